// regint.rs - Internal definitions shared by compiler and executor.
// Limits, bit sets, anchor flags, the bytecode instruction set and the
// compiled program type.

use crate::oniguruma::*;
use crate::regenc::{Encoding, OnigEncoding};
use crate::regparse_types::NameTable;
use crate::regsyntax::OnigSyntaxType;

// === Config Constants ===
/// Nesting of groups and quantifiers. Parsing, compiling and dropping the
/// tree all recurse, so this stays low enough for a 2 MiB thread stack in
/// an unoptimized build.
pub const DEFAULT_PARSE_DEPTH_LIMIT: u32 = 100;
pub const INIT_MATCH_STACK_SIZE: usize = 160;
pub const DEFAULT_MATCH_STACK_LIMIT_SIZE: u32 = 0;
pub const DEFAULT_RETRY_LIMIT_IN_MATCH: u64 = 10_000_000;
pub const DEFAULT_RETRY_LIMIT_IN_SEARCH: u64 = 0;
pub const DEFAULT_TIME_LIMIT_MSEC: u64 = 0;
pub const DEFAULT_CAPTURE_NUM_LIMIT: i32 = 32767;
pub const DEFAULT_REGEX_CACHE_SIZE: usize = 256;

/// The wall clock is consulted once per this many executed steps.
pub const TIME_CHECK_INTERVAL: u64 = 512;

/// Quantified bodies up to this many instructions are unrolled instead of
/// being driven by repeat counters.
pub const QUANTIFIER_EXPAND_LIMIT_SIZE: usize = 64;

pub const INFINITE_REPEAT: i32 = -1;

#[inline]
pub fn is_infinite_repeat(n: i32) -> bool {
    n == INFINITE_REPEAT
}

// === Bytecode Types ===
pub type RelAddrType = i32;
pub type LengthType = i32;
pub type MemNumType = i32;

// === BitSet (256 bits for single-byte code points) ===
pub const BITS_PER_BYTE: usize = 8;
pub const SINGLE_BYTE_SIZE: usize = 1 << BITS_PER_BYTE;
pub const BITS_IN_ROOM: usize = 32;
pub const BITSET_REAL_SIZE: usize = SINGLE_BYTE_SIZE / BITS_IN_ROOM;
pub type Bits = u32;
pub type BitSet = [Bits; BITSET_REAL_SIZE];

#[inline]
pub fn bs_room(pos: usize) -> usize {
    pos >> 5
}

#[inline]
pub fn bs_bit(pos: usize) -> u32 {
    1u32 << (pos & 0x1f)
}

#[inline]
pub fn bitset_at(bs: &BitSet, pos: usize) -> bool {
    (bs[bs_room(pos)] & bs_bit(pos)) != 0
}

#[inline]
pub fn bitset_set_bit(bs: &mut BitSet, pos: usize) {
    bs[bs_room(pos)] |= bs_bit(pos);
}

#[inline]
pub fn bitset_set_range(bs: &mut BitSet, from: usize, to: usize) {
    for pos in from..=to.min(SINGLE_BYTE_SIZE - 1) {
        bitset_set_bit(bs, pos);
    }
}

// === Anchor Flags ===
pub const ANCR_PREC_READ: i32 = 1 << 0;
pub const ANCR_PREC_READ_NOT: i32 = 1 << 1;
pub const ANCR_LOOK_BEHIND: i32 = 1 << 2;
pub const ANCR_LOOK_BEHIND_NOT: i32 = 1 << 3;
pub const ANCR_BEGIN_BUF: i32 = 1 << 4;
pub const ANCR_BEGIN_LINE: i32 = 1 << 5;
pub const ANCR_BEGIN_POSITION: i32 = 1 << 6;
pub const ANCR_END_BUF: i32 = 1 << 7;
pub const ANCR_SEMI_END_BUF: i32 = 1 << 8;
pub const ANCR_END_LINE: i32 = 1 << 9;
pub const ANCR_WORD_BOUNDARY: i32 = 1 << 10;
pub const ANCR_NO_WORD_BOUNDARY: i32 = 1 << 11;

#[inline]
pub fn anchor_has_body(anchor_type: i32) -> bool {
    (anchor_type & (ANCR_PREC_READ | ANCR_PREC_READ_NOT | ANCR_LOOK_BEHIND | ANCR_LOOK_BEHIND_NOT))
        != 0
}

// === Character class ===

/// A compiled bracket class. Code points below 256 live in the bit set
/// (ctype members included); larger ones are checked against `ranges`,
/// `ctypes` and, for case-insensitive classes, `fold_ranges`.
#[derive(Clone, Debug, Default)]
pub struct CClass {
    pub not: bool,
    pub bs: BitSet,
    pub ranges: Vec<(OnigCodePoint, OnigCodePoint)>,
    pub ctypes: Vec<(OnigCtype, bool)>,
    pub ignore_case: bool,
    pub fold_ranges: Vec<(OnigCodePoint, OnigCodePoint)>,
}

fn ranges_contain(ranges: &[(OnigCodePoint, OnigCodePoint)], code: OnigCodePoint) -> bool {
    ranges.iter().any(|&(from, to)| from <= code && code <= to)
}

impl CClass {
    /// Membership before negation.
    fn contains(&self, enc: &dyn Encoding, code: OnigCodePoint) -> bool {
        if (code as usize) < SINGLE_BYTE_SIZE {
            return bitset_at(&self.bs, code as usize);
        }
        if ranges_contain(&self.ranges, code) {
            return true;
        }
        if self
            .ctypes
            .iter()
            .any(|&(ctype, not)| enc.is_code_ctype(code, ctype) != not)
        {
            return true;
        }
        if !self.ignore_case {
            return false;
        }
        let folded = enc.case_fold(code);
        if (folded as usize) < SINGLE_BYTE_SIZE {
            return bitset_at(&self.bs, folded as usize);
        }
        ranges_contain(&self.fold_ranges, folded)
    }

    pub fn is_code_in_cc(&self, enc: &dyn Encoding, code: OnigCodePoint) -> bool {
        self.contains(enc, code) != self.not
    }
}

// === OpCode Enum ===
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    End = 0,
    Str = 1,
    StrIc = 2,
    CClass = 3,
    AnyChar = 4,
    AnyCharMl = 5,
    Word = 6,
    NoWord = 7,
    WordBoundary = 8,
    NoWordBoundary = 9,
    BeginBuf = 10,
    EndBuf = 11,
    SemiEndBuf = 12,
    BeginLine = 13,
    EndLine = 14,
    BeginPosition = 15,
    BackRef = 16,
    BackRefIc = 17,
    MemStart = 18,
    MemEnd = 19,
    Fail = 20,
    Jump = 21,
    Push = 22,
    Mark = 23,
    CutToMark = 24,
    PopToMark = 25,
    Repeat = 26,
    RepeatNg = 27,
    RepeatInc = 28,
    RepeatIncNg = 29,
    EmptyCheckStart = 30,
    EmptyCheckEnd = 31,
    StepBack = 32,
}

// === Operation (Bytecode Instruction) ===
//
// The opcode is stored next to its payload so dispatch is a plain match on
// the opcode. All addresses are relative to the instruction carrying them.
#[derive(Clone, Debug)]
pub struct Operation {
    pub opcode: OpCode,
    pub payload: OperationPayload,
}

#[derive(Clone, Debug)]
pub enum OperationPayload {
    None,
    Str { s: Vec<u8> },
    /// Case-folded code points.
    StrIc { codes: Vec<OnigCodePoint> },
    CClass { cc: Box<CClass> },
    /// `multiline` selects the line-boundary flavor of `^`/`$`.
    Line { multiline: bool },
    BackRef { ns: Vec<MemNumType> },
    Memory { num: MemNumType },
    Jump { addr: RelAddrType },
    Push { addr: RelAddrType },
    Mark { id: MemNumType, save_pos: bool },
    CutToMark { id: MemNumType, restore_pos: bool },
    PopToMark { id: MemNumType },
    Repeat { id: MemNumType, addr: RelAddrType },
    RepeatInc { id: MemNumType, addr: RelAddrType },
    EmptyCheck { mem: MemNumType },
    StepBack { n: LengthType },
}

impl Operation {
    pub fn new(opcode: OpCode, payload: OperationPayload) -> Self {
        Operation { opcode, payload }
    }

    pub fn simple(opcode: OpCode) -> Self {
        Operation {
            opcode,
            payload: OperationPayload::None,
        }
    }
}

// === RepeatRange ===
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatRange {
    pub lower: i32,
    pub upper: i32,
}

// === regex_t ===

/// A compiled program. Never mutated after [`crate::regcomp::onig_new`]
/// returns, so it can be shared freely between threads.
pub struct RegexType {
    // bytecode
    pub ops: Vec<Operation>,

    // capture info
    pub num_mem: i32,
    pub num_repeat: i32,
    pub num_empty_check: i32,
    pub num_mark: i32,
    pub repeat_range: Vec<RepeatRange>,

    // metadata
    pub pattern: Vec<u8>,
    pub enc: OnigEncoding,
    pub options: OnigOptionType,
    pub syntax: &'static OnigSyntaxType,
    pub name_table: NameTable,

    // optimization
    pub anchor: i32,
    pub exact: Vec<u8>,
}

impl RegexType {
    /// Group count including group 0.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.num_mem as usize + 1
    }
}

impl std::fmt::Debug for RegexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexType")
            .field("pattern", &String::from_utf8_lossy(&self.pattern))
            .field("num_mem", &self.num_mem)
            .field("ops", &self.ops.len())
            .field("enc", &self.enc.name())
            .field("options", &self.options)
            .field("syntax", &self.syntax.name)
            .finish()
    }
}

// === Option check helpers ===
#[inline]
pub fn opton_ignorecase(option: OnigOptionType) -> bool {
    option.contains(OnigOptionType::IGNORECASE)
}

#[inline]
pub fn opton_extend(option: OnigOptionType) -> bool {
    option.contains(OnigOptionType::EXTEND)
}

#[inline]
pub fn opton_multiline(option: OnigOptionType) -> bool {
    option.contains(OnigOptionType::MULTILINE)
}

#[inline]
pub fn opton_dotall(option: OnigOptionType) -> bool {
    option.contains(OnigOptionType::DOTALL)
}

#[inline]
pub fn opton_find_longest(option: OnigOptionType) -> bool {
    option.contains(OnigOptionType::FIND_LONGEST)
}

#[inline]
pub fn opton_find_not_empty(option: OnigOptionType) -> bool {
    option.contains(OnigOptionType::FIND_NOT_EMPTY)
}

#[inline]
pub fn opton_notbol(option: OnigOptionType) -> bool {
    option.contains(OnigOptionType::NOTBOL)
}

#[inline]
pub fn opton_noteol(option: OnigOptionType) -> bool {
    option.contains(OnigOptionType::NOTEOL)
}

// === Value helpers ===
#[inline]
pub fn is_code_digit_ascii(code: OnigCodePoint) -> bool {
    (b'0' as u32..=b'9' as u32).contains(&code)
}

#[inline]
pub fn is_code_xdigit_ascii(code: OnigCodePoint) -> bool {
    char::from_u32(code).is_some_and(|c| c.is_ascii_hexdigit())
}

#[inline]
pub fn xdigitval(code: OnigCodePoint) -> u32 {
    char::from_u32(code)
        .and_then(|c| c.to_digit(16))
        .unwrap_or(0)
}
