// regexec.rs - Executor.
// Backtracking VM over the compiled `Operation` array, plus the search
// driver (`onig_search`) and the anchored entry point (`onig_match`).

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use memchr::memmem;

use crate::error::RegexError;
use crate::oniguruma::*;
use crate::regenc::*;
use crate::regint::*;

// ============================================================================
// Global Limits
// ============================================================================

static RETRY_LIMIT_IN_MATCH: AtomicU64 = AtomicU64::new(DEFAULT_RETRY_LIMIT_IN_MATCH);
static RETRY_LIMIT_IN_SEARCH: AtomicU64 = AtomicU64::new(DEFAULT_RETRY_LIMIT_IN_SEARCH);
static MATCH_STACK_LIMIT: AtomicU32 = AtomicU32::new(DEFAULT_MATCH_STACK_LIMIT_SIZE);
static TIME_LIMIT: AtomicU64 = AtomicU64::new(DEFAULT_TIME_LIMIT_MSEC);

/// Backtracks allowed in one anchored attempt. Zero disables the limit.
pub fn onig_set_retry_limit_in_match(n: u64) {
    RETRY_LIMIT_IN_MATCH.store(n, Ordering::Relaxed);
}

pub fn onig_get_retry_limit_in_match() -> u64 {
    RETRY_LIMIT_IN_MATCH.load(Ordering::Relaxed)
}

/// Backtracks allowed over a whole search. Zero disables the limit.
pub fn onig_set_retry_limit_in_search(n: u64) {
    RETRY_LIMIT_IN_SEARCH.store(n, Ordering::Relaxed);
}

pub fn onig_get_retry_limit_in_search() -> u64 {
    RETRY_LIMIT_IN_SEARCH.load(Ordering::Relaxed)
}

/// Maximum backtrack stack depth. Zero disables the limit.
pub fn onig_set_match_stack_limit(n: u32) {
    MATCH_STACK_LIMIT.store(n, Ordering::Relaxed);
}

pub fn onig_get_match_stack_limit() -> u32 {
    MATCH_STACK_LIMIT.load(Ordering::Relaxed)
}

/// Wall-clock budget of one call in milliseconds. Zero disables the limit.
pub fn onig_set_time_limit(msec: u64) {
    TIME_LIMIT.store(msec, Ordering::Relaxed);
}

pub fn onig_get_time_limit() -> u64 {
    TIME_LIMIT.load(Ordering::Relaxed)
}

// ============================================================================
// Stack Types
// ============================================================================

/// Capture state of one group. `pending` is the start of an iteration not
/// closed yet; `start`/`end` are the last completed span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct MemSlot {
    pending: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
enum StackEntry {
    /// Choice point.
    Alt { pcode: usize, s: usize },
    MemRestore { num: usize, slot: MemSlot },
    RepeatRestore { id: usize, count: i32, start: usize },
    EmptyCheckRestore { id: usize, pos: Option<usize> },
    Mark { id: MemNumType, pos: usize },
}

impl StackEntry {
    #[inline]
    fn is_restore(&self) -> bool {
        matches!(
            self,
            StackEntry::MemRestore { .. }
                | StackEntry::RepeatRestore { .. }
                | StackEntry::EmptyCheckRestore { .. }
        )
    }
}

// ============================================================================
// MatchArg - per-call match state
// ============================================================================

struct BestMatch {
    start: usize,
    end: usize,
    mems: Vec<MemSlot>,
}

pub struct MatchArg {
    options: OnigOptionType,
    /// MULTILINE given to the search but not to the compile. Compiled
    /// anchors carry the pattern's own setting, inline `(?-m)` included.
    multiline: bool,
    /// DOTALL given to the search but not to the compile.
    dotall: bool,
    /// Position `\G` matches at.
    search_start: usize,
    retry_limit_in_match: u64,
    retry_limit_in_search: u64,
    retry_in_search_counter: u64,
    match_stack_limit: u32,
    time_limit: u64,
    time_start: Option<Instant>,
    steps: u64,

    stack: Vec<StackEntry>,
    mems: Vec<MemSlot>,
    repeat_count: Vec<i32>,
    repeat_start: Vec<usize>,
    empty_check: Vec<Option<usize>>,
    best: Option<BestMatch>,
}

impl MatchArg {
    fn new(reg: &RegexType, option: OnigOptionType, search_start: usize) -> Self {
        let time_limit = TIME_LIMIT.load(Ordering::Relaxed);
        MatchArg {
            options: option | reg.options,
            multiline: opton_multiline(option.difference(reg.options)),
            dotall: opton_dotall(option.difference(reg.options)),
            search_start,
            retry_limit_in_match: RETRY_LIMIT_IN_MATCH.load(Ordering::Relaxed),
            retry_limit_in_search: RETRY_LIMIT_IN_SEARCH.load(Ordering::Relaxed),
            retry_in_search_counter: 0,
            match_stack_limit: MATCH_STACK_LIMIT.load(Ordering::Relaxed),
            time_limit,
            time_start: (time_limit != 0).then(Instant::now),
            steps: 0,
            stack: Vec::with_capacity(INIT_MATCH_STACK_SIZE),
            mems: vec![MemSlot::default(); reg.group_count()],
            repeat_count: vec![0; reg.num_repeat as usize],
            repeat_start: vec![0; reg.num_repeat as usize],
            empty_check: vec![None; reg.num_empty_check as usize],
            best: None,
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.mems.fill(MemSlot::default());
        self.empty_check.fill(None);
    }

    #[inline]
    fn push(&mut self, e: StackEntry) -> Result<(), i32> {
        if self.match_stack_limit != 0 && self.stack.len() >= self.match_stack_limit as usize {
            return Err(ONIGERR_MATCH_STACK_LIMIT_OVER);
        }
        self.stack.push(e);
        Ok(())
    }

    #[inline]
    fn apply_restore(&mut self, e: StackEntry) {
        match e {
            StackEntry::MemRestore { num, slot } => self.mems[num] = slot,
            StackEntry::RepeatRestore { id, count, start } => {
                self.repeat_count[id] = count;
                self.repeat_start[id] = start;
            }
            StackEntry::EmptyCheckRestore { id, pos } => self.empty_check[id] = pos,
            StackEntry::Alt { .. } | StackEntry::Mark { .. } => {}
        }
    }

    /// Pop to the newest choice point, undoing state on the way.
    fn stack_pop(&mut self) -> Option<(usize, usize)> {
        while let Some(e) = self.stack.pop() {
            if let StackEntry::Alt { pcode, s } = e {
                return Some((pcode, s));
            }
            self.apply_restore(e);
        }
        None
    }

    fn find_mark(&self, id: MemNumType) -> Result<usize, i32> {
        self.stack
            .iter()
            .rposition(|e| matches!(e, StackEntry::Mark { id: mid, .. } if *mid == id))
            .ok_or(ONIGERR_STACK_BUG)
    }

    /// Drop every choice point above the mark (and the mark), keeping the
    /// restore entries. Returns the position saved in the mark.
    fn stack_cut_to_mark(&mut self, id: MemNumType) -> Result<usize, i32> {
        let k = self.find_mark(id)?;
        let StackEntry::Mark { pos, .. } = self.stack[k] else {
            return Err(ONIGERR_STACK_BUG);
        };
        let mut w = k;
        for r in k + 1..self.stack.len() {
            if self.stack[r].is_restore() {
                self.stack[w] = self.stack[r];
                w += 1;
            }
        }
        self.stack.truncate(w);
        Ok(pos)
    }

    /// Pop down to and including the mark, undoing state on the way.
    fn stack_pop_to_mark(&mut self, id: MemNumType) -> Result<(), i32> {
        let k = self.find_mark(id)?;
        while self.stack.len() > k {
            if let Some(e) = self.stack.pop() {
                self.apply_restore(e);
            }
        }
        Ok(())
    }

    #[inline]
    fn check_time_limit(&mut self) -> Result<(), i32> {
        if self.time_limit == 0 {
            return Ok(());
        }
        self.steps += 1;
        if self.steps % TIME_CHECK_INTERVAL != 0 {
            return Ok(());
        }
        match self.time_start {
            Some(start) if start.elapsed() >= Duration::from_millis(self.time_limit) => {
                Err(ONIGERR_TIME_LIMIT_OVER)
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Character helpers
// ============================================================================

fn is_word_at(enc: OnigEncoding, subject: &[u8], s: usize) -> bool {
    s < subject.len() && onigenc_is_code_word(enc, onigenc_mbc_to_code_at(enc, subject, s))
}

fn is_word_before(enc: OnigEncoding, subject: &[u8], s: usize) -> bool {
    match onigenc_get_prev_char_head(enc, subject, 0, s) {
        Some(p) => is_word_at(enc, subject, p),
        None => false,
    }
}

fn is_word_boundary(enc: OnigEncoding, subject: &[u8], s: usize) -> bool {
    is_word_before(enc, subject, s) != is_word_at(enc, subject, s)
}

/// Length of the character at `s` if it ends at or before `right_range`.
#[inline]
fn char_len_within(enc: OnigEncoding, subject: &[u8], s: usize, right_range: usize) -> Option<usize> {
    if s >= right_range {
        return None;
    }
    let len = enclen(enc, subject, s);
    (s + len <= right_range).then_some(len)
}

/// Case-insensitive comparison of `subject[s..]` against folded `codes`.
/// Returns the position after the matched text.
fn string_cmp_ic(
    enc: OnigEncoding,
    subject: &[u8],
    mut s: usize,
    right_range: usize,
    codes: &[OnigCodePoint],
) -> Option<usize> {
    for &code in codes {
        let len = char_len_within(enc, subject, s, right_range)?;
        if enc.case_fold(enc.mbc_to_code(&subject[s..s + len])) != code {
            return None;
        }
        s += len;
    }
    Some(s)
}

fn backref_match(
    enc: OnigEncoding,
    subject: &[u8],
    s: usize,
    right_range: usize,
    (start, end): (usize, usize),
    ignore_case: bool,
) -> Option<usize> {
    let len = end - start;
    if !ignore_case {
        if s + len > right_range || subject[start..end] != subject[s..s + len] {
            return None;
        }
        return Some(s + len);
    }
    let mut p = start;
    let mut q = s;
    while p < end {
        let plen = enclen(enc, subject, p);
        let qlen = char_len_within(enc, subject, q, right_range)?;
        let a = enc.case_fold(enc.mbc_to_code(&subject[p..p + plen]));
        let b = enc.case_fold(enc.mbc_to_code(&subject[q..q + qlen]));
        if a != b {
            return None;
        }
        p += plen;
        q += qlen;
    }
    Some(q)
}

// ============================================================================
// match_at - run the program anchored at `sstart`
// ============================================================================

/// Run the program at `sstart`. Consuming instructions never read at or past
/// `right_range`. On success returns the end of the match, with captures
/// left in `msa.mems`.
fn match_at(
    reg: &RegexType,
    subject: &[u8],
    right_range: usize,
    sstart: usize,
    msa: &mut MatchArg,
) -> Result<Option<usize>, i32> {
    let enc = reg.enc;
    let end = subject.len();
    let ops = &reg.ops;
    let find_longest = opton_find_longest(msa.options);
    let find_not_empty = opton_find_not_empty(msa.options);
    let notbol = opton_notbol(msa.options);
    let noteol = opton_noteol(msa.options);
    let mut retry_in_match: u64 = 0;

    msa.reset();
    let mut pc: usize = 0;
    let mut s: usize = sstart;

    loop {
        msa.check_time_limit()?;
        let op = ops.get(pc).ok_or(ONIGERR_UNDEFINED_BYTECODE)?;

        let ok = match (op.opcode, &op.payload) {
            (OpCode::End, _) => {
                if find_not_empty && s == sstart && sstart == msa.search_start {
                    false
                } else if find_longest {
                    let len = s - sstart;
                    let better = msa.best.as_ref().map_or(true, |b| len > b.end - b.start);
                    if better {
                        msa.best = Some(BestMatch {
                            start: sstart,
                            end: s,
                            mems: msa.mems.clone(),
                        });
                    }
                    false
                } else {
                    return Ok(Some(s));
                }
            }

            (OpCode::Str, OperationPayload::Str { s: lit }) => {
                let n = lit.len();
                if s + n <= right_range && subject[s..s + n] == lit[..] {
                    s += n;
                    pc += 1;
                    true
                } else {
                    false
                }
            }

            (OpCode::StrIc, OperationPayload::StrIc { codes }) => {
                match string_cmp_ic(enc, subject, s, right_range, codes) {
                    Some(next) => {
                        s = next;
                        pc += 1;
                        true
                    }
                    None => false,
                }
            }

            (OpCode::CClass, OperationPayload::CClass { cc }) => {
                match char_len_within(enc, subject, s, right_range) {
                    Some(len) if cc.is_code_in_cc(enc, enc.mbc_to_code(&subject[s..s + len])) => {
                        s += len;
                        pc += 1;
                        true
                    }
                    _ => false,
                }
            }

            (OpCode::AnyChar | OpCode::AnyCharMl, _) => {
                match char_len_within(enc, subject, s, right_range) {
                    Some(len)
                        if op.opcode == OpCode::AnyCharMl
                            || msa.dotall
                            || !enc.is_mbc_newline(&subject[s..s + len]) =>
                    {
                        s += len;
                        pc += 1;
                        true
                    }
                    _ => false,
                }
            }

            (OpCode::Word | OpCode::NoWord, _) => {
                match char_len_within(enc, subject, s, right_range) {
                    Some(len)
                        if is_word_at(enc, subject, s) == (op.opcode == OpCode::Word) =>
                    {
                        s += len;
                        pc += 1;
                        true
                    }
                    _ => false,
                }
            }

            (OpCode::WordBoundary, _) => {
                pc += 1;
                is_word_boundary(enc, subject, s)
            }

            (OpCode::NoWordBoundary, _) => {
                pc += 1;
                !is_word_boundary(enc, subject, s)
            }

            (OpCode::BeginBuf, _) => {
                pc += 1;
                s == 0
            }

            (OpCode::EndBuf, _) => {
                pc += 1;
                s == end
            }

            (OpCode::SemiEndBuf, _) => {
                pc += 1;
                s == end || (s + 1 == end && subject[s] == NEWLINE_CODE as u8)
            }

            (OpCode::BeginLine, OperationPayload::Line { multiline }) => {
                pc += 1;
                if s == 0 {
                    !notbol
                } else {
                    (*multiline || msa.multiline)
                        && s < end
                        && subject[s - 1] == NEWLINE_CODE as u8
                }
            }

            (OpCode::EndLine, OperationPayload::Line { multiline }) => {
                pc += 1;
                if s == end {
                    !noteol
                } else if subject[s] == NEWLINE_CODE as u8 {
                    *multiline || msa.multiline || (s + 1 == end && !noteol)
                } else {
                    false
                }
            }

            (OpCode::BeginPosition, _) => {
                pc += 1;
                s == msa.search_start
            }

            (OpCode::BackRef | OpCode::BackRefIc, OperationPayload::BackRef { ns }) => {
                let ignore_case = op.opcode == OpCode::BackRefIc;
                let found = ns.iter().rev().find_map(|&n| {
                    let slot = msa.mems.get(n as usize)?;
                    let span = (slot.start?, slot.end?);
                    backref_match(enc, subject, s, right_range, span, ignore_case)
                });
                match found {
                    Some(next) => {
                        s = next;
                        pc += 1;
                        true
                    }
                    None => false,
                }
            }

            (OpCode::MemStart, OperationPayload::Memory { num }) => {
                let num = *num as usize;
                msa.push(StackEntry::MemRestore {
                    num,
                    slot: msa.mems[num],
                })?;
                msa.mems[num].pending = Some(s);
                pc += 1;
                true
            }

            (OpCode::MemEnd, OperationPayload::Memory { num }) => {
                let num = *num as usize;
                let slot = msa.mems[num];
                msa.push(StackEntry::MemRestore { num, slot })?;
                msa.mems[num].start = slot.pending;
                msa.mems[num].end = Some(s);
                pc += 1;
                true
            }

            (OpCode::Fail, _) => false,

            (OpCode::Jump, OperationPayload::Jump { addr }) => {
                pc = (pc as RelAddrType + addr) as usize;
                true
            }

            (OpCode::Push, OperationPayload::Push { addr }) => {
                msa.push(StackEntry::Alt {
                    pcode: (pc as RelAddrType + addr) as usize,
                    s,
                })?;
                pc += 1;
                true
            }

            (OpCode::Mark, OperationPayload::Mark { id, .. }) => {
                msa.push(StackEntry::Mark { id: *id, pos: s })?;
                pc += 1;
                true
            }

            (OpCode::CutToMark, OperationPayload::CutToMark { id, restore_pos }) => {
                let pos = msa.stack_cut_to_mark(*id)?;
                if *restore_pos {
                    s = pos;
                }
                pc += 1;
                true
            }

            (OpCode::PopToMark, OperationPayload::PopToMark { id }) => {
                msa.stack_pop_to_mark(*id)?;
                pc += 1;
                true
            }

            (OpCode::Repeat | OpCode::RepeatNg, OperationPayload::Repeat { id, addr }) => {
                let id = *id as usize;
                let range = reg.repeat_range.get(id).ok_or(ONIGERR_UNDEFINED_BYTECODE)?;
                msa.push(StackEntry::RepeatRestore {
                    id,
                    count: msa.repeat_count[id],
                    start: msa.repeat_start[id],
                })?;
                msa.repeat_count[id] = 0;
                msa.repeat_start[id] = s;
                let exit = (pc as RelAddrType + addr) as usize;
                if range.lower == 0 {
                    if op.opcode == OpCode::Repeat {
                        msa.push(StackEntry::Alt { pcode: exit, s })?;
                        pc += 1;
                    } else {
                        msa.push(StackEntry::Alt { pcode: pc + 1, s })?;
                        pc = exit;
                    }
                } else {
                    pc += 1;
                }
                true
            }

            (OpCode::RepeatInc | OpCode::RepeatIncNg, OperationPayload::RepeatInc { id, addr }) => {
                let id = *id as usize;
                let range = *reg.repeat_range.get(id).ok_or(ONIGERR_UNDEFINED_BYTECODE)?;
                msa.push(StackEntry::RepeatRestore {
                    id,
                    count: msa.repeat_count[id],
                    start: msa.repeat_start[id],
                })?;
                msa.repeat_count[id] += 1;
                let count = msa.repeat_count[id];
                let body = (pc as RelAddrType + addr) as usize;
                let empty_iteration = s == msa.repeat_start[id];

                if (empty_iteration && count >= range.lower)
                    || (!is_infinite_repeat(range.upper) && count >= range.upper)
                {
                    pc += 1;
                } else if count >= range.lower {
                    msa.repeat_start[id] = s;
                    if op.opcode == OpCode::RepeatInc {
                        msa.push(StackEntry::Alt { pcode: pc + 1, s })?;
                        pc = body;
                    } else {
                        msa.push(StackEntry::Alt { pcode: body, s })?;
                        pc += 1;
                    }
                } else {
                    msa.repeat_start[id] = s;
                    pc = body;
                }
                true
            }

            (OpCode::EmptyCheckStart, OperationPayload::EmptyCheck { mem }) => {
                let id = *mem as usize;
                msa.push(StackEntry::EmptyCheckRestore {
                    id,
                    pos: msa.empty_check[id],
                })?;
                msa.empty_check[id] = Some(s);
                pc += 1;
                true
            }

            (OpCode::EmptyCheckEnd, OperationPayload::EmptyCheck { mem }) => {
                // an empty iteration leaves the loop by skipping its back jump
                if msa.empty_check[*mem as usize] == Some(s) {
                    pc += 2;
                } else {
                    pc += 1;
                }
                true
            }

            (OpCode::StepBack, OperationPayload::StepBack { n }) => {
                match onigenc_step_back(enc, subject, 0, s, *n as usize) {
                    Some(p) => {
                        s = p;
                        pc += 1;
                        true
                    }
                    None => false,
                }
            }

            _ => return Err(ONIGERR_UNEXPECTED_BYTECODE),
        };

        if !ok {
            let Some((npc, ns)) = msa.stack_pop() else {
                return Ok(None);
            };
            retry_in_match += 1;
            if msa.retry_limit_in_match != 0 && retry_in_match > msa.retry_limit_in_match {
                return Err(ONIGERR_RETRY_LIMIT_IN_MATCH_OVER);
            }
            msa.retry_in_search_counter += 1;
            if msa.retry_limit_in_search != 0
                && msa.retry_in_search_counter > msa.retry_limit_in_search
            {
                return Err(ONIGERR_RETRY_LIMIT_IN_SEARCH_OVER);
            }
            pc = npc;
            s = ns;
        }
    }
}

// ============================================================================
// Region output
// ============================================================================

fn fill_region(region: &mut OnigRegion, start: usize, end: usize, mems: &[MemSlot]) {
    region.reset(mems.len());
    region.set(0, start, end);
    for (i, slot) in mems.iter().enumerate().skip(1) {
        if let (Some(b), Some(e)) = (slot.start, slot.end) {
            region.set(i, b, e);
        }
    }
}

/// IGNORECASE and EXTEND shape the compiled program, so a search may only
/// repeat what the pattern was compiled with.
fn check_search_options(reg: &RegexType, option: OnigOptionType) -> Result<(), RegexError> {
    let compile_only = ONIG_OPTION_IGNORECASE | ONIG_OPTION_EXTEND;
    let missing = (option & compile_only).difference(reg.options);
    if !missing.is_empty() {
        return Err(RegexError::invalid_argument(format!(
            "option {:?} applies at compile time only",
            missing
        )));
    }
    Ok(())
}

/// Region offsets are stored as `i32`.
fn check_subject_len(len: usize) -> Result<(), RegexError> {
    if len > ONIG_MAX_SUBJECT_LEN {
        return Err(RegexError::invalid_argument(format!(
            "subject of {} bytes exceeds the {} byte maximum",
            len, ONIG_MAX_SUBJECT_LEN
        )));
    }
    Ok(())
}

fn check_region_capacity(reg: &RegexType, region: &OnigRegion) -> Result<(), RegexError> {
    if region.capacity() < reg.group_count() {
        return Err(RegexError::invalid_argument(format!(
            "region holds {} groups, program needs {}",
            region.capacity(),
            reg.group_count()
        )));
    }
    Ok(())
}

// ============================================================================
// onig_match - anchored attempt
// ============================================================================

/// Match anchored at `at`. Returns the matched length; the region receives
/// absolute offsets.
pub fn onig_match(
    reg: &RegexType,
    subject: &[u8],
    at: usize,
    region: &mut OnigRegion,
    option: OnigOptionType,
) -> Result<Option<usize>, RegexError> {
    check_subject_len(subject.len())?;
    if at > subject.len() {
        return Err(RegexError::invalid_argument(format!(
            "match position {} outside subject of length {}",
            at,
            subject.len()
        )));
    }
    check_search_options(reg, option)?;
    check_region_capacity(reg, region)?;
    region.clear();

    let mut msa = MatchArg::new(reg, option, at);
    let r = match_at(reg, subject, subject.len(), at, &mut msa).map_err(RegexError::from)?;
    if let Some(end) = r {
        fill_region(region, at, end, &msa.mems);
        return Ok(Some(end - at));
    }
    if let Some(best) = msa.best.take() {
        fill_region(region, best.start, best.end, &best.mems);
        return Ok(Some(best.end - best.start));
    }
    Ok(None)
}

// ============================================================================
// onig_search - scan start positions left to right
// ============================================================================

/// Search for a match starting anywhere in `[start, range]`. A match never
/// consumes text at or after `range`; anchors and look-behind still see the
/// whole subject. Returns the match start.
pub fn onig_search(
    reg: &RegexType,
    subject: &[u8],
    start: usize,
    range: usize,
    region: &mut OnigRegion,
    option: OnigOptionType,
) -> Result<Option<usize>, RegexError> {
    let end = subject.len();
    check_subject_len(end)?;
    if start > range || range > end {
        return Err(RegexError::invalid_argument(format!(
            "search range {}..{} outside subject of length {}",
            start, range, end
        )));
    }
    check_search_options(reg, option)?;
    check_region_capacity(reg, region)?;
    region.clear();

    log::trace!(
        "search {:?} in {} bytes, range {}..{}",
        String::from_utf8_lossy(&reg.pattern),
        end,
        start,
        range
    );

    let mut msa = MatchArg::new(reg, option, start);
    let found = forward_search(reg, subject, start, range, &mut msa).map_err(RegexError::from)?;

    if let Some((sstart, send)) = found {
        fill_region(region, sstart, send, &msa.mems);
        return Ok(Some(sstart));
    }
    if let Some(best) = msa.best.take() {
        fill_region(region, best.start, best.end, &best.mems);
        return Ok(Some(best.start));
    }
    Ok(None)
}

fn forward_search(
    reg: &RegexType,
    subject: &[u8],
    start: usize,
    range: usize,
    msa: &mut MatchArg,
) -> Result<Option<(usize, usize)>, i32> {
    let enc = reg.enc;
    let mut last = range;
    if reg.anchor & ANCR_BEGIN_POSITION != 0 {
        last = start;
    } else if reg.anchor & ANCR_BEGIN_BUF != 0 && !msa.multiline {
        if start != 0 {
            return Ok(None);
        }
        last = 0;
    }

    let finder = (!reg.exact.is_empty()).then(|| memmem::Finder::new(&reg.exact));
    let mut s = start;
    loop {
        if let Some(f) = &finder {
            match f.find(&subject[s..range]) {
                Some(i) => s += i,
                None => return Ok(None),
            }
        }
        if let Some(e) = match_at(reg, subject, range, s, msa)? {
            return Ok(Some((s, e)));
        }
        if s >= last {
            return Ok(None);
        }
        s += enclen(enc, subject, s);
        // a range ending inside a character
        if s > range {
            return Ok(None);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
