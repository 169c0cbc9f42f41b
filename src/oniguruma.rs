// oniguruma.rs - Public types of the engine core.
// Option flags, error codes, limits, and the capture region.

use bitflags::bitflags;

// === Version ===
pub const OXONIG_VERSION_MAJOR: i32 = 0;
pub const OXONIG_VERSION_MINOR: i32 = 1;
pub const OXONIG_VERSION_TEENY: i32 = 0;

// === Basic types ===
pub type OnigCodePoint = u32;
pub type OnigUChar = u8;
pub type OnigCtype = u32;

// === Character Types ===
pub const ONIGENC_CTYPE_NEWLINE: OnigCtype = 0;
pub const ONIGENC_CTYPE_ALPHA: OnigCtype = 1;
pub const ONIGENC_CTYPE_BLANK: OnigCtype = 2;
pub const ONIGENC_CTYPE_CNTRL: OnigCtype = 3;
pub const ONIGENC_CTYPE_DIGIT: OnigCtype = 4;
pub const ONIGENC_CTYPE_GRAPH: OnigCtype = 5;
pub const ONIGENC_CTYPE_LOWER: OnigCtype = 6;
pub const ONIGENC_CTYPE_PRINT: OnigCtype = 7;
pub const ONIGENC_CTYPE_PUNCT: OnigCtype = 8;
pub const ONIGENC_CTYPE_SPACE: OnigCtype = 9;
pub const ONIGENC_CTYPE_UPPER: OnigCtype = 10;
pub const ONIGENC_CTYPE_XDIGIT: OnigCtype = 11;
pub const ONIGENC_CTYPE_WORD: OnigCtype = 12;
pub const ONIGENC_CTYPE_ALNUM: OnigCtype = 13;
pub const ONIGENC_CTYPE_ASCII: OnigCtype = 14;
pub const ONIGENC_MAX_STD_CTYPE: OnigCtype = ONIGENC_CTYPE_ASCII;

// === Config Parameters ===
pub const ONIG_NREGION: usize = 10;
pub const ONIG_MAX_CAPTURE_NUM: i32 = 2147483647;
pub const ONIG_MAX_BACKREF_NUM: i32 = 1000;
pub const ONIG_MAX_REPEAT_NUM: i32 = 100000;
pub const ONIG_MAX_ERROR_MESSAGE_LEN: usize = 90;

// === Option Flags ===
bitflags! {
    /// Compile-time and search-time option set.
    ///
    /// Compile-time flags given to [`crate::regcomp::onig_new`] are stored in
    /// the compiled program; search-time flags are OR-ed in per call.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OnigOptionType: u32 {
        /// Case-insensitive comparison of literals, classes and back-references.
        const IGNORECASE = 1;
        /// Free-spacing syntax: unescaped whitespace and `#` comments are ignored.
        const EXTEND = 1 << 1;
        /// `^` and `$` match at internal line boundaries.
        const MULTILINE = 1 << 2;
        /// `.` also matches a newline.
        const DOTALL = 1 << 3;
        /// Report the longest match instead of the first-priority one.
        const FIND_LONGEST = 1 << 4;
        /// Reject an empty match located at the search start position.
        const FIND_NOT_EMPTY = 1 << 5;
        /// The subject start is not the beginning of a line (search time).
        const NOTBOL = 1 << 9;
        /// The subject end is not the end of a line (search time).
        const NOTEOL = 1 << 10;
    }
}

pub const ONIG_OPTION_NONE: OnigOptionType = OnigOptionType::empty();
pub const ONIG_OPTION_DEFAULT: OnigOptionType = ONIG_OPTION_NONE;
pub const ONIG_OPTION_IGNORECASE: OnigOptionType = OnigOptionType::IGNORECASE;
pub const ONIG_OPTION_EXTEND: OnigOptionType = OnigOptionType::EXTEND;
pub const ONIG_OPTION_MULTILINE: OnigOptionType = OnigOptionType::MULTILINE;
pub const ONIG_OPTION_DOTALL: OnigOptionType = OnigOptionType::DOTALL;
pub const ONIG_OPTION_FIND_LONGEST: OnigOptionType = OnigOptionType::FIND_LONGEST;
pub const ONIG_OPTION_FIND_NOT_EMPTY: OnigOptionType = OnigOptionType::FIND_NOT_EMPTY;
pub const ONIG_OPTION_NOTBOL: OnigOptionType = OnigOptionType::NOTBOL;
pub const ONIG_OPTION_NOTEOL: OnigOptionType = OnigOptionType::NOTEOL;

/// Flags that only make sense when searching.
pub const ONIG_OPTION_SEARCH_TIME_MASK: OnigOptionType =
    OnigOptionType::NOTBOL.union(OnigOptionType::NOTEOL);

// === Error Codes ===
// normal return
pub const ONIG_NORMAL: i32 = 0;
pub const ONIG_MISMATCH: i32 = -1;

// internal error
pub const ONIGERR_MEMORY: i32 = -5;
pub const ONIGERR_TYPE_BUG: i32 = -6;
pub const ONIGERR_PARSER_BUG: i32 = -11;
pub const ONIGERR_STACK_BUG: i32 = -12;
pub const ONIGERR_UNDEFINED_BYTECODE: i32 = -13;
pub const ONIGERR_UNEXPECTED_BYTECODE: i32 = -14;
pub const ONIGERR_MATCH_STACK_LIMIT_OVER: i32 = -15;
pub const ONIGERR_PARSE_DEPTH_LIMIT_OVER: i32 = -16;
pub const ONIGERR_RETRY_LIMIT_IN_MATCH_OVER: i32 = -17;
pub const ONIGERR_RETRY_LIMIT_IN_SEARCH_OVER: i32 = -18;
pub const ONIGERR_TIME_LIMIT_OVER: i32 = -20;

// general error
pub const ONIGERR_INVALID_ARGUMENT: i32 = -30;

// syntax error
pub const ONIGERR_END_PATTERN_AT_LEFT_BRACE: i32 = -100;
pub const ONIGERR_END_PATTERN_AT_LEFT_BRACKET: i32 = -101;
pub const ONIGERR_EMPTY_CHAR_CLASS: i32 = -102;
pub const ONIGERR_PREMATURE_END_OF_CHAR_CLASS: i32 = -103;
pub const ONIGERR_END_PATTERN_AT_ESCAPE: i32 = -104;
pub const ONIGERR_CHAR_CLASS_VALUE_AT_END_OF_RANGE: i32 = -110;
pub const ONIGERR_CHAR_CLASS_VALUE_AT_START_OF_RANGE: i32 = -111;
pub const ONIGERR_UNMATCHED_RANGE_SPECIFIER_IN_CHAR_CLASS: i32 = -112;
pub const ONIGERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED: i32 = -113;
pub const ONIGERR_TARGET_OF_REPEAT_OPERATOR_INVALID: i32 = -114;
pub const ONIGERR_UNMATCHED_CLOSE_PARENTHESIS: i32 = -116;
pub const ONIGERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS: i32 = -117;
pub const ONIGERR_END_PATTERN_IN_GROUP: i32 = -118;
pub const ONIGERR_UNDEFINED_GROUP_OPTION: i32 = -119;
pub const ONIGERR_INVALID_POSIX_BRACKET_TYPE: i32 = -121;
pub const ONIGERR_INVALID_LOOK_BEHIND_PATTERN: i32 = -122;
pub const ONIGERR_INVALID_REPEAT_RANGE_PATTERN: i32 = -123;

// values error (syntax error)
pub const ONIGERR_TOO_BIG_NUMBER: i32 = -200;
pub const ONIGERR_TOO_BIG_NUMBER_FOR_REPEAT_RANGE: i32 = -201;
pub const ONIGERR_UPPER_SMALLER_THAN_LOWER_IN_REPEAT_RANGE: i32 = -202;
pub const ONIGERR_EMPTY_RANGE_IN_CHAR_CLASS: i32 = -203;
pub const ONIGERR_TOO_BIG_BACKREF_NUMBER: i32 = -207;
pub const ONIGERR_INVALID_BACKREF: i32 = -208;
pub const ONIGERR_TOO_MANY_CAPTURES: i32 = -210;
pub const ONIGERR_TOO_BIG_WIDE_CHAR_VALUE: i32 = -401;
pub const ONIGERR_EMPTY_GROUP_NAME: i32 = -214;
pub const ONIGERR_INVALID_GROUP_NAME: i32 = -215;
pub const ONIGERR_INVALID_CHAR_IN_GROUP_NAME: i32 = -216;
pub const ONIGERR_UNDEFINED_NAME_REFERENCE: i32 = -217;
pub const ONIGERR_MULTIPLEX_DEFINED_NAME: i32 = -219;
pub const ONIGERR_INVALID_CODE_POINT_VALUE: i32 = -400;

#[inline]
pub fn onig_is_pattern_error(ecode: i32) -> bool {
    ecode <= -100 && ecode > -1000
}

// === OnigRegion (match result) ===

pub const ONIG_REGION_NOTPOS: i32 = -1;

/// Longest subject a search accepts: region offsets are `i32`.
pub const ONIG_MAX_SUBJECT_LEN: usize = i32::MAX as usize;

/// Reusable capture buffer: one `(begin, end)` byte-offset pair per group,
/// slot 0 being the whole match.
///
/// The capacity is fixed by the caller. A search never grows it; a program
/// with more groups than the capacity is rejected with
/// [`crate::error::RegexError::InvalidArgument`].
///
/// ```
/// use oxonig::oniguruma::OnigRegion;
///
/// let mut region = OnigRegion::with_capacity(2);
/// assert_eq!(region.capacity(), 2);
/// assert_eq!(region.count(), 0);
/// region.ensure_capacity(4);
/// assert_eq!(region.capacity(), 4);
/// assert!(region.get(0).is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnigRegion {
    num_regs: usize,
    beg: Vec<i32>,
    end: Vec<i32>,
}

impl OnigRegion {
    /// A region with room for [`ONIG_NREGION`] groups.
    pub fn new() -> Self {
        Self::with_capacity(ONIG_NREGION)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        OnigRegion {
            num_regs: 0,
            beg: vec![ONIG_REGION_NOTPOS; capacity],
            end: vec![ONIG_REGION_NOTPOS; capacity],
        }
    }

    /// Grow the buffer to hold at least `n` groups. Never shrinks.
    pub fn ensure_capacity(&mut self, n: usize) {
        if n > self.beg.len() {
            self.beg.resize(n, ONIG_REGION_NOTPOS);
            self.end.resize(n, ONIG_REGION_NOTPOS);
        }
    }

    pub fn capacity(&self) -> usize {
        self.beg.len()
    }

    /// Number of slots written by the last successful search or match.
    pub fn count(&self) -> usize {
        self.num_regs
    }

    /// Span of group `i`, or `None` if it is out of range or did not
    /// participate in the match.
    pub fn get(&self, i: usize) -> Option<(usize, usize)> {
        if i >= self.num_regs || self.beg[i] == ONIG_REGION_NOTPOS {
            return None;
        }
        Some((self.beg[i] as usize, self.end[i] as usize))
    }

    /// Raw begin offset (`ONIG_REGION_NOTPOS` when unset).
    pub fn beg(&self, i: usize) -> i32 {
        self.beg.get(i).copied().unwrap_or(ONIG_REGION_NOTPOS)
    }

    /// Raw end offset (`ONIG_REGION_NOTPOS` when unset).
    pub fn end(&self, i: usize) -> i32 {
        self.end.get(i).copied().unwrap_or(ONIG_REGION_NOTPOS)
    }

    /// Forget the previous result; every slot becomes unset.
    pub fn clear(&mut self) {
        self.beg.fill(ONIG_REGION_NOTPOS);
        self.end.fill(ONIG_REGION_NOTPOS);
        self.num_regs = 0;
    }

    /// All `count()` slots in group order.
    pub fn iter(&self) -> impl Iterator<Item = Option<(usize, usize)>> + '_ {
        (0..self.num_regs).map(move |i| self.get(i))
    }

    /// Prepare for a program with `n` groups. The caller has already checked
    /// the capacity.
    pub(crate) fn reset(&mut self, n: usize) {
        self.clear();
        self.num_regs = n;
    }

    pub(crate) fn set(&mut self, i: usize, beg: usize, end: usize) {
        self.beg[i] = beg as i32;
        self.end[i] = end as i32;
    }

    pub(crate) fn unset(&mut self, i: usize) {
        self.beg[i] = ONIG_REGION_NOTPOS;
        self.end[i] = ONIG_REGION_NOTPOS;
    }
}

impl Default for OnigRegion {
    fn default() -> Self {
        Self::new()
    }
}
