// regenc.rs - Encoding trait and shared encoding helpers.
// An encoding knows how to walk, decode, classify and case-fold characters.

use crate::oniguruma::*;

/// Encodings are shared, immutable singletons.
pub type OnigEncoding = &'static dyn Encoding;

pub const ASCII_LIMIT: OnigCodePoint = 127;
pub const NEWLINE_CODE: OnigCodePoint = 0x0a;

pub trait Encoding: Send + Sync {
    /// Encoding name (e.g. "US-ASCII", "UTF-8")
    fn name(&self) -> &'static str;

    /// Maximum encoded character length in bytes
    fn max_enc_len(&self) -> usize;

    /// Byte length of the character starting at `p[0]`, judged from the
    /// lead byte only. Callers clamp it with [`enclen`].
    fn mbc_enc_len(&self, p: &[u8]) -> usize;

    /// Decode the character starting at `p[0]`.
    fn mbc_to_code(&self, p: &[u8]) -> OnigCodePoint;

    /// Encode `code` into `buf`; returns the byte count or a negative error code.
    fn code_to_mbc(&self, code: OnigCodePoint, buf: &mut [u8]) -> i32;

    fn is_code_ctype(&self, code: OnigCodePoint, ctype: OnigCtype) -> bool;

    /// Simple one-to-one case fold.
    fn case_fold(&self, code: OnigCodePoint) -> OnigCodePoint;

    /// Move `s` back to the first byte of the character containing it.
    fn left_adjust_char_head(&self, data: &[u8], start: usize, s: usize) -> usize;

    fn is_valid_mbc_string(&self, s: &[u8]) -> bool;

    fn is_unicode(&self) -> bool {
        false
    }

    fn is_mbc_newline(&self, p: &[u8]) -> bool {
        p.first() == Some(&(NEWLINE_CODE as u8))
    }

    /// One-time setup, run by `onig_initialize`.
    fn init(&self) -> i32 {
        ONIG_NORMAL
    }
}

impl std::fmt::Debug for dyn Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Encoding({})", self.name())
    }
}

/// Two encodings are the same if they share a name.
#[inline]
pub fn onigenc_same(a: OnigEncoding, b: OnigEncoding) -> bool {
    a.name() == b.name()
}

// === Character walking ===

/// Length of the character at `pos`, never past the end and never zero.
#[inline]
pub fn enclen(enc: OnigEncoding, data: &[u8], pos: usize) -> usize {
    let rest = data.len() - pos;
    enc.mbc_enc_len(&data[pos..]).clamp(1, rest.max(1))
}

#[inline]
pub fn onigenc_mbc_to_code_at(enc: OnigEncoding, data: &[u8], pos: usize) -> OnigCodePoint {
    let len = enclen(enc, data, pos);
    enc.mbc_to_code(&data[pos..pos + len])
}

/// Head of the character before `s`, or `None` at `start`.
pub fn onigenc_get_prev_char_head(
    enc: OnigEncoding,
    data: &[u8],
    start: usize,
    s: usize,
) -> Option<usize> {
    if s <= start {
        return None;
    }
    Some(enc.left_adjust_char_head(data, start, s - 1))
}

/// Step back `n` characters from `s`; `None` if that passes `start`.
pub fn onigenc_step_back(
    enc: OnigEncoding,
    data: &[u8],
    start: usize,
    mut s: usize,
    n: usize,
) -> Option<usize> {
    for _ in 0..n {
        s = onigenc_get_prev_char_head(enc, data, start, s)?;
    }
    Some(s)
}

/// Number of characters in `data`.
pub fn onigenc_strlen(enc: OnigEncoding, data: &[u8]) -> usize {
    let mut p = 0;
    let mut n = 0;
    while p < data.len() {
        p += enclen(enc, data, p);
        n += 1;
    }
    n
}

#[inline]
pub fn onigenc_is_code_word(enc: OnigEncoding, code: OnigCodePoint) -> bool {
    enc.is_code_ctype(code, ONIGENC_CTYPE_WORD)
}

#[inline]
pub fn onigenc_is_code_newline(code: OnigCodePoint) -> bool {
    code == NEWLINE_CODE
}

// === Ctype bits ===

pub const BIT_CTYPE_NEWLINE: u32 = 1 << ONIGENC_CTYPE_NEWLINE;
pub const BIT_CTYPE_ALPHA: u32 = 1 << ONIGENC_CTYPE_ALPHA;
pub const BIT_CTYPE_BLANK: u32 = 1 << ONIGENC_CTYPE_BLANK;
pub const BIT_CTYPE_CNTRL: u32 = 1 << ONIGENC_CTYPE_CNTRL;
pub const BIT_CTYPE_DIGIT: u32 = 1 << ONIGENC_CTYPE_DIGIT;
pub const BIT_CTYPE_GRAPH: u32 = 1 << ONIGENC_CTYPE_GRAPH;
pub const BIT_CTYPE_LOWER: u32 = 1 << ONIGENC_CTYPE_LOWER;
pub const BIT_CTYPE_PRINT: u32 = 1 << ONIGENC_CTYPE_PRINT;
pub const BIT_CTYPE_PUNCT: u32 = 1 << ONIGENC_CTYPE_PUNCT;
pub const BIT_CTYPE_SPACE: u32 = 1 << ONIGENC_CTYPE_SPACE;
pub const BIT_CTYPE_UPPER: u32 = 1 << ONIGENC_CTYPE_UPPER;
pub const BIT_CTYPE_XDIGIT: u32 = 1 << ONIGENC_CTYPE_XDIGIT;
pub const BIT_CTYPE_WORD: u32 = 1 << ONIGENC_CTYPE_WORD;
pub const BIT_CTYPE_ALNUM: u32 = 1 << ONIGENC_CTYPE_ALNUM;
pub const BIT_CTYPE_ASCII: u32 = 1 << ONIGENC_CTYPE_ASCII;

#[inline]
pub fn ctype_to_bit(ctype: OnigCtype) -> u32 {
    if ctype <= ONIGENC_MAX_STD_CTYPE {
        1 << ctype
    } else {
        0
    }
}

// === ASCII tables ===

pub static ONIG_ENC_ASCII_TO_LOWER_CASE_TABLE: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2a, 0x2b, 0x2c, 0x2d, 0x2e, 0x2f,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3a, 0x3b, 0x3c, 0x3d, 0x3e, 0x3f,
    0x40, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, // A-G -> a-g
    0x68, 0x69, 0x6a, 0x6b, 0x6c, 0x6d, 0x6e, 0x6f, // H-O -> h-o
    0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77, // P-W -> p-w
    0x78, 0x79, 0x7a, 0x5b, 0x5c, 0x5d, 0x5e, 0x5f, // X-Z -> x-z, then [\]^_
    0x60, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6a, 0x6b, 0x6c, 0x6d, 0x6e, 0x6f,
    0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x7b, 0x7c, 0x7d, 0x7e, 0x7f,
    0x80, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8a, 0x8b, 0x8c, 0x8d, 0x8e, 0x8f,
    0x90, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0x9b, 0x9c, 0x9d, 0x9e, 0x9f,
    0xa0, 0xa1, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xab, 0xac, 0xad, 0xae, 0xaf,
    0xb0, 0xb1, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xbb, 0xbc, 0xbd, 0xbe, 0xbf,
    0xc0, 0xc1, 0xc2, 0xc3, 0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xcb, 0xcc, 0xcd, 0xce, 0xcf,
    0xd0, 0xd1, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xdb, 0xdc, 0xdd, 0xde, 0xdf,
    0xe0, 0xe1, 0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xeb, 0xec, 0xed, 0xee, 0xef,
    0xf0, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd, 0xfe, 0xff,
];

pub static ONIG_ENC_ASCII_CTYPE_TABLE: [u16; 256] = [
    0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x420c, 0x420c, 0x4209, 0x4208,
    0x4208, 0x4208, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008,
    0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4284, 0x41a0, 0x41a0, 0x41a0,
    0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0,
    0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x41a0, 0x41a0,
    0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x74a2,
    0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2,
    0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x51a0,
    0x41a0, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2,
    0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2,
    0x70e2, 0x70e2, 0x70e2, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x4008, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000,
];

#[inline]
pub fn onigenc_is_ascii_code_ctype(code: OnigCodePoint, ctype: OnigCtype) -> bool {
    code < 128 && (ONIG_ENC_ASCII_CTYPE_TABLE[code as usize] & ctype_to_bit(ctype) as u16) != 0
}

#[inline]
pub fn onigenc_ascii_code_to_lower_case(c: u8) -> u8 {
    ONIG_ENC_ASCII_TO_LOWER_CASE_TABLE[c as usize]
}

/// POSIX bracket names accepted inside a character class.
pub fn onigenc_posix_bracket_name_to_ctype(name: &[u8]) -> Option<OnigCtype> {
    let ctype = match name {
        b"alnum" => ONIGENC_CTYPE_ALNUM,
        b"alpha" => ONIGENC_CTYPE_ALPHA,
        b"ascii" => ONIGENC_CTYPE_ASCII,
        b"blank" => ONIGENC_CTYPE_BLANK,
        b"cntrl" => ONIGENC_CTYPE_CNTRL,
        b"digit" => ONIGENC_CTYPE_DIGIT,
        b"graph" => ONIGENC_CTYPE_GRAPH,
        b"lower" => ONIGENC_CTYPE_LOWER,
        b"print" => ONIGENC_CTYPE_PRINT,
        b"punct" => ONIGENC_CTYPE_PUNCT,
        b"space" => ONIGENC_CTYPE_SPACE,
        b"upper" => ONIGENC_CTYPE_UPPER,
        b"xdigit" => ONIGENC_CTYPE_XDIGIT,
        b"word" => ONIGENC_CTYPE_WORD,
        _ => return None,
    };
    Some(ctype)
}
