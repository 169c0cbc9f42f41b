// encodings/utf8.rs - UTF-8 encoding (RFC 3629 range: U+0000 - U+10FFFF).
// Character classes below U+0100 come from the ISO-8859-1 ctype table;
// above that they follow the Unicode properties exposed by `char`.

use crate::oniguruma::*;
use crate::regenc::*;

#[inline]
fn utf8_islead(c: u8) -> bool {
    (c & 0xc0) != 0x80
}

#[inline]
fn utf8_istail(c: u8) -> bool {
    (c & 0xc0) == 0x80
}

// Maps first byte to character length.
static ENC_LEN_UTF8: [u8; 256] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
];

// Latin-1 ctype bits, indexed by code point.
static ENC_UNICODE_ISO_8859_1_CTYPE_TABLE: [u16; 256] = [
    0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008,
    0x4008, 0x428c, 0x4289, 0x4288, 0x4288, 0x4288, 0x4008, 0x4008,
    0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008,
    0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008, 0x4008,
    0x4284, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0,
    0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0,
    0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0, 0x78b0,
    0x78b0, 0x78b0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x41a0,
    0x41a0, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x7ca2, 0x74a2,
    0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2,
    0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2, 0x74a2,
    0x74a2, 0x74a2, 0x74a2, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x51a0,
    0x41a0, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x78e2, 0x70e2,
    0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2,
    0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2, 0x70e2,
    0x70e2, 0x70e2, 0x70e2, 0x41a0, 0x41a0, 0x41a0, 0x41a0, 0x4008,
    0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0288, 0x0008, 0x0008,
    0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008,
    0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008,
    0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008, 0x0008,
    0x0284, 0x01a0, 0x01a0, 0x01a0, 0x01a0, 0x01a0, 0x01a0, 0x01a0,
    0x01a0, 0x01a0, 0x30e2, 0x01a0, 0x01a0, 0x00a8, 0x01a0, 0x01a0,
    0x01a0, 0x01a0, 0x10a0, 0x10a0, 0x01a0, 0x30e2, 0x01a0, 0x01a0,
    0x01a0, 0x10a0, 0x30e2, 0x01a0, 0x10a0, 0x10a0, 0x10a0, 0x01a0,
    0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2,
    0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2,
    0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x01a0,
    0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x34a2, 0x30e2,
    0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2,
    0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2,
    0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x01a0,
    0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2, 0x30e2,
];

pub struct Utf8Encoding;

pub static ONIG_ENCODING_UTF8: Utf8Encoding = Utf8Encoding;

fn is_line_separator(c: char) -> bool {
    matches!(c, '\u{2028}' | '\u{2029}')
}

impl Encoding for Utf8Encoding {
    fn name(&self) -> &'static str {
        "UTF-8"
    }

    fn max_enc_len(&self) -> usize {
        4
    }

    fn mbc_enc_len(&self, p: &[u8]) -> usize {
        ENC_LEN_UTF8[p[0] as usize] as usize
    }

    fn mbc_to_code(&self, p: &[u8]) -> OnigCodePoint {
        let len = (ENC_LEN_UTF8[p[0] as usize] as usize).min(p.len());
        let c = p[0] as u32;
        if len == 1 {
            return c;
        }
        let mut n = c & ((1u32 << (7 - len)) - 1);
        for &b in &p[1..len] {
            n = (n << 6) | (b as u32 & 0x3f);
        }
        n
    }

    fn code_to_mbc(&self, code: OnigCodePoint, buf: &mut [u8]) -> i32 {
        if (code & 0xffffff80) == 0 {
            buf[0] = code as u8;
            return 1;
        }
        let mut i = 0;
        if (code & 0xfffff800) == 0 {
            buf[i] = ((code >> 6) & 0x1f) as u8 | 0xc0;
            i += 1;
        } else if (code & 0xffff0000) == 0 {
            buf[i] = ((code >> 12) & 0x0f) as u8 | 0xe0;
            buf[i + 1] = ((code >> 6) & 0x3f) as u8 | 0x80;
            i += 2;
        } else if code <= 0x10ffff {
            buf[i] = ((code >> 18) & 0x07) as u8 | 0xf0;
            buf[i + 1] = ((code >> 12) & 0x3f) as u8 | 0x80;
            buf[i + 2] = ((code >> 6) & 0x3f) as u8 | 0x80;
            i += 3;
        } else {
            return ONIGERR_TOO_BIG_WIDE_CHAR_VALUE;
        }
        buf[i] = (code & 0x3f) as u8 | 0x80;
        (i + 1) as i32
    }

    fn is_code_ctype(&self, code: OnigCodePoint, ctype: OnigCtype) -> bool {
        if code < 256 {
            return (ENC_UNICODE_ISO_8859_1_CTYPE_TABLE[code as usize] & ctype_to_bit(ctype) as u16)
                != 0;
        }
        let Some(c) = char::from_u32(code) else {
            return false;
        };
        match ctype {
            ONIGENC_CTYPE_ALPHA => c.is_alphabetic(),
            ONIGENC_CTYPE_BLANK => c.is_whitespace() && !is_line_separator(c),
            ONIGENC_CTYPE_CNTRL => c.is_control(),
            ONIGENC_CTYPE_DIGIT => c.is_numeric(),
            ONIGENC_CTYPE_GRAPH => !c.is_whitespace() && !c.is_control(),
            ONIGENC_CTYPE_LOWER => c.is_lowercase(),
            ONIGENC_CTYPE_PRINT => !c.is_control() && !is_line_separator(c),
            ONIGENC_CTYPE_PUNCT => !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control(),
            ONIGENC_CTYPE_SPACE => c.is_whitespace(),
            ONIGENC_CTYPE_UPPER => c.is_uppercase(),
            ONIGENC_CTYPE_WORD | ONIGENC_CTYPE_ALNUM => c.is_alphanumeric(),
            _ => false,
        }
    }

    fn case_fold(&self, code: OnigCodePoint) -> OnigCodePoint {
        if code < 128 {
            return onigenc_ascii_code_to_lower_case(code as u8) as OnigCodePoint;
        }
        let Some(c) = char::from_u32(code) else {
            return code;
        };
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => l as OnigCodePoint,
            _ => code,
        }
    }

    fn left_adjust_char_head(&self, data: &[u8], start: usize, s: usize) -> usize {
        if s <= start {
            return s;
        }
        let mut p = s;
        while p > start && !utf8_islead(data[p]) {
            p -= 1;
        }
        p
    }

    fn is_valid_mbc_string(&self, s: &[u8]) -> bool {
        let mut p = 0;
        while p < s.len() {
            if s[p] > 0xf4 || (s[p] > 0x7f && s[p] < 0xc2) {
                return false;
            }
            let len = ENC_LEN_UTF8[s[p] as usize] as usize;
            p += 1;
            for _ in 1..len {
                if p >= s.len() || !utf8_istail(s[p]) {
                    return false;
                }
                p += 1;
            }
        }
        true
    }

    fn is_unicode(&self) -> bool {
        true
    }
}
