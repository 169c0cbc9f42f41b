// encodings/ascii.rs - US-ASCII encoding.
// Single byte per character; bytes above 0x7f have no character class.

use crate::oniguruma::*;
use crate::regenc::*;

pub struct AsciiEncoding;

pub static ONIG_ENCODING_ASCII: AsciiEncoding = AsciiEncoding;

impl Encoding for AsciiEncoding {
    fn name(&self) -> &'static str {
        "US-ASCII"
    }

    fn max_enc_len(&self) -> usize {
        1
    }

    fn mbc_enc_len(&self, _p: &[u8]) -> usize {
        1
    }

    fn mbc_to_code(&self, p: &[u8]) -> OnigCodePoint {
        p[0] as OnigCodePoint
    }

    fn code_to_mbc(&self, code: OnigCodePoint, buf: &mut [u8]) -> i32 {
        if code > 0xff {
            return ONIGERR_INVALID_CODE_POINT_VALUE;
        }
        buf[0] = code as u8;
        1
    }

    fn is_code_ctype(&self, code: OnigCodePoint, ctype: OnigCtype) -> bool {
        onigenc_is_ascii_code_ctype(code, ctype)
    }

    fn case_fold(&self, code: OnigCodePoint) -> OnigCodePoint {
        if code < 128 {
            onigenc_ascii_code_to_lower_case(code as u8) as OnigCodePoint
        } else {
            code
        }
    }

    fn left_adjust_char_head(&self, _data: &[u8], _start: usize, s: usize) -> usize {
        s
    }

    fn is_valid_mbc_string(&self, _s: &[u8]) -> bool {
        true
    }
}
