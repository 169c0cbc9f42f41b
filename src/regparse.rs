// regparse.rs - Pattern parser.
// Recursive descent from pattern bytes to a parse tree. Errors are returned
// as Oniguruma error codes; the failing offset is left in `ParseEnv`.

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use smallvec::SmallVec;

use crate::oniguruma::*;
use crate::regenc::*;
use crate::regint::*;
use crate::regparse_types::*;
use crate::regsyntax::{SyntaxBehavior, SyntaxOp};

// ============================================================================
// Global State
// ============================================================================

static MAX_CAPTURE_NUM: AtomicI32 = AtomicI32::new(DEFAULT_CAPTURE_NUM_LIMIT);
static PARSE_DEPTH_LIMIT: AtomicU32 = AtomicU32::new(DEFAULT_PARSE_DEPTH_LIMIT);

pub fn onig_get_capture_num_limit() -> i32 {
    MAX_CAPTURE_NUM.load(Ordering::Relaxed)
}

pub fn onig_set_capture_num_limit(num: i32) -> i32 {
    if num < 0 {
        return -1;
    }
    MAX_CAPTURE_NUM.store(num, Ordering::Relaxed);
    0
}

pub fn onig_get_parse_depth_limit() -> u32 {
    PARSE_DEPTH_LIMIT.load(Ordering::Relaxed)
}

/// Zero restores the default.
pub fn onig_set_parse_depth_limit(depth: u32) -> i32 {
    if depth == 0 {
        PARSE_DEPTH_LIMIT.store(DEFAULT_PARSE_DEPTH_LIMIT, Ordering::Relaxed);
    } else {
        PARSE_DEPTH_LIMIT.store(depth, Ordering::Relaxed);
    }
    0
}

// ============================================================================
// Character fetching
// ============================================================================

/// Decode the character at the cursor and advance past it.
fn pfetch(env: &mut ParseEnv) -> OnigCodePoint {
    let len = enclen(env.enc, env.pattern, env.pos);
    let code = env.enc.mbc_to_code(&env.pattern[env.pos..env.pos + len]);
    env.pos += len;
    code
}

fn code_to_bytes(env: &mut ParseEnv, code: OnigCodePoint, at: usize) -> Result<Vec<u8>, i32> {
    let mut buf = [0u8; 8];
    let n = env.enc.code_to_mbc(code, &mut buf);
    if n < 0 {
        return Err(env.fail_at(n, at));
    }
    Ok(buf[..n as usize].to_vec())
}

fn scan_number(env: &mut ParseEnv, max_digits: usize) -> Option<i64> {
    let mut n: i64 = 0;
    let mut digits = 0;
    while digits < max_digits {
        match env.peek_byte() {
            Some(b) if b.is_ascii_digit() => {
                n = (n * 10 + (b - b'0') as i64).min(i32::MAX as i64 + 1);
                env.pos += 1;
                digits += 1;
            }
            _ => break,
        }
    }
    (digits > 0).then_some(n)
}

fn scan_hexadecimal_number(env: &mut ParseEnv, max_digits: usize) -> (u32, usize) {
    let mut n: u64 = 0;
    let mut digits = 0;
    while digits < max_digits {
        match env.peek_byte() {
            Some(b) if b.is_ascii_hexdigit() => {
                n = (n << 4) | xdigitval(b as u32) as u64;
                env.pos += 1;
                digits += 1;
            }
            _ => break,
        }
    }
    (n.min(u32::MAX as u64) as u32, digits)
}

fn scan_octal_number(env: &mut ParseEnv, max_digits: usize) -> (u32, usize) {
    let mut n: u32 = 0;
    let mut digits = 0;
    while digits < max_digits {
        match env.peek_byte() {
            Some(b @ b'0'..=b'7') => {
                n = (n << 3) | (b - b'0') as u32;
                env.pos += 1;
                digits += 1;
            }
            _ => break,
        }
    }
    (n, digits)
}

/// Value of an escape that denotes a single character. The cursor sits on
/// the character after the backslash.
fn fetch_escaped_value(env: &mut ParseEnv) -> Result<OnigCodePoint, i32> {
    let esc_start = env.pos - 1;
    let Some(b) = env.peek_byte() else {
        return Err(env.fail_at(ONIGERR_END_PATTERN_AT_ESCAPE, esc_start));
    };
    let simple = match b {
        b't' => Some(0x09),
        b'n' => Some(0x0a),
        b'r' => Some(0x0d),
        b'f' => Some(0x0c),
        b'v' => Some(0x0b),
        b'a' => Some(0x07),
        b'e' => Some(0x1b),
        _ => None,
    };
    if let Some(code) = simple {
        env.pos += 1;
        return Ok(code);
    }

    match b {
        b'x' => {
            env.pos += 1;
            if env.peek_byte() == Some(b'{') {
                env.pos += 1;
                let (code, digits) = scan_hexadecimal_number(env, 8);
                if digits == 0 || env.peek_byte() != Some(b'}') {
                    return Err(env.fail_at(ONIGERR_INVALID_CODE_POINT_VALUE, esc_start));
                }
                env.pos += 1;
                Ok(code)
            } else {
                let (code, _) = scan_hexadecimal_number(env, 2);
                Ok(code)
            }
        }
        b'u' => {
            env.pos += 1;
            let (code, digits) = scan_hexadecimal_number(env, 4);
            if digits < 4 {
                return Err(env.fail_at(ONIGERR_INVALID_CODE_POINT_VALUE, esc_start));
            }
            Ok(code)
        }
        b'0' => {
            env.pos += 1;
            let (code, _) = scan_octal_number(env, 2);
            Ok(code)
        }
        _ => Ok(pfetch(env)),
    }
}

fn skip_extended_space(env: &mut ParseEnv) {
    if !opton_extend(env.options) {
        return;
    }
    while let Some(b) = env.peek_byte() {
        if b.is_ascii_whitespace() || b == 0x0b {
            env.pos += 1;
        } else if b == b'#' {
            while let Some(c) = env.peek_byte() {
                env.pos += 1;
                if c == b'\n' {
                    break;
                }
            }
        } else {
            break;
        }
    }
}

// ============================================================================
// Names
// ============================================================================

enum NameRef {
    Name(String),
    Num(i32),
}

/// Read a group name up to `end_code`. With `is_ref`, a (signed) number is
/// accepted too and returned as an absolute group number.
fn fetch_name(env: &mut ParseEnv, end_code: u8, is_ref: bool) -> Result<NameRef, i32> {
    let name_start = env.pos;
    let first = match env.peek_byte() {
        None => return Err(env.fail_at(ONIGERR_EMPTY_GROUP_NAME, name_start)),
        Some(b) if b == end_code => {
            return Err(env.fail_at(ONIGERR_EMPTY_GROUP_NAME, name_start));
        }
        Some(b) => b,
    };

    if is_ref && (first.is_ascii_digit() || first == b'-' || first == b'+') {
        let sign = match first {
            b'-' => -1,
            b'+' => 1,
            _ => 0,
        };
        if sign != 0 {
            env.pos += 1;
        }
        let n = scan_number(env, 10);
        let Some(n) = n.filter(|_| env.peek_byte() == Some(end_code)) else {
            let stop = env.pattern[env.pos..]
                .iter()
                .position(|&b| b == end_code)
                .map_or(env.pattern.len(), |i| env.pos + i);
            let text = env.pattern[name_start..stop].to_vec();
            return Err(env.fail_with_name(ONIGERR_INVALID_GROUP_NAME, name_start, &text));
        };
        env.pos += 1;
        if n > ONIG_MAX_BACKREF_NUM as i64 {
            return Err(env.fail_at(ONIGERR_TOO_BIG_BACKREF_NUMBER, name_start));
        }
        let n = n as i32;
        let num = match sign {
            -1 => env.num_mem + 1 - n,
            1 => env.num_mem + n,
            _ => n,
        };
        if num <= 0 {
            return Err(env.fail_at(ONIGERR_INVALID_BACKREF, name_start));
        }
        return Ok(NameRef::Num(num));
    }

    let mut bad_char = false;
    let mut closed = false;
    if first.is_ascii_digit() {
        bad_char = true;
    }
    while !env.at_end() {
        if env.peek_byte() == Some(end_code) {
            closed = true;
            break;
        }
        let code = pfetch(env);
        if !env.enc.is_code_ctype(code, ONIGENC_CTYPE_WORD) {
            bad_char = true;
        }
    }
    let name = env.pattern[name_start..env.pos].to_vec();
    if !closed {
        return Err(env.fail_with_name(ONIGERR_INVALID_GROUP_NAME, name_start, &name));
    }
    env.pos += 1;
    if first.is_ascii_digit() {
        return Err(env.fail_with_name(ONIGERR_INVALID_GROUP_NAME, name_start, &name));
    }
    if bad_char {
        return Err(env.fail_with_name(ONIGERR_INVALID_CHAR_IN_GROUP_NAME, name_start, &name));
    }
    match String::from_utf8(name) {
        Ok(s) => Ok(NameRef::Name(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            Err(env.fail_with_name(ONIGERR_INVALID_CHAR_IN_GROUP_NAME, name_start, &bytes))
        }
    }
}

fn new_backref(env: &ParseEnv, r: NameRef, offset: usize) -> Node {
    let (back_refs, name) = match r {
        NameRef::Num(n) => (SmallVec::from_slice(&[n]), None),
        NameRef::Name(s) => (SmallVec::new(), Some(s.into_bytes())),
    };
    Node::BackRef(BackRefNode {
        back_refs,
        name,
        ignore_case: opton_ignorecase(env.options),
        offset,
    })
}

// ============================================================================
// Character classes
// ============================================================================

enum CcItem {
    Code(OnigCodePoint),
    CType(OnigCtype, bool),
}

fn add_code_into_cc(cc: &mut CClass, code: OnigCodePoint) {
    add_code_range(cc, code, code);
}

fn add_code_range(cc: &mut CClass, from: OnigCodePoint, to: OnigCodePoint) {
    if (from as usize) < SINGLE_BYTE_SIZE {
        bitset_set_range(&mut cc.bs, from as usize, to as usize);
    }
    if to as usize >= SINGLE_BYTE_SIZE {
        cc.ranges.push((from.max(SINGLE_BYTE_SIZE as u32), to));
    }
}

fn add_ctype_to_cc(cc: &mut CClass, ctype: OnigCtype, not: bool, enc: OnigEncoding) {
    for code in 0..SINGLE_BYTE_SIZE as u32 {
        if enc.is_code_ctype(code, ctype) != not {
            bitset_set_bit(&mut cc.bs, code as usize);
        }
    }
    cc.ctypes.push((ctype, not));
}

/// Close the class under simple case folding.
fn cc_apply_ignore_case(cc: &mut CClass, enc: OnigEncoding) {
    let mut folded: BitSet = [0; BITSET_REAL_SIZE];
    for code in 0..SINGLE_BYTE_SIZE {
        if bitset_at(&cc.bs, code) {
            let f = enc.case_fold(code as u32) as usize;
            if f < SINGLE_BYTE_SIZE {
                bitset_set_bit(&mut folded, f);
            }
        }
    }
    for code in 0..SINGLE_BYTE_SIZE {
        let f = enc.case_fold(code as u32) as usize;
        if f < SINGLE_BYTE_SIZE && bitset_at(&folded, f) {
            bitset_set_bit(&mut cc.bs, code);
        }
    }

    let mut codes: Vec<OnigCodePoint> = Vec::new();
    for &(from, to) in &cc.ranges {
        if to - from > 0xffff {
            cc.fold_ranges.push((from, to));
            continue;
        }
        codes.extend((from..=to).map(|c| enc.case_fold(c)));
    }
    codes.sort_unstable();
    codes.dedup();
    for c in codes {
        match cc.fold_ranges.last_mut() {
            Some(last) if last.1 + 1 == c => last.1 = c,
            _ => cc.fold_ranges.push((c, c)),
        }
    }
    cc.ignore_case = true;
}

fn ctype_escape(env: &ParseEnv, b: u8) -> Option<(OnigCtype, bool)> {
    let ctype = match b.to_ascii_lowercase() {
        b'd' => ONIGENC_CTYPE_DIGIT,
        b'w' => ONIGENC_CTYPE_WORD,
        b's' => ONIGENC_CTYPE_SPACE,
        b'h' if env.syntax.has_op(SyntaxOp::ESC_H_XDIGIT) => ONIGENC_CTYPE_XDIGIT,
        _ => return None,
    };
    Some((ctype, b.is_ascii_uppercase()))
}

fn fetch_cc_item(env: &mut ParseEnv) -> Result<CcItem, i32> {
    if env.peek_byte() != Some(b'\\') {
        return Ok(CcItem::Code(pfetch(env)));
    }
    env.pos += 1;
    let Some(b) = env.peek_byte() else {
        return Err(env.fail_at(ONIGERR_PREMATURE_END_OF_CHAR_CLASS, env.pos - 1));
    };
    if let Some((ctype, not)) = ctype_escape(env, b) {
        env.pos += 1;
        return Ok(CcItem::CType(ctype, not));
    }
    if b == b'b' {
        env.pos += 1;
        return Ok(CcItem::Code(0x08));
    }
    fetch_escaped_value(env).map(CcItem::Code)
}

/// `[:name:]` at the cursor. `Ok(None)` when this is not a bracket
/// expression, in which case the cursor is unchanged.
fn prs_posix_bracket(env: &mut ParseEnv) -> Result<Option<CcItem>, i32> {
    let start = env.pos;
    let pattern = env.pattern;
    let rest = &pattern[start + 2..];
    let Some(close) = rest.windows(2).position(|w| w == b":]") else {
        return Ok(None);
    };
    let mut name = &rest[..close];
    let not = name.first() == Some(&b'^');
    if not {
        name = &name[1..];
    }
    if name.is_empty() || !name.iter().all(|b| b.is_ascii_alphabetic()) {
        return Ok(None);
    }
    let Some(ctype) = onigenc_posix_bracket_name_to_ctype(name) else {
        return Err(env.fail_at(ONIGERR_INVALID_POSIX_BRACKET_TYPE, start));
    };
    env.pos = start + 2 + close + 2;
    Ok(Some(CcItem::CType(ctype, not)))
}

fn prs_cc(env: &mut ParseEnv) -> Result<Node, i32> {
    let start = env.pos;
    env.pos += 1;
    let enc = env.enc;
    let mut cc = CClass::default();
    if env.peek_byte() == Some(b'^') {
        cc.not = true;
        env.pos += 1;
    }

    if env.peek_byte() == Some(b']') {
        if !env.pattern[env.pos + 1..].contains(&b']') {
            return Err(env.fail_at(ONIGERR_EMPTY_CHAR_CLASS, start));
        }
        add_code_into_cc(&mut cc, b']' as u32);
        env.pos += 1;
    }

    let mut range_start: Option<OnigCodePoint> = None;
    loop {
        let Some(b) = env.peek_byte() else {
            return Err(env.fail(ONIGERR_PREMATURE_END_OF_CHAR_CLASS));
        };
        match b {
            b']' => {
                env.pos += 1;
                break;
            }
            b'[' if env.syntax.has_op(SyntaxOp::POSIX_BRACKET)
                && env.peek_byte_at(1) == Some(b':') =>
            {
                match prs_posix_bracket(env)? {
                    Some(CcItem::CType(ctype, not)) => {
                        add_ctype_to_cc(&mut cc, ctype, not, enc);
                        range_start = None;
                    }
                    _ => {
                        env.pos += 1;
                        add_code_into_cc(&mut cc, b'[' as u32);
                        range_start = Some(b'[' as u32);
                    }
                }
            }
            b'-' => {
                let range_end_follows = !matches!(env.peek_byte_at(1), None | Some(b']'));
                match range_start {
                    Some(from) if range_end_follows => {
                        let dash = env.pos;
                        env.pos += 1;
                        match fetch_cc_item(env)? {
                            CcItem::CType(..) => {
                                return Err(env.fail_at(
                                    ONIGERR_UNMATCHED_RANGE_SPECIFIER_IN_CHAR_CLASS,
                                    dash,
                                ));
                            }
                            CcItem::Code(to) => {
                                if to < from {
                                    return Err(
                                        env.fail_at(ONIGERR_EMPTY_RANGE_IN_CHAR_CLASS, dash)
                                    );
                                }
                                add_code_range(&mut cc, from, to);
                            }
                        }
                        range_start = None;
                    }
                    _ => {
                        env.pos += 1;
                        add_code_into_cc(&mut cc, b'-' as u32);
                        range_start = Some(b'-' as u32);
                    }
                }
            }
            _ => match fetch_cc_item(env)? {
                CcItem::Code(code) => {
                    add_code_into_cc(&mut cc, code);
                    range_start = Some(code);
                }
                CcItem::CType(ctype, not) => {
                    add_ctype_to_cc(&mut cc, ctype, not, enc);
                    range_start = None;
                }
            },
        }
    }

    if opton_ignorecase(env.options) {
        cc_apply_ignore_case(&mut cc, enc);
    }
    Ok(Node::CClass(Box::new(cc)))
}

// ============================================================================
// Quantifiers
// ============================================================================

struct Quantifier {
    lower: i32,
    upper: i32,
    greedy: bool,
    possessive: bool,
}

fn invalid_interval(env: &mut ParseEnv, start: usize) -> Result<Option<(i32, i32)>, i32> {
    if env.syntax.has_behavior(SyntaxBehavior::ALLOW_INVALID_INTERVAL) {
        env.pos = start;
        Ok(None)
    } else if env.at_end() {
        Err(env.fail_at(ONIGERR_END_PATTERN_AT_LEFT_BRACE, start))
    } else {
        Err(env.fail_at(ONIGERR_INVALID_REPEAT_RANGE_PATTERN, start))
    }
}

/// `{n}`, `{n,}`, `{,m}`, `{n,m}` at the cursor. `Ok(None)` (cursor
/// unchanged) when the text does not form an interval and the dialect reads
/// it literally.
fn fetch_interval(env: &mut ParseEnv) -> Result<Option<(i32, i32)>, i32> {
    let start = env.pos;
    env.pos += 1;

    let low_pos = env.pos;
    let low = scan_number(env, 10);
    let low = match low {
        Some(n) => n,
        None => {
            if env.syntax.has_behavior(SyntaxBehavior::ALLOW_INTERVAL_LOW_ABBREV)
                && env.peek_byte() == Some(b',')
                && env.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit())
            {
                0
            } else {
                return invalid_interval(env, start);
            }
        }
    };

    let up = match env.peek_byte() {
        Some(b'}') => Some(low),
        Some(b',') => {
            env.pos += 1;
            scan_number(env, 10).or(Some(INFINITE_REPEAT as i64))
        }
        _ => None,
    };
    let Some(up) = up else {
        return invalid_interval(env, start);
    };
    if env.peek_byte() != Some(b'}') {
        return invalid_interval(env, start);
    }
    env.pos += 1;

    if low > ONIG_MAX_REPEAT_NUM as i64 || up > ONIG_MAX_REPEAT_NUM as i64 {
        return Err(env.fail_at(ONIGERR_TOO_BIG_NUMBER_FOR_REPEAT_RANGE, low_pos));
    }
    let (low, up) = (low as i32, up as i32);
    if !is_infinite_repeat(up) && low > up {
        return Err(env.fail_at(ONIGERR_UPPER_SMALLER_THAN_LOWER_IN_REPEAT_RANGE, low_pos));
    }
    Ok(Some((low, up)))
}

fn fetch_quantifier(env: &mut ParseEnv) -> Result<Option<Quantifier>, i32> {
    let (lower, upper) = match env.peek_byte() {
        Some(b'*') => {
            env.pos += 1;
            (0, INFINITE_REPEAT)
        }
        Some(b'+') => {
            env.pos += 1;
            (1, INFINITE_REPEAT)
        }
        Some(b'?') => {
            env.pos += 1;
            (0, 1)
        }
        Some(b'{') => match fetch_interval(env)? {
            Some(range) => range,
            None => return Ok(None),
        },
        _ => return Ok(None),
    };

    let mut q = Quantifier {
        lower,
        upper,
        greedy: true,
        possessive: false,
    };
    match env.peek_byte() {
        Some(b'?') => {
            q.greedy = false;
            env.pos += 1;
        }
        Some(b'+') if env.syntax.has_op(SyntaxOp::ATOMIC_GROUP) => {
            q.possessive = true;
            env.pos += 1;
        }
        _ => {}
    }
    Ok(Some(q))
}

fn is_invalid_quantifier_target(node: &Node) -> bool {
    matches!(node, Node::Anchor(_))
}

fn make_quantifier(body: Node, q: Quantifier) -> Node {
    let quant = Node::Quant(QuantNode {
        body: Box::new(body),
        lower: q.lower,
        upper: q.upper,
        greedy: q.greedy,
    });
    if q.possessive {
        Node::Bag(BagNode {
            body: Box::new(quant),
            bag_type: BagType::StopBacktrack,
        })
    } else {
        quant
    }
}

// ============================================================================
// Groups
// ============================================================================

fn prs_group_body(env: &mut ParseEnv) -> Result<Node, i32> {
    let saved = env.options;
    let body = prs_alts(env, true)?;
    env.options = saved;
    // prs_alts stops only at ')' when inside a group
    env.pos += 1;
    Ok(body)
}

fn new_memory(env: &mut ParseEnv, start: usize) -> Result<i32, i32> {
    if env.num_mem >= env.capture_num_limit {
        return Err(env.fail_at(ONIGERR_TOO_MANY_CAPTURES, start));
    }
    env.num_mem += 1;
    Ok(env.num_mem)
}

fn prs_named_group(env: &mut ParseEnv, start: usize, end_code: u8) -> Result<Node, i32> {
    let name_start = env.pos;
    let NameRef::Name(name) = fetch_name(env, end_code, false)? else {
        return Err(env.fail_at(ONIGERR_INVALID_GROUP_NAME, name_start));
    };
    let regnum = new_memory(env, start)?;
    let allow = env
        .syntax
        .has_behavior(SyntaxBehavior::ALLOW_MULTIPLEX_DEFINITION_NAME);
    if let Err(code) = env.name_table.add(&name, regnum, allow) {
        return Err(env.fail_with_name(code, name_start, name.as_bytes()));
    }
    let body = prs_group_body(env)?;
    Ok(Node::Bag(BagNode {
        body: Box::new(body),
        bag_type: BagType::Memory { regnum },
    }))
}

/// Option letters of `(?imsx-imsx)` / `(?imsx-imsx:...)`.
fn prs_options(env: &mut ParseEnv) -> Result<Option<Node>, i32> {
    let mut options = env.options;
    let mut neg = false;
    loop {
        let Some(b) = env.peek_byte() else {
            return Err(env.fail(ONIGERR_END_PATTERN_IN_GROUP));
        };
        let flag = match b {
            b'-' => {
                neg = true;
                env.pos += 1;
                continue;
            }
            b')' => {
                env.pos += 1;
                env.options = options;
                return Ok(None);
            }
            b':' => {
                env.pos += 1;
                let saved = env.options;
                env.options = options;
                let body = prs_group_body(env)?;
                env.options = saved;
                return Ok(Some(body));
            }
            b'i' => OnigOptionType::IGNORECASE,
            b'm' => OnigOptionType::MULTILINE,
            b's' => OnigOptionType::DOTALL,
            b'x' => OnigOptionType::EXTEND,
            _ => return Err(env.fail(ONIGERR_UNDEFINED_GROUP_OPTION)),
        };
        options.set(flag, !neg);
        env.pos += 1;
    }
}

fn new_look_around(anchor_type: i32, body: Node) -> Node {
    Node::Anchor(AnchorNode {
        anchor_type,
        multiline: false,
        body: Some(Box::new(body)),
        char_len: 0,
    })
}

/// A parenthesized construct. `Ok(None)` for constructs that produce no
/// node (comments, bare option settings).
fn prs_bag(env: &mut ParseEnv) -> Result<Option<Node>, i32> {
    let start = env.pos;
    env.pos += 1;

    if env.peek_byte() != Some(b'?') {
        let regnum = new_memory(env, start)?;
        let body = prs_group_body(env)?;
        return Ok(Some(Node::Bag(BagNode {
            body: Box::new(body),
            bag_type: BagType::Memory { regnum },
        })));
    }

    env.pos += 1;
    let Some(c) = env.peek_byte() else {
        return Err(env.fail(ONIGERR_END_PATTERN_IN_GROUP));
    };
    let syn = env.syntax;
    let node = match c {
        b'#' => {
            env.pos += 1;
            loop {
                match env.peek_byte() {
                    None => return Err(env.fail(ONIGERR_END_PATTERN_IN_GROUP)),
                    Some(b')') => {
                        env.pos += 1;
                        return Ok(None);
                    }
                    Some(b'\\') => env.pos += 2,
                    Some(_) => env.pos += 1,
                }
            }
        }
        b':' => {
            env.pos += 1;
            prs_group_body(env)?
        }
        b'=' | b'!' if syn.has_op(SyntaxOp::LOOK_AROUND) => {
            env.pos += 1;
            let body = prs_group_body(env)?;
            let t = if c == b'=' {
                ANCR_PREC_READ
            } else {
                ANCR_PREC_READ_NOT
            };
            new_look_around(t, body)
        }
        b'>' if syn.has_op(SyntaxOp::ATOMIC_GROUP) => {
            env.pos += 1;
            let body = prs_group_body(env)?;
            Node::Bag(BagNode {
                body: Box::new(body),
                bag_type: BagType::StopBacktrack,
            })
        }
        b'<' => {
            env.pos += 1;
            match env.peek_byte() {
                Some(b @ (b'=' | b'!')) if syn.has_op(SyntaxOp::LOOK_AROUND) => {
                    env.pos += 1;
                    let body = prs_group_body(env)?;
                    let t = if b == b'=' {
                        ANCR_LOOK_BEHIND
                    } else {
                        ANCR_LOOK_BEHIND_NOT
                    };
                    new_look_around(t, body)
                }
                None => return Err(env.fail(ONIGERR_END_PATTERN_IN_GROUP)),
                Some(_) if syn.has_op(SyntaxOp::QMARK_LT_NAMED_GROUP) => {
                    prs_named_group(env, start, b'>')?
                }
                Some(_) => return Err(env.fail(ONIGERR_UNDEFINED_GROUP_OPTION)),
            }
        }
        b'\'' if syn.has_op(SyntaxOp::QMARK_LT_NAMED_GROUP) => {
            env.pos += 1;
            prs_named_group(env, start, b'\'')?
        }
        b'P' if syn.has_op(SyntaxOp::QMARK_CAPITAL_P_NAME) => {
            env.pos += 1;
            match env.peek_byte() {
                Some(b'<') => {
                    env.pos += 1;
                    prs_named_group(env, start, b'>')?
                }
                Some(b'=') => {
                    env.pos += 1;
                    let r = fetch_name(env, b')', false)?;
                    new_backref(env, r, start)
                }
                None => return Err(env.fail(ONIGERR_END_PATTERN_IN_GROUP)),
                Some(_) => return Err(env.fail(ONIGERR_UNDEFINED_GROUP_OPTION)),
            }
        }
        b'i' | b'm' | b's' | b'x' | b'-' => return prs_options(env),
        _ => return Err(env.fail(ONIGERR_UNDEFINED_GROUP_OPTION)),
    };
    Ok(Some(node))
}

// ============================================================================
// Atoms
// ============================================================================

fn new_anchor(env: &ParseEnv, anchor_type: i32) -> Node {
    Node::Anchor(AnchorNode {
        anchor_type,
        multiline: opton_multiline(env.options),
        body: None,
        char_len: 0,
    })
}

fn new_ctype(ctype: OnigCtype, not: bool, env: &ParseEnv) -> Node {
    if ctype == ONIGENC_CTYPE_WORD {
        return Node::CType(CtypeNode {
            ctype: ctype as i32,
            not,
            multiline: false,
        });
    }
    let mut cc = CClass::default();
    add_ctype_to_cc(&mut cc, ctype, false, env.enc);
    cc.not = not;
    Node::CClass(Box::new(cc))
}

fn new_str(env: &ParseEnv, s: Vec<u8>) -> Node {
    Node::String(StrNode {
        s,
        ignore_case: opton_ignorecase(env.options),
    })
}

/// Decimal escape `\N`: a back-reference, or an octal value when `N`
/// cannot name a group.
fn prs_decimal_escape(env: &mut ParseEnv, esc_start: usize) -> Result<Node, i32> {
    let digits_start = env.pos;
    let first = env.pattern[digits_start];
    let n = scan_number(env, 10).unwrap_or(0);

    if (n <= 9 || n <= env.num_mem as i64) && env.syntax.has_op(SyntaxOp::DECIMAL_BACKREF) {
        if n > ONIG_MAX_BACKREF_NUM as i64 {
            return Err(env.fail_at(ONIGERR_TOO_BIG_BACKREF_NUMBER, esc_start));
        }
        return Ok(new_backref(env, NameRef::Num(n as i32), esc_start));
    }

    env.pos = digits_start;
    if first <= b'7' {
        let (code, _) = scan_octal_number(env, 3);
        let s = code_to_bytes(env, code, esc_start)?;
        return Ok(new_str(env, s));
    }
    // \8, \9 with no such group
    env.pos = digits_start + 1;
    Ok(new_str(env, vec![first]))
}

fn prs_escape(env: &mut ParseEnv) -> Result<Node, i32> {
    let esc_start = env.pos;
    env.pos += 1;
    let Some(b) = env.peek_byte() else {
        return Err(env.fail_at(ONIGERR_END_PATTERN_AT_ESCAPE, esc_start));
    };
    let syn = env.syntax;

    if let Some((ctype, not)) = ctype_escape(env, b) {
        env.pos += 1;
        return Ok(new_ctype(ctype, not, env));
    }

    let anchor = match b {
        b'A' if syn.has_op(SyntaxOp::ESC_AZ_BUF_ANCHOR) => Some(ANCR_BEGIN_BUF),
        b'z' if syn.has_op(SyntaxOp::ESC_AZ_BUF_ANCHOR) => Some(ANCR_END_BUF),
        b'Z' if syn.has_op(SyntaxOp::ESC_AZ_BUF_ANCHOR) => Some(ANCR_SEMI_END_BUF),
        b'G' if syn.has_op(SyntaxOp::ESC_AZ_BUF_ANCHOR) => Some(ANCR_BEGIN_POSITION),
        b'b' => Some(ANCR_WORD_BOUNDARY),
        b'B' => Some(ANCR_NO_WORD_BOUNDARY),
        _ => None,
    };
    if let Some(t) = anchor {
        env.pos += 1;
        return Ok(new_anchor(env, t));
    }

    match b {
        b'k' if syn.has_op(SyntaxOp::ESC_K_NAMED_BACKREF)
            && matches!(env.peek_byte_at(1), Some(b'<') | Some(b'\'')) =>
        {
            let end_code = if env.peek_byte_at(1) == Some(b'<') {
                b'>'
            } else {
                b'\''
            };
            env.pos += 2;
            let r = fetch_name(env, end_code, true)?;
            Ok(new_backref(env, r, esc_start))
        }
        b'1'..=b'9' => prs_decimal_escape(env, esc_start),
        _ => {
            let literal_start = env.pos;
            let plain = !matches!(b, b't' | b'n' | b'r' | b'f' | b'v' | b'a' | b'e' | b'x' | b'u' | b'0');
            let code = fetch_escaped_value(env)?;
            let s = if plain {
                env.pattern[literal_start..env.pos].to_vec()
            } else {
                code_to_bytes(env, code, esc_start)?
            };
            Ok(new_str(env, s))
        }
    }
}

/// One atom. `Ok(None)` for constructs that produce no node.
fn prs_exp(env: &mut ParseEnv) -> Result<Option<Node>, i32> {
    let Some(b) = env.peek_byte() else {
        return Ok(None);
    };
    let node = match b {
        b'(' => {
            env.parse_depth += 1;
            if env.parse_depth > env.parse_depth_limit {
                return Err(env.fail(ONIGERR_PARSE_DEPTH_LIMIT_OVER));
            }
            let r = prs_bag(env);
            env.parse_depth -= 1;
            return r;
        }
        b'[' => prs_cc(env)?,
        b'.' => {
            env.pos += 1;
            Node::CType(CtypeNode {
                ctype: CTYPE_ANYCHAR,
                not: false,
                multiline: opton_dotall(env.options),
            })
        }
        b'^' => {
            env.pos += 1;
            new_anchor(env, ANCR_BEGIN_LINE)
        }
        b'$' => {
            env.pos += 1;
            new_anchor(env, ANCR_END_LINE)
        }
        b'\\' => prs_escape(env)?,
        _ => {
            let start = env.pos;
            pfetch(env);
            let s = env.pattern[start..env.pos].to_vec();
            new_str(env, s)
        }
    };
    Ok(Some(node))
}

// ============================================================================
// Branches and alternatives
// ============================================================================

/// Join adjacent literals with the same case mode.
fn merge_strings(items: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(items.len());
    for node in items {
        if let (Some(Node::String(prev)), Node::String(cur)) = (out.last_mut(), &node) {
            if prev.ignore_case == cur.ignore_case || cur.s.is_empty() {
                prev.s.extend_from_slice(&cur.s);
                continue;
            }
        }
        out.push(node);
    }
    out
}

fn prs_branch(env: &mut ParseEnv) -> Result<Node, i32> {
    let mut items = Vec::new();
    loop {
        skip_extended_space(env);
        if matches!(env.peek_byte(), None | Some(b'|') | Some(b')')) {
            break;
        }

        let q_start = env.pos;
        if fetch_quantifier(env)?.is_some() {
            return Err(env.fail_at(ONIGERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED, q_start));
        }

        let Some(mut node) = prs_exp(env)? else {
            continue;
        };

        // every wrap nests the tree one level deeper
        let mut wraps = 0;
        loop {
            skip_extended_space(env);
            let q_start = env.pos;
            let Some(q) = fetch_quantifier(env)? else {
                break;
            };
            if is_invalid_quantifier_target(&node) {
                return Err(env.fail_at(ONIGERR_TARGET_OF_REPEAT_OPERATOR_INVALID, q_start));
            }
            // `{1}` repeats the node exactly once
            if q.lower == 1 && q.upper == 1 && !q.possessive {
                continue;
            }
            env.parse_depth += 1;
            wraps += 1;
            if env.parse_depth > env.parse_depth_limit {
                return Err(env.fail_at(ONIGERR_PARSE_DEPTH_LIMIT_OVER, q_start));
            }
            node = make_quantifier(node, q);
        }
        env.parse_depth -= wraps;
        items.push(node);
    }

    let mut items = merge_strings(items);
    Ok(match items.len() {
        0 => Node::empty(),
        1 => items.remove(0),
        _ => Node::List(items),
    })
}

fn prs_alts(env: &mut ParseEnv, in_group: bool) -> Result<Node, i32> {
    let mut alts = vec![prs_branch(env)?];
    loop {
        match env.peek_byte() {
            Some(b'|') => {
                env.pos += 1;
                alts.push(prs_branch(env)?);
            }
            Some(b')') => {
                if !in_group {
                    return Err(env.fail(ONIGERR_UNMATCHED_CLOSE_PARENTHESIS));
                }
                break;
            }
            None => {
                if in_group {
                    return Err(env.fail(ONIGERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS));
                }
                break;
            }
            Some(_) => return Err(env.fail(ONIGERR_PARSER_BUG)),
        }
    }
    Ok(if alts.len() == 1 {
        alts.remove(0)
    } else {
        Node::Alt(alts)
    })
}

// ============================================================================
// Back-reference resolution
// ============================================================================

fn resolve_backrefs(node: &mut Node, env: &mut ParseEnv) -> Result<(), i32> {
    match node {
        Node::BackRef(br) => {
            if let Some(name) = br.name.take() {
                let key = String::from_utf8_lossy(&name);
                match env.name_table.find(&key) {
                    Some(e) => br.back_refs = e.back_refs.clone(),
                    None => {
                        return Err(env.fail_with_name(
                            ONIGERR_UNDEFINED_NAME_REFERENCE,
                            br.offset,
                            &name,
                        ));
                    }
                }
            }
            if br.back_refs.iter().any(|&n| n <= 0 || n > env.num_mem) {
                return Err(env.fail_at(ONIGERR_INVALID_BACKREF, br.offset));
            }
            Ok(())
        }
        Node::Quant(qn) => resolve_backrefs(&mut qn.body, env),
        Node::Bag(bn) => resolve_backrefs(&mut bn.body, env),
        Node::Anchor(an) => match an.body.as_deref_mut() {
            Some(body) => resolve_backrefs(body, env),
            None => Ok(()),
        },
        Node::List(items) | Node::Alt(items) => {
            for item in items.iter_mut() {
                resolve_backrefs(item, env)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse `env.pattern` into a tree. Group count and name table are left in
/// `env`.
pub fn onig_parse_tree(env: &mut ParseEnv) -> Result<Node, i32> {
    env.capture_num_limit = onig_get_capture_num_limit();
    env.parse_depth_limit = onig_get_parse_depth_limit();

    if !env.enc.is_valid_mbc_string(env.pattern) {
        let bad = (0..=env.pattern.len())
            .rev()
            .find(|&i| env.enc.is_valid_mbc_string(&env.pattern[..i]))
            .unwrap_or(0);
        return Err(env.fail_at(ONIGERR_INVALID_CODE_POINT_VALUE, bad));
    }

    let mut root = prs_alts(env, false)?;
    resolve_backrefs(&mut root, env)?;
    Ok(root)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::ONIG_ENCODING_UTF8;
    use crate::regsyntax::{OnigSyntaxOniguruma, OnigSyntaxPerl};

    fn parse(pattern: &str) -> Result<(Node, i32), (i32, usize)> {
        let mut env = ParseEnv::new(
            pattern.as_bytes(),
            ONIG_OPTION_NONE,
            &ONIG_ENCODING_UTF8,
            &OnigSyntaxOniguruma,
        );
        match onig_parse_tree(&mut env) {
            Ok(node) => Ok((node, env.num_mem)),
            Err(code) => Err((code, env.error_pos)),
        }
    }

    fn parse_err(pattern: &str) -> i32 {
        parse(pattern).err().expect("pattern should fail").0
    }

    #[test]
    fn literals_are_merged() {
        let (node, _) = parse("abc").unwrap();
        match node {
            Node::String(sn) => assert_eq!(sn.s, b"abc"),
            other => panic!("unexpected {:?}", other.node_type()),
        }
    }

    #[test]
    fn quantifier_binds_to_last_char() {
        let (node, _) = parse("abc*").unwrap();
        let Node::List(items) = node else {
            panic!("expected list")
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].node_type(), NodeType::Quant);
    }

    #[test]
    fn counts_groups() {
        let (_, n) = parse("(a)(?:b)(?<x>c)((d))").unwrap();
        assert_eq!(n, 4);
    }

    #[test]
    fn empty_pattern() {
        let (node, n) = parse("").unwrap();
        assert!(node.is_empty_string());
        assert_eq!(n, 0);
    }

    #[test]
    fn paren_errors() {
        assert_eq!(parse_err("(a"), ONIGERR_END_PATTERN_WITH_UNMATCHED_PARENTHESIS);
        assert_eq!(parse_err("a)"), ONIGERR_UNMATCHED_CLOSE_PARENTHESIS);
        assert_eq!(parse_err("(?"), ONIGERR_END_PATTERN_IN_GROUP);
        assert_eq!(parse_err("(?Q)"), ONIGERR_UNDEFINED_GROUP_OPTION);
    }

    #[test]
    fn class_errors() {
        assert_eq!(parse_err("[]"), ONIGERR_EMPTY_CHAR_CLASS);
        assert_eq!(parse_err("[ab"), ONIGERR_PREMATURE_END_OF_CHAR_CLASS);
        assert_eq!(parse_err("[z-a]"), ONIGERR_EMPTY_RANGE_IN_CHAR_CLASS);
        assert_eq!(parse_err("[a-\\d]"), ONIGERR_UNMATCHED_RANGE_SPECIFIER_IN_CHAR_CLASS);
        assert_eq!(parse_err("[[:foo:]]"), ONIGERR_INVALID_POSIX_BRACKET_TYPE);
    }

    #[test]
    fn quantifier_errors() {
        assert_eq!(parse_err("*a"), ONIGERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED);
        assert_eq!(parse_err("a|+"), ONIGERR_TARGET_OF_REPEAT_OPERATOR_NOT_SPECIFIED);
        assert_eq!(parse_err("^*"), ONIGERR_TARGET_OF_REPEAT_OPERATOR_INVALID);
        assert_eq!(parse_err("a{3,2}"), ONIGERR_UPPER_SMALLER_THAN_LOWER_IN_REPEAT_RANGE);
        assert_eq!(parse_err("a{100001}"), ONIGERR_TOO_BIG_NUMBER_FOR_REPEAT_RANGE);
    }

    #[test]
    fn invalid_interval_is_literal() {
        let (node, _) = parse("a{x}").unwrap();
        match node {
            Node::String(sn) => assert_eq!(sn.s, b"a{x}"),
            other => panic!("unexpected {:?}", other.node_type()),
        }
    }

    #[test]
    fn error_offsets() {
        assert_eq!(parse("ab[z-a]").err(), Some((ONIGERR_EMPTY_RANGE_IN_CHAR_CLASS, 4)));
        assert_eq!(parse("abc\\").err(), Some((ONIGERR_END_PATTERN_AT_ESCAPE, 3)));
        assert_eq!(parse("x(?<1a>y)").err(), Some((ONIGERR_INVALID_GROUP_NAME, 4)));
    }

    #[test]
    fn name_errors() {
        assert_eq!(parse_err("(?<>a)"), ONIGERR_EMPTY_GROUP_NAME);
        assert_eq!(parse_err("(?<a-b>a)"), ONIGERR_INVALID_CHAR_IN_GROUP_NAME);
        assert_eq!(parse_err("\\k<nope>"), ONIGERR_UNDEFINED_NAME_REFERENCE);
        assert_eq!(parse_err("(a)\\2"), ONIGERR_INVALID_BACKREF);
    }

    #[test]
    fn perl_dialect_rejects_duplicate_names() {
        let mut env = ParseEnv::new(
            b"(?P<x>a)|(?P<x>b)",
            ONIG_OPTION_NONE,
            &ONIG_ENCODING_UTF8,
            &OnigSyntaxPerl,
        );
        assert_eq!(onig_parse_tree(&mut env).err(), Some(ONIGERR_MULTIPLEX_DEFINED_NAME));
        assert_eq!(env.error_param.as_deref(), Some(&b"x"[..]));
    }

    #[test]
    fn relative_backref() {
        let (node, _) = parse("(a)(b)\\k<-1>").unwrap();
        let Node::List(items) = node else {
            panic!("expected list")
        };
        let Node::BackRef(br) = &items[2] else {
            panic!("expected backref")
        };
        assert_eq!(br.back_refs.as_slice(), &[2]);
    }

    #[test]
    fn octal_when_no_such_group() {
        let (node, _) = parse("\\101").unwrap();
        match node {
            Node::String(sn) => assert_eq!(sn.s, b"A"),
            other => panic!("unexpected {:?}", other.node_type()),
        }
    }

    #[test]
    fn depth_limit() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let deep = "(".repeat(5000) + &")".repeat(5000);
                parse_err(&deep)
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), ONIGERR_PARSE_DEPTH_LIMIT_OVER);
    }

    #[test]
    fn stacked_quantifiers_count_toward_depth() {
        let deep = "a".to_string() + &"*".repeat(DEFAULT_PARSE_DEPTH_LIMIT as usize + 1);
        assert_eq!(parse(&deep).err(), Some((ONIGERR_PARSE_DEPTH_LIMIT_OVER, deep.len() - 1)));

        let at_limit = "a".to_string() + &"*".repeat(DEFAULT_PARSE_DEPTH_LIMIT as usize);
        assert!(parse(&at_limit).is_ok());

        // wraps add to the depth of the enclosing groups
        let groups = DEFAULT_PARSE_DEPTH_LIMIT as usize - 1;
        let nested = "(?:".repeat(groups) + "a**" + &")".repeat(groups);
        assert_eq!(parse_err(&nested), ONIGERR_PARSE_DEPTH_LIMIT_OVER);
        let nested = "(?:".repeat(groups) + "a*" + &")".repeat(groups);
        assert!(parse(&nested).is_ok());
    }

    #[test]
    fn exact_once_quantifier_is_dropped() {
        let (node, _) = parse(&("ab".to_string() + &"{1}".repeat(10_000))).unwrap();
        match node {
            Node::String(sn) => assert_eq!(sn.s, b"ab"),
            other => panic!("unexpected {:?}", other.node_type()),
        }
        let (node, _) = parse("a{1}+").unwrap();
        assert_eq!(node.node_type(), NodeType::Bag);
    }

    #[test]
    fn invalid_utf8_pattern() {
        let mut env = ParseEnv::new(
            b"ab\xff",
            ONIG_OPTION_NONE,
            &ONIG_ENCODING_UTF8,
            &OnigSyntaxOniguruma,
        );
        assert_eq!(onig_parse_tree(&mut env).err(), Some(ONIGERR_INVALID_CODE_POINT_VALUE));
        assert_eq!(env.error_pos, 2);
    }
}
