// compat_options.rs - Compile and search options.
//
// Options are passed to both onig_new() and onig_search(); search-only flags
// (NOTBOL, NOTEOL) are ignored by onig_new(). Uses OnigSyntaxOniguruma and
// ONIG_ENCODING_UTF8.

use oxonig::encodings::ONIG_ENCODING_UTF8;
use oxonig::oniguruma::*;
use oxonig::regcomp::onig_new;
use oxonig::regexec::onig_search;
use oxonig::regint::RegexType;
use oxonig::regsyntax::OnigSyntaxOniguruma;

fn compile(options: OnigOptionType, pattern: &[u8]) -> RegexType {
    onig_new(pattern, options, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma).unwrap_or_else(|e| {
        panic!(
            "compile failed for {:?}: {}",
            String::from_utf8_lossy(pattern),
            e
        )
    })
}

fn search(options: OnigOptionType, pattern: &[u8], input: &[u8]) -> (Option<usize>, OnigRegion) {
    let reg = compile(options, pattern);
    let mut region = OnigRegion::with_capacity(reg.group_count());
    let r = onig_search(&reg, input, 0, input.len(), &mut region, options).unwrap_or_else(|e| {
        panic!(
            "search failed for {:?} against {:?}: {}",
            String::from_utf8_lossy(pattern),
            String::from_utf8_lossy(input),
            e
        )
    });
    (r, region)
}

fn x2(options: OnigOptionType, pattern: &[u8], input: &[u8], from: usize, to: usize) {
    x3(options, pattern, input, from, to, 0);
}

fn x3(options: OnigOptionType, pattern: &[u8], input: &[u8], from: usize, to: usize, mem: usize) {
    let (r, region) = search(options, pattern, input);
    assert!(
        r.is_some(),
        "x3: expected match for {:?} against {:?} with options {:?}",
        String::from_utf8_lossy(pattern),
        String::from_utf8_lossy(input),
        options
    );
    assert_eq!(
        region.get(mem),
        Some((from, to)),
        "x3: wrong span of group {} for {:?} against {:?}",
        mem,
        String::from_utf8_lossy(pattern),
        String::from_utf8_lossy(input)
    );
}

fn n(options: OnigOptionType, pattern: &[u8], input: &[u8]) {
    let (r, region) = search(options, pattern, input);
    assert_eq!(
        r,
        None,
        "n: expected no match for {:?} against {:?}, got {:?}",
        String::from_utf8_lossy(pattern),
        String::from_utf8_lossy(input),
        region.get(0)
    );
    assert_eq!(region.count(), 0);
}

// ============================================================================
// IGNORECASE
// ============================================================================

#[test]
fn ignorecase_literal() {
    x2(ONIG_OPTION_IGNORECASE, b"a", b"A", 0, 1);
    x2(ONIG_OPTION_IGNORECASE, b"HeLLo", b"say hello", 4, 9);
    n(ONIG_OPTION_NONE, b"HeLLo", b"say hello");
}

#[test]
fn ignorecase_class() {
    x2(ONIG_OPTION_IGNORECASE, b"[a-c]+", b"xAbC", 1, 4);
    x2(ONIG_OPTION_IGNORECASE, b"[^a]", b"Ab", 1, 2);
}

#[test]
fn ignorecase_non_ascii() {
    x2(ONIG_OPTION_IGNORECASE, "é".as_bytes(), "É".as_bytes(), 0, 2);
    x2(ONIG_OPTION_IGNORECASE, "[à-ï]".as_bytes(), "xÈ".as_bytes(), 1, 3);
}

#[test]
fn ignorecase_inline() {
    x2(ONIG_OPTION_NONE, b"(?i)abc", b"ABC", 0, 3);
    x2(ONIG_OPTION_NONE, b"a(?i:b)c", b"aBc", 0, 3);
    n(ONIG_OPTION_NONE, b"a(?i:b)c", b"aBC");
    x2(ONIG_OPTION_IGNORECASE, b"a(?-i)b", b"Ab", 0, 2);
    n(ONIG_OPTION_IGNORECASE, b"a(?-i)b", b"AB");
}

#[test]
fn ignorecase_backref() {
    x2(ONIG_OPTION_IGNORECASE, b"(a)\\1", b"aA", 0, 2);
    n(ONIG_OPTION_NONE, b"(a)\\1", b"aA");
}

// ============================================================================
// EXTEND
// ============================================================================

#[test]
fn extend_ignores_whitespace() {
    x2(ONIG_OPTION_EXTEND, b" a b c ", b"abc", 0, 3);
    x2(ONIG_OPTION_EXTEND, b"a\\ b", b"a b", 0, 3);
    x2(ONIG_OPTION_EXTEND, b"[ ]", b"x y", 1, 2);
}

#[test]
fn extend_comments() {
    x2(ONIG_OPTION_EXTEND, b"a # comment\nb", b"ab", 0, 2);
    x2(ONIG_OPTION_NONE, b"a(?#comment)b", b"ab", 0, 2);
}

#[test]
fn extend_quantifier_after_space() {
    x2(ONIG_OPTION_EXTEND, b"a +", b"aaa", 0, 3);
}

// ============================================================================
// MULTILINE (^ and $ at line boundaries)
// ============================================================================

#[test]
fn multiline_anchors() {
    n(ONIG_OPTION_NONE, b"^b", b"a\nb");
    x2(ONIG_OPTION_MULTILINE, b"^b", b"a\nb", 2, 3);
    n(ONIG_OPTION_NONE, b"a$", b"a\nb");
    x2(ONIG_OPTION_MULTILINE, b"a$", b"a\nb", 0, 1);
    x2(ONIG_OPTION_NONE, b"(?m)^b", b"a\nb", 2, 3);
}

#[test]
fn multiline_does_not_affect_dot() {
    n(ONIG_OPTION_MULTILINE, b"a.b", b"a\nb");
}

// ============================================================================
// DOTALL
// ============================================================================

#[test]
fn dotall_dot_matches_newline() {
    n(ONIG_OPTION_NONE, b"a.b", b"a\nb");
    x2(ONIG_OPTION_DOTALL, b"a.b", b"a\nb", 0, 3);
    x2(ONIG_OPTION_NONE, b"(?s)a.b", b"a\nb", 0, 3);
    x2(ONIG_OPTION_DOTALL, b".*", b"ab\ncd", 0, 5);
    x2(ONIG_OPTION_NONE, b".*", b"ab\ncd", 0, 2);
}

// ============================================================================
// FIND_LONGEST
// ============================================================================

#[test]
fn find_longest_alternation() {
    x2(ONIG_OPTION_NONE, b"a|ab|abc", b"abcd", 0, 1);
    x2(ONIG_OPTION_FIND_LONGEST, b"a|ab|abc", b"abcd", 0, 3);
}

#[test]
fn find_longest_lazy_quantifier() {
    x2(ONIG_OPTION_NONE, b"a+?", b"aaa", 0, 1);
    x2(ONIG_OPTION_FIND_LONGEST, b"a+?", b"aaa", 0, 3);
}

#[test]
fn find_longest_over_all_starts() {
    x2(ONIG_OPTION_NONE, b"b|abc", b"xbabc", 1, 2);
    x2(ONIG_OPTION_FIND_LONGEST, b"b|abc", b"xbabc", 2, 5);
    // equal lengths: the leftmost wins
    x2(ONIG_OPTION_FIND_LONGEST, b"a|b", b"ba", 0, 1);
}

#[test]
fn find_longest_captures() {
    x3(ONIG_OPTION_FIND_LONGEST, b"(a|ab)(c|bcd)?", b"abcd", 0, 1, 1);
    x3(ONIG_OPTION_FIND_LONGEST, b"(a|ab)(c|bcd)?", b"abcd", 1, 4, 2);
}

// ============================================================================
// FIND_NOT_EMPTY
// ============================================================================

#[test]
fn find_not_empty() {
    x2(ONIG_OPTION_NONE, b"a*", b"bab", 0, 0);
    x2(ONIG_OPTION_FIND_NOT_EMPTY, b"a*", b"bab", 1, 2);
    // only the search start position is excluded
    x2(ONIG_OPTION_FIND_NOT_EMPTY, b"x*", b"abc", 1, 1);
}

// ============================================================================
// NOTBOL / NOTEOL (search time)
// ============================================================================

#[test]
fn notbol() {
    x2(ONIG_OPTION_NONE, b"^a", b"ab", 0, 1);
    n(ONIG_OPTION_NOTBOL, b"^a", b"ab");
    x2(ONIG_OPTION_NOTBOL | ONIG_OPTION_MULTILINE, b"^a", b"ab\na", 3, 4);
    x2(ONIG_OPTION_NOTBOL, b"\\Aa", b"ab", 0, 1);
}

#[test]
fn noteol() {
    x2(ONIG_OPTION_NONE, b"b$", b"ab", 1, 2);
    n(ONIG_OPTION_NOTEOL, b"b$", b"ab");
    x2(ONIG_OPTION_NOTEOL | ONIG_OPTION_MULTILINE, b"b$", b"ab\nb", 1, 2);
    x2(ONIG_OPTION_NOTEOL, b"b\\z", b"ab", 1, 2);
}

// ============================================================================
// Option combinations
// ============================================================================

#[test]
fn ignorecase_extend_multiline() {
    let opts = ONIG_OPTION_IGNORECASE | ONIG_OPTION_EXTEND | ONIG_OPTION_MULTILINE;
    x2(opts, b"^ b c $", b"a\nBC\n", 2, 4);
}

#[test]
fn program_records_effective_options() {
    let reg = compile(ONIG_OPTION_IGNORECASE | ONIG_OPTION_DOTALL, b"a");
    assert!(reg.options.contains(ONIG_OPTION_IGNORECASE));
    assert!(reg.options.contains(ONIG_OPTION_DOTALL));
    assert!(!reg.options.contains(ONIG_OPTION_EXTEND));
}
