// compat_search.rs - Search/match contract: offsets, regions, names,
// sharing across threads, and the process-wide limits.
//
// The limits are global, so every test in this file runs under one lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use oxonig::api::Regex;
use oxonig::encodings::{ONIG_ENCODING_ASCII, ONIG_ENCODING_UTF8};
use oxonig::error::RegexError;
use oxonig::oniguruma::*;
use oxonig::regcache::RegexCache;
use oxonig::regcomp::onig_new;
use oxonig::regexec::*;
use oxonig::reginit::{onig_initialize, onig_is_initialized};
use oxonig::regint::{
    RegexType, DEFAULT_MATCH_STACK_LIMIT_SIZE, DEFAULT_PARSE_DEPTH_LIMIT,
    DEFAULT_RETRY_LIMIT_IN_MATCH, DEFAULT_RETRY_LIMIT_IN_SEARCH, DEFAULT_TIME_LIMIT_MSEC,
};
use oxonig::regnames::*;
use oxonig::regparse::*;
use oxonig::regsyntax::OnigSyntaxOniguruma;

static GLOBALS: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    GLOBALS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn compile(pattern: &str) -> RegexType {
    onig_new(
        pattern.as_bytes(),
        ONIG_OPTION_NONE,
        &ONIG_ENCODING_UTF8,
        &OnigSyntaxOniguruma,
    )
    .unwrap()
}

fn search(reg: &RegexType, subject: &[u8], region: &mut OnigRegion) -> Result<Option<usize>, RegexError> {
    onig_search(reg, subject, 0, subject.len(), region, ONIG_OPTION_NONE)
}

/// Restores the default limits when dropped.
struct LimitsReset;

impl Drop for LimitsReset {
    fn drop(&mut self) {
        onig_set_retry_limit_in_match(DEFAULT_RETRY_LIMIT_IN_MATCH);
        onig_set_retry_limit_in_search(DEFAULT_RETRY_LIMIT_IN_SEARCH);
        onig_set_match_stack_limit(DEFAULT_MATCH_STACK_LIMIT_SIZE);
        onig_set_time_limit(DEFAULT_TIME_LIMIT_MSEC);
    }
}

// ============================================================================
// Basic contract
// ============================================================================

#[test]
fn empty_pattern_matches_everywhere() {
    let _g = serial();
    let reg = compile("");
    let mut region = OnigRegion::with_capacity(1);
    for start in 0..=3 {
        let r = onig_search(&reg, b"abc", start, 3, &mut region, ONIG_OPTION_NONE).unwrap();
        assert_eq!(r, Some(start));
        assert_eq!(region.get(0), Some((start, start)));
    }
    assert_eq!(search(&reg, b"", &mut region).unwrap(), Some(0));
}

#[test]
fn search_is_deterministic() {
    let _g = serial();
    let reg = compile("(\\w+)@(\\w+)");
    let mut first = OnigRegion::with_capacity(3);
    let mut again = OnigRegion::with_capacity(3);
    search(&reg, b"to: me@host", &mut first).unwrap();
    for _ in 0..10 {
        search(&reg, b"to: me@host", &mut again).unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn mismatch_is_not_an_error() {
    let _g = serial();
    let reg = compile("(x)");
    let mut region = OnigRegion::with_capacity(2);
    search(&reg, b"x", &mut region).unwrap();
    assert_eq!(region.count(), 2);
    assert_eq!(search(&reg, b"abc", &mut region).unwrap(), None);
    assert_eq!(region.count(), 0);
    assert!(region.get(0).is_none());
}

#[test]
fn search_start_offset() {
    let _g = serial();
    let reg = compile("a");
    let mut region = OnigRegion::with_capacity(1);
    assert_eq!(onig_search(&reg, b"aba", 1, 3, &mut region, ONIG_OPTION_NONE).unwrap(), Some(2));
    assert_eq!(onig_search(&reg, b"aba", 3, 3, &mut region, ONIG_OPTION_NONE).unwrap(), None);
}

#[test]
fn search_range_limits_start_and_consumption() {
    let _g = serial();
    let reg = compile("bc");
    let mut region = OnigRegion::with_capacity(1);
    assert_eq!(onig_search(&reg, b"abcd", 0, 2, &mut region, ONIG_OPTION_NONE).unwrap(), None);
    assert_eq!(onig_search(&reg, b"abcd", 0, 3, &mut region, ONIG_OPTION_NONE).unwrap(), Some(1));
    // anchors still see the whole subject
    let reg = compile("b$");
    assert_eq!(onig_search(&reg, b"abc", 0, 2, &mut region, ONIG_OPTION_NONE).unwrap(), None);
}

#[test]
fn anchored_match() {
    let _g = serial();
    let reg = compile("(b+)");
    let mut region = OnigRegion::with_capacity(2);
    assert_eq!(onig_match(&reg, b"abbc", 0, &mut region, ONIG_OPTION_NONE).unwrap(), None);
    assert_eq!(onig_match(&reg, b"abbc", 1, &mut region, ONIG_OPTION_NONE).unwrap(), Some(2));
    assert_eq!(region.get(1), Some((1, 3)));
}

#[test]
fn search_span_reproduced_by_match_at_its_start() {
    let _g = serial();
    let patterns = [
        "a|ab",
        "(a+)(b*)",
        "\\bfoo\\w*",
        "(?<=x)y+",
        "a*?b",
        "(?=ab)a",
        "x*",
        "^\\w+$",
        "(\\w)\\1",
        "colou?r",
        "(?:ab|a)(?:bc|c)",
    ];
    let subjects: [&[u8]; 6] = [b"", b"abc", b"xaabbb", b"foo foobar", b"colour color", b"xyy aaab"];
    for option in [ONIG_OPTION_NONE, ONIG_OPTION_FIND_LONGEST] {
        for pattern in patterns {
            let reg = onig_new(pattern.as_bytes(), option, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma).unwrap();
            let mut found = OnigRegion::with_capacity(reg.group_count());
            let mut anchored = OnigRegion::with_capacity(reg.group_count());
            for subject in subjects {
                let Some(start) = onig_search(&reg, subject, 0, subject.len(), &mut found, option).unwrap() else {
                    continue;
                };
                let (b, e) = found.get(0).unwrap();
                assert_eq!(b, start);
                let len = onig_match(&reg, subject, b, &mut anchored, option).unwrap();
                assert_eq!(
                    len,
                    Some(e - b),
                    "{:?} on {:?} with {:?}",
                    pattern,
                    String::from_utf8_lossy(subject),
                    option
                );
                assert_eq!(anchored.get(0), Some((b, e)));
            }
        }
    }
}

// ============================================================================
// Region reuse and contract violations
// ============================================================================

#[test]
fn region_reused_across_programs() {
    let _g = serial();
    let three = compile("(a)(b)");
    let one = compile("c");
    let mut region = OnigRegion::with_capacity(1);
    search(&one, b"xc", &mut region).unwrap();
    assert_eq!(region.count(), 1);

    assert!(matches!(
        search(&three, b"ab", &mut region),
        Err(RegexError::InvalidArgument { .. })
    ));
    region.ensure_capacity(three.group_count());
    search(&three, b"ab", &mut region).unwrap();
    let spans: Vec<_> = region.iter().collect();
    assert_eq!(spans, vec![Some((0, 2)), Some((0, 1)), Some((1, 2))]);

    search(&one, b"c", &mut region).unwrap();
    assert_eq!(region.count(), 1);
    assert!(region.get(1).is_none());
}

#[test]
fn invalid_offsets() {
    let _g = serial();
    let reg = compile("a");
    let mut region = OnigRegion::with_capacity(1);
    for (start, range) in [(2, 1), (0, 4), (4, 4)] {
        let err = onig_search(&reg, b"abc", start, range, &mut region, ONIG_OPTION_NONE).unwrap_err();
        assert_eq!(err.code(), ONIGERR_INVALID_ARGUMENT, "{}..{}", start, range);
    }
    assert!(onig_match(&reg, b"abc", 4, &mut region, ONIG_OPTION_NONE).is_err());
}

#[test]
fn offsets_mid_character_do_not_panic() {
    let _g = serial();
    let reg = compile(".");
    let mut region = OnigRegion::with_capacity(1);
    let subject = "éa".as_bytes();
    let r = onig_search(&reg, subject, 1, subject.len(), &mut region, ONIG_OPTION_NONE).unwrap();
    assert!(r.is_some());
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn names_year_month() {
    let _g = serial();
    let reg = compile("(?<year>[0-9]{4})-(?<month>[0-9]{2})");
    assert_eq!(onig_names(&reg), vec![("year", &[1][..]), ("month", &[2][..])]);
    assert_eq!(onig_name_to_group_numbers(&reg, "year").unwrap(), &[1]);
    assert!(matches!(
        onig_name_to_group_numbers(&reg, "day"),
        Err(RegexError::UndefinedName { .. })
    ));

    let mut region = OnigRegion::with_capacity(reg.group_count());
    assert_eq!(search(&reg, b"on 2024-03-01", &mut region).unwrap(), Some(3));
    assert_eq!(region.get(1), Some((3, 7)));
    assert_eq!(region.get(2), Some((8, 10)));
}

#[test]
fn duplicate_names_listed_once() {
    let _g = serial();
    let reg = compile("(?<x>a)|(?<x>b)");
    assert_eq!(onig_names(&reg), vec![("x", &[1, 2][..])]);
    assert_eq!(onig_number_of_names(&reg), 1);
    assert_eq!(reg.group_count(), 3);
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn program_shared_across_threads() {
    let _g = serial();
    let reg = Arc::new(compile("(\\d+)-(\\d+)"));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                let subject = format!("id {}-{}", i, i * 10);
                let mut region = OnigRegion::with_capacity(reg.group_count());
                for _ in 0..100 {
                    let r = search(&reg, subject.as_bytes(), &mut region).unwrap();
                    assert_eq!(r, Some(3));
                    let (b, e) = region.get(2).unwrap();
                    assert_eq!(&subject[b..e], (i * 10).to_string());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn regex_shared_by_reference_in_scope() {
    let _g = serial();
    let re = Regex::new(r"[aeiou]").unwrap();
    let re = &re;
    let counts: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = ["banana", "sky", "queue"]
            .iter()
            .map(|w| s.spawn(move || re.find_iter(w).count()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(counts, vec![3, 0, 4]);
}

#[test]
fn cache_holds_one_entry_per_key() {
    let _g = serial();
    let cache = Arc::new(RegexCache::new(16));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                cache
                    .get_or_compile(b"x+y", ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
                    .unwrap()
            })
        })
        .collect();
    let regs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(cache.len(), 1);
    assert!(regs.iter().all(|r| r.pattern == b"x+y"));
}

#[test]
fn initialization() {
    let _g = serial();
    onig_initialize(&[&ONIG_ENCODING_UTF8, &ONIG_ENCODING_ASCII]).unwrap();
    onig_initialize(&[&ONIG_ENCODING_UTF8]).unwrap();
    assert!(onig_is_initialized());
}

// ============================================================================
// Limits
// ============================================================================

const CATASTROPHIC: &str = "(?:a|a)*b";

fn catastrophic_subject() -> Vec<u8> {
    vec![b'a'; 28]
}

#[test]
fn retry_limit_in_match() {
    let _g = serial();
    let _reset = LimitsReset;
    onig_set_retry_limit_in_match(1000);
    assert_eq!(onig_get_retry_limit_in_match(), 1000);
    let reg = compile(CATASTROPHIC);
    let mut region = OnigRegion::with_capacity(1);
    let err = search(&reg, &catastrophic_subject(), &mut region).unwrap_err();
    assert_eq!(err, RegexError::RetryLimitInMatchOver);
    assert!(err.is_limit_exceeded());
    assert_eq!(region.count(), 0);
}

#[test]
fn retry_limit_in_search() {
    let _g = serial();
    let _reset = LimitsReset;
    onig_set_retry_limit_in_match(0);
    onig_set_retry_limit_in_search(5000);
    let reg = compile(CATASTROPHIC);
    let mut region = OnigRegion::with_capacity(1);
    let err = search(&reg, &catastrophic_subject(), &mut region).unwrap_err();
    assert_eq!(err, RegexError::RetryLimitInSearchOver);
}

#[test]
fn match_stack_limit() {
    let _g = serial();
    let _reset = LimitsReset;
    onig_set_match_stack_limit(10);
    let reg = compile("a*b");
    let mut region = OnigRegion::with_capacity(1);
    let err = search(&reg, &[b'a'; 100], &mut region).unwrap_err();
    assert_eq!(err, RegexError::MatchStackLimitOver);
    // small inputs stay under the limit
    assert_eq!(search(&reg, b"aab", &mut region).unwrap(), Some(0));
}

#[test]
fn time_limit() {
    let _g = serial();
    let _reset = LimitsReset;
    onig_set_retry_limit_in_match(0);
    onig_set_time_limit(5);
    assert_eq!(onig_get_time_limit(), 5);
    let reg = compile(CATASTROPHIC);
    let mut region = OnigRegion::with_capacity(1);
    let err = search(&reg, &catastrophic_subject(), &mut region).unwrap_err();
    assert_eq!(err, RegexError::TimeLimitOver);
}

#[test]
fn convenience_api_reports_no_match_on_limit() {
    let _g = serial();
    let _reset = LimitsReset;
    onig_set_retry_limit_in_match(1000);
    let re = Regex::new(CATASTROPHIC).unwrap();
    let subject = String::from_utf8(catastrophic_subject()).unwrap();
    assert!(re.find(&subject).is_none());
    assert!(!re.is_match(&subject));
    assert_eq!(re.try_find(&subject).unwrap_err(), RegexError::RetryLimitInMatchOver);
}

#[test]
fn limits_restored_match_normally() {
    let _g = serial();
    drop(LimitsReset);
    let reg = compile(CATASTROPHIC);
    let mut region = OnigRegion::with_capacity(1);
    let mut subject = vec![b'a'; 10];
    subject.push(b'b');
    assert_eq!(search(&reg, &subject, &mut region).unwrap(), Some(0));
}

#[test]
fn capture_num_limit() {
    let _g = serial();
    let saved = onig_get_capture_num_limit();
    assert_eq!(onig_set_capture_num_limit(-1), -1);
    onig_set_capture_num_limit(2);
    let err = onig_new(b"(a)(b)(c)", ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
        .unwrap_err();
    onig_set_capture_num_limit(saved);
    assert_eq!(err.code(), ONIGERR_TOO_MANY_CAPTURES);
    assert!(onig_new(b"(a)(b)(c)", ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma).is_ok());
}

#[test]
fn parse_depth_limit() {
    let _g = serial();
    onig_set_parse_depth_limit(8);
    let deep = format!("{}a{}", "(".repeat(9), ")".repeat(9));
    let shallow = format!("{}a{}", "(".repeat(8), ")".repeat(8));
    let deep_err = onig_new(deep.as_bytes(), ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
        .unwrap_err();
    let shallow_ok = onig_new(shallow.as_bytes(), ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
        .is_ok();
    onig_set_parse_depth_limit(0);
    assert_eq!(deep_err, RegexError::ParseDepthLimitOver);
    assert!(shallow_ok);
}

#[test]
fn default_depth_fits_a_spawned_thread() {
    let _g = serial();
    let n = DEFAULT_PARSE_DEPTH_LIMIT as usize;
    let cases = [
        ("(".repeat(n) + "a" + &")".repeat(n), "xa", 1),
        ("(?:".repeat(n - 1) + "a*" + &")".repeat(n - 1), "aa", 0),
        ("(?<=".to_string() + &"(".repeat(n - 1) + "b" + &")".repeat(n - 1) + ")c", "abc", 2),
    ];
    // std::thread::spawn uses the default 2 MiB stack
    let handle = thread::spawn(move || {
        cases
            .iter()
            .map(|(pattern, subject, _)| {
                let reg = compile(pattern);
                let mut region = OnigRegion::with_capacity(reg.group_count());
                onig_search(&reg, subject.as_bytes(), 0, subject.len(), &mut region, ONIG_OPTION_NONE)
                    .unwrap()
            })
            .zip(cases.iter().map(|c| c.2))
            .collect::<Vec<_>>()
    });
    for (got, want) in handle.join().unwrap() {
        assert_eq!(got, Some(want));
    }

    let over = "(".repeat(n + 1) + "a" + &")".repeat(n + 1);
    let err = onig_new(over.as_bytes(), ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
        .unwrap_err();
    assert_eq!(err, RegexError::ParseDepthLimitOver);
}

#[test]
fn stacked_quantifiers_hit_the_depth_limit() {
    let _g = serial();
    let handle = thread::spawn(|| {
        let once = "a".to_string() + &"{1}".repeat(10_000);
        let once = onig_new(once.as_bytes(), ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
            .map(|reg| reg.group_count());
        let star = "a".to_string() + &"*".repeat(10_000);
        let star = onig_new(star.as_bytes(), ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
            .map(|reg| reg.group_count());
        (once, star)
    });
    let (once, star) = handle.join().unwrap();
    assert_eq!(once, Ok(1));
    assert_eq!(star, Err(RegexError::ParseDepthLimitOver));
}
