// Criterion benchmark suite for compile, search, captures and the cache.
//
// Run: cargo bench
// Specific group: cargo bench -- compile
// HTML report: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use oxonig::api::Regex;
use oxonig::encodings::ONIG_ENCODING_UTF8;
use oxonig::oniguruma::{OnigOptionType, OnigRegion, ONIG_OPTION_IGNORECASE, ONIG_OPTION_NONE};
use oxonig::regcache::RegexCache;
use oxonig::regcomp::onig_new;
use oxonig::regexec::{onig_match, onig_search};
use oxonig::regint::RegexType;
use oxonig::regsyntax::OnigSyntaxOniguruma;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compile(pattern: &[u8], option: OnigOptionType) -> RegexType {
    onig_new(pattern, option, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
        .expect("compile failed")
}

fn search(reg: &RegexType, text: &[u8], region: &mut OnigRegion) -> Option<usize> {
    onig_search(reg, text, 0, text.len(), region, ONIG_OPTION_NONE).expect("search failed")
}

/// Compile and search `text` once per case, benchmarking only the search.
fn bench_search_cases(c: &mut Criterion, group_name: &str, text: &[u8], cases: &[(&str, &[u8])]) {
    let mut group = c.benchmark_group(group_name);
    for (name, pat) in cases {
        let reg = compile(pat, ONIG_OPTION_NONE);
        let mut region = OnigRegion::with_capacity(reg.group_count());
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| black_box(search(&reg, black_box(text), &mut region)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 1. compile
// ---------------------------------------------------------------------------

fn bench_compile(c: &mut Criterion) {
    let patterns: &[(&str, &[u8])] = &[
        ("literal", b"hello world"),
        ("dot_star", b"foo.*bar"),
        ("alternation", b"alpha|beta|gamma|delta"),
        ("char_class", b"[a-zA-Z0-9_]+"),
        ("quantifier", b"a{2,5}b+c?d*"),
        ("group", b"(abc)+(def)*"),
        ("backref", b"(\\w+)\\s+\\1"),
        ("lookahead", b"foo(?=bar)"),
        ("lookbehind", b"(?<=@)\\w+"),
        ("named_capture", b"(?<year>\\d{4})-(?<month>\\d{2})-(?<day>\\d{2})"),
    ];

    let mut group = c.benchmark_group("compile");
    for (name, pat) in patterns {
        group.bench_with_input(BenchmarkId::from_parameter(name), pat, |b, pat| {
            b.iter(|| black_box(compile(black_box(pat), ONIG_OPTION_NONE)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. search by pattern family
// ---------------------------------------------------------------------------

fn bench_literal(c: &mut Criterion) {
    bench_search_cases(
        c,
        "literal",
        b"The quick brown fox jumps over the lazy dog near the riverbank",
        &[
            ("exact", b"lazy dog"),
            ("anchored_start", b"^The quick"),
            ("anchored_end", b"riverbank$"),
            ("word_boundary", b"\\bfox\\b"),
        ],
    );
}

fn bench_quantifiers(c: &mut Criterion) {
    bench_search_cases(
        c,
        "quantifiers",
        b"aaaaabbbbbccccc12345",
        &[
            ("greedy", b"a+b+c+"),
            ("lazy", b"a+?b+?c+?"),
            ("possessive", b"a++b++"),
            ("nested", b"(a+b+)+"),
        ],
    );
}

fn bench_alternation(c: &mut Criterion) {
    bench_search_cases(
        c,
        "alternation",
        b"The wolverine dashed across the frozen tundra at midnight",
        &[
            ("two", b"wolf|wolverine"),
            ("five", b"cat|dog|fox|bear|wolverine"),
            ("nested", b"(cat|dog)|(fox|wolverine)"),
        ],
    );
}

fn bench_backrefs_and_lookaround(c: &mut Criterion) {
    bench_search_cases(
        c,
        "backrefs_lookaround",
        b"user@example.com says hello hello to price $42 and foobar",
        &[
            ("repeated_word", b"\\b(\\w+)\\s+\\1\\b"),
            ("lookahead", b"foo(?=bar)"),
            ("lookbehind", b"(?<=\\$)\\d+"),
            ("neg_lookbehind", b"(?<!@)\\bexample"),
        ],
    );
}

fn bench_case_insensitive(c: &mut Criterion) {
    let text = "Straße und STRASSE, Hello WORLD, ÉCOLE école".as_bytes();
    let mut group = c.benchmark_group("case_insensitive");
    for (name, pat) in [("ascii", &b"hello world"[..]), ("latin", "école".as_bytes())] {
        let reg = compile(pat, ONIG_OPTION_IGNORECASE);
        let mut region = OnigRegion::with_capacity(reg.group_count());
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| black_box(search(&reg, black_box(text), &mut region)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 3. captures through the high-level API
// ---------------------------------------------------------------------------

fn bench_captures(c: &mut Criterion) {
    let re = Regex::new(r"(?<year>\d{4})-(?<month>\d{2})-(?<day>\d{2})").expect("compile failed");
    let text = "released on 2024-03-15, patched on 2024-04-02";

    let mut group = c.benchmark_group("captures");
    group.bench_function("numbered", |b| {
        b.iter(|| {
            let caps = re.captures(black_box(text)).expect("no match");
            black_box(caps.get(2).map(|m| m.range()))
        });
    });
    group.bench_function("by_name", |b| {
        b.iter(|| {
            let caps = re.captures(black_box(text)).expect("no match");
            black_box(caps.name("month").map(|m| m.range()))
        });
    });
    group.bench_function("find_iter", |b| {
        b.iter(|| black_box(re.find_iter(black_box(text)).count()));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// 4. large text
// ---------------------------------------------------------------------------

fn make_log_line(i: usize) -> String {
    format!(
        "2025-06-{:02} {:02}:{:02}:{:02} INFO server[{}] request path=/api/v1/users/{} status=200 duration={}ms\n",
        (i % 28) + 1,
        i % 24,
        i % 60,
        (i * 7) % 60,
        1000 + (i % 50),
        i * 3,
        (i * 13) % 500,
    )
}

fn make_log_text(num_lines: usize) -> Vec<u8> {
    (0..num_lines).map(make_log_line).collect::<String>().into_bytes()
}

fn bench_large_text(c: &mut Criterion) {
    let text = make_log_text(500);
    let cases: &[(&str, &[u8])] = &[
        ("literal", b"INFO"),
        ("timestamp", b"\\d{4}-\\d{2}-\\d{2} \\d{2}:\\d{2}:\\d{2}"),
        ("field_extract", b"duration=(\\d+)ms"),
        ("no_match", b"CRITICAL_ERROR"),
    ];

    let mut group = c.benchmark_group("large_text");
    group.throughput(Throughput::Bytes(text.len() as u64));
    for (name, pat) in cases {
        let reg = compile(pat, ONIG_OPTION_NONE);
        let mut region = OnigRegion::with_capacity(reg.group_count());
        group.bench_with_input(BenchmarkId::from_parameter(name), &text[..], |b, text| {
            b.iter(|| {
                // scan every match, as a log filter would
                let mut at = 0;
                let mut hits = 0usize;
                while at <= text.len() {
                    match onig_search(&reg, text, at, text.len(), &mut region, ONIG_OPTION_NONE) {
                        Ok(Some(_)) => {
                            hits += 1;
                            let (s, e) = region.get(0).expect("group 0 set");
                            at = if e > s { e } else { e + 1 };
                        }
                        _ => break,
                    }
                }
                black_box(hits)
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 5. anchored match at a position
// ---------------------------------------------------------------------------

fn bench_match_at_position(c: &mut Criterion) {
    let text = b"key1=value1;key2=value2;key3=value3";
    let reg = compile(b"\\w+=\\w+", ONIG_OPTION_NONE);
    let mut region = OnigRegion::with_capacity(reg.group_count());

    let mut group = c.benchmark_group("match_at_position");
    for at in [0usize, 12, 24] {
        group.bench_with_input(BenchmarkId::from_parameter(at), &at, |b, &at| {
            b.iter(|| black_box(onig_match(&reg, black_box(text), at, &mut region, ONIG_OPTION_NONE)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 6. cache
// ---------------------------------------------------------------------------

fn bench_cache(c: &mut Criterion) {
    let pattern: &[u8] = b"(?<year>\\d{4})-(?<month>\\d{2})";
    let mut group = c.benchmark_group("cache");

    let cache = RegexCache::new(16);
    group.bench_function("hit", |b| {
        b.iter(|| {
            black_box(
                cache
                    .get_or_compile(black_box(pattern), ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
                    .expect("compile failed"),
            )
        });
    });

    let disabled = RegexCache::new(0);
    group.bench_function("disabled", |b| {
        b.iter(|| {
            black_box(
                disabled
                    .get_or_compile(black_box(pattern), ONIG_OPTION_NONE, &ONIG_ENCODING_UTF8, &OnigSyntaxOniguruma)
                    .expect("compile failed"),
            )
        });
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_compile,
    bench_literal,
    bench_quantifiers,
    bench_alternation,
    bench_backrefs_and_lookaround,
    bench_case_insensitive,
    bench_captures,
    bench_large_text,
    bench_match_at_position,
    bench_cache,
);
criterion_main!(benches);
