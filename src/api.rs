// api.rs - Idiomatic Rust API for oxonig.
//
// Wraps the engine entry points (onig_new, onig_search, onig_match) with
// Rust-native types: Regex, RegexBuilder, Match, Captures, FindIter.

use std::ops::Range;
use std::sync::Arc;

use crate::encodings::utf8::ONIG_ENCODING_UTF8;
use crate::error::RegexError;
use crate::oniguruma::*;
use crate::regcache::onig_cache_global;
use crate::regcomp::onig_new;
use crate::regenc::OnigEncoding;
use crate::regexec::{onig_match, onig_search};
use crate::regint::RegexType;
use crate::regnames::{onig_name_to_backref_number, onig_names};
use crate::regsyntax::{OnigSyntaxOniguruma, OnigSyntaxType};

/// A compiled regular expression.
///
/// Cloning is cheap: clones share the compiled program.
///
/// # Examples
///
/// ```
/// use oxonig::api::Regex;
///
/// let re = Regex::new(r"\d+").unwrap();
/// assert!(re.is_match("hello 42"));
///
/// let m = re.find("hello 42").unwrap();
/// assert_eq!(m.as_str(), "42");
/// assert_eq!(m.start(), 6);
/// assert_eq!(m.end(), 8);
/// ```
#[derive(Clone)]
pub struct Regex {
    inner: Arc<RegexType>,
}

/// Convenience methods report "no match" for any engine error; the `try_*`
/// methods surface it instead. Hitting a resource limit logs a warning.
/// Anything else means an offset or region this module built was rejected,
/// and logs an error.
fn swallow<T>(result: Result<Option<T>, RegexError>) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(err) if err.is_limit_exceeded() => {
            log::warn!("search hit a resource limit, reporting no match: {}", err);
            None
        }
        Err(err) => {
            log::error!("search failed, reporting no match: {}", err);
            None
        }
    }
}

impl Regex {
    /// Compile a pattern using default options (Oniguruma syntax, UTF-8, no flags).
    pub fn new(pattern: &str) -> Result<Regex, RegexError> {
        Self::new_bytes(pattern.as_bytes())
    }

    /// Compile a pattern from raw bytes using default options.
    pub fn new_bytes(pattern: &[u8]) -> Result<Regex, RegexError> {
        let inner = onig_new(
            pattern,
            ONIG_OPTION_NONE,
            &ONIG_ENCODING_UTF8,
            &OnigSyntaxOniguruma,
        )?;
        Ok(Regex {
            inner: Arc::new(inner),
        })
    }

    /// Like [`Regex::new`], but reuses the program from the process-wide
    /// cache when the same pattern was compiled before.
    pub fn cached(pattern: &str) -> Result<Regex, RegexError> {
        let inner = onig_cache_global().get_or_compile(
            pattern.as_bytes(),
            ONIG_OPTION_NONE,
            &ONIG_ENCODING_UTF8,
            &OnigSyntaxOniguruma,
        )?;
        Ok(Regex { inner })
    }

    /// Create a [`RegexBuilder`] for fine-grained control over compilation.
    pub fn builder(pattern: &str) -> RegexBuilder {
        RegexBuilder::new(pattern)
    }

    /// Return the first match in `text`, or `None` if no match.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.find_bytes(text.as_bytes())
    }

    /// Return the first match in `text` (as bytes), or `None` if no match.
    pub fn find_bytes<'t>(&self, text: &'t [u8]) -> Option<Match<'t>> {
        swallow(self.try_find_bytes(text))
    }

    /// Like [`Regex::find`], but execution limits are reported as errors.
    pub fn try_find<'t>(&self, text: &'t str) -> Result<Option<Match<'t>>, RegexError> {
        self.try_find_bytes(text.as_bytes())
    }

    pub fn try_find_bytes<'t>(&self, text: &'t [u8]) -> Result<Option<Match<'t>>, RegexError> {
        let mut region = self.new_region();
        let found = onig_search(
            &self.inner,
            text,
            0,
            text.len(),
            &mut region,
            ONIG_OPTION_NONE,
        )?;
        Ok(found.and_then(|_| Match::from_region(text, &region, 0)))
    }

    /// Check whether `text` matches the pattern anywhere.
    pub fn is_match(&self, text: &str) -> bool {
        self.is_match_bytes(text.as_bytes())
    }

    /// Check whether `text` (as bytes) matches the pattern anywhere.
    pub fn is_match_bytes(&self, text: &[u8]) -> bool {
        self.find_bytes(text).is_some()
    }

    /// Return the first match with all capture groups, or `None`.
    pub fn captures<'r, 't>(&'r self, text: &'t str) -> Option<Captures<'r, 't>> {
        self.captures_bytes(text.as_bytes())
    }

    /// Return the first match with all capture groups (bytes), or `None`.
    pub fn captures_bytes<'r, 't>(&'r self, text: &'t [u8]) -> Option<Captures<'r, 't>> {
        swallow(self.search_at_bytes(text, 0))
    }

    /// Like [`Regex::captures`], but execution limits are reported as errors.
    pub fn try_captures<'r, 't>(
        &'r self,
        text: &'t str,
    ) -> Result<Option<Captures<'r, 't>>, RegexError> {
        self.search_at_bytes(text.as_bytes(), 0)
    }

    /// Search `text` for a match starting at or after byte `offset`.
    ///
    /// Text before `offset` is still visible to anchors and look-behind.
    ///
    /// ```
    /// use oxonig::api::Regex;
    ///
    /// let re = Regex::new(r"\bb").unwrap();
    /// assert_eq!(re.search_at("ab b", 1).unwrap().unwrap().get(0).unwrap().start(), 3);
    /// ```
    pub fn search_at<'r, 't>(
        &'r self,
        text: &'t str,
        offset: usize,
    ) -> Result<Option<Captures<'r, 't>>, RegexError> {
        self.search_at_bytes(text.as_bytes(), offset)
    }

    pub fn search_at_bytes<'r, 't>(
        &'r self,
        text: &'t [u8],
        offset: usize,
    ) -> Result<Option<Captures<'r, 't>>, RegexError> {
        let mut region = self.new_region();
        let found = onig_search(
            &self.inner,
            text,
            offset,
            text.len(),
            &mut region,
            ONIG_OPTION_NONE,
        )?;
        Ok(found.map(|_| Captures {
            text,
            region,
            regex: self,
        }))
    }

    /// Match anchored at byte `at`: the match must begin exactly there.
    pub fn match_at<'t>(&self, text: &'t str, at: usize) -> Result<Option<Match<'t>>, RegexError> {
        self.match_at_bytes(text.as_bytes(), at)
    }

    pub fn match_at_bytes<'t>(
        &self,
        text: &'t [u8],
        at: usize,
    ) -> Result<Option<Match<'t>>, RegexError> {
        let mut region = self.new_region();
        let len = onig_match(&self.inner, text, at, &mut region, ONIG_OPTION_NONE)?;
        Ok(len.map(|len| Match {
            text,
            start: at,
            end: at + len,
        }))
    }

    /// Iterate over all non-overlapping matches in `text`.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> FindIter<'r, 't> {
        self.find_iter_bytes(text.as_bytes())
    }

    /// Iterate over all non-overlapping matches in `text` (as bytes).
    pub fn find_iter_bytes<'r, 't>(&'r self, text: &'t [u8]) -> FindIter<'r, 't> {
        FindIter {
            regex: self,
            text,
            region: self.new_region(),
            last_end: 0,
            last_match_end: None,
        }
    }

    /// A region sized for this program's groups.
    pub fn new_region(&self) -> OnigRegion {
        OnigRegion::with_capacity(self.inner.group_count())
    }

    /// Return the number of capture groups in the pattern (excluding group 0).
    pub fn captures_len(&self) -> usize {
        self.inner.num_mem as usize
    }

    /// Named groups with their group numbers, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = (&str, &[i32])> + '_ {
        onig_names(&self.inner).into_iter()
    }

    /// The pattern this regex was compiled from.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner.pattern
    }

    /// Access the underlying `RegexType` for the low-level entry points.
    pub fn as_raw(&self) -> &RegexType {
        &self.inner
    }
}

impl std::fmt::Debug for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regex")
            .field("pattern", &String::from_utf8_lossy(&self.inner.pattern))
            .finish_non_exhaustive()
    }
}

impl std::str::FromStr for Regex {
    type Err = RegexError;

    fn from_str(s: &str) -> Result<Regex, RegexError> {
        Regex::new(s)
    }
}

// === RegexBuilder ===

/// Builder for compiling a [`Regex`] with custom options.
///
/// # Examples
///
/// ```
/// use oxonig::api::Regex;
///
/// let re = Regex::builder(r"hello world")
///     .case_insensitive(true)
///     .build()
///     .unwrap();
/// assert!(re.is_match("Hello World"));
/// ```
pub struct RegexBuilder {
    pattern: Vec<u8>,
    options: OnigOptionType,
    syntax: &'static OnigSyntaxType,
    encoding: OnigEncoding,
}

impl RegexBuilder {
    /// Create a new builder for the given pattern.
    pub fn new(pattern: &str) -> Self {
        Self::new_bytes(pattern.as_bytes())
    }

    pub fn new_bytes(pattern: &[u8]) -> Self {
        RegexBuilder {
            pattern: pattern.to_vec(),
            options: ONIG_OPTION_NONE,
            syntax: &OnigSyntaxOniguruma,
            encoding: &ONIG_ENCODING_UTF8,
        }
    }

    fn flag(mut self, flag: OnigOptionType, yes: bool) -> Self {
        self.options.set(flag, yes);
        self
    }

    /// Enable or disable case-insensitive matching.
    pub fn case_insensitive(self, yes: bool) -> Self {
        self.flag(ONIG_OPTION_IGNORECASE, yes)
    }

    /// Enable or disable `^`/`$` matching at every line boundary.
    pub fn multi_line(self, yes: bool) -> Self {
        self.flag(ONIG_OPTION_MULTILINE, yes)
    }

    /// Enable or disable `.` matching `\n`.
    pub fn dot_all(self, yes: bool) -> Self {
        self.flag(ONIG_OPTION_DOTALL, yes)
    }

    /// Enable or disable extended mode (whitespace and `#` comments ignored).
    pub fn extended(self, yes: bool) -> Self {
        self.flag(ONIG_OPTION_EXTEND, yes)
    }

    /// Report the longest match over every start position; ties go to the
    /// leftmost one.
    pub fn find_longest(self, yes: bool) -> Self {
        self.flag(ONIG_OPTION_FIND_LONGEST, yes)
    }

    /// Set a raw option flag. See `ONIG_OPTION_*` constants.
    pub fn option(mut self, flag: OnigOptionType) -> Self {
        self.options |= flag;
        self
    }

    /// Select the syntax definition to use (default: Oniguruma).
    ///
    /// Pass one of the `OnigSyntax*` statics from [`crate::regsyntax`].
    pub fn syntax(mut self, syntax: &'static OnigSyntaxType) -> Self {
        self.syntax = syntax;
        self
    }

    /// Select the encoding of pattern and subject (default: UTF-8).
    pub fn encoding(mut self, encoding: OnigEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Compile the pattern into a [`Regex`].
    pub fn build(self) -> Result<Regex, RegexError> {
        let inner = onig_new(&self.pattern, self.options, self.encoding, self.syntax)?;
        Ok(Regex {
            inner: Arc::new(inner),
        })
    }
}

// === Match ===

/// A single match result referencing the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t [u8],
    start: usize,
    end: usize,
}

impl<'t> Match<'t> {
    fn from_region(text: &'t [u8], region: &OnigRegion, i: usize) -> Option<Match<'t>> {
        region.get(i).map(|(start, end)| Match { text, start, end })
    }

    /// Byte offset of the start of the match.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset of the end of the match (exclusive).
    pub fn end(&self) -> usize {
        self.end
    }

    /// Byte range of the match.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The matched text as a byte slice.
    pub fn as_bytes(&self) -> &'t [u8] {
        &self.text[self.start..self.end]
    }

    /// The matched text as a `&str`.
    ///
    /// # Panics
    ///
    /// Panics if the matched bytes are not valid UTF-8.
    pub fn as_str(&self) -> &'t str {
        std::str::from_utf8(self.as_bytes()).expect("match is not valid UTF-8")
    }

    /// Returns the length of the match in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the match is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// === Captures ===

/// All capture groups from a single match.
///
/// Group 0 is the entire match. Groups 1..N correspond to `(...)` in the pattern.
pub struct Captures<'r, 't> {
    text: &'t [u8],
    region: OnigRegion,
    regex: &'r Regex,
}

impl<'r, 't> Captures<'r, 't> {
    /// Get capture group `i`, or `None` if the group did not participate.
    ///
    /// Group 0 is the entire match.
    pub fn get(&self, i: usize) -> Option<Match<'t>> {
        Match::from_region(self.text, &self.region, i)
    }

    /// Get the group with the given name. With duplicate names this is the
    /// last of them that participated, as a `\k<name>` reference would see.
    pub fn name(&self, name: &str) -> Option<Match<'t>> {
        let num = onig_name_to_backref_number(&self.regex.inner, name, Some(&self.region)).ok()?;
        self.get(num as usize)
    }

    /// Number of capture groups (including group 0).
    pub fn len(&self) -> usize {
        self.region.count()
    }

    /// Returns `true` if there are no capture groups (never the case for a match).
    pub fn is_empty(&self) -> bool {
        self.region.count() == 0
    }

    /// The raw region filled by the search.
    pub fn region(&self) -> &OnigRegion {
        &self.region
    }

    /// Iterate over all capture groups.
    pub fn iter(&self) -> CapturesIter<'_, 'r, 't> {
        CapturesIter {
            captures: self,
            index: 0,
        }
    }
}

impl std::fmt::Debug for Captures<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for i in 0..self.len() {
            list.entry(&self.get(i).map(|m| m.range()));
        }
        list.finish()
    }
}

// === CapturesIter ===

/// Iterator over capture groups in a [`Captures`].
pub struct CapturesIter<'c, 'r, 't> {
    captures: &'c Captures<'r, 't>,
    index: usize,
}

impl<'t> Iterator for CapturesIter<'_, '_, 't> {
    type Item = Option<Match<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.captures.len() {
            return None;
        }
        let m = self.captures.get(self.index);
        self.index += 1;
        Some(m)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.captures.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CapturesIter<'_, '_, '_> {}

// === FindIter ===

/// Iterator over all non-overlapping matches in a text.
///
/// An empty match directly after the previous match is skipped.
pub struct FindIter<'r, 't> {
    regex: &'r Regex,
    text: &'t [u8],
    region: OnigRegion,
    last_end: usize,
    last_match_end: Option<usize>,
}

impl<'t> FindIter<'_, 't> {
    fn step_char(&self, at: usize) -> usize {
        if at >= self.text.len() {
            at + 1
        } else {
            at + self.regex.inner.enc.mbc_enc_len(&self.text[at..])
        }
    }
}

impl<'r, 't> Iterator for FindIter<'r, 't> {
    type Item = Match<'t>;

    fn next(&mut self) -> Option<Match<'t>> {
        loop {
            if self.last_end > self.text.len() {
                return None;
            }
            let result = onig_search(
                &self.regex.inner,
                self.text,
                self.last_end,
                self.text.len(),
                &mut self.region,
                ONIG_OPTION_NONE,
            );
            swallow(result)?;
            let m = Match::from_region(self.text, &self.region, 0)?;

            if m.is_empty() && self.last_match_end == Some(m.end) {
                self.last_end = self.step_char(m.end);
                continue;
            }

            self.last_end = if m.is_empty() {
                self.step_char(m.end)
            } else {
                m.end
            };
            self.last_match_end = Some(m.end);
            return Some(m);
        }
    }
}
