//! # oxonig
//!
//! Pure-Rust backtracking regex engine with Oniguruma's shape: a pattern
//! compiler producing immutable bytecode programs, a matching VM with capture
//! tracking, and a named-group registry. Literal prefixes are scanned with
//! [`memchr`](https://crates.io/crates/memchr).
//!
//! ## Quick Start
//!
//! ```rust
//! use oxonig::prelude::*;
//!
//! let re = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
//! let m = re.find("Date: 2026-02-12").unwrap();
//! assert_eq!(m.as_str(), "2026-02-12");
//! assert_eq!(m.start(), 6);
//! ```
//!
//! For fine-grained control, use [`RegexBuilder`](api::RegexBuilder):
//!
//! ```rust
//! use oxonig::prelude::*;
//!
//! let re = Regex::builder(r"hello")
//!     .case_insensitive(true)
//!     .build()
//!     .unwrap();
//! assert!(re.is_match("Hello World"));
//! ```
//!
//! ## Low-Level API
//!
//! The engine entry points take a caller-owned [`OnigRegion`](oniguruma::OnigRegion)
//! that can be reused across calls:
//!
//! ```rust
//! use oxonig::regcomp::onig_new;
//! use oxonig::regexec::onig_search;
//! use oxonig::oniguruma::*;
//! use oxonig::regsyntax::OnigSyntaxOniguruma;
//!
//! let reg = onig_new(
//!     b"(?<y>\\d{4})-\\d{2}-\\d{2}",
//!     ONIG_OPTION_NONE,
//!     &oxonig::encodings::utf8::ONIG_ENCODING_UTF8,
//!     &OnigSyntaxOniguruma,
//! ).unwrap();
//!
//! let input = b"Date: 2026-02-12";
//! let mut region = OnigRegion::with_capacity(reg.group_count());
//! let start = onig_search(&reg, input, 0, input.len(), &mut region, ONIG_OPTION_NONE).unwrap();
//!
//! assert_eq!(start, Some(6));
//! assert_eq!(region.get(1), Some((6, 10)));
//! ```
//!
//! ## Module Structure
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`regparse`] | Pattern parser |
//! | [`regcomp`] | Tree-to-bytecode compiler, `onig_new` |
//! | [`regexec`] | Matching VM, `onig_search` / `onig_match`, execution limits |
//! | [`regnames`] | Named-group registry |
//! | [`reginit`] | One-time library initialization |
//! | [`regcache`] | Shared cache of compiled programs |
//! | [`regint`] | Internal types and opcodes |
//! | [`oniguruma`] | Public types, options, error codes, `OnigRegion` |
//! | [`regenc`] | Encoding trait |
//! | [`regsyntax`] | Syntax definitions |
//! | [`regerror`] | Error messages |

#![allow(clippy::empty_line_after_doc_comments)]

pub mod api;
pub mod encodings;
pub mod error;
pub mod oniguruma;
pub mod prelude;
pub mod regcache;
pub mod regcomp;
pub mod regenc;
pub mod regerror;
pub mod regexec;
pub mod reginit;
pub mod regint;
pub mod regnames;
pub mod regparse;
pub mod regparse_types;
pub mod regsyntax;
