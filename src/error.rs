// error.rs - Idiomatic Rust error type.
//
// Groups the i32 error codes into semantic variants while keeping the
// numeric code available through `code()`.

use std::fmt;

use crate::oniguruma::*;
use crate::regerror::{onig_error_code_to_format, onig_error_code_to_str};

/// Error type for regex compilation and matching operations.
///
/// A failed search is not an error: search functions return `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexError {
    /// Memory allocation failure.
    Memory,
    /// Match-stack limit exceeded.
    MatchStackLimitOver,
    /// Retry limit in match exceeded.
    RetryLimitInMatchOver,
    /// Retry limit in search exceeded.
    RetryLimitInSearchOver,
    /// Time limit exceeded.
    TimeLimitOver,
    /// Parse depth limit exceeded.
    ParseDepthLimitOver,
    /// Malformed pattern. `offset` is the byte offset in the pattern where
    /// the problem was detected, when known.
    Syntax {
        code: i32,
        message: String,
        offset: Option<usize>,
    },
    /// A name lookup on a compiled program found no such group.
    UndefinedName { name: String },
    /// The caller broke a precondition (bad offsets, region too small).
    InvalidArgument { message: String },
    /// Internal engine bug (should not occur in correct usage).
    InternalBug { code: i32, message: String },
    /// Other error not covered by specific variants.
    Other(i32),
}

impl RegexError {
    /// A syntax error for `code`, with its `%n` parameter filled in.
    pub fn syntax(code: i32, param: Option<&[u8]>, offset: Option<usize>) -> Self {
        RegexError::Syntax {
            code,
            message: onig_error_code_to_str(code, param),
            offset,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        RegexError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns the Oniguruma error code.
    pub fn code(&self) -> i32 {
        match self {
            RegexError::Memory => ONIGERR_MEMORY,
            RegexError::MatchStackLimitOver => ONIGERR_MATCH_STACK_LIMIT_OVER,
            RegexError::RetryLimitInMatchOver => ONIGERR_RETRY_LIMIT_IN_MATCH_OVER,
            RegexError::RetryLimitInSearchOver => ONIGERR_RETRY_LIMIT_IN_SEARCH_OVER,
            RegexError::TimeLimitOver => ONIGERR_TIME_LIMIT_OVER,
            RegexError::ParseDepthLimitOver => ONIGERR_PARSE_DEPTH_LIMIT_OVER,
            RegexError::Syntax { code, .. } => *code,
            RegexError::UndefinedName { .. } => ONIGERR_UNDEFINED_NAME_REFERENCE,
            RegexError::InvalidArgument { .. } => ONIGERR_INVALID_ARGUMENT,
            RegexError::InternalBug { code, .. } => *code,
            RegexError::Other(code) => *code,
        }
    }

    /// True for the errors raised by the execution limits.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(
            self,
            RegexError::MatchStackLimitOver
                | RegexError::RetryLimitInMatchOver
                | RegexError::RetryLimitInSearchOver
                | RegexError::TimeLimitOver
        )
    }
}

impl fmt::Display for RegexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegexError::Memory => write!(f, "memory allocation failed"),
            RegexError::MatchStackLimitOver => write!(f, "match-stack limit over"),
            RegexError::RetryLimitInMatchOver => write!(f, "retry-limit-in-match over"),
            RegexError::RetryLimitInSearchOver => write!(f, "retry-limit-in-search over"),
            RegexError::TimeLimitOver => write!(f, "time limit over"),
            RegexError::ParseDepthLimitOver => write!(f, "parse depth limit over"),
            RegexError::Syntax {
                message,
                offset: Some(off),
                ..
            } => write!(f, "syntax error at offset {}: {}", off, message),
            RegexError::Syntax { message, .. } => write!(f, "syntax error: {}", message),
            RegexError::UndefinedName { name } => write!(f, "undefined name <{}>", name),
            RegexError::InvalidArgument { message } => {
                write!(f, "invalid argument: {}", message)
            }
            RegexError::InternalBug { message, .. } => write!(f, "internal error: {}", message),
            RegexError::Other(code) => write!(f, "error code {}", code),
        }
    }
}

impl std::error::Error for RegexError {}

impl From<i32> for RegexError {
    fn from(code: i32) -> Self {
        match code {
            ONIGERR_MEMORY => RegexError::Memory,
            ONIGERR_MATCH_STACK_LIMIT_OVER => RegexError::MatchStackLimitOver,
            ONIGERR_RETRY_LIMIT_IN_MATCH_OVER => RegexError::RetryLimitInMatchOver,
            ONIGERR_RETRY_LIMIT_IN_SEARCH_OVER => RegexError::RetryLimitInSearchOver,
            ONIGERR_TIME_LIMIT_OVER => RegexError::TimeLimitOver,
            ONIGERR_PARSE_DEPTH_LIMIT_OVER => RegexError::ParseDepthLimitOver,
            ONIGERR_INVALID_ARGUMENT => RegexError::invalid_argument("invalid argument"),

            ONIGERR_TYPE_BUG | ONIGERR_PARSER_BUG | ONIGERR_STACK_BUG
            | ONIGERR_UNDEFINED_BYTECODE | ONIGERR_UNEXPECTED_BYTECODE => {
                RegexError::InternalBug {
                    code,
                    message: onig_error_code_to_format(code).to_string(),
                }
            }

            // Syntax / pattern errors (range -100..-999)
            c if onig_is_pattern_error(c) => RegexError::syntax(c, None, None),

            _ => RegexError::Other(code),
        }
    }
}
