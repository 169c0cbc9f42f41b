// regsyntax.rs - Syntax dialect definitions.
//
// A dialect is a set of operator flags (which constructs the parser accepts)
// plus behavior flags and default options.

use bitflags::bitflags;

use crate::oniguruma::*;

bitflags! {
    /// Constructs recognized by the parser.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SyntaxOp: u32 {
        /// `\1` .. `\9..` back-references.
        const DECIMAL_BACKREF = 1 << 0;
        /// `(?<name>...)` and `(?'name'...)`.
        const QMARK_LT_NAMED_GROUP = 1 << 1;
        /// `\k<name>`, `\k'name'`, `\k<1>`.
        const ESC_K_NAMED_BACKREF = 1 << 2;
        /// `(?P<name>...)` and `(?P=name)`.
        const QMARK_CAPITAL_P_NAME = 1 << 3;
        /// `(?=`, `(?!`, `(?<=`, `(?<!`.
        const LOOK_AROUND = 1 << 4;
        /// `(?>...)` and possessive `*+ ++ ?+`.
        const ATOMIC_GROUP = 1 << 5;
        /// `\A \z \Z \G`.
        const ESC_AZ_BUF_ANCHOR = 1 << 6;
        /// `[:alpha:]` inside a bracket class.
        const POSIX_BRACKET = 1 << 7;
        /// `\h` / `\H` as hex-digit classes.
        const ESC_H_XDIGIT = 1 << 8;
    }
}

bitflags! {
    /// Dialect behavior switches.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SyntaxBehavior: u32 {
        /// The same group name may be declared more than once.
        const ALLOW_MULTIPLEX_DEFINITION_NAME = 1 << 0;
        /// An interval that does not parse (`a{x}`) is taken literally.
        const ALLOW_INVALID_INTERVAL = 1 << 1;
        /// `{,n}` means `{0,n}`.
        const ALLOW_INTERVAL_LOW_ABBREV = 1 << 2;
        /// Top-level alternatives of a look-behind may differ in length.
        const DIFFERENT_LEN_ALT_LOOK_BEHIND = 1 << 3;
    }
}

#[derive(Clone, Debug)]
pub struct OnigSyntaxType {
    pub name: &'static str,
    pub op: SyntaxOp,
    pub behavior: SyntaxBehavior,
    pub options: OnigOptionType,
}

impl OnigSyntaxType {
    #[inline]
    pub fn has_op(&self, op: SyntaxOp) -> bool {
        self.op.contains(op)
    }

    #[inline]
    pub fn has_behavior(&self, bv: SyntaxBehavior) -> bool {
        self.behavior.contains(bv)
    }
}

const COMMON_OP: SyntaxOp = SyntaxOp::DECIMAL_BACKREF
    .union(SyntaxOp::QMARK_LT_NAMED_GROUP)
    .union(SyntaxOp::ESC_K_NAMED_BACKREF)
    .union(SyntaxOp::LOOK_AROUND)
    .union(SyntaxOp::ATOMIC_GROUP)
    .union(SyntaxOp::ESC_AZ_BUF_ANCHOR)
    .union(SyntaxOp::POSIX_BRACKET);

/// Default dialect: Oniguruma-flavored, duplicate group names allowed.
#[allow(non_upper_case_globals)]
pub static OnigSyntaxOniguruma: OnigSyntaxType = OnigSyntaxType {
    name: "Oniguruma",
    op: COMMON_OP.union(SyntaxOp::ESC_H_XDIGIT),
    behavior: SyntaxBehavior::ALLOW_MULTIPLEX_DEFINITION_NAME
        .union(SyntaxBehavior::ALLOW_INVALID_INTERVAL)
        .union(SyntaxBehavior::ALLOW_INTERVAL_LOW_ABBREV)
        .union(SyntaxBehavior::DIFFERENT_LEN_ALT_LOOK_BEHIND),
    options: ONIG_OPTION_NONE,
};

/// Perl-flavored dialect: `(?P<name>...)` accepted, every name unique.
#[allow(non_upper_case_globals)]
pub static OnigSyntaxPerl: OnigSyntaxType = OnigSyntaxType {
    name: "Perl",
    op: COMMON_OP.union(SyntaxOp::QMARK_CAPITAL_P_NAME),
    behavior: SyntaxBehavior::ALLOW_INVALID_INTERVAL
        .union(SyntaxBehavior::DIFFERENT_LEN_ALT_LOOK_BEHIND),
    options: ONIG_OPTION_NONE,
};

pub static ONIG_SYNTAX_DEFAULT: &OnigSyntaxType = &OnigSyntaxOniguruma;
