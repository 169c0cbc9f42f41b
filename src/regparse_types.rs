// regparse_types.rs - Parse tree, parse environment and name table.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::oniguruma::*;
use crate::regenc::OnigEncoding;
use crate::regint::*;
use crate::regsyntax::OnigSyntaxType;

// === Node Type Enum ===
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    String = 0,
    CClass = 1,
    CType = 2,
    BackRef = 3,
    Quant = 4,
    Bag = 5,
    Anchor = 6,
    List = 7,
    Alt = 8,
}

/// `ctype` value of a `.` node.
pub const CTYPE_ANYCHAR: i32 = -1;

// === AST Node ===

#[derive(Clone, Debug)]
pub enum Node {
    String(StrNode),
    CClass(Box<CClass>),
    CType(CtypeNode),
    BackRef(BackRefNode),
    Quant(QuantNode),
    Bag(BagNode),
    Anchor(AnchorNode),
    List(Vec<Node>),
    Alt(Vec<Node>),
}

impl Node {
    /// The node matching the empty string.
    pub fn empty() -> Node {
        Node::String(StrNode {
            s: Vec::new(),
            ignore_case: false,
        })
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::String(_) => NodeType::String,
            Node::CClass(_) => NodeType::CClass,
            Node::CType(_) => NodeType::CType,
            Node::BackRef(_) => NodeType::BackRef,
            Node::Quant(_) => NodeType::Quant,
            Node::Bag(_) => NodeType::Bag,
            Node::Anchor(_) => NodeType::Anchor,
            Node::List(_) => NodeType::List,
            Node::Alt(_) => NodeType::Alt,
        }
    }

    pub fn is_empty_string(&self) -> bool {
        matches!(self, Node::String(sn) if sn.s.is_empty())
    }

    pub fn body(&self) -> Option<&Node> {
        match self {
            Node::Quant(qn) => Some(&qn.body),
            Node::Bag(bn) => Some(&bn.body),
            Node::Anchor(an) => an.body.as_deref(),
            _ => None,
        }
    }
}

// === Node Variant Structs ===

#[derive(Clone, Debug)]
pub struct StrNode {
    pub s: Vec<u8>,
    pub ignore_case: bool,
}

#[derive(Clone, Debug)]
pub struct CtypeNode {
    pub ctype: i32,
    pub not: bool,
    /// For `.`: also match a newline.
    pub multiline: bool,
}

#[derive(Clone, Debug)]
pub struct BackRefNode {
    pub back_refs: SmallVec<[i32; 2]>,
    /// Set for `\k<name>`; resolved to group numbers after parsing.
    pub name: Option<Vec<u8>>,
    pub ignore_case: bool,
    /// Pattern offset of the reference, for error reporting.
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct QuantNode {
    pub body: Box<Node>,
    pub lower: i32,
    pub upper: i32,
    pub greedy: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BagType {
    Memory { regnum: i32 },
    StopBacktrack,
}

#[derive(Clone, Debug)]
pub struct BagNode {
    pub body: Box<Node>,
    pub bag_type: BagType,
}

#[derive(Clone, Debug)]
pub struct AnchorNode {
    pub anchor_type: i32,
    /// `^`/`$` match at internal line boundaries.
    pub multiline: bool,
    /// Look-around body.
    pub body: Option<Box<Node>>,
    /// Character length of a look-behind body, filled in by the compiler.
    pub char_len: i32,
}

// === Name Table ===

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameEntry {
    pub name: String,
    pub back_refs: SmallVec<[i32; 2]>,
}

/// Group names in first-declaration order, each with every group number it
/// was declared on.
#[derive(Clone, Debug, Default)]
pub struct NameTable {
    entries: Vec<NameEntry>,
    index: HashMap<String, usize>,
}

impl NameTable {
    pub fn new() -> Self {
        NameTable::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&NameEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NameEntry> {
        self.entries.iter()
    }

    /// Record that group `backref` is named `name`.
    pub fn add(&mut self, name: &str, backref: i32, allow_multiplex: bool) -> Result<(), i32> {
        if let Some(&i) = self.index.get(name) {
            if !allow_multiplex {
                return Err(ONIGERR_MULTIPLEX_DEFINED_NAME);
            }
            self.entries[i].back_refs.push(backref);
            return Ok(());
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(NameEntry {
            name: name.to_string(),
            back_refs: SmallVec::from_slice(&[backref]),
        });
        Ok(())
    }
}

// === Parse Environment ===

pub struct ParseEnv<'a> {
    pub pattern: &'a [u8],
    pub pos: usize,
    pub options: OnigOptionType,
    pub enc: OnigEncoding,
    pub syntax: &'static OnigSyntaxType,
    pub num_mem: i32,
    pub capture_num_limit: i32,
    pub name_table: NameTable,
    pub parse_depth: u32,
    pub parse_depth_limit: u32,
    pub error_pos: usize,
    pub error_param: Option<Vec<u8>>,
}

impl<'a> ParseEnv<'a> {
    pub fn new(
        pattern: &'a [u8],
        options: OnigOptionType,
        enc: OnigEncoding,
        syntax: &'static OnigSyntaxType,
    ) -> Self {
        ParseEnv {
            pattern,
            pos: 0,
            options,
            enc,
            syntax,
            num_mem: 0,
            capture_num_limit: DEFAULT_CAPTURE_NUM_LIMIT,
            name_table: NameTable::new(),
            parse_depth: 0,
            parse_depth_limit: DEFAULT_PARSE_DEPTH_LIMIT,
            error_pos: 0,
            error_param: None,
        }
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    #[inline]
    pub fn peek_byte(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    #[inline]
    pub fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.pattern.get(self.pos + offset).copied()
    }

    /// Record the failure location and hand back the code.
    pub fn fail(&mut self, code: i32) -> i32 {
        self.error_pos = self.pos.min(self.pattern.len());
        code
    }

    pub fn fail_at(&mut self, code: i32, pos: usize) -> i32 {
        self.error_pos = pos;
        code
    }

    pub fn fail_with_name(&mut self, code: i32, pos: usize, name: &[u8]) -> i32 {
        self.error_pos = pos;
        self.error_param = Some(name.to_vec());
        code
    }
}
