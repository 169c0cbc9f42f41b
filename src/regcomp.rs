// regcomp.rs - Compiler.
// Turns the parse tree into bytecode (an `Operation` array), computes the
// search hints and builds the finished `RegexType`.
//
// Every address in the emitted code is relative to the instruction holding
// it, so a compiled fragment can be copied when a quantifier is unrolled.

use crate::error::RegexError;
use crate::oniguruma::*;
use crate::regenc::*;
use crate::reginit::onig_ensure_initialized;
use crate::regint::*;
use crate::regparse::onig_parse_tree;
use crate::regparse_types::*;
use crate::regsyntax::{OnigSyntaxType, SyntaxBehavior};

// ============================================================================
// Operation management
// ============================================================================

fn add_op(reg: &mut RegexType, opcode: OpCode, payload: OperationPayload) -> usize {
    let idx = reg.ops.len();
    reg.ops.push(Operation::new(opcode, payload));
    idx
}

fn ops_curr_offset(reg: &RegexType) -> usize {
    reg.ops.len()
}

/// Point the jump-like instruction at `at` to the absolute index `target`.
fn patch_addr(reg: &mut RegexType, at: usize, target: usize) -> Result<(), i32> {
    let rel = target as RelAddrType - at as RelAddrType;
    match &mut reg.ops[at].payload {
        OperationPayload::Jump { addr }
        | OperationPayload::Push { addr }
        | OperationPayload::Repeat { addr, .. }
        | OperationPayload::RepeatInc { addr, .. } => {
            *addr = rel;
            Ok(())
        }
        _ => Err(ONIGERR_UNDEFINED_BYTECODE),
    }
}

fn add_jump(reg: &mut RegexType) -> usize {
    add_op(reg, OpCode::Jump, OperationPayload::Jump { addr: 0 })
}

fn add_push(reg: &mut RegexType) -> usize {
    add_op(reg, OpCode::Push, OperationPayload::Push { addr: 0 })
}

/// Compile `node` into a detached instruction list.
fn compile_to_vec(node: &Node, reg: &mut RegexType) -> Result<Vec<Operation>, i32> {
    let saved = std::mem::take(&mut reg.ops);
    let r = compile_tree(node, reg);
    let body = std::mem::replace(&mut reg.ops, saved);
    r.map(|_| body)
}

// ============================================================================
// Leaf nodes
// ============================================================================

fn compile_string_node(sn: &StrNode, reg: &mut RegexType) {
    if sn.s.is_empty() {
        return;
    }
    if sn.ignore_case {
        let enc = reg.enc;
        let mut codes = Vec::with_capacity(sn.s.len());
        let mut p = 0;
        while p < sn.s.len() {
            let len = enclen(enc, &sn.s, p);
            codes.push(enc.case_fold(enc.mbc_to_code(&sn.s[p..p + len])));
            p += len;
        }
        add_op(reg, OpCode::StrIc, OperationPayload::StrIc { codes });
    } else {
        add_op(reg, OpCode::Str, OperationPayload::Str { s: sn.s.clone() });
    }
}

fn compile_ctype_node(cn: &CtypeNode, reg: &mut RegexType) -> Result<(), i32> {
    let opcode = match cn.ctype {
        CTYPE_ANYCHAR if cn.multiline => OpCode::AnyCharMl,
        CTYPE_ANYCHAR => OpCode::AnyChar,
        t if t == ONIGENC_CTYPE_WORD as i32 => {
            if cn.not {
                OpCode::NoWord
            } else {
                OpCode::Word
            }
        }
        _ => return Err(ONIGERR_TYPE_BUG),
    };
    add_op(reg, opcode, OperationPayload::None);
    Ok(())
}

fn compile_backref_node(br: &BackRefNode, reg: &mut RegexType) {
    let opcode = if br.ignore_case {
        OpCode::BackRefIc
    } else {
        OpCode::BackRef
    };
    add_op(
        reg,
        opcode,
        OperationPayload::BackRef {
            ns: br.back_refs.to_vec(),
        },
    );
}

// ============================================================================
// Quantifiers
// ============================================================================

/// Smallest number of bytes the node can consume.
fn tree_min_len(node: &Node) -> usize {
    match node {
        Node::String(sn) => sn.s.len(),
        Node::CClass(_) | Node::CType(_) => 1,
        Node::BackRef(_) | Node::Anchor(_) => 0,
        Node::Quant(qn) => tree_min_len(&qn.body).saturating_mul(qn.lower.max(0) as usize),
        Node::Bag(bn) => tree_min_len(&bn.body),
        Node::List(items) => items.iter().map(tree_min_len).fold(0, usize::saturating_add),
        Node::Alt(items) => items.iter().map(tree_min_len).min().unwrap_or(0),
    }
}

fn new_empty_check_id(reg: &mut RegexType) -> MemNumType {
    let id = reg.num_empty_check;
    reg.num_empty_check += 1;
    id
}

/// `L0: PUSH EXIT; [ECS] body [ECE]; JUMP L0; EXIT:` and the lazy mirror.
fn compile_star(body: &[Operation], greedy: bool, may_be_empty: bool, reg: &mut RegexType) -> Result<(), i32> {
    let check = may_be_empty.then(|| new_empty_check_id(reg));
    let l0 = ops_curr_offset(reg);
    let push = add_push(reg);
    let enter_jump = if greedy { None } else { Some(add_jump(reg)) };
    let l1 = ops_curr_offset(reg);
    if let Some(mem) = check {
        add_op(reg, OpCode::EmptyCheckStart, OperationPayload::EmptyCheck { mem });
    }
    reg.ops.extend_from_slice(body);
    if let Some(mem) = check {
        add_op(reg, OpCode::EmptyCheckEnd, OperationPayload::EmptyCheck { mem });
    }
    let back = add_jump(reg);
    patch_addr(reg, back, l0)?;
    let exit = ops_curr_offset(reg);
    match enter_jump {
        None => patch_addr(reg, push, exit),
        Some(jump) => {
            patch_addr(reg, push, l1)?;
            patch_addr(reg, jump, exit)
        }
    }
}

/// `PUSH EXIT; body; EXIT:` and the lazy mirror.
fn compile_optional(body: &[Operation], greedy: bool, reg: &mut RegexType) -> Result<(), i32> {
    let push = add_push(reg);
    if greedy {
        reg.ops.extend_from_slice(body);
        let exit = ops_curr_offset(reg);
        return patch_addr(reg, push, exit);
    }
    let jump = add_jump(reg);
    let l1 = ops_curr_offset(reg);
    reg.ops.extend_from_slice(body);
    let exit = ops_curr_offset(reg);
    patch_addr(reg, push, l1)?;
    patch_addr(reg, jump, exit)
}

fn entry_repeat_range(reg: &mut RegexType, lower: i32, upper: i32) -> MemNumType {
    let id = reg.num_repeat;
    reg.num_repeat += 1;
    reg.repeat_range.push(RepeatRange { lower, upper });
    id
}

/// Counter-driven loop: `REPEAT id -> EXIT; BODY: body; REPEAT_INC id -> BODY; EXIT:`.
fn compile_range_repeat(body: &[Operation], qn: &QuantNode, reg: &mut RegexType) -> Result<(), i32> {
    let id = entry_repeat_range(reg, qn.lower, qn.upper);
    let (op, inc_op) = if qn.greedy {
        (OpCode::Repeat, OpCode::RepeatInc)
    } else {
        (OpCode::RepeatNg, OpCode::RepeatIncNg)
    };
    let head = add_op(reg, op, OperationPayload::Repeat { id, addr: 0 });
    let body_start = ops_curr_offset(reg);
    reg.ops.extend_from_slice(body);
    let inc = add_op(reg, inc_op, OperationPayload::RepeatInc { id, addr: 0 });
    patch_addr(reg, inc, body_start)?;
    let exit = ops_curr_offset(reg);
    patch_addr(reg, head, exit)
}

fn compile_quantifier_node(qn: &QuantNode, reg: &mut RegexType) -> Result<(), i32> {
    let (lower, upper) = (qn.lower, qn.upper);
    if upper == 0 {
        return Ok(());
    }
    let body = compile_to_vec(&qn.body, reg)?;
    let may_be_empty = tree_min_len(&qn.body) == 0;
    let infinite = is_infinite_repeat(upper);

    if lower == 1 && upper == 1 {
        reg.ops.extend(body);
        return Ok(());
    }
    if lower == 0 && upper == 1 {
        return compile_optional(&body, qn.greedy, reg);
    }
    if lower == 0 && infinite {
        return compile_star(&body, qn.greedy, may_be_empty, reg);
    }
    if lower == 1 && infinite && body.len() <= QUANTIFIER_EXPAND_LIMIT_SIZE {
        reg.ops.extend_from_slice(&body);
        return compile_star(&body, qn.greedy, may_be_empty, reg);
    }
    if lower == upper && (lower as usize).saturating_mul(body.len()) <= QUANTIFIER_EXPAND_LIMIT_SIZE {
        for _ in 0..lower {
            reg.ops.extend_from_slice(&body);
        }
        return Ok(());
    }
    compile_range_repeat(&body, qn, reg)
}

// ============================================================================
// Bags (groups)
// ============================================================================

fn new_mark_id(reg: &mut RegexType) -> MemNumType {
    let id = reg.num_mark;
    reg.num_mark += 1;
    id
}

fn compile_bag_node(bn: &BagNode, reg: &mut RegexType) -> Result<(), i32> {
    match bn.bag_type {
        BagType::Memory { regnum } => {
            add_op(reg, OpCode::MemStart, OperationPayload::Memory { num: regnum });
            compile_tree(&bn.body, reg)?;
            add_op(reg, OpCode::MemEnd, OperationPayload::Memory { num: regnum });
        }
        BagType::StopBacktrack => {
            let id = new_mark_id(reg);
            add_op(reg, OpCode::Mark, OperationPayload::Mark { id, save_pos: false });
            compile_tree(&bn.body, reg)?;
            add_op(
                reg,
                OpCode::CutToMark,
                OperationPayload::CutToMark {
                    id,
                    restore_pos: false,
                },
            );
        }
    }
    Ok(())
}

// ============================================================================
// Anchors and look-around
// ============================================================================

/// Character length of a look-behind body, `None` if it is not fixed.
fn get_char_len(node: &Node, enc: OnigEncoding) -> Option<i32> {
    match node {
        Node::String(sn) => Some(onigenc_strlen(enc, &sn.s) as i32),
        Node::CClass(_) | Node::CType(_) => Some(1),
        Node::BackRef(_) => None,
        Node::Anchor(_) => Some(0),
        Node::Quant(qn) => {
            if qn.lower != qn.upper {
                return None;
            }
            if qn.upper == 0 {
                return Some(0);
            }
            get_char_len(&qn.body, enc)?.checked_mul(qn.lower)
        }
        Node::Bag(bn) => get_char_len(&bn.body, enc),
        Node::List(items) => items
            .iter()
            .try_fold(0i32, |acc, n| acc.checked_add(get_char_len(n, enc)?)),
        Node::Alt(items) => {
            let first = get_char_len(items.first()?, enc)?;
            items[1..]
                .iter()
                .all(|n| get_char_len(n, enc) == Some(first))
                .then_some(first)
        }
    }
}

fn compile_look_ahead(body: &Node, negative: bool, reg: &mut RegexType) -> Result<(), i32> {
    let id = new_mark_id(reg);
    if !negative {
        add_op(reg, OpCode::Mark, OperationPayload::Mark { id, save_pos: true });
        compile_tree(body, reg)?;
        add_op(
            reg,
            OpCode::CutToMark,
            OperationPayload::CutToMark {
                id,
                restore_pos: true,
            },
        );
        return Ok(());
    }
    add_op(reg, OpCode::Mark, OperationPayload::Mark { id, save_pos: false });
    let push = add_push(reg);
    compile_tree(body, reg)?;
    add_op(reg, OpCode::PopToMark, OperationPayload::PopToMark { id });
    add_op(reg, OpCode::Fail, OperationPayload::None);
    let ok = ops_curr_offset(reg);
    patch_addr(reg, push, ok)
}

fn compile_look_behind(body: &Node, char_len: i32, negative: bool, reg: &mut RegexType) -> Result<(), i32> {
    let id = new_mark_id(reg);
    if !negative {
        add_op(reg, OpCode::Mark, OperationPayload::Mark { id, save_pos: true });
        add_op(reg, OpCode::StepBack, OperationPayload::StepBack { n: char_len });
        compile_tree(body, reg)?;
        add_op(
            reg,
            OpCode::CutToMark,
            OperationPayload::CutToMark {
                id,
                restore_pos: true,
            },
        );
        return Ok(());
    }
    add_op(reg, OpCode::Mark, OperationPayload::Mark { id, save_pos: false });
    let push = add_push(reg);
    add_op(reg, OpCode::StepBack, OperationPayload::StepBack { n: char_len });
    compile_tree(body, reg)?;
    add_op(reg, OpCode::PopToMark, OperationPayload::PopToMark { id });
    add_op(reg, OpCode::Fail, OperationPayload::None);
    let ok = ops_curr_offset(reg);
    patch_addr(reg, push, ok)
}

/// A look-behind whose top-level alternatives differ in length becomes one
/// look-behind per alternative: an alternation of them when positive, a
/// sequence when negative.
fn divide_look_behind_alternatives(an: &AnchorNode, body: &Node) -> Option<Node> {
    let Node::Alt(alts) = body else {
        return None;
    };
    let parts: Vec<Node> = alts
        .iter()
        .map(|alt| {
            Node::Anchor(AnchorNode {
                anchor_type: an.anchor_type,
                multiline: an.multiline,
                body: Some(Box::new(alt.clone())),
                char_len: 0,
            })
        })
        .collect();
    Some(if an.anchor_type == ANCR_LOOK_BEHIND {
        Node::Alt(parts)
    } else {
        Node::List(parts)
    })
}

fn compile_anchor_node(an: &AnchorNode, reg: &mut RegexType) -> Result<(), i32> {
    let line = OperationPayload::Line {
        multiline: an.multiline,
    };
    let (opcode, payload) = match an.anchor_type {
        ANCR_BEGIN_BUF => (OpCode::BeginBuf, OperationPayload::None),
        ANCR_END_BUF => (OpCode::EndBuf, OperationPayload::None),
        ANCR_SEMI_END_BUF => (OpCode::SemiEndBuf, OperationPayload::None),
        ANCR_BEGIN_LINE => (OpCode::BeginLine, line),
        ANCR_END_LINE => (OpCode::EndLine, line),
        ANCR_BEGIN_POSITION => (OpCode::BeginPosition, OperationPayload::None),
        ANCR_WORD_BOUNDARY => (OpCode::WordBoundary, OperationPayload::None),
        ANCR_NO_WORD_BOUNDARY => (OpCode::NoWordBoundary, OperationPayload::None),
        ANCR_PREC_READ | ANCR_PREC_READ_NOT => {
            let body = an.body.as_deref().ok_or(ONIGERR_PARSER_BUG)?;
            return compile_look_ahead(body, an.anchor_type == ANCR_PREC_READ_NOT, reg);
        }
        ANCR_LOOK_BEHIND | ANCR_LOOK_BEHIND_NOT => {
            let body = an.body.as_deref().ok_or(ONIGERR_PARSER_BUG)?;
            let negative = an.anchor_type == ANCR_LOOK_BEHIND_NOT;
            if let Some(n) = get_char_len(body, reg.enc) {
                return compile_look_behind(body, n, negative, reg);
            }
            if reg
                .syntax
                .has_behavior(SyntaxBehavior::DIFFERENT_LEN_ALT_LOOK_BEHIND)
            {
                if let Some(divided) = divide_look_behind_alternatives(an, body) {
                    return compile_tree(&divided, reg);
                }
            }
            return Err(ONIGERR_INVALID_LOOK_BEHIND_PATTERN);
        }
        _ => return Err(ONIGERR_TYPE_BUG),
    };
    add_op(reg, opcode, payload);
    Ok(())
}

// ============================================================================
// Tree compilation
// ============================================================================

fn compile_alt(alts: &[Node], reg: &mut RegexType) -> Result<(), i32> {
    let mut exits = Vec::with_capacity(alts.len());
    let (last, init) = alts.split_last().ok_or(ONIGERR_PARSER_BUG)?;
    for alt in init {
        let push = add_push(reg);
        compile_tree(alt, reg)?;
        exits.push(add_jump(reg));
        let next = ops_curr_offset(reg);
        patch_addr(reg, push, next)?;
    }
    compile_tree(last, reg)?;
    let end = ops_curr_offset(reg);
    for jump in exits {
        patch_addr(reg, jump, end)?;
    }
    Ok(())
}

pub fn compile_tree(node: &Node, reg: &mut RegexType) -> Result<(), i32> {
    match node {
        Node::String(sn) => {
            compile_string_node(sn, reg);
            Ok(())
        }
        Node::CClass(cc) => {
            add_op(reg, OpCode::CClass, OperationPayload::CClass { cc: cc.clone() });
            Ok(())
        }
        Node::CType(cn) => compile_ctype_node(cn, reg),
        Node::BackRef(br) => {
            compile_backref_node(br, reg);
            Ok(())
        }
        Node::Quant(qn) => compile_quantifier_node(qn, reg),
        Node::Bag(bn) => compile_bag_node(bn, reg),
        Node::Anchor(an) => compile_anchor_node(an, reg),
        Node::List(items) => {
            for item in items {
                compile_tree(item, reg)?;
            }
            Ok(())
        }
        Node::Alt(alts) => compile_alt(alts, reg),
    }
}

// ============================================================================
// Search hints
// ============================================================================

/// Leading anchor and literal prefix, from the first element of the
/// top-level sequence.
fn set_optimize_info(root: &Node, reg: &mut RegexType) {
    let first = match root {
        Node::List(items) => items.first(),
        other => Some(other),
    };
    match first {
        Some(Node::Anchor(an)) => match an.anchor_type {
            ANCR_BEGIN_BUF => reg.anchor |= ANCR_BEGIN_BUF,
            ANCR_BEGIN_LINE if !an.multiline => reg.anchor |= ANCR_BEGIN_BUF,
            ANCR_BEGIN_POSITION => reg.anchor |= ANCR_BEGIN_POSITION,
            _ => {}
        },
        Some(Node::String(sn)) if !sn.ignore_case && !sn.s.is_empty() => {
            reg.exact = sn.s.clone();
        }
        _ => {}
    }
}

// ============================================================================
// Entry point
// ============================================================================

fn parse_error(code: i32, env: &ParseEnv) -> RegexError {
    if onig_is_pattern_error(code) {
        RegexError::syntax(code, env.error_param.as_deref(), Some(env.error_pos))
    } else {
        RegexError::from(code)
    }
}

/// Compile `pattern` into a program.
pub fn onig_new(
    pattern: &[u8],
    option: OnigOptionType,
    enc: OnigEncoding,
    syntax: &'static OnigSyntaxType,
) -> Result<RegexType, RegexError> {
    onig_ensure_initialized(enc)?;

    // NOTBOL and NOTEOL only mean something per search
    let options = option.difference(ONIG_OPTION_SEARCH_TIME_MASK) | syntax.options;
    let mut env = ParseEnv::new(pattern, options, enc, syntax);
    let root = onig_parse_tree(&mut env).map_err(|code| parse_error(code, &env))?;

    let mut reg = RegexType {
        ops: Vec::new(),
        num_mem: env.num_mem,
        num_repeat: 0,
        num_empty_check: 0,
        num_mark: 0,
        repeat_range: Vec::new(),
        pattern: pattern.to_vec(),
        enc,
        options,
        syntax,
        name_table: std::mem::take(&mut env.name_table),
        anchor: 0,
        exact: Vec::new(),
    };

    compile_tree(&root, &mut reg).map_err(|code| {
        if onig_is_pattern_error(code) {
            RegexError::syntax(code, None, None)
        } else {
            RegexError::from(code)
        }
    })?;
    add_op(&mut reg, OpCode::End, OperationPayload::None);
    set_optimize_info(&root, &mut reg);

    log::debug!(
        "compiled {:?} ({}): {} groups, {} ops, {} names",
        String::from_utf8_lossy(pattern),
        syntax.name,
        reg.num_mem,
        reg.ops.len(),
        reg.name_table.len()
    );
    Ok(reg)
}

// ============================================================================
// Tests
// ============================================================================
