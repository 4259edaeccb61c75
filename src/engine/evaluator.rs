//! The tree-walking evaluator.
//!
//! Interprets the token tree directly: each token's symbol/label pair picks
//! its semantics, mirroring how the parser registered it. Focus changes
//! (predicates, `for`/`let`/quantifier bindings, function bodies) work on
//! cloned context snapshots; the dynamic environment itself is never
//! mutated.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use smallvec::SmallVec;

use crate::engine::axes::{Axis, node_test_matches};
use crate::engine::ops::{self, ArithOp, CompareOp};
use crate::engine::runtime::{
    CallCtx, DynamicContext, Error, ErrorCode, Focus, StaticContext,
};
use crate::model::XdmNode;
use crate::parser::XPathExpr;
use crate::parser::ast::{Label, NodeTest, Token, TokenValue};
use crate::parser::dialects::DialectVersion;
use crate::xdm::types::{AtomicType, ItemType, KindTest, NameOrWildcard, SequenceType};
use crate::xdm::{
    self, ExpandedName, FunctionItem, XdmArray, XdmAtomicValue, XdmItem, XdmMap, XdmSequence,
    function::FunctionKind,
};

type Scopes<'a, N> = SmallVec<[(ExpandedName, Binding<'a, N>); 8]>;

// ===== Evaluation context =====

pub struct EvalContext<'a, N: XdmNode> {
    pub env: &'a DynamicContext<N>,
    pub static_ctx: &'a StaticContext,
    pub version: DialectVersion,
    pub focus: Focus<N>,
    pub now: DateTime<FixedOffset>,
    scopes: Scopes<'a, N>,
}

impl<N: XdmNode> Clone for EvalContext<'_, N> {
    fn clone(&self) -> Self {
        Self {
            env: self.env,
            static_ctx: self.static_ctx,
            version: self.version,
            focus: self.focus.clone(),
            now: self.now,
            scopes: self.scopes.clone(),
        }
    }
}

pub enum Binding<'a, N: XdmNode> {
    Value(XdmSequence<N>),
    /// A `let` binding: evaluated on first reference, memoized per
    /// invocation.
    Lazy(Rc<LazyBinding<'a, N>>),
}

impl<N: XdmNode> Clone for Binding<'_, N> {
    fn clone(&self) -> Self {
        match self {
            Binding::Value(v) => Binding::Value(v.clone()),
            Binding::Lazy(l) => Binding::Lazy(l.clone()),
        }
    }
}

pub struct LazyBinding<'a, N: XdmNode> {
    expr: &'a Token,
    snapshot: EvalContext<'a, N>,
    cell: RefCell<Option<XdmSequence<N>>>,
}

impl<'a, N: XdmNode> EvalContext<'a, N> {
    pub fn implicit_timezone(&self) -> FixedOffset {
        self.env.implicit_timezone.unwrap_or(*self.now.offset())
    }

    fn compat(&self) -> bool {
        self.version == DialectVersion::V1_0
    }

    fn with_focus(&self, item: XdmItem<N>, position: usize, size: usize) -> Self {
        let mut child = self.clone();
        child.focus = Focus {
            item: Some(item),
            position,
            size,
        };
        child
    }

    fn with_binding(&self, name: ExpandedName, binding: Binding<'a, N>) -> Self {
        let mut child = self.clone();
        child.scopes.push((name, binding));
        child
    }

    fn lookup_variable(&self, name: &ExpandedName) -> Result<Option<XdmSequence<N>>, Error> {
        for (n, b) in self.scopes.iter().rev() {
            if n == name {
                return Ok(Some(match b {
                    Binding::Value(v) => v.clone(),
                    Binding::Lazy(l) => {
                        let cached = l.cell.borrow().clone();
                        match cached {
                            Some(v) => v,
                            None => {
                                let v = evaluate(l.expr, &l.snapshot)?;
                                *l.cell.borrow_mut() = Some(v.clone());
                                v
                            }
                        }
                    }
                }));
            }
        }
        Ok(self.env.variables.get(name).cloned())
    }

    fn call_ctx(&self) -> CallCtx<'_, N> {
        CallCtx {
            env: self.env,
            static_ctx: self.static_ctx,
            focus: &self.focus,
            now: self.now,
            version: self.version,
        }
    }

    fn default_collation(&self) -> Result<Arc<dyn crate::engine::collation::Collation>, Error> {
        self.env
            .collations
            .resolve(None, &self.static_ctx.default_collation)
    }
}

// ===== Entry points =====

pub fn evaluate_expr<N: XdmNode>(
    expr: &XPathExpr,
    env: &DynamicContext<N>,
) -> Result<XdmSequence<N>, Error> {
    let ctx = root_context(expr, env);
    evaluate(expr.root(), &ctx)
}

fn root_context<'a, N: XdmNode>(
    expr: &'a XPathExpr,
    env: &'a DynamicContext<N>,
) -> EvalContext<'a, N> {
    // current-dateTime is frozen here and stays stable for the whole
    // evaluation.
    let now = env
        .now
        .unwrap_or_else(|| chrono::Local::now().fixed_offset());
    let focus = match &env.context_item {
        Some(item) => Focus {
            item: Some(item.clone()),
            position: 1,
            size: 1,
        },
        None => Focus::default(),
    };
    EvalContext {
        env,
        static_ctx: expr.static_ctx(),
        version: expr.version(),
        focus,
        now,
        scopes: SmallVec::new(),
    }
}

/// Lazy top-level iteration: ranges and comma sequences stream, everything
/// else materializes on first demand.
pub fn select_expr<'a, N: XdmNode>(
    expr: &'a XPathExpr,
    env: &'a DynamicContext<N>,
) -> ItemStream<'a, N> {
    let ctx = root_context(expr, env);
    select(expr.root(), ctx)
}

pub enum ItemStream<'a, N: XdmNode> {
    Failed(Option<Error>),
    Materialized(std::vec::IntoIter<XdmItem<N>>),
    Range {
        cur: i64,
        end: i64,
    },
    Chain {
        parts: Vec<(&'a Token, EvalContext<'a, N>)>,
        current: Option<Box<ItemStream<'a, N>>>,
    },
}

impl<'a, N: XdmNode> Iterator for ItemStream<'a, N> {
    type Item = Result<XdmItem<N>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ItemStream::Failed(e) => e.take().map(Err),
            ItemStream::Materialized(it) => it.next().map(Ok),
            ItemStream::Range { cur, end } => {
                if *cur > *end {
                    None
                } else {
                    let v = *cur;
                    *cur += 1;
                    Some(Ok(XdmItem::Atomic(XdmAtomicValue::Integer(v))))
                }
            }
            ItemStream::Chain { parts, current } => loop {
                if let Some(stream) = current {
                    if let Some(item) = stream.next() {
                        return Some(item);
                    }
                    *current = None;
                }
                if parts.is_empty() {
                    return None;
                }
                let (tok, ctx) = parts.remove(0);
                *current = Some(Box::new(select(tok, ctx)));
            },
        }
    }
}

fn select<'a, N: XdmNode>(tok: &'a Token, ctx: EvalContext<'a, N>) -> ItemStream<'a, N> {
    match tok.symbol {
        "," => {
            let mut parts = Vec::new();
            collect_comma_operands(tok, &mut parts);
            ItemStream::Chain {
                parts: parts.into_iter().map(|t| (t, ctx.clone())).collect(),
                current: None,
            }
        }
        "to" => match range_bounds(tok, &ctx) {
            Ok(Some((m, n))) => ItemStream::Range { cur: m, end: n },
            Ok(None) => ItemStream::Materialized(Vec::new().into_iter()),
            Err(e) => ItemStream::Failed(Some(e)),
        },
        _ => match evaluate(tok, &ctx) {
            Ok(seq) => ItemStream::Materialized(seq.into_iter()),
            Err(e) => ItemStream::Failed(Some(e)),
        },
    }
}

fn collect_comma_operands<'a>(tok: &'a Token, out: &mut Vec<&'a Token>) {
    if tok.symbol == "," {
        for op in &tok.operands {
            collect_comma_operands(op, out);
        }
    } else {
        out.push(tok);
    }
}

// ===== The interpreter =====

pub fn evaluate<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    if let Some(flag) = &ctx.env.cancel
        && flag.load(std::sync::atomic::Ordering::Relaxed)
    {
        return Err(Error::from_code(ErrorCode::FOER0000, "evaluation cancelled"));
    }
    let result = evaluate_inner(tok, ctx);
    // First error wins the span of the token that raised it.
    result.map_err(|e| e.with_span(tok.span))
}

fn evaluate_inner<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    match (tok.label, tok.symbol) {
        (Label::Literal, sym) => eval_literal(tok, sym, ctx),
        (Label::Variable, "$") => {
            let name = tok
                .name_value()
                .map(|n| n.expanded())
                .expect("variable token carries its name");
            ctx.lookup_variable(&name)?.ok_or_else(|| {
                Error::from_code(
                    ErrorCode::XPST0008,
                    format!("variable ${} is not bound", name.local),
                )
            })
        }
        (Label::Name | Label::Wildcard | Label::KindTest | Label::Axis, _) => eval_step(tok, ctx),
        (Label::Function, "(function)") => eval_static_call(tok, ctx),
        (Label::Function, "#") => eval_function_ref(tok, ctx),
        (Label::Function, "function") => eval_inline_function(tok, ctx),
        (Label::Operator, sym) => eval_operator(tok, sym, ctx),
        _ => Err(Error::from_code(
            ErrorCode::XPST0003,
            format!("unevaluable token {:?}", tok.symbol),
        )),
    }
}

fn eval_literal<N: XdmNode>(
    tok: &Token,
    sym: &str,
    ctx: &EvalContext<'_, N>,
) -> Result<XdmSequence<N>, Error> {
    let value = match (&tok.value, sym) {
        (Some(TokenValue::Integer(i)), _) => {
            if ctx.compat() {
                // XPath 1.0 has a single number type.
                XdmAtomicValue::Double(*i as f64)
            } else {
                XdmAtomicValue::Integer(*i)
            }
        }
        (Some(TokenValue::Decimal(d)), _) => {
            if ctx.compat() {
                XdmAtomicValue::Double(
                    rust_decimal::prelude::ToPrimitive::to_f64(d).unwrap_or(f64::NAN),
                )
            } else {
                XdmAtomicValue::Decimal(*d)
            }
        }
        (Some(TokenValue::Double(d)), _) => XdmAtomicValue::Double(*d),
        (Some(TokenValue::String(s)), _) => XdmAtomicValue::String(s.clone()),
        _ => {
            return Err(Error::from_code(
                ErrorCode::XPST0003,
                "malformed literal token",
            ));
        }
    };
    Ok(vec![XdmItem::Atomic(value)])
}

// ===== Steps and paths =====

fn step_parts(tok: &Token) -> Result<(Axis, NodeTest), Error> {
    match tok.label {
        Label::Axis => {
            let axis = Axis::from_symbol(tok.symbol)
                .ok_or_else(|| Error::from_code(ErrorCode::XPST0003, "unknown axis"))?;
            let nt = match &tok.value {
                Some(TokenValue::NodeTest(nt)) => nt.clone(),
                _ => NodeTest::Kind(KindTest::AnyKind),
            };
            Ok((axis, nt))
        }
        Label::Name => {
            let name = tok
                .name_value()
                .expect("name test carries its payload")
                .expanded();
            Ok((Axis::Child, NodeTest::Name(NameOrWildcard::Name(name))))
        }
        Label::Wildcard => {
            let nt = match &tok.value {
                Some(TokenValue::NodeTest(nt)) => nt.clone(),
                _ => NodeTest::Name(NameOrWildcard::Any),
            };
            Ok((Axis::Child, nt))
        }
        Label::KindTest => {
            let nt = match &tok.value {
                Some(TokenValue::NodeTest(nt)) => nt.clone(),
                _ => NodeTest::Kind(KindTest::AnyKind),
            };
            // Bare attribute()/schema-attribute() tests step on the
            // attribute axis.
            let axis = match &nt {
                NodeTest::Kind(KindTest::Attribute { .. })
                | NodeTest::Kind(KindTest::SchemaAttribute(_)) => Axis::Attribute,
                _ => Axis::Child,
            };
            Ok((axis, nt))
        }
        _ => Err(Error::from_code(ErrorCode::XPST0003, "not a step token")),
    }
}

fn eval_step<N: XdmNode>(tok: &Token, ctx: &EvalContext<'_, N>) -> Result<XdmSequence<N>, Error> {
    let item = ctx.focus.item_or_absent()?;
    let XdmItem::Node(node) = item else {
        return Err(Error::from_code(
            ErrorCode::XPTY0020,
            "context item of an axis step must be a node",
        ));
    };
    let (axis, nt) = step_parts(tok)?;
    let out = axis
        .nodes(node)
        .into_iter()
        .filter(|n| node_test_matches(axis, &nt, n))
        .map(XdmItem::Node)
        .collect();
    Ok(out)
}

fn eval_path<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let left = evaluate(tok.op(0), ctx)?;
    let size = left.len();
    let mut out: XdmSequence<N> = Vec::new();
    for (idx, item) in left.into_iter().enumerate() {
        if !matches!(item, XdmItem::Node(_)) {
            return Err(Error::from_code(
                ErrorCode::XPTY0019,
                "path step applied to a non-node",
            ));
        }
        let child = ctx.with_focus(item, idx + 1, size);
        out.extend(evaluate(tok.op(1), &child)?);
    }
    // `/` deduplicates and restores document order when the result is a
    // node sequence; a mixed result is a type error, an all-atomic result
    // (3.0 final function steps) keeps order and duplicates.
    let nodes = out.iter().filter(|i| matches!(i, XdmItem::Node(_))).count();
    if nodes == 0 {
        return Ok(out);
    }
    if nodes != out.len() {
        return Err(Error::from_code(
            ErrorCode::XPTY0018,
            "path result mixes nodes and atomic values",
        ));
    }
    let only_nodes: Vec<N> = out
        .into_iter()
        .map(|i| match i {
            XdmItem::Node(n) => n,
            _ => unreachable!("counted above"),
        })
        .collect();
    Ok(ops::document_order_dedup(only_nodes)?
        .into_iter()
        .map(XdmItem::Node)
        .collect())
}

fn eval_root_token<N: XdmNode>(ctx: &EvalContext<'_, N>) -> Result<XdmSequence<N>, Error> {
    let item = ctx.focus.item_or_absent()?;
    let XdmItem::Node(node) = item else {
        return Err(Error::from_code(
            ErrorCode::XPTY0020,
            "`/` requires a node context item",
        ));
    };
    Ok(vec![XdmItem::Node(node.root())])
}

/// `E[P]`: focus-driven filtering with the numeric-predicate rule. A
/// literal integer predicate short-circuits without evaluating P per item.
fn eval_filter<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let base = evaluate(tok.op(0), ctx)?;
    let pred = tok.op(1);
    let size = base.len();
    // Positional fast path: [k] with a literal k.
    if let Some(TokenValue::Integer(k)) = pred.value.as_ref().filter(|_| pred.label == Label::Literal && pred.symbol == "(integer)") {
        let k = *k;
        if k < 1 || k as usize > size {
            return Ok(Vec::new());
        }
        return Ok(vec![base[(k - 1) as usize].clone()]);
    }
    let mut out = Vec::new();
    for (idx, item) in base.into_iter().enumerate() {
        let child = ctx.with_focus(item.clone(), idx + 1, size);
        let r = evaluate(pred, &child)?;
        if predicate_truth(&r, idx + 1)? {
            out.push(item);
        }
    }
    Ok(out)
}

/// Numeric predicate values select by position; anything else goes through
/// the effective boolean value.
fn predicate_truth<N: XdmNode>(result: &XdmSequence<N>, position: usize) -> Result<bool, Error> {
    if let [XdmItem::Atomic(a)] = result.as_slice()
        && a.is_numeric()
    {
        let d = a.double_value().unwrap_or(f64::NAN);
        return Ok(d == position as f64);
    }
    xdm::effective_boolean_value(result)
}

// ===== Operators =====

fn eval_operator<'a, N: XdmNode>(
    tok: &'a Token,
    sym: &str,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    match sym {
        "()" => Ok(Vec::new()),
        "." => Ok(vec![ctx.focus.item_or_absent()?.clone()]),
        "(root)" => eval_root_token(ctx),
        "/" => eval_path(tok, ctx),
        "[" => eval_filter(tok, ctx),
        "," => {
            let mut parts = Vec::new();
            collect_comma_operands(tok, &mut parts);
            let mut out = Vec::new();
            for p in parts {
                out.extend(evaluate(p, ctx)?);
            }
            Ok(out)
        }
        "+" | "-" if tok.operands.len() == 1 => {
            let v = atomized_singleton(tok.op(0), ctx)?;
            let Some(a) = v else { return Ok(Vec::new()) };
            let zero = XdmAtomicValue::Integer(0);
            let r = if sym == "-" {
                ops::arithmetic(ArithOp::Sub, &zero, &a, ctx.compat(), ctx.implicit_timezone())?
            } else {
                // Unary plus validates the operand without changing it.
                ops::arithmetic(ArithOp::Add, &zero, &a, ctx.compat(), ctx.implicit_timezone())?
            };
            Ok(vec![XdmItem::Atomic(r)])
        }
        "+" | "-" | "*" | "div" | "idiv" | "mod" => {
            let op = match sym {
                "+" => ArithOp::Add,
                "-" => ArithOp::Sub,
                "*" => ArithOp::Mul,
                "div" => ArithOp::Div,
                "idiv" => ArithOp::IDiv,
                _ => ArithOp::Mod,
            };
            let (Some(a), Some(b)) = (
                atomized_singleton(tok.op(0), ctx)?,
                atomized_singleton(tok.op(1), ctx)?,
            ) else {
                return Ok(Vec::new());
            };
            Ok(vec![XdmItem::Atomic(ops::arithmetic(
                op,
                &a,
                &b,
                ctx.compat(),
                ctx.implicit_timezone(),
            )?)])
        }
        "=" | "!=" | "<" | "<=" | ">" | ">=" => {
            let op = CompareOp::from_symbol(sym).expect("registered comparison");
            let lhs = xdm::atomize(&evaluate(tok.op(0), ctx)?)?;
            let rhs = xdm::atomize(&evaluate(tok.op(1), ctx)?)?;
            let collation = ctx.default_collation()?;
            let b = ops::general_compare(
                op,
                &lhs,
                &rhs,
                ctx.compat(),
                collation.as_ref(),
                ctx.implicit_timezone(),
            )?;
            Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(b))])
        }
        "eq" | "ne" | "lt" | "le" | "gt" | "ge" => {
            let op = CompareOp::from_symbol(sym).expect("registered comparison");
            let (Some(a), Some(b)) = (
                atomized_singleton(tok.op(0), ctx)?,
                atomized_singleton(tok.op(1), ctx)?,
            ) else {
                return Ok(Vec::new());
            };
            let collation = ctx.default_collation()?;
            let b = ops::value_compare(op, &a, &b, collation.as_ref(), ctx.implicit_timezone())?;
            Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(b))])
        }
        "is" | "<<" | ">>" => eval_node_comparison(tok, sym, ctx),
        "|" | "union" | "intersect" | "except" => eval_set_op(tok, sym, ctx),
        "to" => match range_bounds(tok, ctx)? {
            None => Ok(Vec::new()),
            Some((m, n)) => {
                let mut out = Vec::with_capacity((n - m + 1).max(0) as usize);
                for v in m..=n {
                    out.push(XdmItem::Atomic(XdmAtomicValue::Integer(v)));
                }
                Ok(out)
            }
        },
        "and" | "or" => {
            let l = xdm::effective_boolean_value(&evaluate(tok.op(0), ctx)?)?;
            let short = if sym == "and" { !l } else { l };
            if short {
                return Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(l))]);
            }
            let r = xdm::effective_boolean_value(&evaluate(tok.op(1), ctx)?)?;
            Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(r))])
        }
        "if" => {
            let cond = xdm::effective_boolean_value(&evaluate(tok.op(0), ctx)?)?;
            evaluate(tok.op(if cond { 1 } else { 2 }), ctx)
        }
        "for" => {
            let mut out = Vec::new();
            eval_for_bindings(tok, 0, ctx, &mut out)?;
            Ok(out)
        }
        "let" => eval_let(tok, ctx),
        "some" | "every" => eval_quantifier(tok, sym == "some", ctx),
        "instance" => {
            let seq = evaluate(tok.op(0), ctx)?;
            let ty = token_seq_type(tok)?;
            Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(
                ty.matches_sequence(&seq),
            ))])
        }
        "treat" => {
            let seq = evaluate(tok.op(0), ctx)?;
            let ty = token_seq_type(tok)?;
            if !ty.matches_sequence(&seq) {
                return Err(Error::from_code(
                    ErrorCode::XPDY0050,
                    "treat as: sequence does not match the asserted type",
                ));
            }
            Ok(seq)
        }
        "cast" | "castable" => eval_cast(tok, sym == "castable", ctx),
        "||" => {
            let mut s = String::new();
            for op in &tok.operands {
                if let Some(a) = atomized_singleton(op, ctx)? {
                    s.push_str(&a.string_value());
                }
            }
            Ok(vec![XdmItem::Atomic(XdmAtomicValue::String(s))])
        }
        "!" => {
            let left = evaluate(tok.op(0), ctx)?;
            let size = left.len();
            let mut out = Vec::new();
            for (idx, item) in left.into_iter().enumerate() {
                let child = ctx.with_focus(item, idx + 1, size);
                out.extend(evaluate(tok.op(1), &child)?);
            }
            // Simple map keeps order and duplicates.
            Ok(out)
        }
        "map" => eval_map_constructor(tok, ctx),
        "array" => {
            let members = match tok.operands.first() {
                None => Vec::new(),
                Some(e) => evaluate(e, ctx)?
                    .into_iter()
                    .map(|item| vec![item])
                    .collect(),
            };
            Ok(vec![XdmItem::Array(XdmArray::new(members))])
        }
        "(array)" => {
            let mut members = Vec::with_capacity(tok.operands.len());
            for op in &tok.operands {
                members.push(evaluate(op, ctx)?);
            }
            Ok(vec![XdmItem::Array(XdmArray::new(members))])
        }
        "?" => eval_lookup(tok, ctx),
        "(call)" => eval_dynamic_call(tok, ctx),
        "(placeholder)" => Err(Error::from_code(
            ErrorCode::XPST0003,
            "argument placeholder outside a function call",
        )),
        other => Err(Error::from_code(
            ErrorCode::XPST0003,
            format!("unevaluable operator {other:?}"),
        )),
    }
}

fn token_seq_type(tok: &Token) -> Result<SequenceType, Error> {
    match &tok.value {
        Some(TokenValue::SeqType(t)) => Ok(t.clone()),
        _ => Err(Error::from_code(
            ErrorCode::XPST0003,
            "missing sequence type on type operator",
        )),
    }
}

/// Atomize an operand and insist on at most one atomic value.
fn atomized_singleton<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<Option<XdmAtomicValue>, Error> {
    let seq = xdm::atomize(&evaluate(tok, ctx)?)?;
    match seq.len() {
        0 => Ok(None),
        1 => Ok(Some(seq.into_iter().next().expect("length checked"))),
        n => Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("expected a single atomic value, got {n}"),
        )),
    }
}

fn range_bounds<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<Option<(i64, i64)>, Error> {
    let to_int = |v: Option<XdmAtomicValue>| -> Result<Option<i64>, Error> {
        let Some(a) = v else { return Ok(None) };
        let cast = crate::xdm::cast::cast_atomic(&a, AtomicType::Integer).map_err(|_| {
            Error::from_code(
                ErrorCode::XPTY0004,
                "range operands must be castable to xs:integer",
            )
        })?;
        Ok(cast.integer_value())
    };
    let (Some(m), Some(n)) = (
        to_int(atomized_singleton(tok.op(0), ctx)?)?,
        to_int(atomized_singleton(tok.op(1), ctx)?)?,
    ) else {
        return Ok(None);
    };
    if m > n {
        return Ok(None);
    }
    Ok(Some((m, n)))
}

fn eval_node_comparison<'a, N: XdmNode>(
    tok: &'a Token,
    sym: &str,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let single_node = |seq: XdmSequence<N>| -> Result<Option<N>, Error> {
        match seq.len() {
            0 => Ok(None),
            1 => match seq.into_iter().next().expect("length checked") {
                XdmItem::Node(n) => Ok(Some(n)),
                _ => Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "node comparison requires nodes",
                )),
            },
            _ => Err(Error::from_code(
                ErrorCode::XPTY0004,
                "node comparison requires singleton operands",
            )),
        }
    };
    let (Some(a), Some(b)) = (
        single_node(evaluate(tok.op(0), ctx)?)?,
        single_node(evaluate(tok.op(1), ctx)?)?,
    ) else {
        return Ok(Vec::new());
    };
    let r = match sym {
        "is" => a == b,
        "<<" => a.compare_document_order(&b)? == core::cmp::Ordering::Less,
        _ => a.compare_document_order(&b)? == core::cmp::Ordering::Greater,
    };
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(r))])
}

fn eval_set_op<'a, N: XdmNode>(
    tok: &'a Token,
    sym: &str,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let nodes_of = |seq: XdmSequence<N>| -> Result<Vec<N>, Error> {
        seq.into_iter()
            .map(|i| match i {
                XdmItem::Node(n) => Ok(n),
                _ => Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "set operations require node sequences",
                )),
            })
            .collect()
    };
    let a = nodes_of(evaluate(tok.op(0), ctx)?)?;
    let b = nodes_of(evaluate(tok.op(1), ctx)?)?;
    let r = match sym {
        "|" | "union" => ops::set_union(a, b)?,
        "intersect" => ops::set_intersect(a, b)?,
        _ => ops::set_except(a, b)?,
    };
    Ok(r.into_iter().map(XdmItem::Node).collect())
}

fn eval_for_bindings<'a, N: XdmNode>(
    tok: &'a Token,
    pair: usize,
    ctx: &EvalContext<'a, N>,
    out: &mut XdmSequence<N>,
) -> Result<(), Error> {
    let body_index = tok.operands.len() - 1;
    if pair * 2 >= body_index {
        out.extend(evaluate(tok.op(body_index), ctx)?);
        return Ok(());
    }
    let var = tok.op(pair * 2);
    let name = var
        .name_value()
        .map(|n| n.expanded())
        .expect("binding variable carries its name");
    let seq = evaluate(tok.op(pair * 2 + 1), ctx)?;
    for item in seq {
        let child = ctx.with_binding(name.clone(), Binding::Value(vec![item]));
        eval_for_bindings(tok, pair + 1, &child, out)?;
    }
    Ok(())
}

fn eval_let<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let body_index = tok.operands.len() - 1;
    let mut current = ctx.clone();
    for pair in tok.operands[..body_index].chunks(2) {
        let name = pair[0]
            .name_value()
            .map(|n| n.expanded())
            .expect("binding variable carries its name");
        let lazy = LazyBinding {
            expr: &pair[1],
            snapshot: current.clone(),
            cell: RefCell::new(None),
        };
        current = current.with_binding(name, Binding::Lazy(Rc::new(lazy)));
    }
    evaluate(tok.op(body_index), &current)
}

fn eval_quantifier<'a, N: XdmNode>(
    tok: &'a Token,
    existential: bool,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    fn rec<'a, N: XdmNode>(
        tok: &'a Token,
        pair: usize,
        existential: bool,
        ctx: &EvalContext<'a, N>,
    ) -> Result<bool, Error> {
        let body_index = tok.operands.len() - 1;
        if pair * 2 >= body_index {
            return xdm::effective_boolean_value(&evaluate(tok.op(body_index), ctx)?);
        }
        let name = tok
            .op(pair * 2)
            .name_value()
            .map(|n| n.expanded())
            .expect("binding variable carries its name");
        let seq = evaluate(tok.op(pair * 2 + 1), ctx)?;
        for item in seq {
            let child = ctx.with_binding(name.clone(), Binding::Value(vec![item]));
            let hit = rec(tok, pair + 1, existential, &child)?;
            // some: first true wins; every: first false loses.
            if hit == existential {
                return Ok(existential);
            }
        }
        Ok(!existential)
    }
    let b = rec(tok, 0, existential, ctx)?;
    Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(b))])
}

fn eval_cast<'a, N: XdmNode>(
    tok: &'a Token,
    castable_only: bool,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let Some(TokenValue::SingleType { ty, optional }) = &tok.value else {
        return Err(Error::from_code(
            ErrorCode::XPST0003,
            "missing target type on cast",
        ));
    };
    let value = atomized_singleton(tok.op(0), ctx);
    let value = match value {
        Ok(v) => v,
        Err(e) => {
            if castable_only {
                return Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(false))]);
            }
            return Err(e);
        }
    };
    let Some(a) = value else {
        if castable_only {
            return Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(*optional))]);
        }
        if *optional {
            return Ok(Vec::new());
        }
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            "cast of an empty sequence to a non-optional type",
        ));
    };
    // xs:QName casts of prefixed literals resolve against the static
    // namespaces.
    let result = if *ty == AtomicType::QName {
        cast_to_qname(&a, ctx)
    } else {
        crate::xdm::cast::cast_atomic(&a, *ty)
    };
    if castable_only {
        return Ok(vec![XdmItem::Atomic(XdmAtomicValue::Boolean(
            result.is_ok(),
        ))]);
    }
    result.map(|v| vec![XdmItem::Atomic(v)])
}

fn cast_to_qname<N: XdmNode>(
    a: &XdmAtomicValue,
    ctx: &EvalContext<'_, N>,
) -> Result<XdmAtomicValue, Error> {
    use XdmAtomicValue as V;
    match a {
        V::QName { .. } => Ok(a.clone()),
        V::String(s) | V::UntypedAtomic(s) => {
            let t = s.trim();
            match t.split_once(':') {
                None => crate::xdm::cast::cast_atomic(a, AtomicType::QName),
                Some((prefix, local)) => {
                    let uri = ctx.static_ctx.resolve_prefix(prefix).ok_or_else(|| {
                        Error::from_code(
                            ErrorCode::FONS0004,
                            format!("no namespace bound to prefix {prefix:?}"),
                        )
                    })?;
                    if !crate::xdm::cast::is_ncname(prefix) || !crate::xdm::cast::is_ncname(local)
                    {
                        return Err(Error::from_code(
                            ErrorCode::FORG0001,
                            format!("{t:?} is not a valid xs:QName"),
                        ));
                    }
                    Ok(V::QName {
                        prefix: Some(prefix.to_string()),
                        ns_uri: Some(uri.to_string()),
                        local: local.to_string(),
                    })
                }
            }
        }
        _ => Err(Error::from_code(
            ErrorCode::XPTY0004,
            "only strings cast to xs:QName",
        )),
    }
}

fn eval_map_constructor<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let mut entries = Vec::with_capacity(tok.operands.len() / 2);
    for pair in tok.operands.chunks(2) {
        let key = atomized_singleton(&pair[0], ctx)?.ok_or_else(|| {
            Error::from_code(ErrorCode::XPTY0004, "map key must be a single atomic value")
        })?;
        let value = evaluate(&pair[1], ctx)?;
        entries.push((key, value));
    }
    Ok(vec![XdmItem::Map(XdmMap::from_entries(entries)?)])
}

fn eval_lookup<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let (base, key_tok) = if tok.operands.len() == 2 {
        (evaluate(tok.op(0), ctx)?, tok.op(1))
    } else {
        (vec![ctx.focus.item_or_absent()?.clone()], tok.op(0))
    };
    let mut out = Vec::new();
    for item in base {
        match item {
            XdmItem::Map(m) => {
                if key_tok.symbol == "*" {
                    for (_, v) in m.entries() {
                        out.extend(v.clone());
                    }
                } else {
                    for key in xdm::atomize(&evaluate(key_tok, ctx)?)? {
                        if let Some(v) = m.get(&key) {
                            out.extend(v.clone());
                        }
                    }
                }
            }
            XdmItem::Array(a) => {
                if key_tok.symbol == "*" {
                    for member in a.members() {
                        out.extend(member.clone());
                    }
                } else {
                    for key in xdm::atomize(&evaluate(key_tok, ctx)?)? {
                        let idx = key.integer_value().ok_or_else(|| {
                            Error::from_code(
                                ErrorCode::XPTY0004,
                                "array lookup keys must be integers",
                            )
                        })?;
                        out.extend(a.get(idx)?.clone());
                    }
                }
            }
            _ => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "lookup applies to maps and arrays",
                ));
            }
        }
    }
    Ok(out)
}

// ===== Function calls =====

fn eval_static_call<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let name = tok
        .name_value()
        .map(|n| n.expanded())
        .expect("function call carries its name");
    // Placeholder arguments turn the call into partial application.
    if tok.operands.iter().any(|a| a.symbol == "(placeholder)") {
        let def = resolve_function(ctx, &name, tok.operands.len())?;
        let base = FunctionItem::native(Some(name), tok.operands.len(), def.body.clone());
        let mut bound = Vec::with_capacity(tok.operands.len());
        for arg in &tok.operands {
            if arg.symbol == "(placeholder)" {
                bound.push(None);
            } else {
                bound.push(Some(evaluate(arg, ctx)?));
            }
        }
        return Ok(vec![XdmItem::Function(FunctionItem::partial(base, bound))]);
    }
    let mut args = Vec::with_capacity(tok.operands.len());
    for arg in &tok.operands {
        args.push(evaluate(arg, ctx)?);
    }
    let def = resolve_function(ctx, &name, args.len())?;
    let args = convert_arguments(args, def.params.as_deref())?;
    (def.body)(&ctx.call_ctx(), &args)
}

fn resolve_function<'b, N: XdmNode>(
    ctx: &'b EvalContext<'_, N>,
    name: &ExpandedName,
    argc: usize,
) -> Result<&'b crate::engine::runtime::FunctionDef<N>, Error> {
    ctx.env.functions.resolve(name, argc).ok_or_else(|| {
        Error::from_code(
            ErrorCode::XPST0017,
            format!("unknown function {name}#{argc}"),
        )
    })
}

/// The function conversion rules: atomization where an atomic type is
/// required, untyped casting, numeric and anyURI promotion, cardinality
/// checks.
fn convert_arguments<N: XdmNode>(
    args: Vec<XdmSequence<N>>,
    params: Option<&[SequenceType]>,
) -> Result<Vec<XdmSequence<N>>, Error> {
    let Some(params) = params else { return Ok(args) };
    let mut out = Vec::with_capacity(args.len());
    for (i, arg) in args.into_iter().enumerate() {
        // Variadic tails repeat the last declared parameter.
        let spec = params
            .get(i)
            .or_else(|| params.last())
            .expect("non-empty parameter list");
        out.push(convert_sequence(arg, spec)?);
    }
    Ok(out)
}

pub(crate) fn convert_sequence<N: XdmNode>(
    seq: XdmSequence<N>,
    spec: &SequenceType,
) -> Result<XdmSequence<N>, Error> {
    let SequenceType::Typed { item, occ } = spec else {
        if seq.is_empty() {
            return Ok(seq);
        }
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            "expected empty-sequence()",
        ));
    };
    let converted: XdmSequence<N> = match item {
        ItemType::Atomic(t) => {
            let atoms = xdm::atomize(&seq)?;
            let mut items = Vec::with_capacity(atoms.len());
            for a in atoms {
                items.push(XdmItem::Atomic(convert_atomic(a, *t)?));
            }
            items
        }
        _ => {
            for it in &seq {
                if !item.matches(it) {
                    return Err(Error::from_code(
                        ErrorCode::XPTY0004,
                        "argument does not match the required item type",
                    ));
                }
            }
            seq
        }
    };
    if !occ.accepts(converted.len()) {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!(
                "argument cardinality {} does not satisfy {}{}",
                converted.len(),
                match item {
                    ItemType::Atomic(t) => format!("xs:{}", t.local_name()),
                    _ => "item()".to_string(),
                },
                occ.indicator()
            ),
        ));
    }
    Ok(converted)
}

fn convert_atomic(a: XdmAtomicValue, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    let ty = a.type_of();
    if ty.derives_from(target) || target == AtomicType::AnyAtomic {
        return Ok(a);
    }
    if ty == AtomicType::UntypedAtomic {
        return crate::xdm::cast::cast_atomic(&a, target);
    }
    if ty.promotes_to(target) {
        return crate::xdm::cast::cast_atomic(&a, target);
    }
    Err(Error::from_code(
        ErrorCode::XPTY0004,
        format!(
            "cannot pass xs:{} where xs:{} is required",
            ty.local_name(),
            target.local_name()
        ),
    ))
}

fn eval_function_ref<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let name = tok
        .name_value()
        .map(|n| n.expanded())
        .expect("function reference carries its name");
    let arity = tok
        .op(0)
        .integer_literal()
        .expect("function reference carries its arity") as usize;
    let def = resolve_function(ctx, &name, arity)?;
    Ok(vec![XdmItem::Function(FunctionItem::native(
        Some(name),
        arity,
        def.body.clone(),
    ))])
}

fn eval_inline_function<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let body_index = tok.operands.len() - 1;
    let mut params = Vec::with_capacity(body_index);
    for p in &tok.operands[..body_index] {
        let name = p
            .name_value()
            .map(|n| n.expanded())
            .expect("parameter carries its name");
        let ty = p.operands.first().and_then(|t| match &t.value {
            Some(TokenValue::SeqType(st)) => Some(st.clone()),
            _ => None,
        });
        params.push((name, ty));
    }
    let ret = match &tok.value {
        Some(TokenValue::SeqType(st)) => Some(st.clone()),
        _ => None,
    };
    // Capture the visible scope by value, innermost binding winning; lazy
    // bindings are forced now so the closure is self-contained.
    let mut closure = Vec::with_capacity(ctx.scopes.len());
    for (name, _) in ctx.scopes.iter().rev() {
        if closure.iter().any(|(n, _): &(ExpandedName, _)| n == name) {
            continue;
        }
        if let Some(v) = ctx.lookup_variable(name)? {
            closure.push((name.clone(), v));
        }
    }
    let body = Arc::new(tok.op(body_index).clone());
    Ok(vec![XdmItem::Function(FunctionItem::inline(
        params, ret, body, closure,
    ))])
}

fn eval_dynamic_call<'a, N: XdmNode>(
    tok: &'a Token,
    ctx: &EvalContext<'a, N>,
) -> Result<XdmSequence<N>, Error> {
    let callee = evaluate(tok.op(0), ctx)?;
    let mut args = Vec::with_capacity(tok.operands.len() - 1);
    let mut placeholders = false;
    for arg in &tok.operands[1..] {
        if arg.symbol == "(placeholder)" {
            placeholders = true;
            args.push(None);
        } else {
            args.push(Some(evaluate(arg, ctx)?));
        }
    }
    let [item] = callee.as_slice() else {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            "dynamic call requires a single function item",
        ));
    };
    if placeholders {
        let f = match item {
            XdmItem::Function(f) => f.clone(),
            XdmItem::Map(m) => map_as_function(m),
            XdmItem::Array(a) => array_as_function(a),
            _ => {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "dynamic call target is not a function",
                ));
            }
        };
        return Ok(vec![XdmItem::Function(FunctionItem::partial(f, args))]);
    }
    let args: Vec<XdmSequence<N>> = args.into_iter().map(|a| a.expect("no placeholders")).collect();
    apply_function(&ctx.call_ctx(), item, args)
}

fn map_as_function<N: XdmNode>(m: &XdmMap<N>) -> FunctionItem<N> {
    let map = m.clone();
    FunctionItem::native(
        None,
        1,
        Arc::new(move |_ctx, args: &[XdmSequence<N>]| {
            let keys = xdm::atomize(&args[0])?;
            let [key] = keys.as_slice() else {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    "map application requires a single key",
                ));
            };
            Ok(map.get(key).cloned().unwrap_or_default())
        }),
    )
}

fn array_as_function<N: XdmNode>(a: &XdmArray<N>) -> FunctionItem<N> {
    let array = a.clone();
    FunctionItem::native(
        None,
        1,
        Arc::new(move |_ctx, args: &[XdmSequence<N>]| {
            let keys = xdm::atomize(&args[0])?;
            let idx = match keys.as_slice() {
                [k] => k.integer_value(),
                _ => None,
            }
            .ok_or_else(|| {
                Error::from_code(
                    ErrorCode::XPTY0004,
                    "array application requires a single integer",
                )
            })?;
            array.get(idx).cloned()
        }),
    )
}

/// Apply any callable item: function item, map, or array.
pub fn apply_function<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    item: &XdmItem<N>,
    args: Vec<XdmSequence<N>>,
) -> Result<XdmSequence<N>, Error> {
    match item {
        XdmItem::Function(f) => call_function_item(ctx, f, args),
        XdmItem::Map(m) => call_function_item(ctx, &map_as_function(m), args),
        XdmItem::Array(a) => call_function_item(ctx, &array_as_function(a), args),
        _ => Err(Error::from_code(
            ErrorCode::XPTY0004,
            "dynamic call target is not a function",
        )),
    }
}

/// Invoke a function item. This is the shared path for dynamic calls and
/// the higher-order built-ins.
pub fn call_function_item<N: XdmNode>(
    ctx: &CallCtx<'_, N>,
    f: &FunctionItem<N>,
    args: Vec<XdmSequence<N>>,
) -> Result<XdmSequence<N>, Error> {
    if args.len() != f.arity() {
        return Err(Error::from_code(
            ErrorCode::XPTY0004,
            format!("function expects {} arguments, got {}", f.arity(), args.len()),
        ));
    }
    match f.kind() {
        FunctionKind::Native { body, .. } => body(ctx, &args),
        FunctionKind::Partial { base, bound } => {
            let mut merged = Vec::with_capacity(bound.len());
            let mut supplied = args.into_iter();
            for slot in bound {
                match slot {
                    Some(v) => merged.push(v.clone()),
                    None => merged.push(supplied.next().expect("arity checked")),
                }
            }
            call_function_item(ctx, base, merged)
        }
        FunctionKind::Inline {
            params,
            ret,
            body,
            closure,
        } => {
            let mut inner = EvalContext {
                env: ctx.env,
                static_ctx: ctx.static_ctx,
                version: ctx.version,
                // Function bodies start with an absent focus.
                focus: Focus::default(),
                now: ctx.now,
                scopes: SmallVec::new(),
            };
            for (name, value) in closure.iter().rev() {
                inner
                    .scopes
                    .push((name.clone(), Binding::Value(value.clone())));
            }
            for ((name, ty), value) in params.iter().zip(args) {
                let value = match ty {
                    Some(st) => convert_sequence(value, st)?,
                    None => value,
                };
                inner.scopes.push((name.clone(), Binding::Value(value)));
            }
            let result = evaluate(body, &inner)?;
            match ret {
                Some(st) => convert_sequence(result, st),
                None => Ok(result),
            }
        }
    }
}
