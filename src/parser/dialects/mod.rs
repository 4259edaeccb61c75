//! Per-version parser dialects.
//!
//! A dialect is a [`SymbolTable`] populated by a chain of registration
//! passes: XPath 2.0 is XPath 1.0 plus its own registrations, and so on.
//! Tables are built once per process and shared.
//!
//! This module also holds the grammar helpers shared between dialects:
//! node tests, kind tests, sequence types, and function call tails.

use std::sync::OnceLock;

use crate::engine::runtime::{Error, ErrorCode, FunctionSignatures};
use crate::parser::ast::{Label, NamePayload, NodeTest, Token, TokenValue};
use crate::parser::kernel::{Cursor, SymbolTable, bp};
use crate::parser::lexer::LexValue;
use crate::parser::span::Span;
use crate::xdm::types::{
    AtomicType, ItemType, KindTest, NameOrWildcard, Occurrence, SequenceType,
};

mod xpath1;
mod xpath2;
mod xpath3;
mod xpath31;

/// XPath language version. Order is the registration chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DialectVersion {
    V1_0,
    V2_0,
    V3_0,
    V3_1,
}

impl DialectVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            DialectVersion::V1_0 => "1.0",
            DialectVersion::V2_0 => "2.0",
            DialectVersion::V3_0 => "3.0",
            DialectVersion::V3_1 => "3.1",
        }
    }
}

pub struct Dialect {
    pub version: DialectVersion,
    pub table: SymbolTable,
    /// Built-in function arity table for static `XPST0017` checking.
    pub signatures: FunctionSignatures,
    reserved_functions: &'static [&'static str],
}

impl Dialect {
    pub fn is_reserved_function_name(&self, local: &str) -> bool {
        self.reserved_functions.contains(&local)
    }
}

/// Names that can never be called as functions (they are grammar).
const RESERVED_1_0: &[&str] = &["comment", "node", "processing-instruction", "text"];
const RESERVED_2_0: &[&str] = &[
    "attribute",
    "comment",
    "document-node",
    "element",
    "empty-sequence",
    "if",
    "item",
    "node",
    "processing-instruction",
    "schema-attribute",
    "schema-element",
    "text",
    "typeswitch",
];
const RESERVED_3_0: &[&str] = &[
    "attribute",
    "comment",
    "document-node",
    "element",
    "empty-sequence",
    "function",
    "if",
    "item",
    "namespace-node",
    "node",
    "processing-instruction",
    "schema-attribute",
    "schema-element",
    "switch",
    "text",
    "typeswitch",
];
const RESERVED_3_1: &[&str] = &[
    "array",
    "attribute",
    "comment",
    "document-node",
    "element",
    "empty-sequence",
    "function",
    "if",
    "item",
    "map",
    "namespace-node",
    "node",
    "processing-instruction",
    "schema-attribute",
    "schema-element",
    "switch",
    "text",
    "typeswitch",
];

fn build(version: DialectVersion) -> Dialect {
    let mut table = SymbolTable::default();
    xpath1::register(&mut table);
    if version >= DialectVersion::V2_0 {
        xpath2::register(&mut table);
    }
    if version >= DialectVersion::V3_0 {
        xpath3::register(&mut table);
    }
    if version >= DialectVersion::V3_1 {
        xpath31::register(&mut table);
    }
    let signatures = crate::engine::functions::signatures_for(version);
    let reserved_functions = match version {
        DialectVersion::V1_0 => RESERVED_1_0,
        DialectVersion::V2_0 => RESERVED_2_0,
        DialectVersion::V3_0 => RESERVED_3_0,
        DialectVersion::V3_1 => RESERVED_3_1,
    };
    Dialect {
        version,
        table,
        signatures,
        reserved_functions,
    }
}

pub fn dialect(version: DialectVersion) -> &'static Dialect {
    static TABLES: [OnceLock<Dialect>; 4] = [
        OnceLock::new(),
        OnceLock::new(),
        OnceLock::new(),
        OnceLock::new(),
    ];
    let idx = match version {
        DialectVersion::V1_0 => 0,
        DialectVersion::V2_0 => 1,
        DialectVersion::V3_0 => 2,
        DialectVersion::V3_1 => 3,
    };
    TABLES[idx].get_or_init(|| build(version))
}

// ===== Shared grammar helpers =====

/// Kind-test keywords that may appear wherever a node test is expected.
pub(crate) fn is_kind_test_keyword(local: &str, version: DialectVersion) -> bool {
    match local {
        "node" | "text" | "comment" | "processing-instruction" => true,
        "document-node" | "element" | "attribute" | "schema-element" | "schema-attribute" => {
            version >= DialectVersion::V2_0
        }
        "namespace-node" => version >= DialectVersion::V3_0,
        _ => false,
    }
}

/// Parse the inside of a kind test, `keyword` already consumed, cursor on
/// `(`.
pub(crate) fn parse_kind_test(cur: &mut Cursor<'_>, keyword: &str) -> Result<KindTest, Error> {
    cur.expect("(")?;
    let kt = match keyword {
        "node" => KindTest::AnyKind,
        "text" => KindTest::Text,
        "comment" => KindTest::Comment,
        "namespace-node" => KindTest::NamespaceNode,
        "processing-instruction" => {
            if cur.next_is(")") {
                KindTest::Pi(None)
            } else {
                match cur.lex(0).clone() {
                    LexValue::String(s) => {
                        cur.advance();
                        KindTest::Pi(Some(s.trim().to_string()))
                    }
                    LexValue::Name { prefix: None, local } => {
                        cur.advance();
                        KindTest::Pi(Some(local))
                    }
                    _ => {
                        return Err(cur.syntax_error(
                            "expected a PI target name or string literal",
                        ));
                    }
                }
            }
        }
        "document-node" => {
            if cur.next_is(")") {
                KindTest::Document(None)
            } else {
                let (inner_kw, _) = cur.expect_name()?;
                if !matches!(inner_kw.local.as_str(), "element" | "schema-element") {
                    return Err(cur.syntax_error(
                        "document-node() accepts only element() or schema-element()",
                    ));
                }
                let inner = parse_kind_test(cur, &inner_kw.local)?;
                KindTest::Document(Some(Box::new(inner)))
            }
        }
        "element" | "attribute" => {
            let is_element = keyword == "element";
            let mut name = None;
            let mut ty = None;
            let mut nillable = false;
            if !cur.next_is(")") {
                name = Some(parse_name_or_wildcard(cur, is_element)?);
                if cur.next_is(",") {
                    cur.advance();
                    let (tn, tspan) = cur.expect_name()?;
                    let resolved = cur.resolve_element_name(&tn, tspan)?;
                    ty = Some(resolved.expanded());
                    if is_element && cur.next_is("?") {
                        cur.advance();
                        nillable = true;
                    }
                }
            }
            if is_element {
                KindTest::Element { name, ty, nillable }
            } else {
                KindTest::Attribute { name, ty }
            }
        }
        "schema-element" | "schema-attribute" => {
            let (n, nspan) = cur.expect_name()?;
            let resolved = cur.resolve_element_name(&n, nspan)?;
            if keyword == "schema-element" {
                KindTest::SchemaElement(resolved.expanded())
            } else {
                KindTest::SchemaAttribute(resolved.expanded())
            }
        }
        _ => return Err(cur.syntax_error(format!("unknown kind test {keyword:?}"))),
    };
    cur.expect(")")?;
    Ok(kt)
}

fn parse_name_or_wildcard(
    cur: &mut Cursor<'_>,
    element: bool,
) -> Result<NameOrWildcard, Error> {
    let span = cur.span(0);
    match cur.lex(0).clone() {
        LexValue::Symbol("*") => {
            cur.advance();
            Ok(NameOrWildcard::Any)
        }
        LexValue::Name { .. } | LexValue::BracedName { .. } => {
            let (payload, span2) = cur.expect_name()?;
            let resolved = if element {
                cur.resolve_element_name(&payload, span2)?
            } else {
                // Attribute names have no default namespace.
                let mut p = payload.clone();
                if let Some(prefix) = &p.prefix {
                    p.ns_uri = Some(cur.resolve_prefix(prefix, span2)?);
                }
                p
            };
            Ok(NameOrWildcard::Name(resolved.expanded()))
        }
        _ => Err(cur
            .syntax_error(format!("expected a name or *, found {}", cur.describe(0)))
            .with_span(span)),
    }
}

/// Parse a node test at the cursor: wildcard, QName, or kind test.
pub(crate) fn parse_node_test(cur: &mut Cursor<'_>, attribute_axis: bool) -> Result<NodeTest, Error> {
    match cur.lex(0).clone() {
        LexValue::Symbol("*") => {
            cur.advance();
            Ok(NodeTest::Name(NameOrWildcard::Any))
        }
        LexValue::NsWildcard(prefix) => {
            let span = cur.span(0);
            cur.advance();
            let uri = cur.resolve_prefix(&prefix, span)?;
            Ok(NodeTest::Name(NameOrWildcard::NsAny(uri)))
        }
        LexValue::LocalWildcard(local) => {
            cur.advance();
            Ok(NodeTest::Name(NameOrWildcard::LocalAny(local)))
        }
        LexValue::Name { prefix: None, ref local }
            if is_kind_test_keyword(local, cur.version)
                && matches!(cur.lex(1), LexValue::Symbol("(")) =>
        {
            let kw = local.clone();
            cur.advance();
            Ok(NodeTest::Kind(parse_kind_test(cur, &kw)?))
        }
        LexValue::Name { .. } | LexValue::BracedName { .. } => {
            let (payload, span) = cur.expect_name()?;
            let resolved = if attribute_axis {
                let mut p = payload.clone();
                if let Some(prefix) = &p.prefix {
                    p.ns_uri = Some(cur.resolve_prefix(prefix, span)?);
                }
                p
            } else {
                cur.resolve_element_name(&payload, span)?
            };
            Ok(NodeTest::Name(NameOrWildcard::Name(resolved.expanded())))
        }
        _ => Err(cur.syntax_error(format!("expected a node test, found {}", cur.describe(0)))),
    }
}

/// Shared nud for the thirteen axis keywords.
pub(crate) fn axis_nud(cur: &mut Cursor<'_>, mut seed: Token) -> Result<Token, Error> {
    cur.expect("::")?;
    let attribute_like = matches!(seed.symbol, "attribute" | "namespace");
    let nt = parse_node_test(cur, attribute_like)?;
    seed.value = Some(TokenValue::NodeTest(nt));
    seed.span = seed.span.cover(cur.span(0));
    Ok(seed)
}

/// Shared nud for kind-test keywords in step position.
pub(crate) fn kind_test_nud(cur: &mut Cursor<'_>, mut seed: Token) -> Result<Token, Error> {
    let kt = parse_kind_test(cur, seed.symbol)?;
    seed.value = Some(TokenValue::NodeTest(NodeTest::Kind(kt)));
    Ok(seed)
}

// ===== Sequence types =====

pub(crate) fn parse_occurrence(cur: &mut Cursor<'_>) -> Occurrence {
    match cur.lex(0) {
        LexValue::Symbol("?") => {
            cur.advance();
            Occurrence::ZeroOrOne
        }
        LexValue::Symbol("*") => {
            cur.advance();
            Occurrence::ZeroOrMore
        }
        LexValue::Symbol("+") => {
            cur.advance();
            Occurrence::OneOrMore
        }
        _ => Occurrence::One,
    }
}

pub(crate) fn parse_atomic_type_name(cur: &mut Cursor<'_>) -> Result<AtomicType, Error> {
    let (payload, span) = cur.expect_name()?;
    let resolved = cur.resolve_element_name(&payload, span)?;
    let in_xs = resolved.ns_uri.as_deref() == Some(crate::consts::XS_NS)
        || resolved.ns_uri.is_none();
    in_xs
        .then(|| AtomicType::by_local_name(&resolved.local))
        .flatten()
        .ok_or_else(|| {
            Error::from_code(
                ErrorCode::XPST0051,
                format!("unknown atomic type {}", resolved.local),
            )
            .with_span(span)
        })
}

pub(crate) fn parse_item_type(cur: &mut Cursor<'_>) -> Result<ItemType, Error> {
    if let LexValue::Name { prefix: None, local } = cur.lex(0).clone() {
        let next_is_paren = matches!(cur.lex(1), LexValue::Symbol("("));
        match local.as_str() {
            "item" if next_is_paren => {
                cur.advance();
                cur.expect("(")?;
                cur.expect(")")?;
                return Ok(ItemType::AnyItem);
            }
            "function" if next_is_paren && cur.version >= DialectVersion::V3_0 => {
                cur.advance();
                cur.expect("(")?;
                if cur.next_is("*") {
                    cur.advance();
                    cur.expect(")")?;
                    return Ok(ItemType::AnyFunction);
                }
                let mut args = Vec::new();
                if !cur.next_is(")") {
                    loop {
                        args.push(parse_sequence_type(cur)?);
                        if cur.next_is(",") {
                            cur.advance();
                        } else {
                            break;
                        }
                    }
                }
                cur.expect(")")?;
                cur.expect("as")?;
                let ret = parse_sequence_type(cur)?;
                return Ok(ItemType::Function {
                    args,
                    ret: Box::new(ret),
                });
            }
            "map" if next_is_paren && cur.version >= DialectVersion::V3_1 => {
                cur.advance();
                cur.expect("(")?;
                if cur.next_is("*") {
                    cur.advance();
                    cur.expect(")")?;
                    return Ok(ItemType::AnyMap);
                }
                let key = parse_atomic_type_name(cur)?;
                cur.expect(",")?;
                let value = parse_sequence_type(cur)?;
                cur.expect(")")?;
                return Ok(ItemType::Map {
                    key,
                    value: Box::new(value),
                });
            }
            "array" if next_is_paren && cur.version >= DialectVersion::V3_1 => {
                cur.advance();
                cur.expect("(")?;
                if cur.next_is("*") {
                    cur.advance();
                    cur.expect(")")?;
                    return Ok(ItemType::AnyArray);
                }
                let member = parse_sequence_type(cur)?;
                cur.expect(")")?;
                return Ok(ItemType::Array(Box::new(member)));
            }
            _ if is_kind_test_keyword(&local, cur.version) && next_is_paren => {
                cur.advance();
                return Ok(ItemType::Kind(parse_kind_test(cur, &local)?));
            }
            _ => {}
        }
    }
    Ok(ItemType::Atomic(parse_atomic_type_name(cur)?))
}

pub(crate) fn parse_sequence_type(cur: &mut Cursor<'_>) -> Result<SequenceType, Error> {
    if let LexValue::Name { prefix: None, local } = cur.lex(0)
        && local == "empty-sequence"
        && matches!(cur.lex(1), LexValue::Symbol("("))
    {
        cur.advance();
        cur.expect("(")?;
        cur.expect(")")?;
        return Ok(SequenceType::Empty);
    }
    let item = parse_item_type(cur)?;
    let occ = parse_occurrence(cur);
    Ok(SequenceType::Typed { item, occ })
}

/// SingleType for `cast as` / `castable as`: an atomic type, optionally `?`.
pub(crate) fn parse_single_type(cur: &mut Cursor<'_>) -> Result<(AtomicType, bool), Error> {
    let span = cur.span(0);
    let ty = parse_atomic_type_name(cur)?;
    if matches!(ty, AtomicType::AnyAtomic | AtomicType::Notation) {
        return Err(Error::from_code(
            ErrorCode::XPST0080,
            format!("cannot cast to xs:{}", ty.local_name()),
        )
        .with_span(span));
    }
    let optional = if cur.next_is("?") {
        cur.advance();
        true
    } else {
        false
    };
    Ok((ty, optional))
}

// ===== Function calls =====

/// Parse `(arg, …)` after a function name. Placeholder `?` arguments are
/// allowed in 3.1 and produce `(placeholder)` tokens.
pub(crate) fn parse_arguments(cur: &mut Cursor<'_>) -> Result<Vec<Token>, Error> {
    cur.expect("(")?;
    parse_argument_list_after_open(cur)
}

/// Argument-list tail for dynamic calls, where `(` was consumed as the led
/// trigger.
pub(crate) fn parse_argument_list_after_open(cur: &mut Cursor<'_>) -> Result<Vec<Token>, Error> {
    let mut args = Vec::new();
    if !cur.next_is(")") {
        loop {
            if cur.version >= DialectVersion::V3_1
                && matches!(cur.lex(0), LexValue::Symbol("?"))
                && matches!(cur.lex(1), LexValue::Symbol(",") | LexValue::Symbol(")"))
            {
                let span = cur.span(0);
                cur.advance();
                args.push(Token::new("(placeholder)", Label::Operator, span));
            } else {
                args.push(cur.expression(bp::COMMA)?);
            }
            if cur.next_is(",") {
                cur.advance();
            } else {
                break;
            }
        }
    }
    cur.expect(")")?;
    Ok(args)
}

/// Build a static function call token for `payload(args…)`, checking the
/// dialect signature table so unknown names and arities fail at parse time.
pub(crate) fn finish_function_call(
    cur: &mut Cursor<'_>,
    payload: &NamePayload,
    name_span: Span,
) -> Result<Token, Error> {
    if payload.prefix.is_none()
        && payload.ns_uri.is_none()
        && dialect(cur.version).is_reserved_function_name(&payload.local)
    {
        return Err(cur.syntax_error(format!(
            "{:?} is a reserved function name",
            payload.local
        )));
    }
    let name = cur.resolve_function_name(payload, name_span)?;
    let args = parse_arguments(cur)?;
    let known = cur.signatures.knows(&name) || cur.static_ctx.extra_functions.knows(&name);
    if !known {
        return Err(Error::from_code(
            ErrorCode::XPST0017,
            format!("unknown function {}#{}", name, args.len()),
        )
        .with_span(name_span));
    }
    if !cur.signatures.accepts(&name, args.len())
        && !cur.static_ctx.extra_functions.accepts(&name, args.len())
    {
        return Err(Error::from_code(
            ErrorCode::XPST0017,
            format!("wrong arity for {}: {} arguments", name, args.len()),
        )
        .with_span(name_span));
    }
    let resolved = NamePayload {
        prefix: payload.prefix.clone(),
        local: name.local.clone(),
        ns_uri: name.ns_uri.clone(),
    };
    Ok(Token::new("(function)", Label::Function, name_span)
        .with_value(TokenValue::Name(resolved))
        .with_operands(args))
}
