//! XPath 1.0 token registrations: paths, axes, node tests, predicates,
//! arithmetic, general comparisons, boolean operators, and the node-set
//! union.

use crate::engine::runtime::Error;
use crate::parser::ast::{Label, NodeTest, Token, TokenValue};
use crate::parser::dialects::{axis_nud, finish_function_call, kind_test_nud, parse_node_test};
use crate::parser::kernel::{Cursor, KeywordGuard, SymbolTable, binary_led, bp};
use crate::parser::lexer::LexValue;
use crate::xdm::types::{KindTest, NameOrWildcard};

const AXES: &[&str] = &[
    "child",
    "descendant",
    "descendant-or-self",
    "self",
    "parent",
    "ancestor",
    "ancestor-or-self",
    "following-sibling",
    "preceding-sibling",
    "following",
    "preceding",
    "attribute",
    "namespace",
];

pub(super) fn register(table: &mut SymbolTable) {
    table.literal("(integer)");
    table.literal("(decimal)");
    table.literal("(string)");

    table.prefix("(name)", Label::Name, name_nud);
    table.prefix("(wildcard)", Label::Wildcard, |_, seed| Ok(seed));
    table.prefix("$", Label::Variable, var_nud);
    table.prefix("(", Label::Operator, paren_nud);
    table.prefix(".", Label::Operator, |_, seed| Ok(seed));
    table.prefix("..", Label::Operator, parent_step_nud);
    table.prefix("@", Label::Operator, attribute_abbrev_nud);

    for axis in AXES {
        table.guarded(axis, Label::Axis, KeywordGuard::Axis, axis_nud);
    }
    for kt in ["node", "text", "comment", "processing-instruction"] {
        table.guarded(kt, Label::KindTest, KeywordGuard::NextIs("("), kind_test_nud);
    }

    table.infix_prefix("/", bp::PATH, slash_led, slash_nud);
    table.infix_prefix("//", bp::PATH, double_slash_led, double_slash_nud);
    table.infix("[", bp::POSTFIX, predicate_led);

    table.infix("|", bp::UNION, binary_led);

    table.infix_prefix("+", bp::ADDITIVE, binary_led, unary_sign_nud);
    table.infix_prefix("-", bp::ADDITIVE, binary_led, unary_sign_nud);
    table.infix_prefix("*", bp::MULTIPLICATIVE, binary_led, star_wildcard_nud);
    table.infix("div", bp::MULTIPLICATIVE, binary_led);
    table.infix("mod", bp::MULTIPLICATIVE, binary_led);

    for cmp in ["=", "!=", "<", "<=", ">", ">="] {
        table.infix(cmp, bp::COMPARISON, binary_led);
    }
    table.infix("and", bp::AND, binary_led);
    table.infix("or", bp::OR, binary_led);
}

fn name_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let payload = seed
        .name_value()
        .cloned()
        .expect("name seed carries its payload");
    if cur.next_is("(") {
        return finish_function_call(cur, &payload, seed.span);
    }
    let resolved = cur.resolve_element_name(&payload, seed.span)?;
    Ok(seed.with_value(TokenValue::Name(resolved)))
}

fn var_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let (payload, span) = cur.expect_name()?;
    let name = cur.resolve_variable_name(&payload, span)?;
    Ok(seed.with_value(TokenValue::Name(crate::parser::ast::NamePayload {
        prefix: payload.prefix,
        local: name.local,
        ns_uri: name.ns_uri,
    })))
}

pub(super) fn paren_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    if cur.next_is(")") {
        cur.advance();
        let mut empty = seed;
        empty.symbol = "()";
        return Ok(empty);
    }
    let inner = cur.expression(bp::NONE)?;
    cur.expect(")")?;
    // `(E)` is `E`; no wrapper node.
    Ok(inner)
}

fn parent_step_nud(_cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    Ok(Token::new("parent", Label::Axis, seed.span)
        .with_value(TokenValue::NodeTest(NodeTest::Kind(KindTest::AnyKind))))
}

fn attribute_abbrev_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let nt = parse_node_test(cur, true)?;
    Ok(Token::new("attribute", Label::Axis, seed.span).with_value(TokenValue::NodeTest(nt)))
}

fn star_wildcard_nud(_cur: &mut Cursor<'_>, mut seed: Token) -> Result<Token, Error> {
    seed.label = Label::Wildcard;
    seed.value = Some(TokenValue::NodeTest(NodeTest::Name(NameOrWildcard::Any)));
    Ok(seed)
}

fn unary_sign_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let operand = cur.expression(bp::UNARY)?;
    Ok(seed.with_operands(vec![operand]))
}

/// Whether the next lexeme can begin a path step (decides `/` alone vs
/// `/child…`).
fn starts_step(cur: &Cursor<'_>) -> bool {
    match cur.lex(0) {
        LexValue::Name { .. }
        | LexValue::BracedName { .. }
        | LexValue::NsWildcard(_)
        | LexValue::LocalWildcard(_) => true,
        LexValue::Symbol(s) => matches!(*s, "*" | "@" | "." | ".."),
        _ => false,
    }
}

fn root_token(seed: &Token) -> Token {
    Token::new("(root)", Label::Operator, seed.span)
}

fn descendant_or_self_token(seed: &Token) -> Token {
    Token::new("descendant-or-self", Label::Axis, seed.span)
        .with_value(TokenValue::NodeTest(NodeTest::Kind(KindTest::AnyKind)))
}

fn slash_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let root = root_token(&seed);
    if !starts_step(cur) {
        return Ok(root);
    }
    let rhs = cur.expression(bp::PATH)?;
    Ok(seed.with_operands(vec![root, rhs]))
}

fn slash_led(cur: &mut Cursor<'_>, seed: Token, left: Token) -> Result<Token, Error> {
    let rhs = cur.expression(bp::PATH)?;
    Ok(seed.with_operands(vec![left, rhs]))
}

/// `//` abbreviates `/descendant-or-self::node()/`.
fn double_slash_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let root = root_token(&seed);
    let dos = descendant_or_self_token(&seed);
    let left = Token::new("/", Label::Operator, seed.span).with_operands(vec![root, dos]);
    let rhs = cur.expression(bp::PATH)?;
    Ok(Token::new("/", Label::Operator, seed.span).with_operands(vec![left, rhs]))
}

fn double_slash_led(cur: &mut Cursor<'_>, seed: Token, left: Token) -> Result<Token, Error> {
    let dos = descendant_or_self_token(&seed);
    let inner = Token::new("/", Label::Operator, seed.span).with_operands(vec![left, dos]);
    let rhs = cur.expression(bp::PATH)?;
    Ok(Token::new("/", Label::Operator, seed.span).with_operands(vec![inner, rhs]))
}

pub(super) fn predicate_led(cur: &mut Cursor<'_>, seed: Token, left: Token) -> Result<Token, Error> {
    let predicate = cur.expression(bp::NONE)?;
    cur.expect("]")?;
    Ok(seed.with_operands(vec![left, predicate]))
}
