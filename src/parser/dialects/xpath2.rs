//! XPath 2.0 additions: comma sequences, ranges, value and node
//! comparisons, `intersect`/`except`, control structures, quantifiers, and
//! the type operators (`instance of`, `treat as`, `castable as`, `cast as`).

use crate::engine::runtime::Error;
use crate::parser::ast::{Label, Token, TokenValue};
use crate::parser::dialects::{kind_test_nud, parse_sequence_type, parse_single_type};
use crate::parser::kernel::{Cursor, KeywordGuard, SymbolTable, binary_led, bp};

pub(super) fn register(table: &mut SymbolTable) {
    table.literal("(double)");

    table.infix(",", bp::COMMA, binary_led);
    table.infix("to", bp::RANGE, binary_led);

    table.infix("idiv", bp::MULTIPLICATIVE, binary_led);
    table.infix("union", bp::UNION, binary_led);
    table.infix("intersect", bp::INTERSECT, binary_led);
    table.infix("except", bp::INTERSECT, binary_led);

    for cmp in ["eq", "ne", "lt", "le", "gt", "ge"] {
        table.infix(cmp, bp::COMPARISON, binary_led);
    }
    table.infix("is", bp::COMPARISON, binary_led);
    table.infix("<<", bp::COMPARISON, binary_led);
    table.infix(">>", bp::COMPARISON, binary_led);

    table.guarded("if", Label::Operator, KeywordGuard::NextIs("("), if_nud);
    table.guarded("for", Label::Operator, KeywordGuard::NextIs("$"), for_nud);
    table.guarded("some", Label::Operator, KeywordGuard::NextIs("$"), quantifier_nud);
    table.guarded("every", Label::Operator, KeywordGuard::NextIs("$"), quantifier_nud);

    table.infix("instance", bp::INSTANCE_OF, instance_led);
    table.infix("treat", bp::TREAT, treat_led);
    table.infix("castable", bp::CASTABLE, cast_led);
    table.infix("cast", bp::CAST, cast_led);

    for kt in [
        "document-node",
        "element",
        "attribute",
        "schema-element",
        "schema-attribute",
    ] {
        table.guarded(kt, Label::KindTest, KeywordGuard::NextIs("("), kind_test_nud);
    }
}

fn if_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    cur.expect("(")?;
    let cond = cur.expression(bp::NONE)?;
    cur.expect(")")?;
    cur.expect("then")?;
    let then_branch = cur.expression(bp::COMMA)?;
    cur.expect("else")?;
    let else_branch = cur.expression(bp::COMMA)?;
    Ok(seed.with_operands(vec![cond, then_branch, else_branch]))
}

/// Read `$name` and return a variable token with the name resolved.
pub(super) fn binding_var(cur: &mut Cursor<'_>) -> Result<Token, Error> {
    cur.expect("$")?;
    let (payload, span) = cur.expect_name()?;
    let name = cur.resolve_variable_name(&payload, span)?;
    Ok(Token::new("$", Label::Variable, span).with_value(TokenValue::Name(
        crate::parser::ast::NamePayload {
            prefix: payload.prefix,
            local: name.local,
            ns_uri: name.ns_uri,
        },
    )))
}

/// `for $v in E (, $v in E)* return F` — operands are the flattened
/// (var, sequence) pairs followed by the return expression.
fn for_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let mut operands = Vec::new();
    loop {
        let var = binding_var(cur)?;
        cur.expect("in")?;
        let seq = cur.expression(bp::COMMA)?;
        operands.push(var);
        operands.push(seq);
        if cur.next_is(",") {
            cur.advance();
        } else {
            break;
        }
    }
    cur.expect("return")?;
    operands.push(cur.expression(bp::COMMA)?);
    Ok(seed.with_operands(operands))
}

/// `some|every $v in E (, …)* satisfies P` — same operand layout as `for`.
fn quantifier_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let mut operands = Vec::new();
    loop {
        let var = binding_var(cur)?;
        cur.expect("in")?;
        let seq = cur.expression(bp::COMMA)?;
        operands.push(var);
        operands.push(seq);
        if cur.next_is(",") {
            cur.advance();
        } else {
            break;
        }
    }
    cur.expect("satisfies")?;
    operands.push(cur.expression(bp::COMMA)?);
    Ok(seed.with_operands(operands))
}

fn instance_led(cur: &mut Cursor<'_>, mut seed: Token, left: Token) -> Result<Token, Error> {
    cur.expect("of")?;
    let ty = parse_sequence_type(cur)?;
    seed.value = Some(TokenValue::SeqType(ty));
    Ok(seed.with_operands(vec![left]))
}

fn treat_led(cur: &mut Cursor<'_>, mut seed: Token, left: Token) -> Result<Token, Error> {
    cur.expect("as")?;
    let ty = parse_sequence_type(cur)?;
    seed.value = Some(TokenValue::SeqType(ty));
    Ok(seed.with_operands(vec![left]))
}

/// Shared by `cast as` and `castable as` (SingleType target).
fn cast_led(cur: &mut Cursor<'_>, mut seed: Token, left: Token) -> Result<Token, Error> {
    cur.expect("as")?;
    let (ty, optional) = parse_single_type(cur)?;
    seed.value = Some(TokenValue::SingleType { ty, optional });
    Ok(seed.with_operands(vec![left]))
}
