//! XPath 3.1 additions: map and array constructors, the lookup operator
//! `?`, and the arrow operator `=>`.

use crate::engine::runtime::{Error, ErrorCode};
use crate::parser::ast::{Label, NamePayload, Token, TokenValue};
use crate::parser::dialects::{dialect, parse_arguments};
use crate::parser::dialects::xpath1::predicate_led;
use crate::parser::kernel::{Cursor, KeywordGuard, SymbolTable, bp};
use crate::parser::lexer::LexValue;

pub(super) fn register(table: &mut SymbolTable) {
    table.guarded("map", Label::Operator, KeywordGuard::NextIs("{"), map_nud);
    table.guarded("array", Label::Operator, KeywordGuard::NextIs("{"), curly_array_nud);
    // `[` doubles as the square array constructor in prefix position.
    table.infix_prefix("[", bp::POSTFIX, predicate_led, square_array_nud);
    table.infix_prefix("?", bp::POSTFIX, lookup_led, unary_lookup_nud);
    table.infix("=>", bp::ARROW, arrow_led);
}

/// `map { K : V, … }` — operands alternate key and value expressions.
fn map_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    cur.expect("{")?;
    let mut operands = Vec::new();
    if !cur.next_is("}") {
        loop {
            let key = cur.expression(bp::COMMA)?;
            cur.expect(":")?;
            let value = cur.expression(bp::COMMA)?;
            operands.push(key);
            operands.push(value);
            if cur.next_is(",") {
                cur.advance();
            } else {
                break;
            }
        }
    }
    cur.expect("}")?;
    Ok(seed.with_operands(operands))
}

/// `array { E? }` — the sequence E supplies one member per item.
fn curly_array_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    cur.expect("{")?;
    let mut operands = Vec::new();
    if !cur.next_is("}") {
        operands.push(cur.expression(bp::NONE)?);
    }
    cur.expect("}")?;
    Ok(seed.with_operands(operands))
}

/// `[ E1, E2, … ]` — one member per ExprSingle, members may be sequences.
fn square_array_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let mut operands = Vec::new();
    if !cur.next_is("]") {
        loop {
            operands.push(cur.expression(bp::COMMA)?);
            if cur.next_is(",") {
                cur.advance();
            } else {
                break;
            }
        }
    }
    cur.expect("]")?;
    let mut out = seed;
    out.symbol = "(array)";
    Ok(out.with_operands(operands))
}

/// KeySpecifier: NCName | integer | `*` | parenthesized expression.
fn parse_key_specifier(cur: &mut Cursor<'_>) -> Result<Token, Error> {
    let span = cur.span(0);
    match cur.lex(0).clone() {
        LexValue::Name { prefix: None, local } => {
            cur.advance();
            Ok(Token::new("(string)", Label::Literal, span)
                .with_value(TokenValue::String(local)))
        }
        LexValue::Integer(i) => {
            cur.advance();
            Ok(Token::new("(integer)", Label::Literal, span).with_value(TokenValue::Integer(i)))
        }
        LexValue::Symbol("*") => {
            cur.advance();
            Ok(Token::new("*", Label::Operator, span))
        }
        LexValue::Symbol("(") => cur.expression(u8::MAX),
        _ => Err(cur.syntax_error(format!(
            "expected a lookup key specifier, found {}",
            cur.describe(0)
        ))),
    }
}

fn lookup_led(cur: &mut Cursor<'_>, seed: Token, left: Token) -> Result<Token, Error> {
    let key = parse_key_specifier(cur)?;
    Ok(seed.with_operands(vec![left, key]))
}

/// Unary lookup applies to the context item: `?name` inside e.g. map:find
/// predicates.
fn unary_lookup_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let key = parse_key_specifier(cur)?;
    Ok(seed.with_operands(vec![key]))
}

/// `E => f(a, b)` rewrites to `f(E, a, b)`; `E => $f(a)` and
/// `E => (expr)(a)` become dynamic calls with E prepended.
fn arrow_led(cur: &mut Cursor<'_>, seed: Token, left: Token) -> Result<Token, Error> {
    match cur.lex(0).clone() {
        LexValue::Name { .. } | LexValue::BracedName { .. } => {
            let (payload, name_span) = cur.expect_name()?;
            if payload.prefix.is_none()
                && payload.ns_uri.is_none()
                && dialect(cur.version).is_reserved_function_name(&payload.local)
            {
                return Err(cur.syntax_error(format!(
                    "{:?} is a reserved function name",
                    payload.local
                )));
            }
            let name = cur.resolve_function_name(&payload, name_span)?;
            let mut args = vec![left];
            args.extend(parse_arguments(cur)?);
            let known = (cur.signatures.knows(&name) && cur.signatures.accepts(&name, args.len()))
                || (cur.static_ctx.extra_functions.knows(&name)
                    && cur.static_ctx.extra_functions.accepts(&name, args.len()));
            if !known {
                return Err(Error::from_code(
                    ErrorCode::XPST0017,
                    format!("unknown function {}#{}", name, args.len()),
                )
                .with_span(name_span));
            }
            Ok(Token::new("(function)", Label::Function, seed.span)
                .with_value(TokenValue::Name(NamePayload {
                    prefix: payload.prefix,
                    local: name.local.clone(),
                    ns_uri: name.ns_uri.clone(),
                }))
                .with_operands(args))
        }
        LexValue::Symbol("$") | LexValue::Symbol("(") => {
            let callee = cur.expression(u8::MAX)?;
            let args = parse_arguments(cur)?;
            let mut operands = vec![callee, left];
            operands.extend(args);
            let mut out = seed;
            out.symbol = "(call)";
            Ok(out.with_operands(operands))
        }
        _ => Err(cur.syntax_error(format!(
            "expected a function name, $variable, or parenthesized expression after =>, found {}",
            cur.describe(0)
        ))),
    }
}
