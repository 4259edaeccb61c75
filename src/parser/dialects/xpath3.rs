//! XPath 3.0 additions: `let`, string concatenation `||`, the simple map
//! operator `!`, inline function expressions, named function references
//! (`name#arity`), and dynamic function calls.

use crate::engine::runtime::{Error, ErrorCode};
use crate::parser::ast::{Label, NamePayload, Token, TokenValue};
use crate::parser::dialects::{
    kind_test_nud, parse_argument_list_after_open, parse_sequence_type,
};
use crate::parser::dialects::xpath2::binding_var;
use crate::parser::kernel::{Cursor, KeywordGuard, SymbolTable, binary_led, bp};

pub(super) fn register(table: &mut SymbolTable) {
    table.infix("||", bp::CONCAT, binary_led);
    table.infix("!", bp::SIMPLE_MAP, binary_led);

    table.guarded("let", Label::Operator, KeywordGuard::NextIs("$"), let_nud);
    table.guarded(
        "function",
        Label::Function,
        KeywordGuard::NextIs("("),
        inline_function_nud,
    );
    table.guarded(
        "namespace-node",
        Label::KindTest,
        KeywordGuard::NextIs("("),
        kind_test_nud,
    );

    table.infix("#", bp::POSTFIX, function_ref_led);
    // `(` keeps its parenthesis reading and gains the postfix dynamic-call
    // reading.
    table.infix_prefix(
        "(",
        bp::POSTFIX,
        dynamic_call_led,
        crate::parser::dialects::xpath1::paren_nud,
    );
}

/// `let $v := E (, $v := E)* return F` — (var, value) pairs then the body.
fn let_nud(cur: &mut Cursor<'_>, seed: Token) -> Result<Token, Error> {
    let mut operands = Vec::new();
    loop {
        let var = binding_var(cur)?;
        cur.expect(":=")?;
        let value = cur.expression(bp::COMMA)?;
        operands.push(var);
        operands.push(value);
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

/// `function($a as T, $b) as R { body }` — operands are the parameter
/// tokens (each optionally carrying a `(type)` operand) followed by the
/// body; the declared return type rides in the value slot.
fn inline_function_nud(cur: &mut Cursor<'_>, mut seed: Token) -> Result<Token, Error> {
    cur.expect("(")?;
    let mut operands = Vec::new();
    if !cur.next_is(")") {
        loop {
            let mut var = binding_var(cur)?;
            if cur.next_is("as") {
                cur.advance();
                let ty = parse_sequence_type(cur)?;
                let ty_token = Token::new("(type)", Label::Operator, var.span)
                    .with_value(TokenValue::SeqType(ty));
                var.push(ty_token);
            }
            operands.push(var);
            if cur.next_is(",") {
                cur.advance();
            } else {
                break;
            }
        }
    }
    cur.expect(")")?;
    if cur.next_is("as") {
        cur.advance();
        let ret = parse_sequence_type(cur)?;
        seed.value = Some(TokenValue::SeqType(ret));
    }
    cur.expect("{")?;
    let body = if cur.next_is("}") {
        Token::new("()", Label::Operator, seed.span)
    } else {
        cur.expression(bp::NONE)?
    };
    cur.expect("}")?;
    operands.push(body);
    Ok(seed.with_operands(operands))
}

/// `name#arity`: a reference to a named function, checked statically.
fn function_ref_led(cur: &mut Cursor<'_>, seed: Token, left: Token) -> Result<Token, Error> {
    let Some(payload) = left.name_value().cloned() else {
        return Err(cur.syntax_error("left side of # must be a function name"));
    };
    let arity = match cur.lex(0) {
        crate::parser::lexer::LexValue::Integer(i) if *i >= 0 => {
            let arity = *i as usize;
            cur.advance();
            arity
        }
        _ => return Err(cur.syntax_error("expected a literal arity after #")),
    };
    // A plain name was resolved as an element name by its own nud; function
    // position resolves the empty prefix differently.
    let lookup = NamePayload {
        prefix: payload.prefix.clone(),
        local: payload.local.clone(),
        ns_uri: if payload.prefix.is_none()
            && payload.ns_uri == cur.static_ctx.default_element_namespace
        {
            None
        } else {
            payload.ns_uri.clone()
        },
    };
    let name = cur.resolve_function_name(&lookup, left.span)?;
    let known = (cur.signatures.knows(&name) && cur.signatures.accepts(&name, arity))
        || (cur.static_ctx.extra_functions.knows(&name)
            && cur.static_ctx.extra_functions.accepts(&name, arity));
    if !known {
        return Err(Error::from_code(
            ErrorCode::XPST0017,
            format!("unknown function {name}#{arity}"),
        )
        .with_span(left.span));
    }
    let arity_token = Token::new("(integer)", Label::Literal, seed.span)
        .with_value(TokenValue::Integer(arity as i64));
    let mut out = seed;
    out.label = Label::Function;
    out.value = Some(TokenValue::Name(NamePayload {
        prefix: payload.prefix,
        local: name.local.clone(),
        ns_uri: name.ns_uri.clone(),
    }));
    Ok(out.with_operands(vec![arity_token]))
}

/// Postfix `E(args…)`: a dynamic call of whatever E evaluates to.
fn dynamic_call_led(cur: &mut Cursor<'_>, seed: Token, left: Token) -> Result<Token, Error> {
    let args = parse_argument_list_after_open(cur)?;
    let mut operands = vec![left];
    operands.extend(args);
    let mut out = seed;
    out.symbol = "(call)";
    Ok(out.with_operands(operands))
}
