//! Parser fundamentals: precedence shapes, spans, static errors.

mod common;

use rstest::rstest;
use xdmpath::parser::ast::Label;
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::parser::parse_xpath;

use common::{eval, ints};

#[rstest]
#[case("1 + 2 * 3", 7)]
#[case("(1 + 2) * 3", 9)]
#[case("2 + 3 - 1", 4)]
#[case("7 mod 4", 3)]
#[case("-3 + 5", 2)]
#[case("10 idiv 3", 3)]
fn arithmetic_precedence(#[case] src: &str, #[case] expected: i64) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![expected]);
}

#[test]
fn parenthesized_expression_is_transparent() {
    let plain = parse_xpath("1 + 2", DialectVersion::V2_0).unwrap();
    let wrapped = parse_xpath("(1 + 2)", DialectVersion::V2_0).unwrap();
    assert_eq!(plain.root().symbol, wrapped.root().symbol);
    assert_eq!(plain.root().operands.len(), wrapped.root().operands.len());
}

#[test]
fn union_of_paths_parses_as_operator() {
    let parsed = parse_xpath("a | b", DialectVersion::V1_0).unwrap();
    assert_eq!(parsed.root().symbol, "|");
    assert_eq!(parsed.root().label, Label::Operator);
}

#[test]
fn star_is_wildcard_in_prefix_and_times_in_infix() {
    let times = parse_xpath("2 * 3", DialectVersion::V1_0).unwrap();
    assert_eq!(times.root().symbol, "*");
    assert_eq!(times.root().operands.len(), 2);
    let path = parse_xpath("child::*", DialectVersion::V1_0).unwrap();
    assert_eq!(path.root().symbol, "child");
    assert_eq!(path.root().label, Label::Axis);
}

#[test]
fn spans_point_at_offending_token() {
    let err = parse_xpath("1 + ", DialectVersion::V2_0).unwrap_err();
    assert_eq!(err.code.local, "XPST0003");
    assert!(err.span.is_some());
    let err = parse_xpath("1 ] 2", DialectVersion::V2_0).unwrap_err();
    let span = err.span.unwrap();
    assert_eq!(&"1 ] 2"[span.start..span.end], "]");
}

#[rstest]
#[case("")]
#[case("1 +")]
#[case("for $x in")]
#[case("a[")]
#[case("(1, 2")]
#[case("if (1) then 2")]
fn syntax_errors_are_xpst0003(#[case] src: &str) {
    let err = parse_xpath(src, DialectVersion::V2_0).unwrap_err();
    assert_eq!(err.code.local, "XPST0003", "source: {src:?}");
}

#[test]
fn trailing_tokens_rejected() {
    let err = parse_xpath("1 2", DialectVersion::V2_0).unwrap_err();
    assert_eq!(err.code.local, "XPST0003");
}

#[test]
fn unknown_function_is_static_xpst0017() {
    let err = parse_xpath("frobnicate(1)", DialectVersion::V2_0).unwrap_err();
    assert_eq!(err.code.local, "XPST0017");
    // Wrong arity for a known function is the same code.
    let err = parse_xpath("count()", DialectVersion::V2_0).unwrap_err();
    assert_eq!(err.code.local, "XPST0017");
}

#[test]
fn unbound_prefix_is_static_xpst0081() {
    let err = parse_xpath("nope:item", DialectVersion::V2_0).unwrap_err();
    assert_eq!(err.code.local, "XPST0081");
}

#[test]
fn reserved_function_names_do_not_parse_as_calls() {
    for src in ["if(1)", "item()"] {
        let err = parse_xpath(src, DialectVersion::V2_0).unwrap_err();
        assert_eq!(err.code.local, "XPST0003", "source: {src:?}");
    }
}

#[test]
fn keyword_operators_still_work_as_element_names() {
    // `div` in step position is a name test, not the operator.
    let parsed = parse_xpath("div", DialectVersion::V2_0).unwrap();
    assert_eq!(parsed.root().label, Label::Name);
    let parsed = parse_xpath("union/intersect", DialectVersion::V2_0).unwrap();
    assert_eq!(parsed.root().symbol, "/");
}

#[test]
fn comments_nest_in_xpath2() {
    let out = eval("1 (: one (: nested :) still :) + 1", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![2]);
    let err = parse_xpath("1 (: nope :)", DialectVersion::V1_0).unwrap_err();
    assert_eq!(err.code.local, "XPST0003");
}
