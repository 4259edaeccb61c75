//! Arithmetic, comparison, range, and set operators.

mod common;

use rstest::rstest;
use xdmpath::ErrorCode;
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::xdm::XdmAtomicValue;

use common::{abc_tree, atomics, booleans, eval, eval_on, eval31, ints, node_names};

#[test]
fn integer_division_by_zero_raises() {
    let err = eval("1 div 0", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FOAR0001));
    let err = eval("1 idiv 0", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FOAR0001));
}

#[test]
fn double_division_by_zero_is_ieee() {
    let out = eval("1.0e0 div 0", DialectVersion::V2_0).unwrap();
    assert_eq!(atomics(&out), vec![XdmAtomicValue::Double(f64::INFINITY)]);
    let out = eval("0e0 div 0e0", DialectVersion::V2_0).unwrap();
    match atomics(&out).as_slice() {
        [XdmAtomicValue::Double(d)] => assert!(d.is_nan()),
        other => panic!("expected NaN, got {other:?}"),
    }
}

#[test]
fn integer_div_produces_decimal() {
    let out = eval("1 div 2", DialectVersion::V2_0).unwrap();
    assert_eq!(
        atomics(&out),
        vec![XdmAtomicValue::Decimal("0.5".parse().unwrap())]
    );
}

#[rstest]
#[case("(1, 2) = (2, 3)", true)]
#[case("(1, 2) = (3, 4)", false)]
#[case("(1, 2) != (1, 2)", true)] // existential: 1 != 2
#[case("2 > 1", true)]
#[case("'b' > 'a'", true)]
#[case("() = 1", false)]
fn general_comparison_is_existential(#[case] src: &str, #[case] expected: bool) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![expected], "source: {src:?}");
}

#[test]
fn value_comparison_requires_singletons() {
    let err = eval("(1, 2) eq 2", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPTY0004));
    // Empty operands give the empty sequence, not false.
    let out = eval("() eq 1", DialectVersion::V2_0).unwrap();
    assert!(out.is_empty());
}

#[test]
fn incomparable_value_comparison_is_type_error() {
    let err = eval("1 eq 'one'", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPTY0004));
}

#[test]
fn range_operator() {
    assert_eq!(ints(&eval("1 to 5", DialectVersion::V2_0).unwrap()), vec![1, 2, 3, 4, 5]);
    assert!(eval("5 to 1", DialectVersion::V2_0).unwrap().is_empty());
    assert_eq!(ints(&eval("3 to 3", DialectVersion::V2_0).unwrap()), vec![3]);
}

#[test]
fn range_with_filter() {
    let out = eval("(1 to 5)[. mod 2 = 1]", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![1, 3, 5]);
}

#[test]
fn union_deduplicates_by_identity() {
    let out = eval_on("count(//C2 | //C2)", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(ints(&out), vec![1]);
}

#[test]
fn union_is_commutative_and_document_ordered() {
    let tree = abc_tree();
    let ab = eval_on("//C3 | //C1", DialectVersion::V2_0, tree.clone()).unwrap();
    let ba = eval_on("//C1 | //C3", DialectVersion::V2_0, tree).unwrap();
    assert_eq!(node_names(&ab), vec!["C1", "C3"]);
    assert_eq!(node_names(&ab), node_names(&ba));
}

#[test]
fn intersect_and_except() {
    let tree = abc_tree();
    let out = eval_on("//* intersect //C2", DialectVersion::V2_0, tree.clone()).unwrap();
    assert_eq!(node_names(&out), vec!["C2"]);
    let out = eval_on("/A/B2/* except //C2", DialectVersion::V2_0, tree).unwrap();
    assert_eq!(node_names(&out), vec!["C1", "C3"]);
}

#[test]
fn set_operations_reject_atomics() {
    let err = eval("(1, 2) union (2, 3)", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPTY0004));
}

#[test]
fn node_comparison_operators() {
    let tree = abc_tree();
    let out = eval_on("//C1 << //C3", DialectVersion::V2_0, tree.clone()).unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval_on("//C3 is //C3", DialectVersion::V2_0, tree.clone()).unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval_on("//C1 >> //C3", DialectVersion::V2_0, tree).unwrap();
    assert_eq!(booleans(&out), vec![false]);
}

#[test]
fn logical_operators_short_circuit() {
    // The right side would raise if evaluated.
    let out = eval("false() and (1 div 0 = 1)", DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![false]);
    let out = eval("true() or (1 div 0 = 1)", DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![true]);
}

#[test]
fn string_concat_operator() {
    let out = eval31("'foo' || 'bar'").unwrap();
    assert_eq!(common::strings(&out), vec!["foobar"]);
    let out = eval31("() || 'x' || ()").unwrap();
    assert_eq!(common::strings(&out), vec!["x"]);
}

#[test]
fn simple_map_operator_preserves_order_and_duplicates() {
    let out = eval31("('abc', 'abc') ! upper-case(.)").unwrap();
    assert_eq!(common::strings(&out), vec!["ABC", "ABC"]);
}

#[test]
fn unary_minus() {
    assert_eq!(ints(&eval("-(3)", DialectVersion::V2_0).unwrap()), vec![-3]);
    assert_eq!(ints(&eval("--3", DialectVersion::V2_0).unwrap()), vec![3]);
}

#[test]
fn numeric_promotion_in_arithmetic() {
    let out = eval("1 + 0.5", DialectVersion::V2_0).unwrap();
    assert_eq!(
        atomics(&out),
        vec![XdmAtomicValue::Decimal("1.5".parse().unwrap())]
    );
    let out = eval("1 + 0.5e0", DialectVersion::V2_0).unwrap();
    assert_eq!(atomics(&out), vec![XdmAtomicValue::Double(1.5)]);
}
