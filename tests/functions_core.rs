//! The core function library: strings, numerics, sequences, EBV.

mod common;

use rstest::rstest;
use xdmpath::ErrorCode;
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::xdm::XdmAtomicValue;

use common::{atomics, booleans, eval, eval31, ints, strings};

#[rstest]
#[case("concat('a', 'b', 'c')", "abc")]
#[case("concat('a', (), 'b')", "ab")]
#[case("string-join(('a', 'b', 'c'), '-')", "a-b-c")]
#[case("substring('12345', 2, 3)", "234")]
#[case("substring('12345', 1.5, 2.6)", "234")]
#[case("substring('12345', 0, 3)", "12")]
#[case("substring('12345', 2)", "2345")]
#[case("upper-case('aBc')", "ABC")]
#[case("lower-case('aBc')", "abc")]
#[case("normalize-space('  a   b  ')", "a b")]
#[case("translate('abcab', 'ab', 'AB')", "ABcAB")]
#[case("translate('abc', 'b', '')", "ac")]
#[case("substring-before('1999/04/01', '/')", "1999")]
#[case("substring-after('1999/04/01', '/')", "04/01")]
#[case("substring-after('abc', '')", "abc")]
fn string_functions(#[case] src: &str, #[case] expected: &str) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(strings(&out), vec![expected], "source: {src:?}");
}

#[rstest]
#[case("contains('haystack', 'stack')", true)]
#[case("contains('haystack', 'needle')", false)]
#[case("starts-with('haystack', 'hay')", true)]
#[case("ends-with('haystack', 'stack')", true)]
#[case("codepoint-equal('a', 'a')", true)]
fn string_predicates(#[case] src: &str, #[case] expected: bool) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![expected], "source: {src:?}");
}

#[test]
fn string_length_is_codepoint_based() {
    let out = eval("string-length('naïve')", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![5]);
    let out = eval("string-to-codepoints('ab')", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![97, 98]);
    let out = eval("codepoints-to-string((104, 105))", DialectVersion::V2_0).unwrap();
    assert_eq!(strings(&out), vec!["hi"]);
}

#[rstest]
#[case("abs(-3)", XdmAtomicValue::Integer(3))]
#[case("abs(-3.2)", XdmAtomicValue::Decimal("3.2".parse().unwrap()))]
#[case("floor(3.7)", XdmAtomicValue::Decimal("3".parse().unwrap()))]
#[case("ceiling(3.2)", XdmAtomicValue::Decimal("4".parse().unwrap()))]
#[case("round(2.5)", XdmAtomicValue::Decimal("3".parse().unwrap()))]
#[case("round(-2.5)", XdmAtomicValue::Decimal("-2".parse().unwrap()))]
#[case("round-half-to-even(2.5)", XdmAtomicValue::Decimal("2".parse().unwrap()))]
#[case("round-half-to-even(3.5)", XdmAtomicValue::Decimal("4".parse().unwrap()))]
#[case("round(2.4999e0)", XdmAtomicValue::Double(2.0))]
fn numeric_functions_preserve_type(#[case] src: &str, #[case] expected: XdmAtomicValue) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(atomics(&out), vec![expected], "source: {src:?}");
}

#[test]
fn numeric_specials() {
    let out = eval("abs(xs:double('-INF'))", DialectVersion::V2_0).unwrap();
    assert_eq!(atomics(&out), vec![XdmAtomicValue::Double(f64::INFINITY)]);
    let out = eval("floor(xs:double('NaN'))", DialectVersion::V2_0).unwrap();
    match atomics(&out).as_slice() {
        [XdmAtomicValue::Double(d)] => assert!(d.is_nan()),
        other => panic!("expected NaN, got {other:?}"),
    }
}

#[test]
fn sequence_basics() {
    assert_eq!(ints(&eval31("count((1, 2, 3))").unwrap()), vec![3]);
    assert_eq!(booleans(&eval31("empty(())").unwrap()), vec![true]);
    assert_eq!(booleans(&eval31("exists((1))").unwrap()), vec![true]);
    assert_eq!(ints(&eval31("head((1, 2, 3))").unwrap()), vec![1]);
    assert_eq!(ints(&eval31("tail((1, 2, 3))").unwrap()), vec![2, 3]);
    assert_eq!(ints(&eval31("reverse((1, 2, 3))").unwrap()), vec![3, 2, 1]);
    assert_eq!(
        ints(&eval31("insert-before((1, 3), 2, 2)").unwrap()),
        vec![1, 2, 3]
    );
    assert_eq!(ints(&eval31("remove((1, 2, 3), 2)").unwrap()), vec![1, 3]);
    assert_eq!(
        ints(&eval31("subsequence((1, 2, 3, 4), 2, 2)").unwrap()),
        vec![2, 3]
    );
}

#[test]
fn positional_functions_in_predicates() {
    let out = eval("(1, 2, 3)[last()]", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![3]);
    let out = eval("(1, 2, 3)[position() = last() - 1]", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![2]);
    let out = eval("(10, 20, 30)[position() gt 1]", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![20, 30]);
}

#[test]
fn distinct_values_uses_eq_semantics() {
    let out = eval31("distinct-values((1, 1.0, 2, '2', 1e0))").unwrap();
    // Numeric 1, 1.0 and 1e0 collapse; the string '2' stays distinct.
    assert_eq!(out.len(), 3);
}

#[test]
fn index_of_returns_all_positions() {
    let out = eval31("index-of((10, 20, 10), 10)").unwrap();
    assert_eq!(ints(&out), vec![1, 3]);
    let out = eval31("index-of((10, 20), 99)").unwrap();
    assert!(out.is_empty());
}

#[test]
fn cardinality_checks() {
    assert!(eval31("zero-or-one((1, 2))").unwrap_err().is_code(ErrorCode::FORG0003));
    assert!(eval31("one-or-more(())").unwrap_err().is_code(ErrorCode::FORG0004));
    assert!(eval31("exactly-one((1, 2))").unwrap_err().is_code(ErrorCode::FORG0005));
    assert_eq!(ints(&eval31("exactly-one(7)").unwrap()), vec![7]);
}

#[test]
fn ebv_errors_on_bad_shapes() {
    let err = eval("boolean((1, 2))", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORG0006));
    let err = eval(
        "boolean(xs:date('2024-01-01'))",
        DialectVersion::V2_0,
    )
    .unwrap_err();
    assert!(err.is_code(ErrorCode::FORG0006));
}

#[test]
fn not_and_boolean() {
    assert_eq!(booleans(&eval31("not(())").unwrap()), vec![true]);
    assert_eq!(booleans(&eval31("not('x')").unwrap()), vec![false]);
    assert_eq!(booleans(&eval31("boolean(0)").unwrap()), vec![false]);
    assert_eq!(
        booleans(&eval31("boolean(xs:double('NaN'))").unwrap()),
        vec![false]
    );
}

#[test]
fn deep_equal_compares_structure() {
    assert_eq!(
        booleans(&eval31("deep-equal((1, 2), (1, 2))").unwrap()),
        vec![true]
    );
    assert_eq!(
        booleans(&eval31("deep-equal((1, 2), (2, 1))").unwrap()),
        vec![false]
    );
    assert_eq!(
        booleans(&eval31("deep-equal(xs:double('NaN'), xs:double('NaN'))").unwrap()),
        vec![true]
    );
}

#[test]
fn error_function_raises_user_code() {
    let err = eval31("error()").unwrap_err();
    assert_eq!(err.code.local, "FOER0000");
    let err = eval31("error(xs:QName('err:FORG0001'), 'boom')").unwrap_err();
    assert_eq!(err.code.local, "FORG0001");
    assert_eq!(err.message, "boom");
}

#[test]
fn number_function_coerces_or_nan() {
    let out = eval31("number('12.5')").unwrap();
    assert_eq!(atomics(&out), vec![XdmAtomicValue::Double(12.5)]);
    let out = eval31("number('notanumber')").unwrap();
    match atomics(&out).as_slice() {
        [XdmAtomicValue::Double(d)] => assert!(d.is_nan()),
        other => panic!("expected NaN, got {other:?}"),
    }
}
