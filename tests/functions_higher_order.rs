//! Function items: references, inline functions, partial application, the
//! arrow operator, and the higher-order built-ins.

mod common;

use rstest::rstest;
use xdmpath::parser::dialects::DialectVersion;

use common::{booleans, eval, eval31, ints, strings};

#[test]
fn named_function_reference_call() {
    let out = eval31("abs#1(-4)").unwrap();
    assert_eq!(ints(&out), vec![4]);
    let out = eval31("function-arity(abs#1)").unwrap();
    assert_eq!(ints(&out), vec![1]);
}

#[test]
fn unknown_function_reference_is_static() {
    let err = eval31("nonexistent#3").unwrap_err();
    assert_eq!(err.code.local, "XPST0017");
}

#[test]
fn inline_function_with_closure() {
    let out = eval(
        "let $n := 10 return (function($x) { $x + $n })(5)",
        DialectVersion::V3_0,
    )
    .unwrap();
    assert_eq!(ints(&out), vec![15]);
}

#[test]
fn inline_function_parameter_types_convert() {
    let out = eval(
        "(function($x as xs:double) { $x * 2 })(3)",
        DialectVersion::V3_0,
    )
    .unwrap();
    assert_eq!(
        common::atomics(&out),
        vec![xdmpath::XdmAtomicValue::Double(6.0)]
    );
}

#[test]
fn arrow_operator_is_call_rewriting() {
    let a = eval31("'abc' => upper-case()").unwrap();
    let b = eval31("upper-case('abc')").unwrap();
    assert_eq!(strings(&a), strings(&b));
    let out = eval31("(1, 2, 3) => count()").unwrap();
    assert_eq!(ints(&out), vec![3]);
    // Chained arrows feed left to right.
    let out = eval31("' x ' => normalize-space() => string-length()").unwrap();
    assert_eq!(ints(&out), vec![1]);
}

#[test]
fn arrow_with_variable_callee() {
    let out = eval31("let $f := abs#1 return -7 => $f()").unwrap();
    assert_eq!(ints(&out), vec![7]);
}

#[test]
fn partial_application_with_placeholder() {
    let out = eval31("let $add3 := concat('3-', ?) return $add3('x')").unwrap();
    assert_eq!(strings(&out), vec!["3-x"]);
    let out = eval31("for-each((1, 2), subsequence((10, 20, 30), ?, 1))").unwrap();
    assert_eq!(ints(&out), vec![10, 20]);
}

#[rstest]
#[case("for-each((1, 2, 3), function($x) { $x * $x })", &[1, 4, 9])]
#[case("filter(1 to 6, function($x) { $x mod 2 = 0 })", &[2, 4, 6])]
#[case("fold-left((1, 2, 3), 0, function($a, $b) { $a + $b })", &[6])]
#[case("fold-right((1, 2, 3), 0, function($a, $b) { $a + $b })", &[6])]
#[case(
    "for-each-pair((1, 2, 3), (10, 20, 30), function($a, $b) { $a + $b })",
    &[11, 22, 33]
)]
fn higher_order_builtins(#[case] src: &str, #[case] expected: &[i64]) {
    let out = eval31(src).unwrap();
    assert_eq!(ints(&out), expected, "source: {src:?}");
}

#[test]
fn fold_left_is_left_associative() {
    let out = eval31("fold-left((1, 2, 3), '', function($a, $b) { concat($a, $b) })").unwrap();
    assert_eq!(strings(&out), vec!["123"]);
    let out = eval31("fold-right((1, 2, 3), '', function($a, $b) { concat($a, $b) })").unwrap();
    assert_eq!(strings(&out), vec!["123"]);
}

#[test]
fn function_lookup_and_name() {
    let out = eval31("function-lookup(xs:QName('fn:abs'), 1)(-2)").unwrap();
    assert_eq!(ints(&out), vec![2]);
    let out = eval31("empty(function-lookup(xs:QName('fn:abs'), 99))").unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval31("string(function-name(abs#1))").unwrap();
    assert_eq!(strings(&out), vec!["abs"]);
}

#[test]
fn apply_spreads_array_arguments() {
    let out = eval31("apply(concat#3, ['a', 'b', 'c'])").unwrap();
    assert_eq!(strings(&out), vec!["abc"]);
}

#[test]
fn sort_with_and_without_key() {
    let out = eval31("sort((3, 1, 2))").unwrap();
    assert_eq!(ints(&out), vec![1, 2, 3]);
    let out = eval31("sort((-2, 3, -1), (), function($x) { abs($x) })").unwrap();
    assert_eq!(ints(&out), vec![-1, -2, 3]);
}

#[test]
fn functions_are_first_class_sequence_items() {
    let out = eval31("count((abs#1, concat#2))").unwrap();
    assert_eq!(ints(&out), vec![2]);
}

#[test]
fn inline_function_body_has_absent_focus() {
    let err = eval31("(function() { . })()").unwrap_err();
    assert_eq!(err.code.local, "XPDY0002");
}
