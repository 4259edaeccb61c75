//! `instance of`, `castable as`, `cast as`, `treat as`, and promotion.

mod common;

use rstest::rstest;
use xdmpath::ErrorCode;
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::xdm::XdmAtomicValue;

use common::{atomics, booleans, eval, eval31, strings};

#[rstest]
#[case("1 instance of xs:integer", true)]
#[case("1 instance of xs:decimal", true)] // derivation
#[case("1.5 instance of xs:integer", false)]
#[case("(1, 2) instance of xs:integer+", true)]
#[case("(1, 2) instance of xs:integer", false)]
#[case("() instance of xs:integer?", true)]
#[case("() instance of xs:integer", false)]
#[case("() instance of empty-sequence()", true)]
#[case("'a' instance of item()", true)]
#[case("1 instance of xs:string", false)]
fn instance_of(#[case] src: &str, #[case] expected: bool) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![expected], "source: {src:?}");
}

#[rstest]
#[case("'3' castable as xs:integer", true)]
#[case("'3.5' castable as xs:integer", false)]
#[case("'2024-02-29' castable as xs:date", true)]
#[case("'2023-02-29' castable as xs:date", false)]
#[case("'true' castable as xs:boolean", true)]
#[case("'yes' castable as xs:boolean", false)]
#[case("() castable as xs:integer?", true)]
#[case("() castable as xs:integer", false)]
fn castable_as(#[case] src: &str, #[case] expected: bool) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![expected], "source: {src:?}");
}

#[test]
fn cast_preserves_narrowest_type() {
    let out = eval("'42' cast as xs:short", DialectVersion::V2_0).unwrap();
    assert_eq!(atomics(&out), vec![XdmAtomicValue::Short(42)]);
    let err = eval("'300' cast as xs:byte", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORG0001));
}

#[test]
fn cast_empty_to_optional() {
    let out = eval("() cast as xs:integer?", DialectVersion::V2_0).unwrap();
    assert!(out.is_empty());
    let err = eval("() cast as xs:integer", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPTY0004));
}

#[test]
fn treat_as_passes_or_raises_dynamic_error() {
    let out = eval("5 treat as xs:integer", DialectVersion::V2_0).unwrap();
    assert_eq!(atomics(&out), vec![XdmAtomicValue::Integer(5)]);
    let err = eval("'x' treat as xs:integer", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPDY0050));
}

#[test]
fn cast_to_notation_is_rejected_statically() {
    let err = eval("'x' cast as xs:NOTATION", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::XPST0080));
}

#[test]
fn constructor_functions_share_cast_semantics() {
    let out = eval("xs:integer('  17  ')", DialectVersion::V2_0).unwrap();
    assert_eq!(atomics(&out), vec![XdmAtomicValue::Integer(17)]);
    let out = eval("xs:string(3.5e0)", DialectVersion::V2_0).unwrap();
    assert_eq!(strings(&out), vec!["3.5"]);
    let err = eval("xs:date('yesterday')", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORG0001));
}

#[test]
fn qname_constructor_resolves_static_prefixes() {
    let out = eval("xs:QName('fn:abs')", DialectVersion::V2_0).unwrap();
    match atomics(&out).as_slice() {
        [XdmAtomicValue::QName { prefix, ns_uri, local }] => {
            assert_eq!(prefix.as_deref(), Some("fn"));
            assert_eq!(
                ns_uri.as_deref(),
                Some("http://www.w3.org/2005/xpath-functions")
            );
            assert_eq!(local, "abs");
        }
        other => panic!("expected a QName, got {other:?}"),
    }
}

#[test]
fn duration_subtype_casts() {
    let out = eval(
        "xs:yearMonthDuration('P2Y6M') cast as xs:duration",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(
        atomics(&out),
        vec![XdmAtomicValue::Duration {
            months: 30,
            millis: 0
        }]
    );
    let err = eval("xs:yearMonthDuration('P1D')", DialectVersion::V2_0).unwrap_err();
    assert!(err.is_code(ErrorCode::FORG0001));
}

#[test]
fn untyped_promotes_through_function_conversion() {
    // Untyped arguments take the numeric route: cast to double.
    let out = eval31("abs(xs:untypedAtomic('-3'))").unwrap();
    assert_eq!(atomics(&out), vec![XdmAtomicValue::Double(3.0)]);
}

#[test]
fn sequence_type_lexical_round_trip() {
    // xs:T(string(xs:T(L))) = xs:T(L) for a few representative types.
    for (ty, lexical) in [
        ("xs:decimal", "3.14"),
        ("xs:date", "2024-02-29"),
        ("xs:dayTimeDuration", "P1DT2H"),
        ("xs:hexBinary", "DEADBEEF"),
    ] {
        let src = format!("{ty}(string({ty}('{lexical}'))) eq {ty}('{lexical}')");
        let out = eval31(&src).unwrap();
        assert_eq!(booleans(&out), vec![true], "type: {ty}");
    }
}

#[test]
fn function_sequence_types_in_instance_of() {
    let out = eval31("abs#1 instance of function(*)").unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval31("map { 'a': 1 } instance of map(*)").unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval31("[1, 2] instance of array(*)").unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval31("map { 'a': 1 } instance of function(*)").unwrap();
    assert_eq!(booleans(&out), vec![true]);
}
