//! Version gating: each dialect accepts exactly its own constructs.

mod common;

use rstest::rstest;
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::parser::parse_xpath;

use common::{eval, ints, strings};

#[rstest]
#[case("1 to 3", DialectVersion::V1_0, false)]
#[case("1 to 3", DialectVersion::V2_0, true)]
#[case("if (1) then 1 else 2", DialectVersion::V1_0, false)]
#[case("if (1) then 1 else 2", DialectVersion::V2_0, true)]
#[case("let $x := 1 return $x", DialectVersion::V2_0, false)]
#[case("let $x := 1 return $x", DialectVersion::V3_0, true)]
#[case("'a' || 'b'", DialectVersion::V2_0, false)]
#[case("'a' || 'b'", DialectVersion::V3_0, true)]
#[case("(1, 2) ! (. + 1)", DialectVersion::V2_0, false)]
#[case("(1, 2) ! (. + 1)", DialectVersion::V3_0, true)]
#[case("abs#1", DialectVersion::V2_0, false)]
#[case("abs#1", DialectVersion::V3_0, true)]
#[case("function($x) { $x }", DialectVersion::V2_0, false)]
#[case("function($x) { $x }", DialectVersion::V3_0, true)]
#[case("map { 'a': 1 }", DialectVersion::V3_0, false)]
#[case("map { 'a': 1 }", DialectVersion::V3_1, true)]
#[case("[1, 2]", DialectVersion::V3_0, false)]
#[case("[1, 2]", DialectVersion::V3_1, true)]
#[case("'ab' => upper-case()", DialectVersion::V3_0, false)]
#[case("'ab' => upper-case()", DialectVersion::V3_1, true)]
#[case("math:pi()", DialectVersion::V2_0, false)]
#[case("math:pi()", DialectVersion::V3_0, true)]
#[case("map:size(map { 'a': 1 })", DialectVersion::V3_1, true)]
fn construct_availability(
    #[case] src: &str,
    #[case] version: DialectVersion,
    #[case] ok: bool,
) {
    let result = parse_xpath(src, version);
    assert_eq!(result.is_ok(), ok, "source {src:?} at {}", version.as_str());
}

#[test]
fn double_literals_require_2_0() {
    assert!(parse_xpath("1.0e0", DialectVersion::V1_0).is_err());
    assert!(parse_xpath("1.0e0", DialectVersion::V2_0).is_ok());
}

#[test]
fn braced_uri_literals_require_3_0() {
    assert!(parse_xpath("Q{urn:x}local", DialectVersion::V2_0).is_err());
    assert!(parse_xpath("Q{urn:x}local", DialectVersion::V3_0).is_ok());
}

#[test]
fn later_dialects_still_run_earlier_expressions() {
    for version in [
        DialectVersion::V2_0,
        DialectVersion::V3_0,
        DialectVersion::V3_1,
    ] {
        let out = eval("2 + 2", version).unwrap();
        assert_eq!(ints(&out), vec![4]);
    }
}

#[test]
fn boundary_scenario_math_atan() {
    let out = eval("math:atan(1.0e0)", DialectVersion::V3_0).unwrap();
    match common::atomics(&out).as_slice() {
        [xdmpath::XdmAtomicValue::Double(d)] => {
            assert!((d - 0.785_398_163_397_448_3).abs() < 1e-15);
        }
        other => panic!("expected a double, got {other:?}"),
    }
}

#[test]
fn boundary_scenario_concat_and_map_operators() {
    let out = eval("\"foo\" || \"bar\"", DialectVersion::V3_0).unwrap();
    assert_eq!(strings(&out), vec!["foobar"]);
    let out = eval("\"abc\" ! upper-case(.)", DialectVersion::V3_0).unwrap();
    assert_eq!(strings(&out), vec!["ABC"]);
}

#[test]
fn namespace_axis_survives_in_all_versions() {
    for version in [
        DialectVersion::V1_0,
        DialectVersion::V2_0,
        DialectVersion::V3_1,
    ] {
        assert!(
            parse_xpath("namespace::*", version).is_ok(),
            "version {}",
            version.as_str()
        );
    }
}
