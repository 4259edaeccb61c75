//! Control structures: `if`, `for`, `let`, quantifiers, variable scoping.

mod common;

use rstest::rstest;
use xdmpath::parser::dialects::DialectVersion;

use common::{booleans, eval, ints, strings};

#[test]
fn if_selects_branch_by_ebv() {
    assert_eq!(
        ints(&eval("if (1) then 10 else 20", DialectVersion::V2_0).unwrap()),
        vec![10]
    );
    assert_eq!(
        ints(&eval("if (()) then 10 else 20", DialectVersion::V2_0).unwrap()),
        vec![20]
    );
    // The untaken branch is never evaluated.
    assert_eq!(
        ints(&eval("if (1) then 1 else 1 div 0", DialectVersion::V2_0).unwrap()),
        vec![1]
    );
}

#[test]
fn for_concatenates_in_binding_order() {
    let out = eval("for $x in (1, 2, 3) return $x * 10", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![10, 20, 30]);
}

#[test]
fn for_with_multiple_bindings_nests() {
    let out = eval(
        "for $x in (1, 2), $y in (10, 20) return $x + $y",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(ints(&out), vec![11, 21, 12, 22]);
}

#[test]
fn let_binds_and_shadows() {
    let out = eval("let $x := 2 return $x * $x", DialectVersion::V3_0).unwrap();
    assert_eq!(ints(&out), vec![4]);
    // Innermost binding wins.
    let out = eval(
        "let $x := 1 return let $x := 2 return $x",
        DialectVersion::V3_0,
    )
    .unwrap();
    assert_eq!(ints(&out), vec![2]);
    // Later bindings see earlier ones.
    let out = eval(
        "let $x := 3, $y := $x + 1 return $y",
        DialectVersion::V3_0,
    )
    .unwrap();
    assert_eq!(ints(&out), vec![4]);
}

#[test]
fn let_is_lazy_and_memoized() {
    // The binding would raise if forced; an unused binding must not.
    let out = eval(
        "let $boom := error() return 42",
        DialectVersion::V3_0,
    )
    .unwrap();
    assert_eq!(ints(&out), vec![42]);
    // Referenced bindings do raise.
    let err = eval(
        "let $boom := error() return $boom",
        DialectVersion::V3_0,
    )
    .unwrap_err();
    assert_eq!(err.code.local, "FOER0000");
}

#[rstest]
#[case("some $x in (1, 2, 3) satisfies $x = 2", true)]
#[case("every $x in (1, 2, 3) satisfies $x = 2", false)]
#[case("every $x in (2, 4) satisfies $x mod 2 = 0", true)]
#[case("some $x in () satisfies $x = 1", false)]
#[case("every $x in () satisfies $x = 1", true)]
fn quantifiers(#[case] src: &str, #[case] expected: bool) {
    let out = eval(src, DialectVersion::V2_0).unwrap();
    assert_eq!(booleans(&out), vec![expected], "source: {src:?}");
}

#[test]
fn quantifiers_short_circuit() {
    // `some` stops at the first hit; the division never happens.
    let out = eval(
        "some $x in (2, 0) satisfies 10 idiv $x = 5",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(booleans(&out), vec![true]);
}

#[test]
fn quantifier_with_multiple_bindings() {
    let out = eval(
        "some $x in (1, 2), $y in (2, 3) satisfies $x = $y",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(booleans(&out), vec![true]);
}

#[test]
fn for_variable_scoping_is_lexical() {
    // $x out of scope after the for body.
    let err = eval(
        "(for $x in (1, 2) return $x) + $x",
        DialectVersion::V2_0,
    )
    .unwrap_err();
    assert_eq!(err.code.local, "XPST0008");
}

#[test]
fn nested_for_and_let_combine() {
    let out = eval(
        "for $x in 1 to 3 return let $sq := $x * $x return $sq",
        DialectVersion::V3_0,
    )
    .unwrap();
    assert_eq!(ints(&out), vec![1, 4, 9]);
}

#[test]
fn if_inside_path_predicate() {
    let out = eval(
        "(1 to 10)[if (. mod 2 = 0) then . > 5 else false()]",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(ints(&out), vec![6, 8, 10]);
}

#[test]
fn string_results_from_branches() {
    let out = eval(
        "for $s in ('a', 'b') return concat($s, '!')",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(strings(&out), vec!["a!", "b!"]);
}
