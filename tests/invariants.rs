//! The algebraic invariants every release must keep.

mod common;

use rstest::rstest;
use xdmpath::parser::dialects::DialectVersion;

use common::{abc_tree, booleans, eval, eval_on, eval31, ints, node_names};

#[rstest]
#[case("1 + 2 * 3")]
#[case("(1, 2, 3)[2]")]
#[case("string-join(('a', 'b'), ',')")]
#[case("for $x in 1 to 3 return $x * $x")]
fn parenthesization_is_identity(#[case] src: &str) {
    let plain = eval(src, DialectVersion::V2_0).unwrap();
    let wrapped = eval(&format!("({src})"), DialectVersion::V2_0).unwrap();
    assert_eq!(plain, wrapped, "source: {src:?}");
}

#[test]
fn union_commutes_and_equals_dedup_concat() {
    let tree = abc_tree();
    for (a, b) in [("//C1", "//C3"), ("//*", "//C2"), ("/A/B2/*", "/A/*")] {
        let ab = eval_on(
            &format!("{a} union {b}"),
            DialectVersion::V2_0,
            tree.clone(),
        )
        .unwrap();
        let ba = eval_on(
            &format!("{b} union {a}"),
            DialectVersion::V2_0,
            tree.clone(),
        )
        .unwrap();
        assert_eq!(node_names(&ab), node_names(&ba), "{a} / {b}");
    }
}

#[rstest]
#[case("child")]
#[case("descendant")]
#[case("descendant-or-self")]
#[case("following-sibling")]
#[case("following")]
fn forward_axes_are_document_ordered_and_unique(#[case] axis: &str) {
    let tree = abc_tree();
    let path = format!("/A/B2/C1/{axis}::node()");
    let out = eval_on(&path, DialectVersion::V2_0, tree.clone()).unwrap();
    let sorted = eval_on(
        &format!("({path}) union ({path})"),
        DialectVersion::V2_0,
        tree,
    )
    .unwrap();
    assert_eq!(node_names(&out), node_names(&sorted), "axis: {axis}");
}

#[test]
fn double_reverse_is_identity() {
    let out = eval31("reverse(reverse((1, 2, 3)))").unwrap();
    assert_eq!(ints(&out), vec![1, 2, 3]);
    let out = eval31("reverse(reverse(()))").unwrap();
    assert!(out.is_empty());
}

#[test]
fn arrow_equals_direct_call() {
    for (arrowed, direct) in [
        ("'a' => string-length()", "string-length('a')"),
        ("(1, 2) => count()", "count((1, 2))"),
        ("' x ' => normalize-space()", "normalize-space(' x ')"),
    ] {
        assert_eq!(
            eval31(arrowed).unwrap(),
            eval31(direct).unwrap(),
            "{arrowed} vs {direct}"
        );
    }
}

#[test]
fn position_ranges_over_focus_exactly_once() {
    let out = eval("(10, 20, 30)[position() = position()]", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![10, 20, 30]);
    let out = eval("count((10, 20, 30)[position() le 3])", DialectVersion::V2_0).unwrap();
    assert_eq!(ints(&out), vec![3]);
    // Positions observed inside the predicate are 1..N in order.
    let out = eval(
        "for $p in (1, 2, 3) return (10, 20, 30)[position() = $p]",
        DialectVersion::V2_0,
    )
    .unwrap();
    assert_eq!(ints(&out), vec![10, 20, 30]);
}

#[test]
fn repeated_evaluation_is_referentially_transparent() {
    let tree = abc_tree();
    let first = eval_on("//*[position() mod 2 = 1]", DialectVersion::V2_0, tree.clone()).unwrap();
    for _ in 0..3 {
        let again =
            eval_on("//*[position() mod 2 = 1]", DialectVersion::V2_0, tree.clone()).unwrap();
        assert_eq!(node_names(&first), node_names(&again));
    }
}

#[test]
fn ebv_of_singleton_nodes_is_true() {
    let out = eval_on("boolean(//C2)", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(booleans(&out), vec![true]);
    let out = eval_on("boolean(//missing)", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(booleans(&out), vec![false]);
}
