//! Paths, steps, axes, and predicates over the sample trees.

mod common;

use rstest::rstest;
use xdmpath::ErrorCode;
use xdmpath::model::simple::{attr, doc, elem, ns, pi, text};
use xdmpath::parser::dialects::DialectVersion;

use common::{abc_tree, catalog_tree, eval_on, ints, node_names};

#[test]
fn child_steps_in_document_order() {
    let out = eval_on("/A/B2/*", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(node_names(&out), vec!["C1", "C2", "C3"]);
}

#[test]
fn descendant_or_self_abbreviation() {
    let out = eval_on("//C2", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(node_names(&out), vec!["C2"]);
    let out = eval_on("//*", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(node_names(&out), vec!["A", "B1", "B2", "C1", "C2", "C3"]);
}

#[rstest]
#[case("/A/B2/C1/following-sibling::*", &["C2", "C3"])]
#[case("/A/B2/C3/preceding-sibling::*", &["C1", "C2"])]
#[case("/A/B2/C2/ancestor::*", &["A", "B2"])]
#[case("/A/B1/following::*", &["B2", "C1", "C2", "C3"])]
#[case("/A/B2/C1/preceding::*", &["B1"])]
#[case("/A/B2/self::B2", &["B2"])]
#[case("/A/B2/parent::*", &["A"])]
#[case("/A/B2/C2/ancestor-or-self::*", &["A", "B2", "C2"])]
fn axes_results_in_document_order(#[case] path: &str, #[case] expected: &[&str]) {
    let out = eval_on(path, DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(node_names(&out), expected, "path: {path:?}");
}

#[test]
fn positional_predicates_count_in_axis_order() {
    // Nearest-first on reverse axes.
    let out = eval_on(
        "/A/B2/C3/preceding-sibling::*[1]",
        DialectVersion::V2_0,
        abc_tree(),
    )
    .unwrap();
    assert_eq!(node_names(&out), vec!["C2"]);
    let out = eval_on("/A/B2/*[2]", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(node_names(&out), vec!["C2"]);
}

#[test]
fn predicate_with_last() {
    let out = eval_on("/A/B2/*[last()]", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(node_names(&out), vec!["C3"]);
    let out = eval_on(
        "/A/B2/*[position() = last() - 1]",
        DialectVersion::V2_0,
        abc_tree(),
    )
    .unwrap();
    assert_eq!(node_names(&out), vec!["C2"]);
}

#[test]
fn attribute_axis_and_abbreviation() {
    let out = eval_on(
        "/catalog/book[1]/@price",
        DialectVersion::V2_0,
        catalog_tree(),
    )
    .unwrap();
    let values: Vec<String> = out
        .iter()
        .filter_map(|i| match i {
            xdmpath::XdmItem::Node(n) => {
                use xdmpath::model::XdmNode;
                Some(n.string_value())
            }
            _ => None,
        })
        .collect();
    assert_eq!(values, vec!["10"]);
    let out = eval_on(
        "/catalog/book[@id = 'b2']/title",
        DialectVersion::V2_0,
        catalog_tree(),
    )
    .unwrap();
    assert_eq!(node_names(&out), vec!["title"]);
}

#[test]
fn predicates_filter_by_content() {
    let out = eval_on(
        "/catalog/book[number(@price) > 15]/@id",
        DialectVersion::V2_0,
        catalog_tree(),
    )
    .unwrap();
    let values: Vec<String> = out
        .iter()
        .filter_map(|i| match i {
            xdmpath::XdmItem::Node(n) => {
                use xdmpath::model::XdmNode;
                Some(n.string_value())
            }
            _ => None,
        })
        .collect();
    assert_eq!(values, vec!["b2"]);
}

#[test]
fn text_kind_test_with_normalize_space() {
    let out = eval_on(
        "//text()[normalize-space()]",
        DialectVersion::V2_0,
        catalog_tree(),
    )
    .unwrap();
    let values: Vec<String> = out
        .iter()
        .filter_map(|i| match i {
            xdmpath::XdmItem::Node(n) => {
                use xdmpath::model::XdmNode;
                Some(n.string_value())
            }
            _ => None,
        })
        .collect();
    // The whitespace-only note text is filtered out, document order kept.
    assert_eq!(values, vec!["Rust in Anger", "The XDM Companion"]);
}

#[test]
fn parent_abbreviation() {
    let out = eval_on("/A/B2/C1/..", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(node_names(&out), vec!["B2"]);
}

#[test]
fn path_over_atomics_is_type_error() {
    let err = eval_on("(1, 2)/C1", DialectVersion::V2_0, abc_tree()).unwrap_err();
    assert!(err.is_code(ErrorCode::XPTY0019));
}

#[test]
fn step_on_atomic_context_is_type_error() {
    let err = eval_on("'text'/a", DialectVersion::V2_0, abc_tree()).unwrap_err();
    assert!(err.is_code(ErrorCode::XPTY0019));
}

#[test]
fn multi_context_steps_dedupe_and_sort() {
    // Both B elements contribute the same A ancestor; `/` dedups.
    let out = eval_on("/A/*/ancestor::*", DialectVersion::V2_0, abc_tree()).unwrap();
    assert_eq!(node_names(&out), vec!["A"]);
}

#[test]
fn comment_and_pi_kind_tests() {
    let tree = doc()
        .child(
            elem("root")
                .child(xdmpath::model::simple::comment("note"))
                .child(pi("target", "data"))
                .child(text("x")),
        )
        .build();
    let out = eval_on("//comment()", DialectVersion::V2_0, tree.clone()).unwrap();
    assert_eq!(out.len(), 1);
    let out = eval_on("//processing-instruction()", DialectVersion::V2_0, tree.clone()).unwrap();
    assert_eq!(out.len(), 1);
    let out = eval_on(
        "//processing-instruction('other')",
        DialectVersion::V2_0,
        tree,
    )
    .unwrap();
    assert!(out.is_empty());
}

#[test]
fn namespace_axis_read_only_emulation() {
    let tree = doc()
        .child(
            elem("root")
                .namespace(ns("p", "urn:one"))
                .child(elem("inner")),
        )
        .build();
    let out = eval_on(
        "/root/inner/namespace::p",
        DialectVersion::V2_0,
        tree.clone(),
    )
    .unwrap();
    assert_eq!(out.len(), 1);
    // Wildcard over the namespace axis sees inherited bindings.
    let out = eval_on("/root/inner/namespace::*", DialectVersion::V2_0, tree).unwrap();
    assert_eq!(out.len(), 1);
}

#[test]
fn wildcard_forms() {
    let tree = doc()
        .child(
            elem("root")
                .child(xdmpath::model::simple::elem_ns("urn:one", "p", "a").child(text("1")))
                .child(elem("b").child(text("2"))),
        )
        .build();
    let static_ctx = xdmpath::StaticContextBuilder::new()
        .namespace("p", "urn:one")
        .build();
    let parsed =
        xdmpath::parse_with_context("/root/p:*", DialectVersion::V2_0, &static_ctx).unwrap();
    let ctx = xdmpath::DynamicContextBuilder::new()
        .context_item(tree.clone())
        .build();
    assert_eq!(node_names(&parsed.evaluate(&ctx).unwrap()), vec!["a"]);

    let parsed =
        xdmpath::parse_with_context("/root/*:a", DialectVersion::V2_0, &static_ctx).unwrap();
    assert_eq!(node_names(&parsed.evaluate(&ctx).unwrap()), vec!["a"]);
}

#[test]
fn attribute_wildcard() {
    let tree = doc()
        .child(elem("e").attr(attr("x", "1")).attr(attr("y", "2")))
        .build();
    let out = eval_on("/e/@*", DialectVersion::V2_0, tree).unwrap();
    assert_eq!(out.len(), 2);
}

#[test]
fn leading_slash_alone_selects_root() {
    let tree = abc_tree();
    let out = eval_on("/", DialectVersion::V2_0, tree.clone()).unwrap();
    assert_eq!(out.len(), 1);
    let out = eval_on("count(/) ", DialectVersion::V2_0, tree).unwrap();
    assert_eq!(ints(&out), vec![1]);
}
