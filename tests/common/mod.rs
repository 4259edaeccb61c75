//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use xdmpath::engine::runtime::{DynamicContext, DynamicContextBuilder};
use xdmpath::model::simple::{SimpleNode, attr, doc, elem, text};
use xdmpath::parser::dialects::DialectVersion;
use xdmpath::parser::parse_xpath;
use xdmpath::xdm::{XdmAtomicValue, XdmItem, XdmSequence};

pub type Seq = XdmSequence<SimpleNode>;

/// Evaluate without a context item.
pub fn eval(expr: &str, version: DialectVersion) -> Result<Seq, xdmpath::Error> {
    let parsed = parse_xpath(expr, version)?;
    let ctx: DynamicContext<SimpleNode> = DynamicContextBuilder::new().build();
    parsed.evaluate(&ctx)
}

/// Evaluate with the given tree as the context item.
pub fn eval_on(
    expr: &str,
    version: DialectVersion,
    root: SimpleNode,
) -> Result<Seq, xdmpath::Error> {
    let parsed = parse_xpath(expr, version)?;
    let ctx = DynamicContextBuilder::new().context_item(root).build();
    parsed.evaluate(&ctx)
}

pub fn eval31(expr: &str) -> Result<Seq, xdmpath::Error> {
    eval(expr, DialectVersion::V3_1)
}

pub fn atomics(seq: &Seq) -> Vec<XdmAtomicValue> {
    seq.iter()
        .filter_map(|item| match item {
            XdmItem::Atomic(a) => Some(a.clone()),
            _ => None,
        })
        .collect()
}

pub fn ints(seq: &Seq) -> Vec<i64> {
    atomics(seq)
        .iter()
        .filter_map(|a| a.integer_value())
        .collect()
}

pub fn strings(seq: &Seq) -> Vec<String> {
    atomics(seq).iter().map(|a| a.string_value()).collect()
}

pub fn booleans(seq: &Seq) -> Vec<bool> {
    atomics(seq)
        .iter()
        .filter_map(|a| match a {
            XdmAtomicValue::Boolean(b) => Some(*b),
            _ => None,
        })
        .collect()
}

pub fn node_names(seq: &Seq) -> Vec<String> {
    seq.iter()
        .filter_map(|item| match item {
            XdmItem::Node(n) => {
                use xdmpath::model::XdmNode;
                n.name().map(|q| q.local)
            }
            _ => None,
        })
        .collect()
}

/// `<A><B1/><B2><C1/><C2/><C3/></B2></A>` — the tree from the boundary
/// scenarios.
pub fn abc_tree() -> SimpleNode {
    doc()
        .child(
            elem("A")
                .child(elem("B1"))
                .child(
                    elem("B2")
                        .child(elem("C1"))
                        .child(elem("C2"))
                        .child(elem("C3")),
                ),
        )
        .build()
}

/// A small catalog document with attributes and text content.
pub fn catalog_tree() -> SimpleNode {
    doc()
        .child(
            elem("catalog")
                .child(
                    elem("book")
                        .attr(attr("id", "b1"))
                        .attr(attr("price", "10"))
                        .child(elem("title").child(text("Rust in Anger"))),
                )
                .child(
                    elem("book")
                        .attr(attr("id", "b2"))
                        .attr(attr("price", "25"))
                        .child(elem("title").child(text("The XDM Companion"))),
                )
                .child(elem("note").child(text("  \t\n "))),
        )
        .build()
}
