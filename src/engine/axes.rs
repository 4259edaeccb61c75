//! The thirteen XPath axes and node-test matching.
//!
//! Axis results are produced in *axis order*: forward axes in document
//! order, reverse axes (parent, ancestor…, preceding…) nearest-first.
//! Predicates count positions in axis order; the path layer restores
//! document order afterwards.

use crate::model::{NodeKind, XdmNode};
use crate::parser::ast::NodeTest;
use crate::xdm::types::NameOrWildcard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_symbol(symbol: &str) -> Option<Axis> {
        Some(match symbol {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "self" => Axis::SelfAxis,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            "attribute" => Axis::Attribute,
            "namespace" => Axis::Namespace,
            _ => return None,
        })
    }

    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }

    /// The node kind a bare-name node test selects on this axis.
    pub fn principal_node_kind(self) -> NodeKind {
        match self {
            Axis::Attribute => NodeKind::Attribute,
            Axis::Namespace => NodeKind::Namespace,
            _ => NodeKind::Element,
        }
    }

    /// All nodes on this axis from `origin`, in axis order.
    pub fn nodes<N: XdmNode>(self, origin: &N) -> Vec<N> {
        match self {
            Axis::Child => origin.children(),
            Axis::Attribute => origin.attributes(),
            Axis::SelfAxis => vec![origin.clone()],
            Axis::Parent => origin.parent().into_iter().collect(),
            Axis::Descendant => {
                let mut out = Vec::new();
                for c in origin.children() {
                    descend(&c, &mut out);
                }
                out
            }
            Axis::DescendantOrSelf => {
                let mut out = Vec::new();
                descend(origin, &mut out);
                out
            }
            Axis::Ancestor => {
                let mut out = Vec::new();
                let mut cur = origin.parent();
                while let Some(p) = cur {
                    cur = p.parent();
                    out.push(p);
                }
                out
            }
            Axis::AncestorOrSelf => {
                let mut out = vec![origin.clone()];
                out.extend(Axis::Ancestor.nodes(origin));
                out
            }
            Axis::FollowingSibling => siblings_after(origin),
            Axis::PrecedingSibling => {
                let mut before = siblings_before(origin);
                before.reverse();
                before
            }
            Axis::Following => {
                // Everything after the origin in document order, minus its
                // own descendants: following siblings (and their subtrees)
                // of every ancestor-or-self.
                let mut out = Vec::new();
                for anchor in Axis::AncestorOrSelf.nodes(origin) {
                    for sib in siblings_after(&anchor) {
                        descend(&sib, &mut out);
                    }
                }
                out.sort_by(|a, b| {
                    a.compare_document_order(b)
                        .unwrap_or(core::cmp::Ordering::Equal)
                });
                out
            }
            Axis::Preceding => {
                // Everything before the origin, minus its ancestors.
                let mut out = Vec::new();
                for anchor in Axis::AncestorOrSelf.nodes(origin) {
                    for sib in siblings_before(&anchor) {
                        descend(&sib, &mut out);
                    }
                }
                out.sort_by(|a, b| {
                    b.compare_document_order(a)
                        .unwrap_or(core::cmp::Ordering::Equal)
                });
                out
            }
            Axis::Namespace => in_scope_namespaces(origin),
        }
    }
}

fn descend<N: XdmNode>(n: &N, out: &mut Vec<N>) {
    out.push(n.clone());
    for c in n.children() {
        descend(&c, out);
    }
}

fn siblings_after<N: XdmNode>(n: &N) -> Vec<N> {
    // Attributes and namespace nodes have no siblings on these axes.
    if matches!(n.kind(), NodeKind::Attribute | NodeKind::Namespace) {
        return Vec::new();
    }
    let Some(parent) = n.parent() else {
        return Vec::new();
    };
    let children = parent.children();
    match children.iter().position(|c| c == n) {
        Some(i) => children[i + 1..].to_vec(),
        None => Vec::new(),
    }
}

fn siblings_before<N: XdmNode>(n: &N) -> Vec<N> {
    if matches!(n.kind(), NodeKind::Attribute | NodeKind::Namespace) {
        return Vec::new();
    }
    let Some(parent) = n.parent() else {
        return Vec::new();
    };
    let children = parent.children();
    match children.iter().position(|c| c == n) {
        Some(i) => children[..i].to_vec(),
        None => Vec::new(),
    }
}

/// In-scope namespace nodes of an element: its own and its ancestors',
/// nearest binding per prefix winning. Non-elements have none.
fn in_scope_namespaces<N: XdmNode>(origin: &N) -> Vec<N> {
    if origin.kind() != NodeKind::Element {
        return Vec::new();
    }
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    let mut cur = Some(origin.clone());
    while let Some(n) = cur {
        for ns in n.namespaces() {
            let prefix = ns.name().map(|q| q.local).unwrap_or_default();
            if seen.insert(prefix) {
                out.push(ns);
            }
        }
        cur = n.parent();
    }
    out
}

/// Match a node test against a candidate on a given axis. Bare-name and
/// wildcard tests select the axis's principal node kind only.
pub fn node_test_matches<N: XdmNode>(axis: Axis, test: &NodeTest, node: &N) -> bool {
    match test {
        NodeTest::Kind(kt) => kt.matches_node(node),
        NodeTest::Name(w) => {
            if node.kind() != axis.principal_node_kind() {
                return false;
            }
            if axis == Axis::Namespace {
                // Namespace nodes are named by their prefix, no URI part.
                return match w {
                    NameOrWildcard::Any => true,
                    NameOrWildcard::Name(e) => {
                        node.name().is_some_and(|q| q.local == e.local)
                    }
                    _ => false,
                };
            }
            w.matches(node.name().as_ref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{attr, doc, elem, text};

    fn sample() -> crate::model::simple::SimpleNode {
        doc()
            .child(
                elem("a")
                    .attr(attr("id", "x"))
                    .child(elem("b").child(text("1")))
                    .child(elem("c"))
                    .child(elem("b").child(text("2"))),
            )
            .build()
    }

    fn names<N: XdmNode>(nodes: &[N]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| {
                n.name()
                    .map(|q| q.local)
                    .unwrap_or_else(|| format!("#{:?}", n.kind()).to_lowercase())
            })
            .collect()
    }

    #[test]
    fn descendant_is_preorder() {
        let root = sample();
        let a = root.children()[0].clone();
        assert_eq!(
            names(&Axis::Descendant.nodes(&a)),
            vec!["b", "#text", "c", "b", "#text"]
        );
    }

    #[test]
    fn reverse_axes_are_nearest_first() {
        let root = sample();
        let a = root.children()[0].clone();
        let second_b = a.children()[2].clone();
        assert_eq!(names(&Axis::PrecedingSibling.nodes(&second_b)), vec!["c", "b"]);
        let text = second_b.children()[0].clone();
        assert_eq!(names(&Axis::Ancestor.nodes(&text)), vec!["b", "a", "#document"]);
    }

    #[test]
    fn following_excludes_descendants() {
        let root = sample();
        let a = root.children()[0].clone();
        let first_b = a.children()[0].clone();
        assert_eq!(
            names(&Axis::Following.nodes(&first_b)),
            vec!["c", "b", "#text"]
        );
    }

    #[test]
    fn attribute_axis_and_principal_kind() {
        let root = sample();
        let a = root.children()[0].clone();
        let attrs = Axis::Attribute.nodes(&a);
        assert_eq!(attrs.len(), 1);
        let test = NodeTest::Name(NameOrWildcard::Any);
        assert!(node_test_matches(Axis::Attribute, &test, &attrs[0]));
        // The same wildcard on the child axis must not match attributes.
        assert!(!node_test_matches(Axis::Child, &test, &attrs[0]));
    }
}
