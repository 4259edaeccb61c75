//! The node side of the XDM: node kinds, names, and the tree adapter trait.
//!
//! The engine never touches a concrete XML representation. Adapters implement
//! [`XdmNode`] over their own tree type; [`SimpleNode`](simple::SimpleNode)
//! is the bundled in-memory implementation used by tests and prototypes.

use core::cmp::Ordering;

use crate::engine::runtime::{Error, ErrorCode};
use crate::xdm::XdmAtomicValue;

pub mod simple;

/// The seven XDM node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

/// A lexical QName as carried by nodes: prefix, local part, and the bound
/// namespace URI (if any).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            ns_uri: None,
        }
    }

    pub fn with_ns(ns_uri: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            ns_uri: Some(ns_uri.into()),
        }
    }
}

/// Tree adapter consumed by the engine.
///
/// `Clone` must be cheap (adapters are expected to be handle types), and
/// equality is node identity, not structural equality.
pub trait XdmNode:
    Clone + PartialEq + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static
{
    fn kind(&self) -> NodeKind;

    /// Expanded name, if the node has one (elements, attributes, PIs and
    /// namespace nodes do; documents, text and comments do not).
    fn name(&self) -> Option<QName>;

    /// The string value per XDM: concatenated descendant text for
    /// elements/documents, the content itself for the leaf kinds.
    fn string_value(&self) -> String;

    /// Typed value used by atomization. Untyped trees (no schema) yield a
    /// single `xs:untypedAtomic` for elements and attributes.
    fn typed_value(&self) -> Vec<XdmAtomicValue> {
        match self.kind() {
            NodeKind::Comment | NodeKind::ProcessingInstruction | NodeKind::Namespace => {
                vec![XdmAtomicValue::String(self.string_value())]
            }
            _ => vec![XdmAtomicValue::UntypedAtomic(self.string_value())],
        }
    }

    fn base_uri(&self) -> Option<String> {
        None
    }

    /// URI of the containing document, for document nodes loaded via `fn:doc`.
    fn document_uri(&self) -> Option<String> {
        None
    }

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;
    fn namespaces(&self) -> Vec<Self>;

    /// Optional total-order hint. Adapters that can cheaply assign a stable
    /// preorder rank should return it; the engine then never re-derives
    /// ancestry during sorting and set operations.
    fn doc_order_key(&self) -> Option<u64> {
        None
    }

    /// Document order. The default derives order from ancestry and sibling
    /// rank; adapters with multi-root forests must override (or provide
    /// `doc_order_key`) to obtain a total order across roots.
    fn compare_document_order(&self, other: &Self) -> Result<Ordering, Error> {
        if let (Some(a), Some(b)) = (self.doc_order_key(), other.doc_order_key()) {
            return Ok(a.cmp(&b));
        }
        compare_by_ancestry(self, other)
    }

    /// Walk to the root of the containing tree.
    fn root(&self) -> Self {
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    /// Resolve a namespace prefix against the in-scope namespace nodes of
    /// this node and its ancestors. The `xml` prefix is always bound.
    fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        if prefix == "xml" {
            return Some(crate::consts::XML_NS.to_string());
        }
        let mut cur = Some(self.clone());
        while let Some(n) = cur {
            for ns in n.namespaces() {
                if let Some(name) = ns.name()
                    && name.local == prefix
                {
                    return Some(ns.string_value());
                }
            }
            cur = n.parent();
        }
        None
    }
}

/// Fallback document-order comparator based on ancestry and stable sibling
/// order.
///
/// - An ancestor precedes its descendants.
/// - Among the children of one parent, attributes come first, then namespace
///   nodes, then child nodes, each group in adapter order.
/// - Nodes under different roots cannot be ordered here; callers get
///   `FOCA0002` and must supply `doc_order_key` ranks instead.
pub fn compare_by_ancestry<N: XdmNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    if a == b {
        return Ok(Ordering::Equal);
    }
    fn path_from_root<N: XdmNode>(mut n: N) -> Vec<N> {
        let mut p = vec![n.clone()];
        while let Some(parent) = n.parent() {
            p.push(parent.clone());
            n = parent;
        }
        p.reverse();
        p
    }
    let pa = path_from_root(a.clone());
    let pb = path_from_root(b.clone());
    let shared = core::cmp::min(pa.len(), pb.len());
    let mut i = 0usize;
    while i < shared && pa[i] == pb[i] {
        i += 1;
    }
    if i == shared {
        // One path is a prefix of the other: the shorter one is the ancestor.
        return Ok(if pa.len() < pb.len() {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    if i == 0 {
        return Err(Error::from_code(
            ErrorCode::FOCA0002,
            "cannot order nodes from different trees without doc_order_key",
        ));
    }
    let parent = &pa[i - 1];
    let mut siblings: Vec<N> = parent.attributes();
    siblings.extend(parent.namespaces());
    siblings.extend(parent.children());
    let ra = siblings.iter().position(|n| n == &pa[i]);
    let rb = siblings.iter().position(|n| n == &pb[i]);
    Ok(match (ra, rb) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    })
}
