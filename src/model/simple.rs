//! In-memory tree implementation of [`XdmNode`] used by tests and quick
//! prototypes.
//!
//! Trees are assembled through builders and are immutable once built.
//! `build()` assigns every node a preorder rank from a process-wide counter,
//! so document order is total even across separately built trees (tree
//! creation order decides, which keeps set operations deterministic).
//!
//! ```
//! use xdmpath::model::simple::{doc, elem, attr, text};
//! use xdmpath::model::XdmNode;
//!
//! // <root id="r"><child>Hello</child></root>
//! let root = doc()
//!     .child(elem("root").attr(attr("id", "r")).child(elem("child").child(text("Hello"))))
//!     .build();
//! assert_eq!(root.string_value(), "Hello");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock, Weak};

use super::{NodeKind, QName, XdmNode};

static DOC_ORDER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    parent: RwLock<Option<Weak<Inner>>>,
    attributes: RwLock<Vec<SimpleNode>>,
    namespaces: RwLock<Vec<SimpleNode>>,
    children: RwLock<Vec<SimpleNode>>,
    order: AtomicU64,
    base_uri: RwLock<Option<String>>,
    document_uri: RwLock<Option<String>>,
}

/// An `Arc`-backed node handle; equality and hashing are pointer identity.
#[derive(Clone)]
pub struct SimpleNode(Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}

impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state)
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value)
            .finish()
    }
}

impl SimpleNode {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        SimpleNode(Arc::new(Inner {
            kind,
            name,
            value,
            parent: RwLock::new(None),
            attributes: RwLock::new(Vec::new()),
            namespaces: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
            order: AtomicU64::new(0),
            base_uri: RwLock::new(None),
            document_uri: RwLock::new(None),
        }))
    }

    fn assign_order(&self) {
        self.0
            .order
            .store(DOC_ORDER.fetch_add(1, AtomicOrdering::Relaxed), AtomicOrdering::Relaxed);
        for a in self.attributes() {
            a.assign_order();
        }
        for n in self.namespaces() {
            n.assign_order();
        }
        for c in self.children() {
            c.assign_order();
        }
    }

    pub fn set_document_uri(&self, uri: &str) {
        *self.0.document_uri.write().unwrap() = Some(uri.to_string());
        *self.0.base_uri.write().unwrap() = Some(uri.to_string());
    }
}

/// Builder for document and element nodes; leaf kinds build directly.
pub struct SimpleNodeBuilder {
    node: SimpleNode,
    children: Vec<SimpleNode>,
    attributes: Vec<SimpleNode>,
    namespaces: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<QName>) -> Self {
        Self {
            node: SimpleNode::new(kind, name, None),
            children: Vec::new(),
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    pub fn child(mut self, c: impl Into<NodeOrBuilder>) -> Self {
        self.children.push(match c.into() {
            NodeOrBuilder::Node(n) => n,
            NodeOrBuilder::Builder(b) => b.finish(),
        });
        self
    }

    pub fn attr(mut self, a: SimpleNode) -> Self {
        debug_assert!(a.kind() == NodeKind::Attribute);
        self.attributes.push(a);
        self
    }

    pub fn namespace(mut self, n: SimpleNode) -> Self {
        debug_assert!(n.kind() == NodeKind::Namespace);
        self.namespaces.push(n);
        self
    }

    fn finish(self) -> SimpleNode {
        let parent = Arc::downgrade(&self.node.0);
        for n in self
            .attributes
            .iter()
            .chain(&self.namespaces)
            .chain(&self.children)
        {
            *n.0.parent.write().unwrap() = Some(parent.clone());
        }
        *self.node.0.attributes.write().unwrap() = self.attributes;
        *self.node.0.namespaces.write().unwrap() = self.namespaces;
        *self.node.0.children.write().unwrap() = self.children;
        self.node
    }

    /// Finalize the tree and assign document-order ranks.
    pub fn build(self) -> SimpleNode {
        let node = self.finish();
        node.assign_order();
        node
    }
}

pub enum NodeOrBuilder {
    Node(SimpleNode),
    Builder(SimpleNodeBuilder),
}
impl From<SimpleNode> for NodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        NodeOrBuilder::Node(n)
    }
}
impl From<SimpleNodeBuilder> for NodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        NodeOrBuilder::Builder(b)
    }
}

pub fn doc() -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Document, None)
}
pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Element, Some(QName::local(name)))
}
pub fn elem_ns(ns_uri: &str, prefix: &str, name: &str) -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(
        NodeKind::Element,
        Some(QName {
            prefix: Some(prefix.to_string()),
            local: name.to_string(),
            ns_uri: Some(ns_uri.to_string()),
        }),
    )
}
pub fn attr(name: &str, value: &str) -> SimpleNode {
    SimpleNode::new(
        NodeKind::Attribute,
        Some(QName::local(name)),
        Some(value.to_string()),
    )
}
pub fn attr_ns(ns_uri: &str, prefix: &str, name: &str, value: &str) -> SimpleNode {
    SimpleNode::new(
        NodeKind::Attribute,
        Some(QName {
            prefix: Some(prefix.to_string()),
            local: name.to_string(),
            ns_uri: Some(ns_uri.to_string()),
        }),
        Some(value.to_string()),
    )
}
pub fn text(value: &str) -> SimpleNode {
    SimpleNode::new(NodeKind::Text, None, Some(value.to_string()))
}
pub fn comment(value: &str) -> SimpleNode {
    SimpleNode::new(NodeKind::Comment, None, Some(value.to_string()))
}
pub fn pi(target: &str, data: &str) -> SimpleNode {
    SimpleNode::new(
        NodeKind::ProcessingInstruction,
        Some(QName::local(target)),
        Some(data.to_string()),
    )
}
pub fn ns(prefix: &str, uri: &str) -> SimpleNode {
    SimpleNode::new(
        NodeKind::Namespace,
        Some(QName::local(prefix)),
        Some(uri.to_string()),
    )
}

impl XdmNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }

    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }

    fn string_value(&self) -> String {
        match self.kind() {
            NodeKind::Element | NodeKind::Document => {
                fn collect(n: &SimpleNode, out: &mut String) {
                    if n.kind() == NodeKind::Text {
                        if let Some(v) = &n.0.value {
                            out.push_str(v);
                        }
                    }
                    for c in n.children() {
                        collect(&c, out);
                    }
                }
                let mut out = String::new();
                collect(self, &mut out);
                out
            }
            _ => self.0.value.clone().unwrap_or_default(),
        }
    }

    fn base_uri(&self) -> Option<String> {
        if let Some(u) = self.0.base_uri.read().unwrap().clone() {
            return Some(u);
        }
        self.parent().and_then(|p| p.base_uri())
    }

    fn document_uri(&self) -> Option<String> {
        self.0.document_uri.read().unwrap().clone()
    }

    fn parent(&self) -> Option<Self> {
        self.0
            .parent
            .read()
            .ok()?
            .as_ref()
            .and_then(|w| w.upgrade())
            .map(SimpleNode)
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.read().unwrap().clone()
    }

    fn attributes(&self) -> Vec<Self> {
        self.0.attributes.read().unwrap().clone()
    }

    fn namespaces(&self) -> Vec<Self> {
        self.0.namespaces.read().unwrap().clone()
    }

    fn doc_order_key(&self) -> Option<u64> {
        match self.0.order.load(AtomicOrdering::Relaxed) {
            0 => None,
            k => Some(k),
        }
    }
}
