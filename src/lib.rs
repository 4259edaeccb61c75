//! `xdmpath` — an XPath 1.0/2.0/3.0/3.1 engine over abstract in-memory XML
//! trees.
//!
//! The engine is three tightly coupled pieces:
//!
//! - a data-driven Pratt (TDOP) parser kernel, extended per XPath version by
//!   additive token registration ([`parser`]),
//! - the XDM value model: the atomic type lattice, sequences, maps, arrays
//!   and function items ([`xdm`]),
//! - an axis-based tree-walking evaluator over any tree that implements the
//!   [`model::XdmNode`] adapter ([`engine`]).
//!
//! ```
//! use xdmpath::model::simple::{doc, elem, text};
//! use xdmpath::parser::{parse_xpath, dialects::DialectVersion};
//! use xdmpath::engine::runtime::DynamicContextBuilder;
//!
//! let tree = doc()
//!     .child(elem("a").child(elem("b").child(text("1"))).child(elem("b").child(text("2"))))
//!     .build();
//! let expr = parse_xpath("/a/b[2]", DialectVersion::V2_0).unwrap();
//! let ctx = DynamicContextBuilder::new().context_item(tree).build();
//! let result = expr.evaluate(&ctx).unwrap();
//! assert_eq!(result.len(), 1);
//! ```

pub mod consts;
pub mod engine;
pub mod model;
pub mod parser;
pub mod schema;
pub mod xdm;

pub use engine::runtime::{
    DynamicContext, DynamicContextBuilder, Error, ErrorCode, StaticContext, StaticContextBuilder,
};
pub use model::{NodeKind, QName, XdmNode};
pub use parser::dialects::DialectVersion;
pub use parser::{XPathExpr, parse_with_context, parse_xpath};
pub use xdm::{ExpandedName, XdmAtomicValue, XdmItem, XdmSequence};

/// Caller-facing result shape: a singleton atomic unwraps to the value, a
/// singleton node to the node, anything else stays a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated<N: XdmNode> {
    Atomic(XdmAtomicValue),
    Node(N),
    Sequence(XdmSequence<N>),
}

impl<N: XdmNode> Evaluated<N> {
    pub fn from_sequence(mut seq: XdmSequence<N>) -> Self {
        if seq.len() == 1 {
            match seq.pop().expect("length checked") {
                XdmItem::Atomic(a) => return Evaluated::Atomic(a),
                XdmItem::Node(n) => return Evaluated::Node(n),
                other => return Evaluated::Sequence(vec![other]),
            }
        }
        Evaluated::Sequence(seq)
    }

    pub fn into_items(self) -> XdmSequence<N> {
        match self {
            Evaluated::Atomic(a) => vec![XdmItem::Atomic(a)],
            Evaluated::Node(n) => vec![XdmItem::Node(n)],
            Evaluated::Sequence(s) => s,
        }
    }

    /// 1.0-style boolean accessor (effective boolean value).
    pub fn as_boolean(&self) -> Result<bool, Error> {
        xdm::effective_boolean_value(&self.clone().into_items())
    }

    /// 1.0-style number accessor (NaN on failure, per `fn:number`).
    pub fn as_number(&self) -> f64 {
        match self {
            Evaluated::Atomic(a) => a
                .double_value()
                .or_else(|| a.string_value().trim().parse().ok())
                .unwrap_or(f64::NAN),
            Evaluated::Node(n) => n.string_value().trim().parse().unwrap_or(f64::NAN),
            Evaluated::Sequence(s) => match s.first() {
                Some(XdmItem::Atomic(a)) if s.len() == 1 => {
                    a.double_value().unwrap_or(f64::NAN)
                }
                Some(XdmItem::Node(n)) => n.string_value().trim().parse().unwrap_or(f64::NAN),
                _ => f64::NAN,
            },
        }
    }

    /// 1.0-style string accessor (string value of the first item).
    pub fn as_string(&self) -> String {
        match self {
            Evaluated::Atomic(a) => a.string_value(),
            Evaluated::Node(n) => n.string_value(),
            Evaluated::Sequence(s) => s
                .first()
                .and_then(|it| xdm::item_string_value(it).ok())
                .unwrap_or_default(),
        }
    }
}
