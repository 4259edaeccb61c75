//! The XDM value model: items, sequences, atomization, effective boolean
//! value.

use core::fmt;

use crate::engine::runtime::{Error, ErrorCode};
use crate::model::XdmNode;

pub mod atomic;
pub mod cast;
pub mod function;
pub mod types;

pub use atomic::XdmAtomicValue;
pub use function::{FunctionItem, XdmArray, XdmMap};

/// An expanded QName: namespace URI plus local part. The currency of
/// variable, function and error-code naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self {
            ns_uri,
            local: local.into(),
        }
    }

    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }

    pub fn in_ns(ns_uri: &str, local: impl Into<String>) -> Self {
        Self::new(Some(ns_uri.to_string()), local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A single XDM item. Sequences are flat: an item is never a sequence.
#[derive(Debug, Clone)]
pub enum XdmItem<N: XdmNode> {
    Node(N),
    Atomic(XdmAtomicValue),
    Function(FunctionItem<N>),
    Map(XdmMap<N>),
    Array(XdmArray<N>),
}

impl<N: XdmNode + PartialEq + Clone> PartialEq for XdmItem<N> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XdmItem::Node(a), XdmItem::Node(b)) => a == b,
            (XdmItem::Atomic(a), XdmItem::Atomic(b)) => a == b,
            (XdmItem::Map(a), XdmItem::Map(b)) => a == b,
            (XdmItem::Array(a), XdmItem::Array(b)) => a == b,
            // Function items have no equality in XDM.
            _ => false,
        }
    }
}

impl<N: XdmNode> From<N> for XdmItem<N> {
    fn from(n: N) -> Self {
        XdmItem::Node(n)
    }
}

pub type XdmSequence<N> = Vec<XdmItem<N>>;

pub fn singleton<N: XdmNode>(item: impl Into<XdmItem<N>>) -> XdmSequence<N> {
    vec![item.into()]
}

/// Atomization per XDM: nodes yield their typed value, arrays flatten and
/// atomize their members, maps and function items are not atomizable.
pub fn atomize<N: XdmNode>(seq: &[XdmItem<N>]) -> Result<Vec<XdmAtomicValue>, Error> {
    let mut out = Vec::with_capacity(seq.len());
    atomize_into(seq, &mut out)?;
    Ok(out)
}

fn atomize_into<N: XdmNode>(seq: &[XdmItem<N>], out: &mut Vec<XdmAtomicValue>) -> Result<(), Error> {
    for item in seq {
        match item {
            XdmItem::Atomic(a) => out.push(a.clone()),
            XdmItem::Node(n) => out.extend(n.typed_value()),
            XdmItem::Array(a) => {
                for member in a.members() {
                    atomize_into(member, out)?;
                }
            }
            XdmItem::Function(_) | XdmItem::Map(_) => {
                return Err(Error::from_code(
                    ErrorCode::FOTY0013,
                    "function items cannot be atomized",
                ));
            }
        }
    }
    Ok(())
}

/// Effective boolean value (`fn:boolean` and every boolean context).
pub fn effective_boolean_value<N: XdmNode>(seq: &[XdmItem<N>]) -> Result<bool, Error> {
    match seq {
        [] => Ok(false),
        [XdmItem::Node(_), ..] => Ok(true),
        [XdmItem::Atomic(a)] => {
            use XdmAtomicValue as V;
            match a {
                V::Boolean(b) => Ok(*b),
                V::String(s) | V::UntypedAtomic(s) | V::AnyUri(s) => Ok(!s.is_empty()),
                V::NormalizedString(s)
                | V::Token(s)
                | V::Language(s)
                | V::NMTOKEN(s)
                | V::Name(s)
                | V::NCName(s)
                | V::Id(s)
                | V::IdRef(s)
                | V::Entity(s) => Ok(!s.is_empty()),
                _ if a.is_numeric() => {
                    let d = a.double_value().unwrap_or(f64::NAN);
                    Ok(!d.is_nan() && d != 0.0)
                }
                _ => Err(Error::from_code(
                    ErrorCode::FORG0006,
                    format!(
                        "effective boolean value undefined for xs:{}",
                        a.type_of().local_name()
                    ),
                )),
            }
        }
        _ => Err(Error::from_code(
            ErrorCode::FORG0006,
            "effective boolean value undefined for this sequence",
        )),
    }
}

/// The string value of one item (`fn:string` applied to it).
pub fn item_string_value<N: XdmNode>(item: &XdmItem<N>) -> Result<String, Error> {
    match item {
        XdmItem::Node(n) => Ok(n.string_value()),
        XdmItem::Atomic(a) => Ok(a.string_value()),
        XdmItem::Function(_) | XdmItem::Map(_) | XdmItem::Array(_) => Err(Error::from_code(
            ErrorCode::FOTY0014,
            "function items have no string value",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::{elem, text};

    #[test]
    fn ebv_rules() {
        type S = XdmSequence<crate::model::simple::SimpleNode>;
        let empty: S = vec![];
        assert!(!effective_boolean_value(&empty).unwrap());
        let s: S = vec![XdmItem::Atomic(XdmAtomicValue::String("x".into()))];
        assert!(effective_boolean_value(&s).unwrap());
        let zero: S = vec![XdmItem::Atomic(XdmAtomicValue::Double(0.0))];
        assert!(!effective_boolean_value(&zero).unwrap());
        let nan: S = vec![XdmItem::Atomic(XdmAtomicValue::Double(f64::NAN))];
        assert!(!effective_boolean_value(&nan).unwrap());
        let node: S = vec![XdmItem::Node(elem("a").child(text("1")).build())];
        assert!(effective_boolean_value(&node).unwrap());
        // Two atomics: error, not "true-ish".
        let two: S = vec![
            XdmItem::Atomic(XdmAtomicValue::Integer(1)),
            XdmItem::Atomic(XdmAtomicValue::Integer(2)),
        ];
        assert!(effective_boolean_value(&two).is_err());
    }

    #[test]
    fn atomize_flattens_nodes() {
        let n = elem("a").child(text("42")).build();
        let seq: XdmSequence<_> = vec![XdmItem::Node(n)];
        let atoms = atomize(&seq).unwrap();
        assert_eq!(atoms, vec![XdmAtomicValue::UntypedAtomic("42".into())]);
    }
}
