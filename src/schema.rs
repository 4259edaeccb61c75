//! Optional schema provider consulted during static analysis.
//!
//! The engine itself never validates; a provider only refines the static
//! types of element and attribute steps and answers derivation queries for
//! user-defined types.

use crate::xdm::ExpandedName;
use crate::xdm::types::AtomicType;

pub trait SchemaProvider: Send + Sync {
    /// Declared type of a global element, if the schema knows it.
    fn element_type(&self, name: &ExpandedName) -> Option<AtomicType>;

    /// Declared type of a global attribute, if the schema knows it.
    fn attribute_type(&self, name: &ExpandedName) -> Option<AtomicType>;

    /// Whether `sub` derives from `sup` under this schema. Built-in
    /// derivation is answered without consulting the provider.
    fn is_derived(&self, sub: &ExpandedName, sup: &ExpandedName) -> bool {
        sub == sup
    }
}

/// A provider that knows nothing; static analysis stays fully conservative.
pub struct NoSchema;

impl SchemaProvider for NoSchema {
    fn element_type(&self, _name: &ExpandedName) -> Option<AtomicType> {
        None
    }
    fn attribute_type(&self, _name: &ExpandedName) -> Option<AtomicType> {
        None
    }
}
