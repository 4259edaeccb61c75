//! String collations.
//!
//! The Unicode codepoint collation is always registered and is the default
//! everywhere. The case/accent-insensitive built-ins are one configurable
//! folding collation registered under three URIs; anything locale-sensitive
//! plugs in through the registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::consts::{ACCENT_BLIND_URI, CASE_ACCENT_BLIND_URI, CASE_BLIND_URI, CODEPOINT_URI};
use crate::engine::runtime::{Error, ErrorCode};

/// A collation is fully described by its key function: equal keys mean
/// equal strings, and ordering is ordering of keys. `distinct-values`,
/// `index-of`, and the contains/starts/ends family all work on keys.
pub trait Collation: Send + Sync + std::fmt::Debug {
    fn uri(&self) -> &str;

    /// Collation key. The default is the identity, i.e. codepoint
    /// semantics.
    fn key(&self, s: &str) -> String {
        s.to_string()
    }

    fn compare(&self, a: &str, b: &str) -> core::cmp::Ordering {
        self.key(a).cmp(&self.key(b))
    }

    fn equals(&self, a: &str, b: &str) -> bool {
        self.key(a) == self.key(b)
    }
}

/// The Unicode codepoint collation: identity keys, codepoint order.
pub struct CodepointCollation;

impl Collation for CodepointCollation {
    fn uri(&self) -> &str {
        CODEPOINT_URI
    }
}

/// The built-in insensitive collations: decompose, optionally drop
/// combining marks, optionally fold case.
pub struct FoldingCollation {
    uri: &'static str,
    fold_case: bool,
    strip_marks: bool,
}

impl FoldingCollation {
    pub const CASE_BLIND: FoldingCollation = FoldingCollation {
        uri: CASE_BLIND_URI,
        fold_case: true,
        strip_marks: false,
    };
    pub const ACCENT_BLIND: FoldingCollation = FoldingCollation {
        uri: ACCENT_BLIND_URI,
        fold_case: false,
        strip_marks: true,
    };
    pub const CASE_ACCENT_BLIND: FoldingCollation = FoldingCollation {
        uri: CASE_ACCENT_BLIND_URI,
        fold_case: true,
        strip_marks: true,
    };
}

impl Collation for FoldingCollation {
    fn uri(&self) -> &str {
        self.uri
    }

    fn key(&self, s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        use unicode_normalization::char::is_combining_mark;
        let mut key = String::with_capacity(s.len());
        for c in s.nfd() {
            if self.strip_marks && is_combining_mark(c) {
                continue;
            }
            if self.fold_case {
                key.extend(c.to_lowercase());
            } else {
                key.push(c);
            }
        }
        key
    }
}

/// Registry of collations keyed by URI.
pub struct CollationRegistry {
    by_uri: HashMap<String, Arc<dyn Collation>>,
}

impl Default for CollationRegistry {
    fn default() -> Self {
        let mut reg = Self {
            by_uri: HashMap::new(),
        };
        reg.insert(Arc::new(CodepointCollation));
        reg.insert(Arc::new(FoldingCollation::CASE_BLIND));
        reg.insert(Arc::new(FoldingCollation::ACCENT_BLIND));
        reg.insert(Arc::new(FoldingCollation::CASE_ACCENT_BLIND));
        reg
    }
}

impl CollationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collation: Arc<dyn Collation>) {
        self.by_uri.insert(collation.uri().to_string(), collation);
    }

    pub fn get(&self, uri: &str) -> Option<Arc<dyn Collation>> {
        self.by_uri.get(uri).cloned()
    }

    /// Resolve a URI (or the default when absent) or fail with `FOCH0002`.
    pub fn resolve(&self, uri: Option<&str>, default: &str) -> Result<Arc<dyn Collation>, Error> {
        let uri = uri.unwrap_or(default);
        self.get(uri).ok_or_else(|| {
            Error::from_code(ErrorCode::FOCH0002, format!("unknown collation URI: {uri}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codepoint_is_identity() {
        let c = CodepointCollation;
        assert_eq!(c.key("Straße"), "Straße");
        assert!(c.compare("a", "b").is_lt());
        assert!(!c.equals("a", "A"));
    }

    #[test]
    fn folding_collations_fold_what_they_claim() {
        assert!(FoldingCollation::CASE_BLIND.equals("ABC", "abc"));
        assert!(!FoldingCollation::CASE_BLIND.equals("été", "ete"));
        assert!(FoldingCollation::ACCENT_BLIND.equals("été", "ete"));
        assert!(!FoldingCollation::ACCENT_BLIND.equals("ÉTÉ", "ete"));
        assert!(FoldingCollation::CASE_ACCENT_BLIND.equals("ÉTÉ", "ete"));
    }

    #[test]
    fn registry_resolves_default_and_rejects_unknown() {
        let reg = CollationRegistry::default();
        assert!(reg.resolve(None, crate::consts::CODEPOINT_URI).is_ok());
        let err = reg.resolve(Some("urn:nope"), crate::consts::CODEPOINT_URI);
        assert!(err.unwrap_err().is_code(ErrorCode::FOCH0002));
    }
}
