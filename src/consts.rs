//! Namespace URIs and other well-known constants.

/// XPath Functions and Operators namespace (`fn:`).
pub const FN_NS: &str = "http://www.w3.org/2005/xpath-functions";
/// XML Schema namespace (`xs:`).
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";
/// Math functions namespace (`math:`, XPath 3.0+).
pub const MATH_NS: &str = "http://www.w3.org/2005/xpath-functions/math";
/// Map functions namespace (`map:`, XPath 3.1).
pub const MAP_NS: &str = "http://www.w3.org/2005/xpath-functions/map";
/// Array functions namespace (`array:`, XPath 3.1).
pub const ARRAY_NS: &str = "http://www.w3.org/2005/xpath-functions/array";
/// W3C error codes namespace (`err:`).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";
/// The reserved `xml` prefix namespace. Cannot be rebound.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
/// XML Schema instance namespace (`xsi:`).
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Local function declarations (`local:`).
pub const LOCAL_NS: &str = "http://www.w3.org/2005/xquery-local-functions";

/// Unicode codepoint collation, the default collation everywhere.
pub const CODEPOINT_URI: &str =
    "http://www.w3.org/2005/xpath-functions/collation/codepoint";
/// Built-in case-insensitive collation.
pub const CASE_BLIND_URI: &str = "urn:xdmpath:collation:case-blind";
/// Built-in accent-insensitive collation.
pub const ACCENT_BLIND_URI: &str = "urn:xdmpath:collation:accent-blind";
/// Built-in case- and accent-insensitive collation.
pub const CASE_ACCENT_BLIND_URI: &str = "urn:xdmpath:collation:case-accent-blind";
