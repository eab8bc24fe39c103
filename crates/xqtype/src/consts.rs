//! Well-known namespace URIs.

/// XML Schema namespace (`xs:` prefix).
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
/// Default function namespace (`fn:` prefix).
pub const FNS: &str = "http://www.w3.org/2005/xpath-functions";
/// Namespace of W3C-defined error codes (`err:` prefix).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";
/// The reserved `xml` namespace.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
