//! XML document model and namespace constants.
//!
//! Documents are read into an owned [`XmlElement`] tree before any entity
//! sees them. Each element records its resolved namespace URI and the
//! qualified name of its parent so that error messages and namespace checks
//! work without walking back up the tree.

mod tree;

pub use tree::{parse_tree, QName, XmlAttribute, XmlElement, XmlNode};

/// The Atom syndication namespace.
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// The OpenSearch 1.1 namespace used for paging metadata.
pub const OPENSEARCH_NS: &str = "http://a9.com/-/spec/opensearch/1.1/";

/// The GData namespace (`gd:` prefix).
pub const GDATA_NS: &str = "http://schemas.google.com/g/2005";

/// The namespace bound to the reserved `xml:` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Returns true if `element` belongs to `namespace_uri`.
///
/// An element with no namespace at all is treated as Atom.
pub fn is_namespace(element: &XmlElement, namespace_uri: &str) -> bool {
    match element.namespace() {
        Some(ns) => ns == namespace_uri,
        None => namespace_uri == ATOM_NS,
    }
}
