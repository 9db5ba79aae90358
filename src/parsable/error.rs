use thiserror::Error;

use crate::xml::{XmlElement, ATOM_NS};

/// Errors that can occur while parsing an entity from XML.
///
/// The `element` fields hold a printable location such as `<feed/title>`:
/// the element name, prefixed by its parent where known, with namespace
/// prefixes kept for anything outside Atom.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("Error parsing XML: {0}")]
    Xml(String),

    /// The document contains no root element.
    #[error("Error parsing XML: Empty document.")]
    EmptyDocument,

    /// SEC-003: Element nesting exceeds the configured limit.
    #[error("XML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// An element that must carry text was empty.
    #[error("A {element} element was missing required content.")]
    RequiredContentMissing { element: String },

    /// A mandatory child element never appeared.
    #[error("A required element (<{parent}/{element}>) was not present.")]
    RequiredElementMissing { element: String, parent: String },

    /// A mandatory attribute was absent or empty. `property` includes the `@`.
    #[error("A required property of a {element} element ({property}) was not present.")]
    RequiredPropertyMissing { element: String, property: String },

    /// A singleton child appeared more than once.
    #[error("A singleton element ({element}) was duplicated.")]
    DuplicateElement { element: String },

    /// A timestamp could not be parsed.
    #[error("The content of a {element} element (\"{value}\") was not in ISO 8601 format.")]
    NotIso8601Format { element: String, value: String },

    /// An attribute carried a value outside its permitted set.
    #[error("The value of the {property} property of a {element} element (\"{value}\") was unknown.")]
    UnknownPropertyValue {
        element: String,
        property: String,
        value: String,
    },

    /// An element or text was not recognized by any handler.
    #[error("The content of a {element} element (\"{content}\") was unknown.")]
    UnknownContent { element: String, content: String },

    /// A value passed to a constructor or setter violated an entity invariant.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The background parse task ended without producing a result.
    #[error("Feed parsing was aborted: {0}")]
    Aborted(String),
}

/// Fieldless discriminant of [`ParseError`], convenient for matching in callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    Xml,
    EmptyDocument,
    MaxDepthExceeded,
    RequiredContentMissing,
    RequiredElementMissing,
    RequiredPropertyMissing,
    DuplicateElement,
    NotIso8601Format,
    UnknownPropertyValue,
    UnknownContent,
    InvalidValue,
    Aborted,
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            Self::Xml(_) => ParseErrorKind::Xml,
            Self::EmptyDocument => ParseErrorKind::EmptyDocument,
            Self::MaxDepthExceeded(_) => ParseErrorKind::MaxDepthExceeded,
            Self::RequiredContentMissing { .. } => ParseErrorKind::RequiredContentMissing,
            Self::RequiredElementMissing { .. } => ParseErrorKind::RequiredElementMissing,
            Self::RequiredPropertyMissing { .. } => ParseErrorKind::RequiredPropertyMissing,
            Self::DuplicateElement { .. } => ParseErrorKind::DuplicateElement,
            Self::NotIso8601Format { .. } => ParseErrorKind::NotIso8601Format,
            Self::UnknownPropertyValue { .. } => ParseErrorKind::UnknownPropertyValue,
            Self::UnknownContent { .. } => ParseErrorKind::UnknownContent,
            Self::InvalidValue(_) => ParseErrorKind::InvalidValue,
            Self::Aborted(_) => ParseErrorKind::Aborted,
        }
    }

    pub fn required_content_missing(element: &XmlElement) -> Self {
        Self::RequiredContentMissing {
            element: element_path(element),
        }
    }

    /// `element_name` and `parent_name` are plain names such as `"title"` and `"feed"`.
    pub fn required_element_missing(element_name: &str, parent_name: &str) -> Self {
        Self::RequiredElementMissing {
            element: element_name.to_owned(),
            parent: parent_name.to_owned(),
        }
    }

    /// `property` is the attribute name including its `@`, e.g. `"@term"`.
    pub fn required_property_missing(element: &XmlElement, property: &str) -> Self {
        Self::RequiredPropertyMissing {
            element: element_path(element),
            property: property.to_owned(),
        }
    }

    pub fn duplicate_element(element: &XmlElement) -> Self {
        Self::DuplicateElement {
            element: element_path(element),
        }
    }

    pub fn not_iso8601_format(element: &XmlElement, actual: &str) -> Self {
        Self::NotIso8601Format {
            element: element_path(element),
            value: actual.to_owned(),
        }
    }

    pub fn unknown_property_value(element: &XmlElement, property: &str, actual: &str) -> Self {
        Self::UnknownPropertyValue {
            element: element_path(element),
            property: property.to_owned(),
            value: actual.to_owned(),
        }
    }

    pub fn unknown_content(element: &XmlElement, actual: &str) -> Self {
        Self::UnknownContent {
            element: element_path(element),
            content: actual.to_owned(),
        }
    }
}

/// Formats an element for error messages: `<parent/name>`.
///
/// Atom and unprefixed names print bare; anything else keeps its prefix,
/// e.g. `<entry/gd:who>`.
pub fn element_path(element: &XmlElement) -> String {
    fn printable(prefix: Option<&str>, namespace: Option<&str>, local: &str) -> String {
        match prefix {
            Some(prefix) if namespace != Some(ATOM_NS) => format!("{prefix}:{local}"),
            _ => local.to_owned(),
        }
    }

    let name = printable(element.prefix(), element.namespace(), element.name());
    match element.parent() {
        Some(parent) => format!(
            "<{}/{}>",
            printable(parent.prefix(), parent.namespace(), parent.local()),
            name
        ),
        None => format!("<{name}>"),
    }
}
