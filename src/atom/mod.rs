//! Atom entities: authors, categories, generators, links and entries.
//!
//! Each type validates its invariants on construction and on parse, and
//! serializes through the shared [`Parsable`](crate::parsable::Parsable)
//! protocol.

mod author;
mod category;
mod entry;
mod generator;
mod link;

pub use author::Author;
pub use category::Category;
pub use entry::Entry;
pub use generator::Generator;
pub use link::{expand_relation, relation, Link};

use chrono::{DateTime, Utc};

use crate::parsable::ParseError;
use crate::util::parse_iso8601;
use crate::xml::XmlElement;

/// Stores a singleton child's text, failing if it was already set.
///
/// An element with no text stores the empty string, so presence is still
/// detected on a second occurrence.
pub(crate) fn set_once(slot: &mut Option<String>, node: &XmlElement) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::duplicate_element(node));
    }
    *slot = Some(node.text().unwrap_or_default());
    Ok(())
}

/// Parses a singleton ISO 8601 timestamp child.
pub(crate) fn set_timestamp(
    slot: &mut Option<DateTime<Utc>>,
    node: &XmlElement,
) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::duplicate_element(node));
    }
    let text = node.text().unwrap_or_default();
    let timestamp = parse_iso8601(&text).ok_or_else(|| ParseError::not_iso8601_format(node, &text))?;
    *slot = Some(timestamp);
    Ok(())
}
