//! The parse/serialize protocol shared by every entity.
//!
//! An entity is a [`Parsable`]: a type with an XML element name and an
//! ordered chain of [`Handler`]s, most-derived first. A type that extends
//! another (a specialized entry extending [`Entry`](crate::atom::Entry),
//! say) composes the base value and puts its own handler in front of the
//! base's chain. Parsing a child element walks the chain until a handler
//! reports [`ParseOutcome::Consumed`]; if none does, the entity's
//! [`ExtraXml`] applies the configured [`UnknownElementPolicy`].
//!
//! Serialization runs the chain the other way round so ancestors emit their
//! attributes and children before descendants do:
//!
//! ```text
//! <name [xmlns='Atom' xmlns:p='..']* [extra xmlns]* [attributes]*>
//!   [children]* [preserved extra XML]
//! </name>
//! ```
//!
//! An element with no body self-closes.
//!
//! # Examples
//!
//! ```
//! use gfeed::atom::Author;
//! use gfeed::parsable::Parsable;
//!
//! let author = Author::from_xml("<author><name>Jo</name><email>jo@example.com</email></author>")?;
//! assert_eq!(author.name(), "Jo");
//! assert_eq!(
//!     author.to_xml(),
//!     "<author xmlns='http://www.w3.org/2005/Atom'><name>Jo</name><email>jo@example.com</email></author>"
//! );
//! # Ok::<(), gfeed::parsable::ParseError>(())
//! ```

mod error;
mod writer;

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

pub use error::{element_path, ParseError, ParseErrorKind};
pub use writer::XmlBuilder;

use crate::xml::{parse_tree, XmlElement, XmlNode, ATOM_NS};

/// SEC-003: Default limit on element nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// What to do with child elements and text that no handler recognizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownElementPolicy {
    /// Fail the parse with [`ParseError::UnknownContent`].
    #[default]
    Reject,
    /// Keep the markup and re-emit it when the entity is serialized.
    Preserve,
}

/// Per-parse settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub unknown_elements: UnknownElementPolicy,
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            unknown_elements: UnknownElementPolicy::Reject,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    /// Default options with unknown content preserved.
    pub fn preserving() -> Self {
        Self {
            unknown_elements: UnknownElementPolicy::Preserve,
            ..Self::default()
        }
    }
}

/// Receives entities as soon as a container finishes parsing them.
///
/// The entity arrives type-erased; observers downcast to the entry type
/// they were built for.
pub trait ParseObserver {
    fn entry_parsed(&mut self, entry: &dyn Any, index: usize, count: u32);
}

/// State threaded through one document parse.
///
/// The observer lives only as long as the parse, so entities never hold
/// on to it.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    options: &'a ParseOptions,
    observer: Option<&'a RefCell<dyn ParseObserver + 'a>>,
}

impl<'a> ParseContext<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        Self { options, observer: None }
    }

    pub fn with_observer(options: &'a ParseOptions, observer: &'a RefCell<dyn ParseObserver + 'a>) -> Self {
        Self {
            options,
            observer: Some(observer),
        }
    }

    pub fn options(&self) -> &'a ParseOptions {
        self.options
    }

    /// Hands a freshly parsed entry to the observer, if there is one.
    pub fn notify_entry(&self, entry: &dyn Any, index: usize, count: u32) {
        if let Some(observer) = self.observer {
            observer.borrow_mut().entry_parsed(entry, index, count);
        }
    }
}

impl fmt::Debug for ParseContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseContext")
            .field("options", self.options)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Result of offering a child to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The handler recognized and stored the node.
    Consumed,
    /// Not recognized; pass it to the next handler in the chain.
    Delegate,
}

/// Prefix to namespace URI declarations, ordered by prefix.
pub type Namespaces = BTreeMap<&'static str, &'static str>;

/// One level of an entity's parse/serialize behaviour.
///
/// Every method has a no-op default, so a handler implements only the
/// hooks it needs. Failures are returned as errors; there is no separate
/// "failed" outcome.
pub trait Handler {
    /// Runs before any child is seen. Attributes of the entity's own
    /// element are read here.
    fn pre_parse(&mut self, _root: &XmlElement, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        Ok(())
    }

    fn parse_child(
        &mut self,
        _node: &XmlElement,
        _ctx: &ParseContext<'_>,
    ) -> Result<ParseOutcome, ParseError> {
        Ok(ParseOutcome::Delegate)
    }

    /// Offered each non-whitespace text run directly inside the entity's element.
    fn parse_text(&mut self, _text: &str, _ctx: &ParseContext<'_>) -> Result<ParseOutcome, ParseError> {
        Ok(ParseOutcome::Delegate)
    }

    /// Runs after all children. Required-element checks belong here.
    fn post_parse(&mut self, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        Ok(())
    }

    /// Adds the prefixes this level uses to a standalone document's root.
    fn namespaces(&self, _namespaces: &mut Namespaces) {}

    /// Appends ` name='value'` pairs to the open start tag.
    fn write_attributes(&self, _out: &mut XmlBuilder) {}

    /// Appends child markup.
    fn write_children(&self, _out: &mut XmlBuilder) {}
}

/// Markup that no handler claimed, kept under [`UnknownElementPolicy::Preserve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraXml {
    content: String,
    namespaces: BTreeMap<String, String>,
}

impl ExtraXml {
    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Prefixes used by the preserved markup and the URIs they were bound to.
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    fn reject(parent: &XmlElement, child: &XmlNode, owner: &str) -> ParseError {
        match child {
            XmlNode::Element(element) => {
                tracing::debug!(element = %element_path(element), owner, "Rejecting unhandled XML");
                ParseError::unknown_content(element, &element.text().unwrap_or_default())
            }
            XmlNode::Text(text) => {
                tracing::debug!(element = %element_path(parent), "Rejecting unhandled text");
                ParseError::unknown_content(parent, text)
            }
        }
    }

    fn preserve(&mut self, parent: &XmlElement, child: &XmlNode, owner: &str) {
        match child {
            XmlNode::Element(element) => {
                tracing::debug!(element = %element_path(element), owner, "Unhandled XML preserved");
                self.content.push_str(&element.to_xml_string());
                element.collect_namespaces(&mut self.namespaces);
            }
            XmlNode::Text(text) => {
                tracing::debug!(element = %element_path(parent), "Unhandled text preserved");
                crate::util::append_escaped(&mut self.content, "", text, "");
            }
        }
    }
}

/// A typed entity with an XML representation.
///
/// Implementors supply the element name, a blank instance for the parser to
/// fill, and their handler chain. Parsing and serialization come for free.
pub trait Parsable: Sized {
    /// Local name of the entity's element.
    const ELEMENT_NAME: &'static str;

    /// Prefix used when serializing, for elements outside Atom.
    const ELEMENT_PREFIX: Option<&'static str> = None;

    /// An empty instance for the parser to populate.
    ///
    /// Its required fields are unset, so it is not a valid entity until a
    /// parse into it succeeds.
    fn blank() -> Self;

    /// The handler chain, most-derived first.
    fn handlers(&self) -> Vec<&dyn Handler>;

    /// Mutable handler chain, in the same order as [`handlers`](Parsable::handlers).
    fn handlers_mut(&mut self) -> Vec<&mut dyn Handler>;

    fn extra_xml(&self) -> &ExtraXml;

    fn extra_xml_mut(&mut self) -> &mut ExtraXml;

    /// Parses a standalone document with default options.
    fn from_xml(xml: impl AsRef<[u8]>) -> Result<Self, ParseError> {
        parse_document(xml)
    }

    fn from_xml_with(xml: impl AsRef<[u8]>, options: &ParseOptions) -> Result<Self, ParseError> {
        parse_document_with(xml, options)
    }

    /// Serializes as a standalone document fragment with namespace declarations.
    fn to_xml(&self) -> String {
        serialize(self)
    }
}

/// Parses a complete document into `P` with default options.
pub fn parse_document<P: Parsable>(xml: impl AsRef<[u8]>) -> Result<P, ParseError> {
    parse_document_with(xml, &ParseOptions::default())
}

/// Parses a complete document into `P`.
///
/// # Errors
///
/// - [`ParseError::Xml`] if the bytes are not UTF-8 or not well-formed XML
/// - [`ParseError::EmptyDocument`] if there is no root element
/// - Any error raised by the entity's handlers
pub fn parse_document_with<P: Parsable>(
    xml: impl AsRef<[u8]>,
    options: &ParseOptions,
) -> Result<P, ParseError> {
    let mut parsable = P::blank();
    parse_document_into(&mut parsable, xml.as_ref(), &ParseContext::new(options))?;
    Ok(parsable)
}

/// Parses a complete document into an existing `target` under `ctx`.
pub fn parse_document_into<P: Parsable>(
    target: &mut P,
    xml: &[u8],
    ctx: &ParseContext<'_>,
) -> Result<(), ParseError> {
    let text = std::str::from_utf8(xml).map_err(|e| ParseError::Xml(e.to_string()))?;
    let root = parse_tree(text, ctx.options().max_depth)?;
    parse_into(target, &root, ctx)
}

/// Parses a nested element into a fresh `P`. Handlers use this for child entities.
pub fn parse_element<P: Parsable>(node: &XmlElement, ctx: &ParseContext<'_>) -> Result<P, ParseError> {
    let mut parsable = P::blank();
    parse_into(&mut parsable, node, ctx)?;
    Ok(parsable)
}

/// Runs the full handler protocol for `node` against `target`.
///
/// The handler chain is built once. Children no handler claims are either
/// rejected on the spot or kept and moved into the entity's [`ExtraXml`]
/// once the chain is released.
pub fn parse_into<P: Parsable>(
    target: &mut P,
    node: &XmlElement,
    ctx: &ParseContext<'_>,
) -> Result<(), ParseError> {
    let mut unclaimed: Vec<&XmlNode> = Vec::new();
    {
        let mut handlers = target.handlers_mut();
        for handler in handlers.iter_mut().rev() {
            handler.pre_parse(node, ctx)?;
        }

        for child in node.children() {
            let claimed = match child {
                XmlNode::Element(element) => offer_element(&mut handlers, element, ctx)?,
                XmlNode::Text(text) if text.chars().all(char::is_whitespace) => true,
                XmlNode::Text(text) => offer_text(&mut handlers, text, ctx)?,
            };
            if claimed {
                continue;
            }
            match ctx.options().unknown_elements {
                UnknownElementPolicy::Reject => {
                    return Err(ExtraXml::reject(node, child, P::ELEMENT_NAME));
                }
                UnknownElementPolicy::Preserve => unclaimed.push(child),
            }
        }

        for handler in handlers.iter_mut().rev() {
            handler.post_parse(ctx)?;
        }
    }

    let extra = target.extra_xml_mut();
    for child in unclaimed {
        extra.preserve(node, child, P::ELEMENT_NAME);
    }
    Ok(())
}

fn offer_element(
    handlers: &mut [&mut dyn Handler],
    element: &XmlElement,
    ctx: &ParseContext<'_>,
) -> Result<bool, ParseError> {
    for handler in handlers.iter_mut() {
        if handler.parse_child(element, ctx)? == ParseOutcome::Consumed {
            return Ok(true);
        }
    }
    Ok(false)
}

fn offer_text(
    handlers: &mut [&mut dyn Handler],
    text: &str,
    ctx: &ParseContext<'_>,
) -> Result<bool, ParseError> {
    for handler in handlers.iter_mut() {
        if handler.parse_text(text, ctx)? == ParseOutcome::Consumed {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Serializes `parsable` as a standalone fragment.
pub fn serialize<P: Parsable>(parsable: &P) -> String {
    let mut out = XmlBuilder::new();
    write_element(parsable, &mut out, true);
    out.into_string()
}

/// Writes `parsable` into `out`.
///
/// With `standalone` set, the Atom default namespace and every prefix the
/// handlers report are declared on the element. Nested entities rely on
/// their container for those declarations.
pub fn write_element<P: Parsable>(parsable: &P, out: &mut XmlBuilder, standalone: bool) {
    let handlers = parsable.handlers();
    let name = match P::ELEMENT_PREFIX {
        Some(prefix) => format!("{prefix}:{}", P::ELEMENT_NAME),
        None => P::ELEMENT_NAME.to_owned(),
    };

    out.raw("<");
    out.raw(&name);

    let mut declared = Namespaces::new();
    if standalone {
        out.attribute("xmlns", ATOM_NS);
        for handler in &handlers {
            handler.namespaces(&mut declared);
        }
        for (prefix, uri) in &declared {
            out.attribute(&format!("xmlns:{prefix}"), uri);
        }
    }
    for (prefix, uri) in parsable.extra_xml().namespaces() {
        if !declared.contains_key(prefix.as_str()) {
            out.attribute(&format!("xmlns:{prefix}"), uri);
        }
    }

    for handler in handlers.iter().rev() {
        handler.write_attributes(out);
    }
    out.raw(">");

    let mark = out.len();
    for handler in handlers.iter().rev() {
        handler.write_children(out);
    }
    out.raw(parsable.extra_xml().as_str());
    out.finish_element(mark, &name);
}
