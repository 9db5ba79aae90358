use std::cell::RefCell;
use std::fmt;

use chrono::{DateTime, Utc};

use super::progress::{ProgressSink, SinkObserver};
use crate::atom::{set_once, set_timestamp, Author, Category, Entry, Generator, Link};
use crate::parsable::{
    parse_document_into, parse_element, write_element, ExtraXml, Handler, Namespaces,
    ParseContext, ParseError, ParseOptions, ParseOutcome, Parsable, XmlBuilder,
};
use crate::util::format_iso8601;
use crate::xml::{XmlElement, ATOM_NS, GDATA_NS, OPENSEARCH_NS};

/// Entries that expose their Atom `<id>`, for [`Feed::look_up_entry`].
pub trait AtomEntry {
    fn id(&self) -> Option<&str>;
}

impl AtomEntry for Entry {
    fn id(&self) -> Option<&str> {
        Entry::id(self)
    }
}

/// A parsed Atom feed whose entries are of type `E`.
///
/// Feeds are only produced by [`parse_feed`] (or the fetch helpers); there
/// is no public constructor. Entries keep document order.
///
/// A service-specific feed composes a `Feed<E>` and puts its own handler in
/// front of [`Parsable::handlers`]; see [`AtomFeed`].
pub struct Feed<E = Entry> {
    fields: FeedFields<E>,
    extra: ExtraXml,
}

struct FeedFields<E> {
    title: Option<String>,
    subtitle: Option<String>,
    id: Option<String>,
    etag: Option<String>,
    updated: Option<DateTime<Utc>>,
    logo: Option<String>,
    icon: Option<String>,
    generator: Option<Generator>,
    categories: Vec<Category>,
    links: Vec<Link>,
    authors: Vec<Author>,
    entries: Vec<E>,
    items_per_page: Option<u32>,
    start_index: Option<u32>,
    total_results: Option<u32>,
}

impl<E> Default for FeedFields<E> {
    fn default() -> Self {
        Self {
            title: None,
            subtitle: None,
            id: None,
            etag: None,
            updated: None,
            logo: None,
            icon: None,
            generator: None,
            categories: Vec::new(),
            links: Vec::new(),
            authors: Vec::new(),
            entries: Vec::new(),
            items_per_page: None,
            start_index: None,
            total_results: None,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Feed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = &self.fields;
        f.debug_struct("Feed")
            .field("title", &fields.title)
            .field("subtitle", &fields.subtitle)
            .field("id", &fields.id)
            .field("etag", &fields.etag)
            .field("updated", &fields.updated)
            .field("logo", &fields.logo)
            .field("icon", &fields.icon)
            .field("generator", &fields.generator)
            .field("categories", &fields.categories)
            .field("links", &fields.links)
            .field("authors", &fields.authors)
            .field("items_per_page", &fields.items_per_page)
            .field("start_index", &fields.start_index)
            .field("total_results", &fields.total_results)
            .field("entries", &fields.entries)
            .field("extra", &self.extra)
            .finish()
    }
}

impl<E> Feed<E> {
    pub fn title(&self) -> &str {
        self.fields.title.as_deref().unwrap_or_default()
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.fields.subtitle.as_deref()
    }

    pub fn id(&self) -> &str {
        self.fields.id.as_deref().unwrap_or_default()
    }

    pub fn etag(&self) -> Option<&str> {
        self.fields.etag.as_deref()
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.fields.updated.unwrap_or_default()
    }

    pub fn logo(&self) -> Option<&str> {
        self.fields.logo.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.fields.icon.as_deref()
    }

    pub fn generator(&self) -> Option<&Generator> {
        self.fields.generator.as_ref()
    }

    pub fn categories(&self) -> &[Category] {
        &self.fields.categories
    }

    pub fn links(&self) -> &[Link] {
        &self.fields.links
    }

    pub fn authors(&self) -> &[Author] {
        &self.fields.authors
    }

    pub fn entries(&self) -> &[E] {
        &self.fields.entries
    }

    pub fn into_entries(self) -> Vec<E> {
        self.fields.entries
    }

    /// OpenSearch `itemsPerPage`, 0 when absent.
    pub fn items_per_page(&self) -> u32 {
        self.fields.items_per_page.unwrap_or(0)
    }

    /// OpenSearch `startIndex`, 1 when absent.
    pub fn start_index(&self) -> u32 {
        self.fields.start_index.unwrap_or(1)
    }

    /// OpenSearch `totalResults`, 0 when absent.
    pub fn total_results(&self) -> u32 {
        self.fields.total_results.unwrap_or(0)
    }

    /// First link with the given relation type.
    pub fn look_up_link(&self, rel: &str) -> Option<&Link> {
        self.fields.links.iter().find(|link| link.relation_type() == rel)
    }
}

impl<E: AtomEntry> Feed<E> {
    /// First entry whose id equals `id`.
    pub fn look_up_entry(&self, id: &str) -> Option<&E> {
        self.fields.entries.iter().find(|entry| entry.id() == Some(id))
    }
}

impl<E> FeedFields<E> {
    fn progress_count(&self) -> u32 {
        self.items_per_page
            .unwrap_or(0)
            .min(self.total_results.unwrap_or(0))
    }

    fn has_paging(&self) -> bool {
        self.items_per_page.is_some() || self.start_index.is_some() || self.total_results.is_some()
    }
}

fn set_count(slot: &mut Option<u32>, node: &XmlElement) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::duplicate_element(node));
    }
    let text = node
        .text()
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ParseError::required_content_missing(node))?;
    let value = text
        .trim()
        .parse::<u32>()
        .map_err(|_| ParseError::unknown_content(node, &text))?;
    *slot = Some(value);
    Ok(())
}

impl<E: Parsable + Clone + 'static> FeedFields<E> {
    fn parse_atom_child(&mut self, node: &XmlElement, ctx: &ParseContext<'_>) -> Result<ParseOutcome, ParseError> {
        match node.name() {
            "entry" => {
                let entry: E = parse_element(node, ctx)?;
                let index = self.entries.len();
                ctx.notify_entry(&entry, index, self.progress_count());
                self.entries.push(entry);
            }
            "title" => set_once(&mut self.title, node)?,
            "subtitle" => set_once(&mut self.subtitle, node)?,
            "id" => set_once(&mut self.id, node)?,
            "logo" => set_once(&mut self.logo, node)?,
            "icon" => set_once(&mut self.icon, node)?,
            "updated" => set_timestamp(&mut self.updated, node)?,
            "generator" => {
                if self.generator.is_some() {
                    return Err(ParseError::duplicate_element(node));
                }
                self.generator = Some(parse_element(node, ctx)?);
            }
            "category" => self.categories.push(parse_element(node, ctx)?),
            "link" => self.links.push(parse_element(node, ctx)?),
            "author" => self.authors.push(parse_element(node, ctx)?),
            _ => return Ok(ParseOutcome::Delegate),
        }
        Ok(ParseOutcome::Consumed)
    }

    fn parse_opensearch_child(&mut self, node: &XmlElement) -> Result<ParseOutcome, ParseError> {
        match node.name() {
            "totalResults" => set_count(&mut self.total_results, node)?,
            "startIndex" => set_count(&mut self.start_index, node)?,
            "itemsPerPage" => set_count(&mut self.items_per_page, node)?,
            _ => return Ok(ParseOutcome::Delegate),
        }
        Ok(ParseOutcome::Consumed)
    }
}

impl<E: Parsable + Clone + 'static> Handler for FeedFields<E> {
    fn pre_parse(&mut self, root: &XmlElement, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        self.etag = root.attribute_ns(GDATA_NS, "etag").map(str::to_owned);
        Ok(())
    }

    fn parse_child(&mut self, node: &XmlElement, ctx: &ParseContext<'_>) -> Result<ParseOutcome, ParseError> {
        if node.is_namespace(ATOM_NS) {
            self.parse_atom_child(node, ctx)
        } else if node.is_namespace(OPENSEARCH_NS) {
            self.parse_opensearch_child(node)
        } else {
            Ok(ParseOutcome::Delegate)
        }
    }

    fn post_parse(&mut self, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        if self.title.is_none() {
            return Err(ParseError::required_element_missing("title", "feed"));
        }
        if self.id.is_none() {
            return Err(ParseError::required_element_missing("id", "feed"));
        }
        if self.updated.is_none() {
            return Err(ParseError::required_element_missing("updated", "feed"));
        }
        Ok(())
    }

    fn namespaces(&self, namespaces: &mut Namespaces) {
        if self.etag.is_some() {
            namespaces.insert("gd", GDATA_NS);
        }
        if self.has_paging() {
            namespaces.insert("openSearch", OPENSEARCH_NS);
        }
        for entry in &self.entries {
            for handler in entry.handlers() {
                handler.namespaces(namespaces);
            }
        }
    }

    fn write_attributes(&self, out: &mut XmlBuilder) {
        out.optional_attribute("gd:etag", self.etag.as_deref());
    }

    fn write_children(&self, out: &mut XmlBuilder) {
        out.optional_text_element("title", self.title.as_deref());
        out.optional_text_element("id", self.id.as_deref());
        if let Some(updated) = &self.updated {
            out.text_element("updated", &format_iso8601(updated));
        }
        out.optional_text_element("subtitle", self.subtitle.as_deref());
        out.optional_text_element("logo", self.logo.as_deref());
        out.optional_text_element("icon", self.icon.as_deref());
        if let Some(generator) = &self.generator {
            write_element(generator, out, false);
        }
        for category in &self.categories {
            write_element(category, out, false);
        }
        for link in &self.links {
            write_element(link, out, false);
        }
        for author in &self.authors {
            write_element(author, out, false);
        }

        let paging = [
            ("openSearch:totalResults", self.total_results),
            ("openSearch:startIndex", self.start_index),
            ("openSearch:itemsPerPage", self.items_per_page),
        ];
        for (name, value) in paging {
            if let Some(value) = value {
                out.text_element(name, &value.to_string());
            }
        }

        for entry in &self.entries {
            write_element(entry, out, false);
        }
    }
}

impl<E: Parsable + Clone + 'static> Parsable for Feed<E> {
    const ELEMENT_NAME: &'static str = "feed";

    fn blank() -> Self {
        Self {
            fields: FeedFields::default(),
            extra: ExtraXml::default(),
        }
    }

    fn handlers(&self) -> Vec<&dyn Handler> {
        vec![&self.fields]
    }

    fn handlers_mut(&mut self) -> Vec<&mut dyn Handler> {
        vec![&mut self.fields]
    }

    fn extra_xml(&self) -> &ExtraXml {
        &self.extra
    }

    fn extra_xml_mut(&mut self) -> &mut ExtraXml {
        &mut self.extra
    }
}

/// A feed entity: [`Feed`] itself, or a type that extends it.
///
/// Extending types keep a `Feed<Self::Entry>` inside, chain their own
/// handler ahead of the feed's, and hand the inner feed out here so the
/// generic parse and fetch helpers can report on it.
pub trait AtomFeed: Parsable {
    type Entry: Parsable + Clone + 'static;

    fn feed(&self) -> &Feed<Self::Entry>;
}

impl<E: Parsable + Clone + 'static> AtomFeed for Feed<E> {
    type Entry = E;

    fn feed(&self) -> &Feed<E> {
        self
    }
}

/// Parses a complete feed document, building entries as `E`.
///
/// Shorthand for [`parse_feed_as`] with a plain [`Feed`].
pub fn parse_feed<E: Parsable + Clone + 'static>(
    xml: impl AsRef<[u8]>,
    options: &ParseOptions,
    progress: Option<Box<dyn ProgressSink<E> + Send>>,
) -> Result<Feed<E>, ParseError> {
    parse_feed_as::<Feed<E>>(xml, options, progress)
}

/// Parses a complete feed document into `F`.
///
/// When `progress` is given, each entry is cloned into it as soon as the
/// entry is parsed. The sink belongs to this call only and is dropped
/// before it returns, which closes a channel-backed sink.
///
/// # Errors
///
/// - [`ParseError::Xml`] / [`ParseError::EmptyDocument`] for unusable input
/// - [`ParseError::RequiredElementMissing`] when `title`, `id` or `updated` is absent
/// - [`ParseError::DuplicateElement`] for a repeated singleton
/// - [`ParseError::UnknownContent`] for unrecognized content under the reject policy
///   or non-numeric OpenSearch values
/// - Any error raised while parsing an entry
pub fn parse_feed_as<F: AtomFeed>(
    xml: impl AsRef<[u8]>,
    options: &ParseOptions,
    progress: Option<Box<dyn ProgressSink<F::Entry> + Send>>,
) -> Result<F, ParseError> {
    let mut target = F::blank();
    match progress {
        Some(sink) => {
            let observer = RefCell::new(SinkObserver::new(sink));
            let ctx = ParseContext::with_observer(options, &observer);
            parse_document_into(&mut target, xml.as_ref(), &ctx)?;
        }
        None => parse_document_into(&mut target, xml.as_ref(), &ParseContext::new(options))?,
    }

    let feed = target.feed();
    tracing::debug!(
        id = %feed.id(),
        entries = feed.entries().len(),
        total_results = feed.total_results(),
        "Parsed feed"
    );
    Ok(target)
}
