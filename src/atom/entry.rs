use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::parsable::{
    parse_element, write_element, ExtraXml, Handler, Namespaces, ParseContext, ParseError,
    ParseOutcome, Parsable, XmlBuilder,
};
use crate::util::format_iso8601;
use crate::xml::{XmlElement, ATOM_NS, GDATA_NS};

use super::{set_once, set_timestamp, Author, Category, Link};

/// A generic Atom `<entry>`.
///
/// No child is mandatory: some services return entries that carry only
/// service-specific elements. Specialized entry types wrap an `Entry` and
/// put their own [`Handler`] in front of [`Entry::handlers`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    fields: EntryFields,
    extra: ExtraXml,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct EntryFields {
    title: Option<String>,
    summary: Option<String>,
    id: Option<String>,
    etag: Option<String>,
    updated: Option<DateTime<Utc>>,
    published: Option<DateTime<Utc>>,
    content: Option<String>,
    rights: Option<String>,
    categories: Vec<Category>,
    links: Vec<Link>,
    authors: Vec<Author>,
}

impl Entry {
    /// Creates an empty entry. `id` is normally assigned by the server.
    pub fn new(id: Option<&str>) -> Self {
        let mut entry = Self::blank();
        entry.fields.id = id.map(str::to_owned);
        entry
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.title.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.fields.summary.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.id.as_deref()
    }

    /// Version tag of the server's copy, from the `gd:etag` attribute.
    pub fn etag(&self) -> Option<&str> {
        self.fields.etag.as_deref()
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.fields.updated
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.fields.published
    }

    /// Text content, or the `src` URI of out-of-line content.
    pub fn content(&self) -> Option<&str> {
        self.fields.content.as_deref()
    }

    pub fn rights(&self) -> Option<&str> {
        self.fields.rights.as_deref()
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

    pub fn set_title(&mut self, title: Option<&str>) {
        self.fields.title = title.map(str::to_owned);
    }

    pub fn set_summary(&mut self, summary: Option<&str>) {
        self.fields.summary = summary.map(str::to_owned);
    }

    pub fn set_content(&mut self, content: Option<&str>) {
        self.fields.content = content.map(str::to_owned);
    }

    pub fn set_rights(&mut self, rights: Option<&str>) {
        self.fields.rights = rights.map(str::to_owned);
    }

    /// Adds a category unless one with the same term is already present.
    pub fn add_category(&mut self, category: Category) {
        add_unique(&mut self.fields.categories, category, Category::compare);
    }

    /// Adds a link unless one with the same URI and relation is already present.
    pub fn add_link(&mut self, link: Link) {
        add_unique(&mut self.fields.links, link, Link::compare);
    }

    /// Adds an author unless one with the same name is already present.
    pub fn add_author(&mut self, author: Author) {
        add_unique(&mut self.fields.authors, author, Author::compare);
    }

    /// First link with the given relation type.
    pub fn look_up_link(&self, rel: &str) -> Option<&Link> {
        self.fields.links.iter().find(|link| link.relation_type() == rel)
    }

    /// All links with the given relation type, in document order.
    pub fn look_up_links(&self, rel: &str) -> Vec<&Link> {
        self.fields
            .links
            .iter()
            .filter(|link| link.relation_type() == rel)
            .collect()
    }

    /// True once the server has stored the entry: it has an id, an update
    /// time and at least one link.
    pub fn is_inserted(&self) -> bool {
        self.fields.id.is_some() && self.fields.updated.is_some() && !self.fields.links.is_empty()
    }
}

fn add_unique<T>(items: &mut Vec<T>, item: T, compare: fn(&T, &T) -> Ordering) {
    if !items.iter().any(|existing| compare(existing, &item) == Ordering::Equal) {
        items.push(item);
    }
}

impl Handler for EntryFields {
    fn pre_parse(&mut self, root: &XmlElement, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        self.etag = root.attribute_ns(GDATA_NS, "etag").map(str::to_owned);
        Ok(())
    }

    fn parse_child(&mut self, node: &XmlElement, ctx: &ParseContext<'_>) -> Result<ParseOutcome, ParseError> {
        if !node.is_namespace(ATOM_NS) {
            return Ok(ParseOutcome::Delegate);
        }

        match node.name() {
            "title" => set_once(&mut self.title, node)?,
            "id" => set_once(&mut self.id, node)?,
            "updated" => set_timestamp(&mut self.updated, node)?,
            "published" => set_timestamp(&mut self.published, node)?,
            "summary" => set_once(&mut self.summary, node)?,
            "rights" => set_once(&mut self.rights, node)?,
            "content" => {
                if self.content.is_some() {
                    return Err(ParseError::duplicate_element(node));
                }
                // Present but empty still counts, so a second <content> is caught
                self.content = Some(
                    node.text()
                        .or_else(|| node.attribute("src").map(str::to_owned))
                        .unwrap_or_default(),
                );
            }
            "category" => self.categories.push(parse_element(node, ctx)?),
            "link" => self.links.push(parse_element(node, ctx)?),
            "author" => self.authors.push(parse_element(node, ctx)?),
            _ => return Ok(ParseOutcome::Delegate),
        }
        Ok(ParseOutcome::Consumed)
    }

    fn namespaces(&self, namespaces: &mut Namespaces) {
        namespaces.insert("gd", GDATA_NS);
    }

    fn write_attributes(&self, out: &mut XmlBuilder) {
        out.optional_attribute("gd:etag", self.etag.as_deref());
    }

    fn write_children(&self, out: &mut XmlBuilder) {
        out.escaped("<title type='text'>", self.title.as_deref().unwrap_or_default(), "</title>");
        out.optional_text_element("id", self.id.as_deref());
        if let Some(updated) = &self.updated {
            out.text_element("updated", &format_iso8601(updated));
        }
        if let Some(published) = &self.published {
            out.text_element("published", &format_iso8601(published));
        }
        if let Some(summary) = &self.summary {
            out.escaped("<summary type='text'>", summary, "</summary>");
        }
        out.optional_text_element("rights", self.rights.as_deref());
        if let Some(content) = &self.content {
            out.escaped("<content type='text'>", content, "</content>");
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
    }
}

impl Parsable for Entry {
    const ELEMENT_NAME: &'static str = "entry";

    fn blank() -> Self {
        Self {
            fields: EntryFields::default(),
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
