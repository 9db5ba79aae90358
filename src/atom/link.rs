use std::cmp::Ordering;

use crate::parsable::{ExtraXml, Handler, ParseContext, ParseError, Parsable, XmlBuilder};
use crate::xml::XmlElement;

/// Well-known link relation types, in their expanded IANA form.
pub mod relation {
    /// Prefix applied to registered relation names such as `self`.
    pub const IANA_PREFIX: &str = "http://www.iana.org/assignments/relation/";

    pub const ALTERNATE: &str = "http://www.iana.org/assignments/relation/alternate";
    pub const SELF: &str = "http://www.iana.org/assignments/relation/self";
    pub const RELATED: &str = "http://www.iana.org/assignments/relation/related";
    pub const EDIT: &str = "http://www.iana.org/assignments/relation/edit";
    pub const EDIT_MEDIA: &str = "http://www.iana.org/assignments/relation/edit-media";
    pub const ENCLOSURE: &str = "http://www.iana.org/assignments/relation/enclosure";
    pub const VIA: &str = "http://www.iana.org/assignments/relation/via";
    pub const NEXT: &str = "http://www.iana.org/assignments/relation/next";
    pub const PREVIOUS: &str = "http://www.iana.org/assignments/relation/previous";
}

/// Expands a registered relation name (`self`, `next`) to its full URI.
/// Values that are already URIs are returned unchanged.
pub fn expand_relation(rel: &str) -> String {
    if rel.contains(':') {
        rel.to_owned()
    } else {
        format!("{}{rel}", relation::IANA_PREFIX)
    }
}

/// An Atom `<link>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    fields: LinkFields,
    extra: ExtraXml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkFields {
    uri: String,
    relation_type: String,
    content_type: Option<String>,
    language: Option<String>,
    title: Option<String>,
    length: Option<u64>,
}

impl Default for LinkFields {
    fn default() -> Self {
        Self {
            uri: String::new(),
            relation_type: relation::ALTERNATE.to_owned(),
            content_type: None,
            language: None,
            title: None,
            length: None,
        }
    }
}

impl Link {
    /// Creates a link; `rel` defaults to [`relation::ALTERNATE`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if `uri` is empty.
    pub fn new(uri: &str, rel: Option<&str>) -> Result<Self, ParseError> {
        let mut link = Self::blank();
        link.set_uri(uri)?;
        link.set_relation_type(rel);
        Ok(link)
    }

    pub fn uri(&self) -> &str {
        &self.fields.uri
    }

    pub fn relation_type(&self) -> &str {
        &self.fields.relation_type
    }

    pub fn content_type(&self) -> Option<&str> {
        self.fields.content_type.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.fields.language.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.title.as_deref()
    }

    pub fn length(&self) -> Option<u64> {
        self.fields.length
    }

    pub fn set_uri(&mut self, uri: &str) -> Result<(), ParseError> {
        if uri.is_empty() {
            return Err(ParseError::InvalidValue("link URI must not be empty".to_owned()));
        }
        self.fields.uri = uri.to_owned();
        Ok(())
    }

    /// `None` resets the relation to [`relation::ALTERNATE`].
    pub fn set_relation_type(&mut self, rel: Option<&str>) {
        self.fields.relation_type = match rel {
            Some(rel) if !rel.is_empty() => expand_relation(rel),
            _ => relation::ALTERNATE.to_owned(),
        };
    }

    pub fn set_content_type(&mut self, content_type: Option<&str>) {
        self.fields.content_type = content_type.map(str::to_owned);
    }

    pub fn set_language(&mut self, language: Option<&str>) {
        self.fields.language = language.map(str::to_owned);
    }

    pub fn set_title(&mut self, title: Option<&str>) {
        self.fields.title = title.map(str::to_owned);
    }

    pub fn set_length(&mut self, length: Option<u64>) {
        self.fields.length = length;
    }

    /// Orders links by URI, then relation. Links equal on both are duplicates.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.uri()
            .cmp(other.uri())
            .then_with(|| self.relation_type().cmp(other.relation_type()))
    }
}

impl Handler for LinkFields {
    fn pre_parse(&mut self, root: &XmlElement, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        match root.attribute("href") {
            Some(href) if !href.is_empty() => self.uri = href.to_owned(),
            _ => return Err(ParseError::required_property_missing(root, "@href")),
        }

        if let Some(rel) = root.attribute("rel").filter(|rel| !rel.is_empty()) {
            self.relation_type = expand_relation(rel);
        }
        self.content_type = root.attribute("type").map(str::to_owned);
        self.language = root.attribute("hreflang").map(str::to_owned);
        self.title = root.attribute("title").map(str::to_owned);

        if let Some(length) = root.attribute("length") {
            let parsed = length
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::unknown_property_value(root, "@length", length))?;
            self.length = Some(parsed);
        }
        Ok(())
    }

    fn write_attributes(&self, out: &mut XmlBuilder) {
        out.attribute("href", &self.uri);
        out.optional_attribute("title", self.title.as_deref());
        out.attribute("rel", &self.relation_type);
        out.optional_attribute("type", self.content_type.as_deref());
        out.optional_attribute("hreflang", self.language.as_deref());
        if let Some(length) = self.length {
            out.attribute("length", &length.to_string());
        }
    }
}

impl Parsable for Link {
    const ELEMENT_NAME: &'static str = "link";

    fn blank() -> Self {
        Self {
            fields: LinkFields::default(),
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
