use std::cmp::Ordering;

use crate::parsable::{
    ExtraXml, Handler, ParseContext, ParseError, ParseOutcome, Parsable, XmlBuilder,
};
use crate::xml::{XmlElement, ATOM_NS};

use super::set_once;

/// An Atom person construct (`<author>`).
///
/// The name is always non-empty; construction, setters and parsing all
/// enforce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    fields: AuthorFields,
    extra: ExtraXml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AuthorFields {
    name: Option<String>,
    uri: Option<String>,
    email_address: Option<String>,
}

impl Author {
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if `name` is empty.
    pub fn new(name: &str, uri: Option<&str>, email_address: Option<&str>) -> Result<Self, ParseError> {
        let mut author = Self::blank();
        author.set_name(name)?;
        author.set_uri(uri);
        author.set_email_address(email_address);
        Ok(author)
    }

    pub fn name(&self) -> &str {
        self.fields.name.as_deref().unwrap_or_default()
    }

    pub fn uri(&self) -> Option<&str> {
        self.fields.uri.as_deref()
    }

    pub fn email_address(&self) -> Option<&str> {
        self.fields.email_address.as_deref()
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ParseError> {
        if name.is_empty() {
            return Err(ParseError::InvalidValue("author name must not be empty".to_owned()));
        }
        self.fields.name = Some(name.to_owned());
        Ok(())
    }

    pub fn set_uri(&mut self, uri: Option<&str>) {
        self.fields.uri = uri.map(str::to_owned);
    }

    pub fn set_email_address(&mut self, email_address: Option<&str>) {
        self.fields.email_address = email_address.map(str::to_owned);
    }

    /// Orders authors by name. Feeds and entries treat equal names as duplicates.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.name().cmp(other.name())
    }
}

impl Handler for AuthorFields {
    fn parse_child(&mut self, node: &XmlElement, _ctx: &ParseContext<'_>) -> Result<ParseOutcome, ParseError> {
        if !node.is_namespace(ATOM_NS) {
            return Ok(ParseOutcome::Delegate);
        }

        match node.name() {
            "name" => {
                if self.name.is_some() {
                    return Err(ParseError::duplicate_element(node));
                }
                let name = node
                    .text()
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| ParseError::required_content_missing(node))?;
                self.name = Some(name);
            }
            "uri" => set_once(&mut self.uri, node)?,
            "email" => set_once(&mut self.email_address, node)?,
            _ => return Ok(ParseOutcome::Delegate),
        }
        Ok(ParseOutcome::Consumed)
    }

    fn post_parse(&mut self, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        if self.name.is_none() {
            return Err(ParseError::required_element_missing("name", "author"));
        }
        Ok(())
    }

    fn write_children(&self, out: &mut XmlBuilder) {
        out.optional_text_element("name", self.name.as_deref());
        out.optional_text_element("uri", self.uri.as_deref());
        out.optional_text_element("email", self.email_address.as_deref());
    }
}

impl Parsable for Author {
    const ELEMENT_NAME: &'static str = "author";

    fn blank() -> Self {
        Self {
            fields: AuthorFields::default(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsable::{ParseErrorKind, ParseOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_author_round_trip() {
        let author = Author::new(
            "John Smöth",
            Some("http://example.com/"),
            Some("john@example.com"),
        )
        .unwrap();

        let xml = author.to_xml();
        assert_eq!(
            xml,
            "<author xmlns='http://www.w3.org/2005/Atom'><name>John Smöth</name><uri>http://example.com/</uri><email>john@example.com</email></author>"
        );
        assert_eq!(Author::from_xml(&xml).unwrap(), author);
    }

    #[test]
    fn test_name_only_serializes_just_name() {
        let author = Author::new("A", None, None).unwrap();
        let mut out = XmlBuilder::new();
        for handler in author.handlers() {
            handler.write_children(&mut out);
        }
        assert_eq!(out.as_str(), "<name>A</name>");
    }

    #[test]
    fn test_missing_name() {
        let err = Author::from_xml("<author><email>a@b.c</email></author>").unwrap_err();
        assert_eq!(err, ParseError::required_element_missing("name", "author"));
    }

    #[test]
    fn test_empty_name_element() {
        let err = Author::from_xml("<author><name></name></author>").unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::RequiredContentMissing);
        assert_eq!(err.to_string(), "A <author/name> element was missing required content.");
    }

    #[test]
    fn test_duplicate_uri() {
        let err = Author::from_xml("<author><name>A</name><uri>x</uri><uri>y</uri></author>").unwrap_err();
        assert_eq!(err.to_string(), "A singleton element (<author/uri>) was duplicated.");
    }

    #[test]
    fn test_empty_name_rejected_by_setters() {
        assert!(Author::new("", None, None).is_err());

        let mut author = Author::new("A", None, None).unwrap();
        assert_eq!(author.set_name("").unwrap_err().kind(), ParseErrorKind::InvalidValue);
        assert_eq!(author.name(), "A");
    }

    #[test]
    fn test_compare_by_name() {
        let a = Author::new("Alice", Some("http://a/"), None).unwrap();
        let a2 = Author::new("Alice", None, Some("x@y")).unwrap();
        let b = Author::new("Bob", None, None).unwrap();
        assert_eq!(a.compare(&a2), Ordering::Equal);
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn test_foreign_child_preserved() {
        let xml = "<author xmlns='http://www.w3.org/2005/Atom' xmlns:gd='http://schemas.google.com/g/2005'>\
                   <name>A</name><gd:extra>1</gd:extra></author>";
        let author = Author::from_xml_with(xml, &ParseOptions::preserving()).unwrap();
        assert_eq!(
            author.to_xml(),
            "<author xmlns='http://www.w3.org/2005/Atom' xmlns:gd='http://schemas.google.com/g/2005'><name>A</name><gd:extra>1</gd:extra></author>"
        );
    }
}
