use std::cmp::Ordering;

use crate::parsable::{ExtraXml, Handler, ParseContext, ParseError, Parsable, XmlBuilder};
use crate::xml::XmlElement;

/// An Atom `<category>`: a `term` with optional `scheme` and `label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    fields: CategoryFields,
    extra: ExtraXml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CategoryFields {
    term: String,
    scheme: Option<String>,
    label: Option<String>,
}

impl Category {
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if `term` is empty.
    pub fn new(term: &str, scheme: Option<&str>, label: Option<&str>) -> Result<Self, ParseError> {
        let mut category = Self::blank();
        category.set_term(term)?;
        category.set_scheme(scheme);
        category.set_label(label);
        Ok(category)
    }

    pub fn term(&self) -> &str {
        &self.fields.term
    }

    pub fn scheme(&self) -> Option<&str> {
        self.fields.scheme.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.fields.label.as_deref()
    }

    pub fn set_term(&mut self, term: &str) -> Result<(), ParseError> {
        if term.is_empty() {
            return Err(ParseError::InvalidValue("category term must not be empty".to_owned()));
        }
        self.fields.term = term.to_owned();
        Ok(())
    }

    pub fn set_scheme(&mut self, scheme: Option<&str>) {
        self.fields.scheme = scheme.map(str::to_owned);
    }

    pub fn set_label(&mut self, label: Option<&str>) {
        self.fields.label = label.map(str::to_owned);
    }

    /// Orders categories by term; equal terms are duplicates.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.term().cmp(other.term())
    }
}

impl Handler for CategoryFields {
    fn pre_parse(&mut self, root: &XmlElement, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        match root.attribute("term") {
            Some(term) if !term.is_empty() => self.term = term.to_owned(),
            _ => return Err(ParseError::required_property_missing(root, "@term")),
        }
        self.scheme = root.attribute("scheme").map(str::to_owned);
        self.label = root.attribute("label").map(str::to_owned);
        Ok(())
    }

    fn write_attributes(&self, out: &mut XmlBuilder) {
        out.attribute("term", &self.term);
        out.optional_attribute("scheme", self.scheme.as_deref());
        out.optional_attribute("label", self.label.as_deref());
    }
}

impl Parsable for Category {
    const ELEMENT_NAME: &'static str = "category";

    fn blank() -> Self {
        Self {
            fields: CategoryFields::default(),
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
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serializes_attributes_and_self_closes() {
        let category = Category::new(
            "jokes",
            Some("http://foobar.com#categories"),
            Some("Jokes & Trivia"),
        )
        .unwrap();
        assert_eq!(
            category.to_xml(),
            "<category xmlns='http://www.w3.org/2005/Atom' term='jokes' scheme='http://foobar.com#categories' label='Jokes &amp; Trivia'/>"
        );
    }

    #[test]
    fn test_parse() {
        let category = Category::from_xml(
            "<category xmlns='http://www.w3.org/2005/Atom' term='jokes' label='Jokes &amp; Trivia'/>",
        )
        .unwrap();
        assert_eq!(category.term(), "jokes");
        assert_eq!(category.scheme(), None);
        assert_eq!(category.label(), Some("Jokes & Trivia"));
    }

    #[test]
    fn test_missing_or_empty_term() {
        let missing = Category::from_xml("<category label='x'/>").unwrap_err();
        assert_eq!(
            missing.to_string(),
            "A required property of a <category> element (@term) was not present."
        );

        let empty = Category::from_xml("<category term=''/>").unwrap_err();
        assert_eq!(empty, missing);
    }

    #[test]
    fn test_setters_keep_term_non_empty() {
        let mut category = Category::new("a", None, None).unwrap();
        assert!(category.set_term("").is_err());
        category.set_scheme(Some("urn:s"));
        assert_eq!(category.term(), "a");
        assert_eq!(category.scheme(), Some("urn:s"));
    }
}
