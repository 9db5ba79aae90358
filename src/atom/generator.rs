use crate::parsable::{
    ExtraXml, Handler, ParseContext, ParseError, ParseOutcome, Parsable, XmlBuilder,
};
use crate::xml::XmlElement;

/// The agent that produced a feed (`<generator>`). Read-only once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generator {
    fields: GeneratorFields,
    extra: ExtraXml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct GeneratorFields {
    name: Option<String>,
    uri: Option<String>,
    version: Option<String>,
}

impl Generator {
    pub fn name(&self) -> Option<&str> {
        self.fields.name.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.fields.uri.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.fields.version.as_deref()
    }
}

impl Handler for GeneratorFields {
    fn pre_parse(&mut self, root: &XmlElement, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        if let Some(uri) = root.attribute("uri") {
            if uri.is_empty() {
                return Err(ParseError::required_property_missing(root, "@uri"));
            }
            self.uri = Some(uri.to_owned());
        }
        self.version = root.attribute("version").map(str::to_owned);
        self.name = root.text();
        Ok(())
    }

    fn parse_text(&mut self, _text: &str, _ctx: &ParseContext<'_>) -> Result<ParseOutcome, ParseError> {
        // Already captured whole in pre_parse
        Ok(ParseOutcome::Consumed)
    }

    fn write_attributes(&self, out: &mut XmlBuilder) {
        out.optional_attribute("uri", self.uri.as_deref());
        out.optional_attribute("version", self.version.as_deref());
    }

    fn write_children(&self, out: &mut XmlBuilder) {
        if let Some(name) = &self.name {
            out.text(name);
        }
    }
}

impl Parsable for Generator {
    const ELEMENT_NAME: &'static str = "generator";

    fn blank() -> Self {
        Self {
            fields: GeneratorFields::default(),
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
