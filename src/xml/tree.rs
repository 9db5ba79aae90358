use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName as RawName;
use quick_xml::{Reader, Writer};

use super::XML_NS;
use crate::parsable::ParseError;
use crate::util::escape_text;

/// A namespace-resolved element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    prefix: Option<String>,
    local: String,
    namespace: Option<String>,
}

impl QName {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    /// The namespace URI the prefix (or default namespace) resolved to.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: QName,
    pub value: String,
}

/// A child of an element: either a nested element or character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element of a parsed document, with its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: QName,
    parent: Option<QName>,
    /// Namespace declarations written on this element, in document order.
    declarations: Vec<(Option<String>, String)>,
    attributes: Vec<XmlAttribute>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Local name, without prefix.
    pub fn name(&self) -> &str {
        &self.name.local
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.prefix()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }

    pub fn qname(&self) -> &QName {
        &self.name
    }

    /// Name of the enclosing element, or `None` for the document root.
    pub fn parent(&self) -> Option<&QName> {
        self.parent.as_ref()
    }

    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// Looks up an attribute by local name, ignoring its namespace.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.local == local)
            .map(|attr| attr.value.as_str())
    }

    /// Looks up an attribute bound to `namespace`.
    ///
    /// `gd:etag` matches when `gd` resolves to `namespace`; `foo:etag` and a
    /// bare `etag` do not.
    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.local == local && attr.name.namespace() == Some(namespace))
            .map(|attr| attr.value.as_str())
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Iterates over child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated character data of the direct children.
    ///
    /// Returns `None` when the element has no text children at all, so
    /// `<uri/>` and `<uri></uri>` both yield `None`.
    pub fn text(&self) -> Option<String> {
        let mut text: Option<String> = None;
        for node in &self.children {
            if let XmlNode::Text(chunk) = node {
                text.get_or_insert_with(String::new).push_str(chunk);
            }
        }
        text
    }

    pub fn is_namespace(&self, namespace_uri: &str) -> bool {
        super::is_namespace(self, namespace_uri)
    }

    /// Serializes this element and its subtree.
    ///
    /// Namespace declarations written on the element are reproduced;
    /// prefixes bound by ancestors are not. Use [`collect_namespaces`]
    /// to find those.
    ///
    /// [`collect_namespaces`]: XmlElement::collect_namespaces
    pub fn write_to<W: io::Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        let name = self.name.to_string();
        let mut start = BytesStart::new(name.as_str());
        for (prefix, uri) in &self.declarations {
            let key = match prefix {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_owned(),
            };
            push_escaped_attribute(&mut start, &key, uri);
        }
        for attr in &self.attributes {
            push_escaped_attribute(&mut start, &attr.name.to_string(), &attr.value);
        }

        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start));
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                XmlNode::Element(element) => element.write_to(writer)?,
                XmlNode::Text(text) => {
                    writer.write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))
    }

    pub fn to_xml_string(&self) -> String {
        let mut writer = Writer::new(Vec::new());
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut writer);
        String::from_utf8_lossy(&writer.into_inner()).into_owned()
    }

    /// Records every prefix used in this subtree together with the URI it
    /// resolved to. The `xml:` prefix is never recorded.
    pub fn collect_namespaces(&self, out: &mut BTreeMap<String, String>) {
        let names = std::iter::once(&self.name).chain(self.attributes.iter().map(|a| &a.name));
        for name in names {
            if let (Some(prefix), Some(uri)) = (name.prefix(), name.namespace()) {
                if prefix != "xml" {
                    out.entry(prefix.to_owned()).or_insert_with(|| uri.to_owned());
                }
            }
        }
        for child in self.elements() {
            child.collect_namespaces(out);
        }
    }
}

fn xml_error(e: impl fmt::Display) -> ParseError {
    ParseError::Xml(e.to_string())
}

fn utf8(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(xml_error)
}

type Scope = Vec<(Option<String>, String)>;

/// Resolves a raw `prefix:local` name against the in-scope declarations.
///
/// Unprefixed attributes never take the default namespace.
fn resolve(raw: &str, scope: &Scope, is_element: bool) -> Result<QName, ParseError> {
    match raw.split_once(':') {
        Some((prefix, local)) => {
            let namespace = if prefix == "xml" {
                XML_NS.to_owned()
            } else {
                scope
                    .iter()
                    .rev()
                    .find(|(p, _)| p.as_deref() == Some(prefix))
                    .map(|(_, uri)| uri.clone())
                    .ok_or_else(|| {
                        ParseError::Xml(format!("Namespace prefix {prefix} on {raw} is not defined"))
                    })?
            };
            Ok(QName {
                prefix: Some(prefix.to_owned()),
                local: local.to_owned(),
                namespace: Some(namespace),
            })
        }
        None => {
            let namespace = if is_element {
                scope
                    .iter()
                    .rev()
                    .find(|(p, _)| p.is_none())
                    .map(|(_, uri)| uri.clone())
                    .filter(|uri| !uri.is_empty())
            } else {
                None
            };
            Ok(QName {
                prefix: None,
                local: raw.to_owned(),
                namespace,
            })
        }
    }
}

/// Builds an element from its start tag, pushing its namespace declarations
/// onto `scope`. The caller pops them when the element closes.
fn open_element(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    scope: &mut Scope,
    parent: Option<&QName>,
) -> Result<XmlElement, ParseError> {
    let mut declarations = Vec::new();
    let mut raw_attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = utf8(attr.key.as_ref())?.to_owned();
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(xml_error)?
            .into_owned();

        if key == "xmlns" {
            declarations.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.push((Some(prefix.to_owned()), value));
        } else {
            raw_attributes.push((key, value));
        }
    }

    scope.extend(declarations.iter().cloned());

    let name = resolve(utf8(e.name().as_ref())?, scope, true)?;
    let attributes = raw_attributes
        .into_iter()
        .map(|(key, value)| {
            Ok(XmlAttribute {
                name: resolve(&key, scope, false)?,
                value,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(XmlElement {
        name,
        parent: parent.cloned(),
        declarations,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    element: XmlElement,
    stack: &mut [(XmlElement, usize)],
    root: &mut Option<XmlElement>,
) -> Result<(), ParseError> {
    if let Some((parent, _)) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(ParseError::Xml(
            "Extra content at the end of the document".to_owned(),
        ));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [(XmlElement, usize)], text: &str) -> Result<(), ParseError> {
    let Some((element, _)) = stack.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(ParseError::Xml(
            "Character data outside the root element".to_owned(),
        ));
    };

    if let Some(XmlNode::Text(existing)) = element.children.last_mut() {
        existing.push_str(text);
    } else {
        element.children.push(XmlNode::Text(text.to_owned()));
    }
    Ok(())
}

/// Parses a complete document into an element tree.
///
/// Comments, processing instructions and the DOCTYPE are skipped. Text and
/// CDATA are kept verbatim, whitespace included; deciding which whitespace
/// is insignificant is left to the entity handlers.
///
/// # Errors
///
/// - [`ParseError::EmptyDocument`] when there is no root element
/// - [`ParseError::MaxDepthExceeded`] when elements nest deeper than `max_depth`
/// - [`ParseError::Xml`] for malformed XML and unbound namespace prefixes
///
/// # Security
///
/// `quick-xml` never expands `<!ENTITY>` declarations; only the five
/// predefined entities and character references are resolved. Unknown
/// entity references fail with [`ParseError::Xml`].
pub fn parse_tree(input: &str, max_depth: usize) -> Result<XmlElement, ParseError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = Reader::from_str(input);

    let mut scope: Scope = Vec::new();
    // Open elements paired with the scope length to restore when they close
    let mut stack: Vec<(XmlElement, usize)> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                // SEC-003: Reject excessively nested documents
                if stack.len() >= max_depth {
                    return Err(ParseError::MaxDepthExceeded(max_depth));
                }
                let mark = scope.len();
                let element = open_element(&e, &reader, &mut scope, stack.last().map(|(p, _)| &p.name))?;
                stack.push((element, mark));
            }
            Ok(Event::Empty(e)) => {
                if stack.len() >= max_depth {
                    return Err(ParseError::MaxDepthExceeded(max_depth));
                }
                let mark = scope.len();
                let element = open_element(&e, &reader, &mut scope, stack.last().map(|(p, _)| &p.name))?;
                scope.truncate(mark);
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let Some((element, mark)) = stack.pop() else {
                    return Err(ParseError::Xml("Unexpected closing tag".to_owned()));
                };
                scope.truncate(mark);
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(xml_error)?;
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(c)) => {
                push_text(&mut stack, utf8(&c)?)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(e)),
        }
    }

    if let Some((element, _)) = stack.last() {
        return Err(ParseError::Xml(format!(
            "Premature end of data in tag {}",
            element.name
        )));
    }

    root.ok_or(ParseError::EmptyDocument)
}

/// Pushes an attribute whose value is escaped with [`escape_text`], so
/// control characters survive as character references.
fn push_escaped_attribute(start: &mut BytesStart<'_>, key: &str, value: &str) {
    let value = escape_text(value);
    start.push_attribute(Attribute {
        key: RawName(key.as_bytes()),
        value: Cow::Borrowed(value.as_bytes()),
    });
}
