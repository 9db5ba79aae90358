use crate::util::append_escaped;

/// Output buffer for entity serialization.
///
/// Attributes are written single-quoted, which `quick_xml::Writer` cannot
/// produce. Content passed through the typed helpers is escaped with
/// [`escape_text`](crate::util::escape_text); [`raw`](XmlBuilder::raw) is
/// for markup only.
#[derive(Debug, Default)]
pub struct XmlBuilder {
    buf: String,
}

impl XmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends markup verbatim.
    pub fn raw(&mut self, markup: &str) {
        self.buf.push_str(markup);
    }

    /// Appends escaped character data.
    pub fn text(&mut self, content: &str) {
        append_escaped(&mut self.buf, "", content, "");
    }

    /// Appends ` name='value'`.
    pub fn attribute(&mut self, name: &str, value: &str) {
        self.buf.push(' ');
        self.buf.push_str(name);
        append_escaped(&mut self.buf, "='", value, "'");
    }

    pub fn optional_attribute(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.attribute(name, value);
        }
    }

    /// Appends `pre`, the escaped `content`, then `post`.
    pub fn escaped(&mut self, pre: &str, content: &str, post: &str) {
        append_escaped(&mut self.buf, pre, content, post);
    }

    /// Appends `<name>content</name>`.
    pub fn text_element(&mut self, name: &str, content: &str) {
        self.buf.push('<');
        self.buf.push_str(name);
        self.buf.push('>');
        self.text(content);
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
    }

    pub fn optional_text_element(&mut self, name: &str, content: Option<&str>) {
        if let Some(content) = content {
            self.text_element(name, content);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    /// Closes a start tag whose body has not been written yet.
    ///
    /// If the buffer has not grown past `mark` (the length just after the
    /// start tag's `>`), the `>` is rewritten to `/>`. Otherwise the end
    /// tag is appended.
    pub(crate) fn finish_element(&mut self, mark: usize, qualified_name: &str) {
        if self.buf.len() == mark && self.buf.ends_with('>') {
            self.buf.pop();
            self.buf.push_str("/>");
        } else {
            self.buf.push_str("</");
            self.buf.push_str(qualified_name);
            self.buf.push('>');
        }
    }
}
