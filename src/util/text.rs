use std::borrow::Cow;
use std::fmt::Write as _;

use quick_xml::escape::escape;

/// Returns true for the C0 and C1 control characters that XML 1.0 forbids
/// or discourages. Tab, LF, CR and NEL (0x85) are allowed.
fn is_restricted(c: char) -> bool {
    matches!(
        c,
        '\u{1}'..='\u{8}' | '\u{b}'..='\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}'..='\u{84}' | '\u{86}'..='\u{9f}'
    )
}

/// Escapes text for inclusion in XML element content or a single-quoted attribute.
///
/// The five markup characters go through `quick_xml::escape::escape`;
/// control characters are then written as hexadecimal character
/// references (`&#x1;`).
///
/// Returns `Cow::Borrowed` when nothing needs escaping, which is the common case
/// for identifiers, URIs and dates.
///
/// # Examples
///
/// ```
/// use gfeed::util::escape_text;
///
/// assert_eq!(escape_text("plain"), "plain");
/// assert_eq!(escape_text("<a href='x'>"), "&lt;a href=&apos;x&apos;&gt;");
/// assert_eq!(escape_text("bell\u{7}"), "bell&#x7;");
/// ```
pub fn escape_text(s: &str) -> Cow<'_, str> {
    let escaped = escape(s);
    if !escaped.chars().any(is_restricted) {
        return escaped;
    }

    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        if is_restricted(c) {
            // Writing into a String cannot fail
            let _ = write!(out, "&#x{:x};", u32::from(c));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Appends `pre`, the escaped `content`, then `post` to `out`.
///
/// `pre` and `post` are markup and are copied verbatim.
pub fn append_escaped(out: &mut String, pre: &str, content: &str, post: &str) {
    out.push_str(pre);
    out.push_str(&escape_text(content));
    out.push_str(post);
}

/// Strips leading and trailing Unicode whitespace.
pub fn trim_whitespace(s: &str) -> &str {
    s.trim_matches(char::is_whitespace)
}
