//! End-to-end feed parsing: the generic entry, a derived entry type,
//! the unknown-content policies and progressive delivery.

use gfeed::atom::{relation, Entry};
use gfeed::feed::{parse_feed, parse_feed_as, parse_feed_with_progress, AtomEntry, AtomFeed, Feed};
use gfeed::parsable::{
    ExtraXml, Handler, Namespaces, ParseContext, ParseError, ParseErrorKind, ParseOptions,
    ParseOutcome, Parsable, XmlBuilder,
};
use gfeed::xml::XmlElement;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const GPHOTO_NS: &str = "http://schemas.google.com/photos/2007";

const PICASA_FEED: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<feed xmlns='http://www.w3.org/2005/Atom'
      xmlns:openSearch='http://a9.com/-/spec/opensearch/1.1/'
      xmlns:gd='http://schemas.google.com/g/2005'
      xmlns:gphoto='http://schemas.google.com/photos/2007'
      gd:etag='W/"CkABRXY8fip7ImA9WxVVGE8."'>
  <id>http://picasaweb.google.com/data/feed/user/libgdata.picasaweb</id>
  <updated>2009-04-26T10:01:29.000Z</updated>
  <title type='text'>libgdata.picasaweb</title>
  <subtitle type='text'>Test albums</subtitle>
  <icon>http://lh3.ggpht.com/icon.jpg</icon>
  <link rel='http://schemas.google.com/g/2005#feed' type='application/atom+xml'
        href='http://picasaweb.google.com/data/feed/user/libgdata.picasaweb'/>
  <link rel='alternate' type='text/html' href='http://picasaweb.google.com/libgdata.picasaweb'/>
  <link rel='self' type='application/atom+xml'
        href='http://picasaweb.google.com/data/feed/user/libgdata.picasaweb?start-index=1'/>
  <author>
    <name>libgdata.picasaweb</name>
    <uri>http://picasaweb.google.com/libgdata.picasaweb</uri>
  </author>
  <generator version='1.00' uri='http://picasaweb.google.com/'>Picasaweb</generator>
  <openSearch:totalResults>3</openSearch:totalResults>
  <openSearch:startIndex>1</openSearch:startIndex>
  <openSearch:itemsPerPage>1000</openSearch:itemsPerPage>
  <entry gd:etag='"first"'>
    <id>urn:photo:1</id>
    <published>2009-04-26T09:56:21.000Z</published>
    <updated>2009-04-26T10:01:29.000Z</updated>
    <title type='text'>Sunset</title>
    <summary type='text'>Over the hills</summary>
    <gphoto:width>1024</gphoto:width>
    <gphoto:height>768</gphoto:height>
  </entry>
  <entry>
    <id>urn:photo:2</id>
    <title type='text'>Harbour &amp; boats</title>
    <category scheme='http://schemas.google.com/g/2005#kind'
              term='http://schemas.google.com/photos/2007#photo'/>
    <gphoto:width>640</gphoto:width>
  </entry>
  <entry>
    <id>urn:photo:3</id>
    <title type='text'>Untitled</title>
    <link rel='edit' href='http://picasaweb.google.com/edit/3'/>
  </entry>
</feed>"#;

/// A Picasa-style photo entry: the generic entry plus `gphoto:` dimensions.
#[derive(Debug, Clone)]
struct PhotoEntry {
    photo: PhotoFields,
    entry: Entry,
}

#[derive(Debug, Clone, Default)]
struct PhotoFields {
    width: Option<u32>,
    height: Option<u32>,
}

fn dimension(slot: &mut Option<u32>, node: &XmlElement) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::duplicate_element(node));
    }
    let text = node.text().unwrap_or_default();
    let value = text
        .trim()
        .parse()
        .map_err(|_| ParseError::unknown_content(node, &text))?;
    *slot = Some(value);
    Ok(())
}

impl Handler for PhotoFields {
    fn parse_child(&mut self, node: &XmlElement, _ctx: &ParseContext<'_>) -> Result<ParseOutcome, ParseError> {
        if !node.is_namespace(GPHOTO_NS) {
            return Ok(ParseOutcome::Delegate);
        }
        match node.name() {
            "width" => dimension(&mut self.width, node)?,
            "height" => dimension(&mut self.height, node)?,
            _ => return Ok(ParseOutcome::Delegate),
        }
        Ok(ParseOutcome::Consumed)
    }

    fn namespaces(&self, namespaces: &mut Namespaces) {
        namespaces.insert("gphoto", GPHOTO_NS);
    }

    fn write_children(&self, out: &mut XmlBuilder) {
        if let Some(width) = self.width {
            out.text_element("gphoto:width", &width.to_string());
        }
        if let Some(height) = self.height {
            out.text_element("gphoto:height", &height.to_string());
        }
    }
}

impl Parsable for PhotoEntry {
    const ELEMENT_NAME: &'static str = "entry";

    fn blank() -> Self {
        Self {
            photo: PhotoFields::default(),
            entry: Entry::blank(),
        }
    }

    fn handlers(&self) -> Vec<&dyn Handler> {
        let mut chain: Vec<&dyn Handler> = vec![&self.photo];
        chain.extend(self.entry.handlers());
        chain
    }

    fn handlers_mut(&mut self) -> Vec<&mut dyn Handler> {
        let mut chain: Vec<&mut dyn Handler> = vec![&mut self.photo];
        chain.extend(self.entry.handlers_mut());
        chain
    }

    fn extra_xml(&self) -> &ExtraXml {
        self.entry.extra_xml()
    }

    fn extra_xml_mut(&mut self) -> &mut ExtraXml {
        self.entry.extra_xml_mut()
    }
}

impl AtomEntry for PhotoEntry {
    fn id(&self) -> Option<&str> {
        self.entry.id()
    }
}

const USER_FEED: &str = "<feed xmlns='http://www.w3.org/2005/Atom' \
                               xmlns:gphoto='http://schemas.google.com/photos/2007'>\
    <title>libgdata</title><id>urn:user:libgdata</id><updated>2009-01-01T00:00:00Z</updated>\
    <gphoto:user>libgdata</gphoto:user><gphoto:id>42</gphoto:id>\
    <entry><id>urn:photo:1</id><gphoto:width>10</gphoto:width></entry></feed>";

/// A Picasa-style user feed: the generic feed plus `gphoto:` account details.
#[derive(Debug)]
struct UserFeed {
    user: UserFields,
    feed: Feed<PhotoEntry>,
}

#[derive(Debug, Default)]
struct UserFields {
    user: Option<String>,
    id: Option<String>,
}

impl Handler for UserFields {
    fn parse_child(&mut self, node: &XmlElement, _ctx: &ParseContext<'_>) -> Result<ParseOutcome, ParseError> {
        if !node.is_namespace(GPHOTO_NS) {
            return Ok(ParseOutcome::Delegate);
        }
        let slot = match node.name() {
            "user" => &mut self.user,
            "id" => &mut self.id,
            _ => return Ok(ParseOutcome::Delegate),
        };
        if slot.is_some() {
            return Err(ParseError::duplicate_element(node));
        }
        *slot = Some(node.text().unwrap_or_default());
        Ok(ParseOutcome::Consumed)
    }

    fn post_parse(&mut self, _ctx: &ParseContext<'_>) -> Result<(), ParseError> {
        if self.user.is_none() {
            return Err(ParseError::required_element_missing("gphoto:user", "feed"));
        }
        Ok(())
    }

    fn namespaces(&self, namespaces: &mut Namespaces) {
        namespaces.insert("gphoto", GPHOTO_NS);
    }

    fn write_children(&self, out: &mut XmlBuilder) {
        out.optional_text_element("gphoto:user", self.user.as_deref());
        out.optional_text_element("gphoto:id", self.id.as_deref());
    }
}

impl Parsable for UserFeed {
    const ELEMENT_NAME: &'static str = "feed";

    fn blank() -> Self {
        Self {
            user: UserFields::default(),
            feed: Feed::blank(),
        }
    }

    fn handlers(&self) -> Vec<&dyn Handler> {
        let mut chain: Vec<&dyn Handler> = vec![&self.user];
        chain.extend(self.feed.handlers());
        chain
    }

    fn handlers_mut(&mut self) -> Vec<&mut dyn Handler> {
        let mut chain: Vec<&mut dyn Handler> = vec![&mut self.user];
        chain.extend(self.feed.handlers_mut());
        chain
    }

    fn extra_xml(&self) -> &ExtraXml {
        self.feed.extra_xml()
    }

    fn extra_xml_mut(&mut self) -> &mut ExtraXml {
        self.feed.extra_xml_mut()
    }
}

impl AtomFeed for UserFeed {
    type Entry = PhotoEntry;

    fn feed(&self) -> &Feed<PhotoEntry> {
        &self.feed
    }
}

fn minimal_feed(body: &str) -> String {
    format!(
        "<feed xmlns='http://www.w3.org/2005/Atom'>\
         <title>T</title><id>urn:feed</id><updated>2009-01-01T00:00:00Z</updated>{body}</feed>"
    )
}

#[test]
fn test_derived_entries_parse_in_document_order() {
    let feed: Feed<PhotoEntry> = parse_feed(PICASA_FEED, &ParseOptions::default(), None).unwrap();

    assert_eq!(feed.title(), "libgdata.picasaweb");
    assert_eq!(feed.subtitle(), Some("Test albums"));
    assert_eq!(feed.etag(), Some("W/\"CkABRXY8fip7ImA9WxVVGE8.\""));
    assert_eq!(feed.total_results(), 3);
    assert_eq!(feed.start_index(), 1);
    assert_eq!(feed.items_per_page(), 1000);

    let ids: Vec<_> = feed.entries().iter().map(|e| e.entry.id()).collect();
    assert_eq!(ids, vec![Some("urn:photo:1"), Some("urn:photo:2"), Some("urn:photo:3")]);

    let first = &feed.entries()[0];
    assert_eq!(first.photo.width, Some(1024));
    assert_eq!(first.photo.height, Some(768));
    assert_eq!(first.entry.etag(), Some("\"first\""));
    assert_eq!(first.entry.summary(), Some("Over the hills"));

    let second = feed.look_up_entry("urn:photo:2").unwrap();
    assert_eq!(second.entry.title(), Some("Harbour & boats"));
    assert_eq!(second.photo.height, None);
    assert_eq!(second.entry.categories()[0].term(), "http://schemas.google.com/photos/2007#photo");

    assert!(feed.look_up_entry("urn:photo:9").is_none());
}

#[test]
fn test_feed_metadata() {
    let feed: Feed<PhotoEntry> = parse_feed(PICASA_FEED, &ParseOptions::default(), None).unwrap();

    let generator = feed.generator().unwrap();
    assert_eq!(generator.name(), Some("Picasaweb"));
    assert_eq!(generator.version(), Some("1.00"));
    assert_eq!(generator.uri(), Some("http://picasaweb.google.com/"));

    assert_eq!(feed.links().len(), 3);
    assert_eq!(
        feed.look_up_link(relation::SELF).map(|l| l.uri()),
        Some("http://picasaweb.google.com/data/feed/user/libgdata.picasaweb?start-index=1")
    );
    assert_eq!(feed.authors()[0].name(), "libgdata.picasaweb");
    assert_eq!(feed.icon(), Some("http://lh3.ggpht.com/icon.jpg"));

    let edit = feed.entries()[2].entry.look_up_link(relation::EDIT).unwrap();
    assert_eq!(edit.uri(), "http://picasaweb.google.com/edit/3");
}

#[test]
fn test_generic_entry_rejects_extension_elements() {
    let err = parse_feed::<Entry>(PICASA_FEED, &ParseOptions::default(), None).unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::UnknownContent);
    assert_eq!(
        err.to_string(),
        "The content of a <entry/gphoto:width> element (\"1024\") was unknown."
    );
}

#[test]
fn test_missing_required_feed_elements() {
    let xml = "<feed xmlns='http://www.w3.org/2005/Atom'><id>urn:x</id>\
               <updated>2009-01-01T00:00:00Z</updated></feed>";
    let err = parse_feed::<Entry>(xml, &ParseOptions::default(), None).unwrap_err();
    assert_eq!(err.to_string(), "A required element (<feed/title>) was not present.");

    let xml = "<feed xmlns='http://www.w3.org/2005/Atom'><title>T</title><id>urn:x</id></feed>";
    let err = parse_feed::<Entry>(xml, &ParseOptions::default(), None).unwrap_err();
    assert_eq!(err.to_string(), "A required element (<feed/updated>) was not present.");
}

#[test]
fn test_duplicate_singletons() {
    let err = parse_feed::<Entry>(minimal_feed("<title>Again</title>"), &ParseOptions::default(), None)
        .unwrap_err();
    assert_eq!(err.to_string(), "A singleton element (<feed/title>) was duplicated.");

    let err = parse_feed::<PhotoEntry>(
        minimal_feed(
            "<entry xmlns:gphoto='http://schemas.google.com/photos/2007'>\
             <gphoto:width>1</gphoto:width><gphoto:width>2</gphoto:width></entry>",
        ),
        &ParseOptions::default(),
        None,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::DuplicateElement);
}

#[test]
fn test_bad_timestamp_and_empty_document() {
    let err = parse_feed::<Entry>(
        minimal_feed("<entry><published>yesterday</published></entry>"),
        &ParseOptions::default(),
        None,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The content of a <entry/published> element (\"yesterday\") was not in ISO 8601 format."
    );

    let err = parse_feed::<Entry>("", &ParseOptions::default(), None).unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::EmptyDocument);

    let err = parse_feed::<Entry>("<feed><title>", &ParseOptions::default(), None).unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::Xml);
}

#[test]
fn test_preserved_extension_round_trips() {
    let xml = minimal_feed(
        "<entry><id>urn:e</id><title>E</title>\
         <x:rating xmlns:x='urn:example:x' stars='4'>good</x:rating></entry>",
    );
    let feed: Feed = parse_feed(&xml, &ParseOptions::preserving(), None).unwrap();
    let entry = &feed.entries()[0];

    assert_eq!(
        entry.extra_xml().as_str(),
        "<x:rating xmlns:x=\"urn:example:x\" stars=\"4\">good</x:rating>"
    );
    assert_eq!(
        entry.to_xml(),
        "<entry xmlns='http://www.w3.org/2005/Atom' xmlns:gd='http://schemas.google.com/g/2005' \
         xmlns:x='urn:example:x'>\
         <title type='text'>E</title><id>urn:e</id>\
         <x:rating xmlns:x=\"urn:example:x\" stars=\"4\">good</x:rating></entry>"
    );

    let reparsed = Entry::from_xml_with(entry.to_xml(), &ParseOptions::preserving()).unwrap();
    assert_eq!(reparsed.extra_xml().as_str(), entry.extra_xml().as_str());
}

#[test]
fn test_derived_entry_serialization() {
    let feed: Feed<PhotoEntry> = parse_feed(PICASA_FEED, &ParseOptions::default(), None).unwrap();
    let photo = &feed.entries()[0];

    assert_eq!(
        photo.to_xml(),
        "<entry xmlns='http://www.w3.org/2005/Atom' xmlns:gd='http://schemas.google.com/g/2005' \
         xmlns:gphoto='http://schemas.google.com/photos/2007' gd:etag='&quot;first&quot;'>\
         <title type='text'>Sunset</title>\
         <id>urn:photo:1</id>\
         <updated>2009-04-26T10:01:29Z</updated>\
         <published>2009-04-26T09:56:21Z</published>\
         <summary type='text'>Over the hills</summary>\
         <gphoto:width>1024</gphoto:width><gphoto:height>768</gphoto:height>\
         </entry>"
    );

    let reparsed = PhotoEntry::from_xml(photo.to_xml()).unwrap();
    assert_eq!(reparsed.photo.width, Some(1024));
    assert_eq!(reparsed.entry.etag(), Some("\"first\""));
}

#[tokio::test]
async fn test_progress_reports_every_derived_entry() {
    let mut seen = Vec::new();
    let feed: Feed<PhotoEntry> = parse_feed_with_progress(
        PICASA_FEED.as_bytes().to_vec(),
        ParseOptions::default(),
        |photo: &PhotoEntry, index, count| {
            seen.push((index, count, photo.photo.width));
        },
    )
    .await
    .unwrap();

    assert_eq!(feed.entries().len(), 3);
    assert_eq!(seen, vec![(0, 3, Some(1024)), (1, 3, Some(640)), (2, 3, None)]);
}

#[test]
fn test_plain_feed_rejects_feed_extension() {
    let err = parse_feed::<PhotoEntry>(USER_FEED, &ParseOptions::default(), None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The content of a <feed/gphoto:user> element (\"libgdata\") was unknown."
    );
}

#[test]
fn test_derived_feed_parses_and_serializes() {
    let feed: UserFeed = parse_feed_as(USER_FEED, &ParseOptions::default(), None).unwrap();

    assert_eq!(feed.user.user.as_deref(), Some("libgdata"));
    assert_eq!(feed.user.id.as_deref(), Some("42"));
    // Atom <id> still reaches the base feed
    assert_eq!(feed.feed().id(), "urn:user:libgdata");
    assert_eq!(feed.feed().entries()[0].photo.width, Some(10));

    assert_eq!(
        feed.to_xml(),
        "<feed xmlns='http://www.w3.org/2005/Atom' xmlns:gd='http://schemas.google.com/g/2005' \
         xmlns:gphoto='http://schemas.google.com/photos/2007'>\
         <title>libgdata</title><id>urn:user:libgdata</id><updated>2009-01-01T00:00:00Z</updated>\
         <entry><title type='text'></title><id>urn:photo:1</id><gphoto:width>10</gphoto:width></entry>\
         <gphoto:user>libgdata</gphoto:user><gphoto:id>42</gphoto:id></feed>"
    );

    let reparsed = UserFeed::from_xml(feed.to_xml()).unwrap();
    assert_eq!(reparsed.user.user.as_deref(), Some("libgdata"));
    assert_eq!(reparsed.feed().entries().len(), 1);
}

#[test]
fn test_derived_feed_keeps_base_requirements() {
    let err = parse_feed_as::<UserFeed>(
        "<feed xmlns:gphoto='http://schemas.google.com/photos/2007'>\
         <title>t</title><id>i</id><gphoto:user>u</gphoto:user></feed>",
        &ParseOptions::default(),
        None,
    )
    .unwrap_err();
    assert_eq!(err, ParseError::required_element_missing("updated", "feed"));

    let err = parse_feed_as::<UserFeed>(minimal_feed(""), &ParseOptions::default(), None).unwrap_err();
    assert_eq!(err, ParseError::required_element_missing("gphoto:user", "feed"));
}

#[tokio::test]
async fn test_derived_feed_reports_progress() {
    let mut seen = Vec::new();
    let feed = parse_feed_with_progress::<UserFeed, _>(USER_FEED, ParseOptions::default(), |photo, index, count| {
        seen.push((index, count, photo.photo.width));
    })
    .await
    .unwrap();

    assert_eq!(feed.user.user.as_deref(), Some("libgdata"));
    assert_eq!(seen, vec![(0, 0, Some(10))]);
}

proptest! {
    #[test]
    fn test_entries_keep_document_order(titles in proptest::collection::vec("[ -~]{0,16}", 0..24)) {
        let body: String = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let mut title_xml = String::new();
                gfeed::util::append_escaped(&mut title_xml, "<title>", title, "</title>");
                format!("<entry><id>urn:{i}</id>{title_xml}</entry>")
            })
            .collect();

        let feed: Feed = parse_feed(minimal_feed(&body), &ParseOptions::default(), None).unwrap();
        prop_assert_eq!(feed.entries().len(), titles.len());
        for (i, (entry, title)) in feed.entries().iter().zip(&titles).enumerate() {
            let expected_id = format!("urn:{i}");
            prop_assert_eq!(entry.id(), Some(expected_id.as_str()));
            prop_assert_eq!(entry.title().unwrap_or_default().trim(), title.trim());
        }
    }
}
