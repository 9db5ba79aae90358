//! Typed Atom/GData feed entities with a strict, extensible XML pipeline.
//!
//! Every entity implements [`Parsable`]: a chain of [`Handler`]s that
//! consume XML on the way in and write it back on the way out. Derived
//! entity types compose a base type and put their own handler first, so
//! they see each child element before the base does.
//!
//! - [`atom`]: authors, categories, generators, links and entries
//! - [`feed`]: the feed aggregate, progressive parsing and HTTP fetching
//! - [`query`]: GData query URIs with ETag tracking
//! - [`config`]: the TOML configuration file
//!
//! ```
//! use gfeed::atom::Entry;
//! use gfeed::feed::{parse_feed, Feed};
//! use gfeed::parsable::ParseOptions;
//!
//! let xml = "<feed xmlns='http://www.w3.org/2005/Atom'>\
//!            <title>Example</title><id>urn:example</id>\
//!            <updated>2009-01-01T00:00:00Z</updated>\
//!            <entry><id>urn:one</id><title>One</title></entry></feed>";
//! let feed: Feed<Entry> = parse_feed(xml, &ParseOptions::default(), None)?;
//! assert_eq!(feed.entries()[0].title(), Some("One"));
//! # Ok::<(), gfeed::parsable::ParseError>(())
//! ```

pub mod atom;
pub mod config;
pub mod feed;
pub mod parsable;
pub mod query;
pub mod util;
pub mod xml;

pub use atom::{Author, Category, Entry, Generator, Link};
pub use config::{Config, ConfigError};
pub use feed::{Feed, FetchError};
pub use parsable::{
    Handler, Parsable, ParseError, ParseErrorKind, ParseOptions, UnknownElementPolicy,
};
pub use query::Query;
