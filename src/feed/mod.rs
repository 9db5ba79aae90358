//! Atom feeds: the aggregating entity, progressive parsing and HTTP retrieval.
//!
//! - [`Feed`] collects entries along with feed-level metadata and the
//!   OpenSearch paging values.
//! - [`parse_feed_with_progress`] reports each entry while the rest of the
//!   document is still being parsed.
//! - [`fetch_feed`] and [`fetch_query`] retrieve and parse a feed over HTTP.
//! - [`AtomFeed`] lets a service-specific feed type reuse all of the above
//!   through [`parse_feed_as`].
//!
//! # Example
//!
//! ```ignore
//! use gfeed::feed::{parse_feed_with_progress, Feed};
//! use gfeed::atom::Entry;
//!
//! let feed = parse_feed_with_progress::<Feed<Entry>, _>(xml, options, |entry, index, count| {
//!     println!("{}/{}: {:?}", index + 1, count, entry.title());
//! })
//! .await?;
//! ```

mod fetcher;
mod parser;
mod progress;

pub use fetcher::{fetch_feed, fetch_feed_with_progress, fetch_query, FetchError, FetchOptions};
pub use parser::{parse_feed, parse_feed_as, AtomEntry, AtomFeed, Feed};
pub use progress::{parse_feed_with_progress, EntryProgress, ProgressSink};
