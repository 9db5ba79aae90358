//! Query parameters for GData feeds.
//!
//! A [`Query`] holds the standard GData parameters plus the ETag of the
//! last response it produced. Changing any parameter invalidates that ETag,
//! since a cached response no longer matches the new query.
//!
//! # Examples
//!
//! ```
//! use gfeed::query::Query;
//!
//! let mut query = Query::new(Some("foobar"));
//! query.set_categories(Some("Fritz|Laurie"));
//! assert_eq!(
//!     query.query_uri("http://example.com"),
//!     "http://example.com/-/Fritz%7CLaurie?q=foobar"
//! );
//! ```

use chrono::{DateTime, Utc};
use url::form_urlencoded;

use crate::util::format_iso8601;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    q: Option<String>,
    categories: Option<String>,
    author: Option<String>,
    updated_min: Option<DateTime<Utc>>,
    updated_max: Option<DateTime<Utc>>,
    published_min: Option<DateTime<Utc>>,
    published_max: Option<DateTime<Utc>>,
    start_index: Option<u32>,
    max_results: Option<u32>,
    etag: Option<String>,
}

impl Query {
    /// Creates a query with an optional full-text search string.
    pub fn new(q: Option<&str>) -> Self {
        Self {
            q: q.map(str::to_owned),
            ..Self::default()
        }
    }

    /// Creates a query for one page of results.
    pub fn with_limits(q: Option<&str>, start_index: u32, max_results: u32) -> Self {
        let mut query = Self::new(q);
        query.start_index = Some(start_index);
        query.max_results = Some(max_results);
        query
    }

    pub fn q(&self) -> Option<&str> {
        self.q.as_deref()
    }

    /// Category filter, e.g. `Fritz/Laurie` (both) or `Fritz|Laurie` (either).
    pub fn categories(&self) -> Option<&str> {
        self.categories.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn updated_min(&self) -> Option<DateTime<Utc>> {
        self.updated_min
    }

    pub fn updated_max(&self) -> Option<DateTime<Utc>> {
        self.updated_max
    }

    pub fn published_min(&self) -> Option<DateTime<Utc>> {
        self.published_min
    }

    pub fn published_max(&self) -> Option<DateTime<Utc>> {
        self.published_max
    }

    /// One-based index of the first result.
    pub fn start_index(&self) -> Option<u32> {
        self.start_index
    }

    pub fn max_results(&self) -> Option<u32> {
        self.max_results
    }

    /// ETag of the response this query last produced.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn set_etag(&mut self, etag: Option<&str>) {
        self.etag = etag.map(str::to_owned);
    }

    /// Clears the ETag along with setting `q`.
    pub fn set_q(&mut self, q: Option<&str>) {
        self.q = q.map(str::to_owned);
        self.etag = None;
    }

    /// Clears the ETag along with setting the category filter.
    pub fn set_categories(&mut self, categories: Option<&str>) {
        self.categories = categories.map(str::to_owned);
        self.etag = None;
    }

    /// Clears the ETag along with setting the author filter.
    pub fn set_author(&mut self, author: Option<&str>) {
        self.author = author.map(str::to_owned);
        self.etag = None;
    }

    /// Clears the ETag along with setting the lower update bound.
    pub fn set_updated_min(&mut self, updated_min: Option<DateTime<Utc>>) {
        self.updated_min = updated_min;
        self.etag = None;
    }

    /// Clears the ETag along with setting the upper update bound.
    pub fn set_updated_max(&mut self, updated_max: Option<DateTime<Utc>>) {
        self.updated_max = updated_max;
        self.etag = None;
    }

    /// Clears the ETag along with setting the lower publication bound.
    pub fn set_published_min(&mut self, published_min: Option<DateTime<Utc>>) {
        self.published_min = published_min;
        self.etag = None;
    }

    /// Clears the ETag along with setting the upper publication bound.
    pub fn set_published_max(&mut self, published_max: Option<DateTime<Utc>>) {
        self.published_max = published_max;
        self.etag = None;
    }

    /// Clears the ETag along with setting the start index. `Some(0)` unsets it.
    pub fn set_start_index(&mut self, start_index: Option<u32>) {
        self.start_index = start_index.filter(|&i| i > 0);
        self.etag = None;
    }

    /// Clears the ETag along with setting the page size. `Some(0)` unsets it.
    pub fn set_max_results(&mut self, max_results: Option<u32>) {
        self.max_results = max_results.filter(|&n| n > 0);
        self.etag = None;
    }

    /// Builds the request URI for `feed_uri`.
    ///
    /// Categories become a `/-/` path suffix with each segment
    /// percent-encoded; the remaining parameters form the query string.
    /// No `?` is added when there are no parameters.
    pub fn query_uri(&self, feed_uri: &str) -> String {
        let mut uri = feed_uri.to_owned();

        if let Some(categories) = &self.categories {
            uri.push_str("/-/");
            let segments: Vec<String> = categories.split('/').map(encode_path_segment).collect();
            uri.push_str(&segments.join("/"));
        }

        let mut params = form_urlencoded::Serializer::new(String::new());
        if let Some(q) = &self.q {
            params.append_pair("q", q);
        }
        if let Some(author) = &self.author {
            params.append_pair("author", author);
        }
        let bounds = [
            ("updated-min", &self.updated_min),
            ("updated-max", &self.updated_max),
            ("published-min", &self.published_min),
            ("published-max", &self.published_max),
        ];
        for (name, value) in bounds {
            if let Some(value) = value {
                params.append_pair(name, &format_iso8601(value));
            }
        }
        if let Some(start_index) = self.start_index {
            params.append_pair("start-index", &start_index.to_string());
        }
        if let Some(max_results) = self.max_results {
            params.append_pair("max-results", &max_results.to_string());
        }

        let params = params.finish();
        if !params.is_empty() {
            uri.push(if feed_uri.contains('?') { '&' } else { '?' });
            uri.push_str(&params);
        }
        uri
    }
}

fn encode_path_segment(segment: &str) -> String {
    // form encoding writes spaces as '+', which is literal in a path
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
