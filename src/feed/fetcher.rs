use std::time::Duration;

use futures::StreamExt;
use reqwest::{header, StatusCode};
use thiserror::Error;

use super::parser::AtomFeed;
use super::progress::{parse_feed_blocking, parse_feed_with_progress};
use crate::parsable::{ParseError, ParseOptions};
use crate::query::Query;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching and parsing a feed over HTTP.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL is malformed or not http(s)
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Server rejected the request as malformed (400)
    #[error("Protocol error: the server rejected the request (status 400)")]
    Protocol,
    /// Server requires (or refused) credentials (401, 403)
    #[error("Authentication required (status {0})")]
    AuthenticationRequired(u16),
    /// The feed does not exist (404)
    #[error("Feed not found")]
    NotFound,
    /// The server's copy changed underneath the request (409)
    #[error("Conflict: the feed was modified on the server")]
    Conflict,
    /// The cached ETag is still current (304)
    #[error("Feed not modified")]
    NotModified,
    /// Any other non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// The body was not a valid feed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Settings for a single fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_response_bytes: usize,
    pub parse: ParseOptions,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_response_bytes: MAX_FEED_SIZE,
            parse: ParseOptions::default(),
        }
    }
}

/// Fetches `url` and parses the body as a `T`, usually a [`Feed`](super::Feed).
///
/// A single attempt is made; there is no retry or backoff. Parsing runs on
/// a blocking worker.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] for non-http(s) URLs
/// - [`FetchError::Timeout`] / [`FetchError::Network`] for transport failures
/// - [`FetchError::Protocol`], [`FetchError::AuthenticationRequired`],
///   [`FetchError::NotFound`], [`FetchError::Conflict`], [`FetchError::HttpStatus`]
///   for non-2xx responses
/// - [`FetchError::ResponseTooLarge`] / [`FetchError::IncompleteResponse`] for bad bodies
/// - [`FetchError::Parse`] if the body is not a valid feed
pub async fn fetch_feed<T: AtomFeed + Send + 'static>(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<T, FetchError> {
    let bytes = fetch_bytes(client, url, None, options).await?;
    Ok(parse_feed_blocking(bytes, options.parse.clone()).await?)
}

/// Like [`fetch_feed`], reporting each entry to `callback` as it is parsed.
pub async fn fetch_feed_with_progress<T, C>(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
    callback: C,
) -> Result<T, FetchError>
where
    T: AtomFeed + Send + 'static,
    T::Entry: Send,
    C: FnMut(&T::Entry, usize, u32),
{
    let bytes = fetch_bytes(client, url, None, options).await?;
    Ok(parse_feed_with_progress(bytes, options.parse.clone(), callback).await?)
}

/// Runs `query` against `feed_uri`.
///
/// When the query carries an ETag it is sent as `If-None-Match`, and an
/// unchanged feed yields [`FetchError::NotModified`].
pub async fn fetch_query<T: AtomFeed + Send + 'static>(
    client: &reqwest::Client,
    feed_uri: &str,
    query: &Query,
    options: &FetchOptions,
) -> Result<T, FetchError> {
    let url = query.query_uri(feed_uri);
    let bytes = fetch_bytes(client, &url, query.etag(), options).await?;
    Ok(parse_feed_blocking(bytes, options.parse.clone()).await?)
}

fn validate_url(url: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(FetchError::InvalidUrl(format!(
            "{url}: unsupported scheme '{scheme}'"
        ))),
    }
}

fn status_error(status: StatusCode) -> FetchError {
    match status {
        StatusCode::NOT_MODIFIED => FetchError::NotModified,
        StatusCode::BAD_REQUEST => FetchError::Protocol,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FetchError::AuthenticationRequired(status.as_u16())
        }
        StatusCode::NOT_FOUND => FetchError::NotFound,
        StatusCode::CONFLICT => FetchError::Conflict,
        _ => FetchError::HttpStatus(status.as_u16()),
    }
}

async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    etag: Option<&str>,
    options: &FetchOptions,
) -> Result<Vec<u8>, FetchError> {
    validate_url(url)?;

    let mut request = client.get(url);
    if let Some(etag) = etag {
        request = request.header(header::IF_NONE_MATCH, etag);
    }

    let response = tokio::time::timeout(options.timeout, request.send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    let status = response.status();
    if !status.is_success() {
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(url = %url, "Feed not modified");
        } else {
            tracing::warn!(url = %url, status = status.as_u16(), "Feed request failed");
        }
        return Err(status_error(status));
    }

    read_limited_bytes(response, options.max_response_bytes).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // EDGE-005: Interrupted transfers deliver fewer bytes than announced
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
