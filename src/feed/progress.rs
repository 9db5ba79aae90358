use std::any::Any;

use tokio::sync::mpsc;
use tokio::task::JoinError;

use super::parser::{parse_feed_as, AtomFeed};
use crate::parsable::{ParseError, ParseObserver, ParseOptions};

/// One parsed entry, reported while the rest of the feed is still parsing.
#[derive(Debug, Clone)]
pub struct EntryProgress<E> {
    pub entry: E,
    /// Zero-based position of the entry in the document.
    pub index: usize,
    /// `min(itemsPerPage, totalResults)` as known when the entry was parsed.
    pub count: u32,
}

/// Receives entries as the feed parser completes them.
///
/// `deliver` is called on the parsing thread, so implementations should
/// hand the value off rather than do work inline.
pub trait ProgressSink<E> {
    fn deliver(&mut self, progress: EntryProgress<E>);
}

impl<E> ProgressSink<E> for mpsc::UnboundedSender<EntryProgress<E>> {
    fn deliver(&mut self, progress: EntryProgress<E>) {
        if let Err(e) = self.send(progress) {
            tracing::warn!(
                index = e.0.index,
                "Progress channel send failed (receiver dropped)"
            );
        }
    }
}

/// Adapts a typed sink to the parser's observer hook for a single parse.
pub(crate) struct SinkObserver<E> {
    sink: Box<dyn ProgressSink<E> + Send>,
}

impl<E> SinkObserver<E> {
    pub(crate) fn new(sink: Box<dyn ProgressSink<E> + Send>) -> Self {
        Self { sink }
    }
}

impl<E: Clone + 'static> ParseObserver for SinkObserver<E> {
    fn entry_parsed(&mut self, entry: &dyn Any, index: usize, count: u32) {
        // Entries of other types belong to some nested container
        if let Some(entry) = entry.downcast_ref::<E>() {
            self.sink.deliver(EntryProgress {
                entry: entry.clone(),
                index,
                count,
            });
        }
    }
}

/// Parses a feed on a blocking worker, invoking `callback` on the calling
/// task for each entry as it is parsed.
///
/// Callbacks run in document order with `(entry, index, count)`. Every
/// callback has run by the time this returns, including those for entries
/// parsed before a failure.
///
/// # Errors
///
/// Returns the parse error, if any, after draining pending callbacks.
/// [`ParseError::Aborted`] is returned if the worker is cancelled.
///
/// # Panics
///
/// Re-raises a panic from the parsing worker.
pub async fn parse_feed_with_progress<T, C>(
    xml: impl AsRef<[u8]> + Send + 'static,
    options: ParseOptions,
    mut callback: C,
) -> Result<T, ParseError>
where
    T: AtomFeed + Send + 'static,
    T::Entry: Send,
    C: FnMut(&T::Entry, usize, u32),
{
    let (tx, mut rx) = mpsc::unbounded_channel::<EntryProgress<T::Entry>>();

    let worker = tokio::task::spawn_blocking(move || {
        let sink: Box<dyn ProgressSink<T::Entry> + Send> = Box::new(tx);
        parse_feed_as::<T>(xml, &options, Some(sink))
    });

    // The channel closes once the worker drops the sink
    while let Some(progress) = rx.recv().await {
        callback(&progress.entry, progress.index, progress.count);
    }

    join_parse(worker.await)
}

/// Parses a feed on a blocking worker so large documents do not stall
/// the async executor.
pub(crate) async fn parse_feed_blocking<T>(
    xml: impl AsRef<[u8]> + Send + 'static,
    options: ParseOptions,
) -> Result<T, ParseError>
where
    T: AtomFeed + Send + 'static,
{
    let worker = tokio::task::spawn_blocking(move || parse_feed_as::<T>(xml, &options, None));
    join_parse(worker.await)
}

fn join_parse<T>(joined: Result<Result<T, ParseError>, JoinError>) -> Result<T, ParseError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(ParseError::Aborted(e.to_string())),
    }
}
