use crate::feed::transport::TransportError;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// The result of one parse attempt — always produced, never an error.
///
/// The distinction between "no entry sequence at all" and "a valid feed
/// that happens to be empty" is load-bearing for the orchestrator's
/// validation gate, so it is modeled explicitly: `entries: None` means the
/// document was structurally unusable, `Some(vec![])` means empty but
/// valid. `diagnostic` carries the parser's note for the `None` case.
#[derive(Debug)]
pub struct RawFeed {
    /// Feed-level title, when the document carries one
    pub title: Option<String>,
    /// `None` = no entry sequence recoverable; `Some` = ordered raw entries
    pub entries: Option<Vec<RawEntry>>,
    /// Best-effort note about what went wrong during parsing
    pub diagnostic: Option<String>,
}

impl RawFeed {
    /// True when the document exposed an entry sequence, even an empty one.
    pub fn is_structured(&self) -> bool {
        self.entries.is_some()
    }

    /// Number of recovered entries (zero when unstructured).
    pub fn entry_count(&self) -> usize {
        self.entries.as_ref().map_or(0, Vec::len)
    }
}

/// One entry as the feed supplied it: a bag of fields any of which may be
/// absent. Per-source variability, not an error — every consumer works
/// against this fixed optional-field contract instead of probing.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Structured content blocks, in document order
    pub content_blocks: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
}

/// Parses feed bytes into a [`RawFeed`].
///
/// Never fails: a malformed document yields `entries: None` plus a
/// diagnostic, and a partially garbled one yields whatever entries feed-rs
/// could recover. The underlying library is lenient about unknown
/// elements and missing metadata, which is exactly the behavior wanted
/// here.
pub fn parse_feed(bytes: &[u8]) -> RawFeed {
    match feed_rs::parser::parse(bytes) {
        Ok(feed) => RawFeed {
            title: feed.title.map(|t| t.content),
            entries: Some(feed.entries.into_iter().map(convert_entry).collect()),
            diagnostic: None,
        },
        Err(e) => {
            tracing::debug!(error = %e, "Feed unparsable, returning unstructured result");
            RawFeed {
                title: None,
                entries: None,
                diagnostic: Some(e.to_string()),
            }
        }
    }
}

/// Retrieves `url` with plain client defaults and parses the body.
///
/// This is the primary-tier path: the parser manages its own retrieval the
/// way a batteries-included feed library would — no identification header
/// rotation, no response-header inspection. The explicit transport layer
/// is the fallback tier's job.
///
/// # Errors
///
/// Transport failures only ([`TransportError::Timeout`],
/// [`TransportError::HttpStatus`], [`TransportError::Network`]); parse
/// problems are reported through the returned [`RawFeed`], never as errors.
pub async fn parse_url(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<RawFeed, TransportError> {
    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(TransportError::Network)?;

    if !response.status().is_success() {
        return Err(TransportError::HttpStatus(response.status().as_u16()));
    }

    let bytes = response.bytes().await.map_err(TransportError::Network)?;
    Ok(parse_feed(&bytes))
}

fn convert_entry(entry: feed_rs::model::Entry) -> RawEntry {
    let content_blocks = entry
        .content
        .and_then(|c| c.body)
        .map(|body| vec![body])
        .unwrap_or_default();

    // feed-rs routes RSS <description> into `summary`; media descriptions
    // are the remaining descriptive field and fill the third slot of the
    // extraction priority chain.
    let description = entry
        .media
        .into_iter()
        .find_map(|m| m.description.map(|d| d.content));

    RawEntry {
        title: entry.title.map(|t| t.content),
        link: entry.links.first().map(|l| l.href.clone()),
        published: entry.published.or(entry.updated),
        content_blocks,
        summary: entry.summary.map(|s| s.content),
        description,
    }
}
