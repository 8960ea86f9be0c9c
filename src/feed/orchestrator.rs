use crate::feed::normalize::{normalize, EntryRecord};
use crate::feed::parser::{self, RawFeed};
use crate::feed::transport::{self, TransportError, UserAgentPool};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors surfaced by a fetch cycle, after the fallback tier is exhausted.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Both tiers exceeded their bounded wait
    #[error("feed request timed out")]
    Timeout,
    /// Final tier answered with a non-2xx status
    #[error("feed HTTP error: status {0}")]
    HttpStatus(u16),
    /// Network-level failure (DNS, connection, TLS, etc.)
    #[error("feed request failed: {0}")]
    Network(String),
    /// The document exposes no entry sequence at all — distinct from a
    /// valid feed with zero entries, which is a success with zero records
    #[error("invalid feed structure: {0}")]
    InvalidStructure(String),
}

impl From<TransportError> for FeedError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Timeout => FeedError::Timeout,
            TransportError::HttpStatus(status) => FeedError::HttpStatus(status),
            other => FeedError::Network(other.to_string()),
        }
    }
}

/// Fetches and normalizes one feed.
///
/// Holds the immutable feed source plus the transport knobs, and exposes
/// the single entry point the rest of the system uses
/// ([`FeedFetcher::entries`]). Each call performs exactly one fetch cycle:
/// no scheduling, no caching, no state carried between calls.
pub struct FeedFetcher {
    client: reqwest::Client,
    source: Url,
    agents: UserAgentPool,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client, source: Url, agents: UserAgentPool, timeout: Duration) -> Self {
        Self {
            client,
            source,
            agents,
            timeout,
        }
    }

    /// The feed URL this fetcher was constructed with.
    pub fn source(&self) -> &Url {
        &self.source
    }

    /// Runs the two-tier fetch and returns the raw parsed feed.
    ///
    /// Primary tier: the parser retrieves the URL itself with plain client
    /// defaults. Fallback tier — attempted exactly once, and only when the
    /// primary tier errors, parses to no entry sequence, or yields zero
    /// entries: explicit transport (identification headers, bounded
    /// timeout), then a parse of the retrieved bytes.
    ///
    /// A structurally valid primary result is kept as a backstop: if the
    /// fallback fails outright, an empty-but-valid feed beats a second
    /// error.
    pub async fn fetch_feed(&self) -> Result<RawFeed, FeedError> {
        tracing::info!(url = %self.source, "Fetching feed");

        let primary = parser::parse_url(&self.client, self.source.as_str(), self.timeout).await;

        let primary_feed = match primary {
            Ok(feed) if feed.entry_count() > 0 => {
                tracing::debug!(entries = feed.entry_count(), "Primary tier succeeded");
                return Ok(feed);
            }
            Ok(feed) => {
                tracing::debug!(
                    structured = feed.is_structured(),
                    "Primary tier yielded no entries, trying fallback"
                );
                Some(feed)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Primary tier failed, trying fallback");
                None
            }
        };

        match self.fetch_fallback().await {
            Ok(feed) if feed.is_structured() => Ok(feed),
            Ok(feed) => {
                // Fallback transport succeeded but the document is
                // unstructured; a structured primary result still wins.
                match primary_feed {
                    Some(p) if p.is_structured() => Ok(p),
                    _ => Ok(feed),
                }
            }
            Err(e) => match primary_feed {
                Some(p) if p.is_structured() => {
                    tracing::warn!(error = %e, "Fallback tier failed, keeping empty primary result");
                    Ok(p)
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn fetch_fallback(&self) -> Result<RawFeed, TransportError> {
        let payload =
            transport::fetch(&self.client, self.source.as_str(), &self.agents, self.timeout).await?;
        tracing::debug!(
            status = payload.status,
            final_url = %payload.final_url,
            content_type = payload.content_type.as_deref().unwrap_or("-"),
            "Fallback transport succeeded"
        );
        Ok(parser::parse_feed(&payload.body))
    }

    /// Performs one fetch cycle and returns the surviving entry records.
    ///
    /// Applies the validation gate — a document with no entry sequence at
    /// all raises [`FeedError::InvalidStructure`] — then maps every raw
    /// entry through extraction and normalization, dropping entries with
    /// no usable content. Order matches the feed's own entry order.
    ///
    /// # Errors
    ///
    /// Transport failures after the fallback tier is exhausted, or
    /// [`FeedError::InvalidStructure`]. Per-entry extraction failures are
    /// never errors; they only affect that entry's inclusion.
    pub async fn entries(&self) -> Result<Vec<EntryRecord>, FeedError> {
        let feed = self.fetch_feed().await?;

        let raw_entries = feed.entries.ok_or_else(|| {
            FeedError::InvalidStructure(
                feed.diagnostic
                    .unwrap_or_else(|| "no entry sequence found".to_string()),
            )
        })?;

        let total = raw_entries.len();
        let records: Vec<EntryRecord> = raw_entries.iter().filter_map(normalize).collect();

        tracing::info!(
            total = total,
            kept = records.len(),
            dropped = total - records.len(),
            "Feed normalized"
        );
        Ok(records)
    }
}
