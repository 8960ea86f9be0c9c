use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Fallback identification string used when a pool is constructed empty.
const DEFAULT_AGENT: &str = "feedbrief/0.1 (+github.com/dhofheinz/feedbrief)";

/// Errors that can occur during a single transport attempt.
///
/// The transport layer performs exactly one attempt per call — retry and
/// fallback policy belongs to the fetch orchestrator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded its bounded wait
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("response too large")]
    ResponseTooLarge,
}

/// The outcome of a successful transport attempt.
///
/// `final_url` is the post-redirect URL — redirects are followed
/// transparently and the landing address is reported to the caller.
#[derive(Debug)]
pub struct FetchedPayload {
    /// HTTP status code of the final response
    pub status: u16,
    /// URL after following redirects
    pub final_url: String,
    /// Raw response body, capped at 10MB
    pub body: Vec<u8>,
    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,
}

/// A rotating pool of identification (User-Agent) strings.
///
/// Some hosts refuse traffic that identifies itself as automation; a
/// plausible browser string, varied between attempts, reduces the chance of
/// a refusal. This is a heuristic mitigation, not a correctness
/// requirement, so the strategy is pluggable: tests construct a
/// single-value pool and rotation disappears.
///
/// Selection is round-robin on an atomic cursor, so successive attempts
/// see successive values without any shared-state locking.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl UserAgentPool {
    /// Builds a pool from candidate strings. An empty list falls back to a
    /// single static identifier so `next()` always has a value to hand out.
    pub fn new(agents: Vec<String>) -> Self {
        let agents = if agents.is_empty() {
            vec![DEFAULT_AGENT.to_string()]
        } else {
            agents
        };
        Self {
            agents,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns the next identification string, advancing the rotation.
    pub fn next(&self) -> &str {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[idx]
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Performs one HTTP retrieval of `url`.
///
/// Attaches the pool's next identification header, bounds the attempt with
/// `timeout`, follows redirects, and reads the body through a size-capped
/// stream.
///
/// # Errors
///
/// - [`TransportError::Timeout`] — the attempt exceeded `timeout`
/// - [`TransportError::HttpStatus`] — the server answered with non-2xx
/// - [`TransportError::Network`] — connection, DNS, or TLS failure
/// - [`TransportError::ResponseTooLarge`] — body exceeded the 10MB cap
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    agents: &UserAgentPool,
    timeout: Duration,
) -> Result<FetchedPayload, TransportError> {
    let agent = agents.next();
    tracing::debug!(url = %url, agent = %agent, "Fetching feed over explicit transport");

    let response = tokio::time::timeout(
        timeout,
        client
            .get(url)
            .header(reqwest::header::USER_AGENT, agent)
            .header(
                reqwest::header::ACCEPT,
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8",
            )
            .send(),
    )
    .await
    .map_err(|_| TransportError::Timeout)?
    .map_err(TransportError::Network)?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::HttpStatus(status.as_u16()));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = read_limited_bytes(response, MAX_FEED_SIZE).await?;

    Ok(FetchedPayload {
        status: status.as_u16(),
        final_url,
        body,
        content_type,
    })
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(TransportError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(TransportError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
