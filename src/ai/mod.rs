//! The summarization/translation collaborator.
//!
//! The feed pipeline hands finished [`EntryRecord`](crate::feed::EntryRecord)s
//! to a [`Processor`]; everything behind that trait — prompt construction,
//! the Gemini REST protocol, retry policy — is this module's concern and
//! nobody else's. Failures are the caller's responsibility to handle, so
//! both operations return typed errors instead of degrading silently.

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

pub mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};

/// Errors from the AI collaborator.
#[derive(Debug, Error)]
pub enum AiError {
    /// No API key was configured
    #[error("GOOGLE_API_KEY is not set")]
    MissingApiKey,
    /// Request exceeded its bounded wait
    #[error("request timed out")]
    Timeout,
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx answer from the API, with the server's message when one
    /// could be decoded
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    /// 2xx answer that contained no generated text
    #[error("empty response from model")]
    EmptyResponse,
}

impl AiError {
    /// True if the failure is transient and the request is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::Timeout | AiError::Network(_) => true,
            AiError::Api { status, .. } => *status >= 500,
            AiError::MissingApiKey | AiError::EmptyResponse => false,
        }
    }
}

/// The narrow interface the rest of the system sees: two independent,
/// idempotent-per-call text operations.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Produces a condensed version of `text` in its source language.
    async fn summarize(&self, text: &str) -> Result<String, AiError>;

    /// Translates `text` into the target language (Japanese).
    async fn translate(&self, text: &str) -> Result<String, AiError>;
}

/// Deterministic test double.
///
/// Echo mode derives its output from the input so assertions can follow
/// text through the pipeline; failing mode errors on every call to
/// exercise per-entry error handling. All calls are recorded.
#[derive(Debug, Default)]
pub struct MockProcessor {
    fail: bool,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A processor whose every call fails with a non-retryable API error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls received so far, as (operation, input) pairs.
    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, text: &str) -> Result<(), AiError> {
        self.calls.lock().unwrap().push((op, text.to_string()));
        if self.fail {
            return Err(AiError::Api {
                status: 400,
                message: "mock failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Processor for MockProcessor {
    async fn summarize(&self, text: &str) -> Result<String, AiError> {
        self.record("summarize", text)?;
        Ok(format!("summary({})", text))
    }

    async fn translate(&self, text: &str) -> Result<String, AiError> {
        self.record("translate", text)?;
        Ok(format!("訳({})", text))
    }
}
