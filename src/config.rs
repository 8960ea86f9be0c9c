//! Configuration for a feedbrief run.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos. Environment variables override file
//! values; CLI flags (applied by the binary) override both.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
///
/// The custom Debug impl masks `api_key` to prevent secret leakage in logs
/// and error messages.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed to fetch.
    pub feed_url: String,

    /// Directory the markdown digests are written to.
    pub output_dir: String,

    /// Gemini model identifier.
    pub model: String,

    /// Character budget requested from the summarizer.
    pub max_summary_chars: usize,

    /// Per-attempt network timeout, in seconds.
    pub request_timeout_secs: u64,

    /// Identification strings rotated between transport attempts.
    /// An empty list disables rotation.
    pub user_agents: Vec<String>,

    /// Gemini API key (alternative to the GOOGLE_API_KEY env var).
    /// Env var takes precedence over the config file.
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "https://blog.research.google/feeds/posts/default".to_string(),
            output_dir: "output".to_string(),
            model: "gemini-pro".to_string(),
            max_summary_chars: 500,
            request_timeout_secs: 30,
            user_agents: default_user_agents(),
            api_key: None,
        }
    }
}

/// Plausible browser identification strings, rotated per attempt.
fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Mask api_key in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feed_url", &self.feed_url)
            .field("output_dir", &self.output_dir)
            .field("model", &self.model)
            .field("max_summary_chars", &self.max_summary_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agents", &self.user_agents)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "feed_url",
                "output_dir",
                "model",
                "max_summary_chars",
                "request_timeout_secs",
                "user_agents",
                "api_key",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feed_url = %config.feed_url, "Loaded configuration");
        Ok(config)
    }

    /// Apply environment overrides, mirroring the variables the tool has
    /// always honored: RSS_FEED_URL, OUTPUT_DIR, MAX_SUMMARY_LENGTH,
    /// GOOGLE_API_KEY.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("RSS_FEED_URL") {
            if !url.trim().is_empty() {
                self.feed_url = url;
            }
        }
        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = dir;
            }
        }
        if let Ok(len) = std::env::var("MAX_SUMMARY_LENGTH") {
            match len.parse::<usize>() {
                Ok(parsed) => self.max_summary_chars = parsed,
                Err(_) => {
                    tracing::warn!(value = %len, "MAX_SUMMARY_LENGTH is not a number, ignoring")
                }
            }
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
