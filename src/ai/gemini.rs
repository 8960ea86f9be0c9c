use crate::ai::{AiError, Processor};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-pro";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_SUMMARY_CHARS: usize = 500;

/// Retry budget for transient failures. Backoff doubles per attempt.
const MAX_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct GeminiConfig {
    /// API key, sent via the `x-goog-api-key` header and never logged
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Character budget the summarization prompt asks the model for
    pub max_summary_chars: usize,
}

impl GeminiConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_summary_chars: DEFAULT_MAX_SUMMARY_CHARS,
        }
    }
}

/// Masked Debug: the key must not leak into logs or error output.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_summary_chars", &self.max_summary_chars)
            .finish()
    }
}

/// Client for the Gemini `generateContent` REST endpoint.
///
/// One prompt in, one text candidate out. Transient failures (timeout,
/// network, 5xx) are retried with exponential backoff (1s, 2s, 4s);
/// everything else surfaces immediately.
pub struct GeminiClient {
    http: reqwest::Client,
    cfg: GeminiConfig,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, cfg: GeminiConfig) -> Self {
        Self { http, cfg }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.model
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let mut retry_count = 0;

        loop {
            match self.generate_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && retry_count < MAX_RETRIES => {
                    let delay = 1u64 << retry_count; // 1s, 2s, 4s
                    tracing::debug!(
                        error = %e,
                        retry = retry_count + 1,
                        delay_secs = delay,
                        "Retrying generation after transient error"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = tokio::time::timeout(
            self.cfg.timeout,
            self.http
                .post(self.endpoint())
                .header("x-goog-api-key", self.cfg.api_key.expose_secret())
                .json(&request)
                .send(),
        )
        .await
        .map_err(|_| AiError::Timeout)?
        .map_err(AiError::Network)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(AiError::Network)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiErrorEnvelope>(&bytes)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_slice(&bytes).map_err(|_| AiError::EmptyResponse)?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .find(|t| !t.is_empty())
            .ok_or(AiError::EmptyResponse)
    }

    fn summarize_prompt(&self, text: &str) -> String {
        format!(
            "Please summarize the following text in approximately {} characters, \
             maintaining all key technical details and main points:\n\n{}",
            self.cfg.max_summary_chars, text
        )
    }

    fn translate_prompt(text: &str) -> String {
        format!(
            "Please translate the following English text to Japanese. \
             Maintain technical terms accuracy and natural Japanese flow:\n\n{}",
            text
        )
    }
}

#[async_trait]
impl Processor for GeminiClient {
    async fn summarize(&self, text: &str) -> Result<String, AiError> {
        self.generate(&self.summarize_prompt(text)).await
    }

    async fn translate(&self, text: &str) -> Result<String, AiError> {
        self.generate(&Self::translate_prompt(text)).await
    }
}

// Wire format ------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CANDIDATE_BODY: &str = r#"{
        "candidates": [
            {"content": {"parts": [{"text": "generated text"}]}}
        ]
    }"#;

    fn client_for(uri: &str) -> GeminiClient {
        let mut cfg = GeminiConfig::new(SecretString::from("test-key"));
        cfg.base_url = uri.to_string();
        cfg.timeout = Duration::from_secs(5);
        GeminiClient::new(reqwest::Client::new(), cfg)
    }

    #[tokio::test]
    async fn test_summarize_success_extracts_candidate_text() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(CANDIDATE_BODY)
                    .insert_header("Content-Type", "application/json"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let out = client.summarize("article body").await.unwrap();
        assert_eq!(out, "generated text");

        // The prompt carries the character budget and the source text
        let requests = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("500 characters"));
        assert!(prompt.contains("article body"));
    }

    #[tokio::test]
    async fn test_translate_prompt_targets_japanese() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(CANDIDATE_BODY),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        client.translate("Hello").await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Japanese"));
        assert!(prompt.contains("Hello"));
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error": {"message": "API key not valid"}}"#),
            )
            .expect(1) // 4xx is not retried
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        match client.summarize("text").await.unwrap_err() {
            AiError::Api { status: 400, message } => {
                assert_eq!(message, "API key not valid");
            }
            e => panic!("Expected Api error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_server_error_retried_then_succeeds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CANDIDATE_BODY))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        let out = client.summarize("text").await.unwrap();
        assert_eq!(out, "generated text");
    }

    #[tokio::test]
    async fn test_empty_candidates_is_empty_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"candidates": []}"#))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server.uri());
        match client.summarize("text").await.unwrap_err() {
            AiError::EmptyResponse => {}
            e => panic!("Expected EmptyResponse, got {:?}", e),
        }
    }

    #[test]
    fn test_debug_masks_api_key() {
        let cfg = GeminiConfig::new(SecretString::from("super-secret"));
        let debug_output = format!("{:?}", cfg);
        assert!(!debug_output.contains("super-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
