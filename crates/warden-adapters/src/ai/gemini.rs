//! Gemini API adapter implementation
//!
//! Implements the AIProviderPort trait for Google's Gemini `generateContent` API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use warden_core::api_key::SecretApiKey;
use warden_core::ports::ai::{AIError, AIProviderPort, AIResponse, TextPrompt};

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Gemini API base URL
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Maximum attempts when rate limited
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Gemini API adapter
pub struct GeminiAdapter {
    client: Client,
    api_key: SecretApiKey,
    model: String,
    base_url: String,
    initial_backoff: Duration,
}

impl GeminiAdapter {
    /// Creates a new Gemini adapter
    ///
    /// # Example
    /// ```
    /// use warden_adapters::ai::GeminiAdapter;
    /// use warden_core::SecretApiKey;
    ///
    /// let key = SecretApiKey::new("AIza-example".to_string()).unwrap();
    /// let adapter = GeminiAdapter::new(key, "gemini-1.5-flash")
    ///     .with_base_url("http://127.0.0.1:8080/v1beta/models");
    /// ```
    pub fn new(api_key: SecretApiKey, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to configure HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            api_key,
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Points the adapter at another models endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the first rate-limit backoff; later ones double
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    fn api_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.base_url,
            self.model,
            self.api_key.expose()
        )
    }

    fn build_request(&self, prompt: &TextPrompt) -> GenerateContentRequest {
        let mut parts = Vec::new();

        if !prompt.system_message.is_empty() {
            parts.push(Part {
                text: prompt.system_message.clone(),
            });
        }

        parts.push(Part {
            text: prompt.user_text.clone(),
        });

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(2048),
                temperature: None,
            }),
        }
    }

    /// Sends a request, retrying with exponential backoff while rate limited
    async fn send_request(&self, request: &GenerateContentRequest) -> Result<AIResponse, AIError> {
        for attempt in 0..MAX_RETRIES {
            match self.send_single_request(request).await {
                Err(AIError::RateLimitExceeded) if attempt + 1 < MAX_RETRIES => {
                    let backoff = self.initial_backoff * 2u32.pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }

        Err(AIError::RateLimitExceeded)
    }

    async fn send_single_request(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<AIResponse, AIError> {
        debug!(model = %self.model, "Sending request to Gemini API");

        let response = self
            .client
            .post(self.api_url())
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                // The URL carries the key
                let e = e.without_url();
                error!(error = %e, "Failed to send request to Gemini API");
                AIError::RequestFailed(e.to_string())
            })?;

        let status = response.status();

        if status.is_success() {
            let body: GenerateContentResponse = response.json().await.map_err(|e| {
                let e = e.without_url();
                error!(error = %e, "Failed to parse Gemini API response");
                AIError::InvalidResponse(e.to_string())
            })?;

            let text = body.text();
            if text.is_empty() {
                warn!("Gemini API returned no text content");
            } else {
                debug!(text_length = text.len(), "Received response from Gemini API");
            }

            Ok(AIResponse { text })
        } else {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            match status.as_u16() {
                401 | 403 => {
                    error!("Gemini API authentication failed");
                    Err(AIError::Unauthorized)
                }
                429 => {
                    warn!("Gemini API rate limit exceeded");
                    Err(AIError::RateLimitExceeded)
                }
                400 => {
                    error!(body = %error_body, "Gemini API invalid request");
                    Err(AIError::InvalidRequest(error_body))
                }
                _ => {
                    error!(status = %status, body = %error_body, "Gemini API error");
                    Err(AIError::ProviderError("gemini".to_string(), error_body))
                }
            }
        }
    }
}

#[async_trait]
impl AIProviderPort for GeminiAdapter {
    async fn generate(&self, prompt: TextPrompt) -> Result<AIResponse, AIError> {
        let request = self.build_request(&prompt);
        self.send_request(&request).await
    }
}

// === Request/Response Types ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// Blocked or truncated answers omit `content` or `parts`
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated as sent
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}
