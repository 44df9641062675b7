//! AI provider port definition

use async_trait::async_trait;
use thiserror::Error;

/// Text prompt for AI providers
#[derive(Debug, Clone)]
pub struct TextPrompt {
    /// System message for the AI
    pub system_message: String,
    /// User message text
    pub user_text: String,
}

/// Response from an AI provider
#[derive(Debug, Clone)]
pub struct AIResponse {
    /// Generated text response (may be empty when the provider returned no content)
    pub text: String,
}

/// Errors that can occur during AI operations
#[derive(Debug, Error)]
pub enum AIError {
    /// API key is missing, a placeholder, or rejected by the provider
    #[error("Unauthorized: API key is missing or invalid. Set ai.api_key in config.toml or the GOOGLE_AI_API_KEY environment variable")]
    Unauthorized,

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// Invalid request (e.g., empty report)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider-specific error
    #[error("Provider '{0}' error: {1}")]
    ProviderError(String, String),

    /// Request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

/// Port for text-generation providers
#[async_trait]
pub trait AIProviderPort: Send + Sync {
    /// Generates free text for the given prompt
    async fn generate(&self, prompt: TextPrompt) -> Result<AIResponse, AIError>;
}
