//! Optional narrative analysis of a health report

use crate::api_key::SecretApiKey;
use crate::ports::ai::{AIError, AIProviderPort};
use crate::prompt::PromptBuilder;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Text used when the provider answered without any content
pub const NO_RESPONSE_TEXT: &str = "⚠️ No AI response";

/// Sends report text to a text-generation provider
#[derive(Clone)]
pub struct NarrativeGenerator {
    provider: Arc<dyn AIProviderPort>,
}

impl NarrativeGenerator {
    pub fn new(provider: Arc<dyn AIProviderPort>) -> Self {
        Self { provider }
    }

    /// Builds a generator only when a usable credential was resolved
    ///
    /// `make_provider` is not called for a missing or placeholder credential,
    /// so no client is constructed and no request can be made.
    pub fn from_credential<F>(
        credential: Result<SecretApiKey, AIError>,
        make_provider: F,
    ) -> Option<Self>
    where
        F: FnOnce(SecretApiKey) -> Arc<dyn AIProviderPort>,
    {
        match credential {
            Ok(key) => Some(Self::new(make_provider(key))),
            Err(e) => {
                error!(error = %e, "Google API key not configured correctly, narrative analysis disabled");
                None
            }
        }
    }

    /// Returns the provider's analysis of `report`
    ///
    /// An empty answer is replaced by [`NO_RESPONSE_TEXT`]; every other
    /// failure is returned for the caller to log.
    pub async fn generate(&self, report: &str, now: NaiveDateTime) -> Result<String, AIError> {
        let prompt = PromptBuilder::build_health_prompt(report, now)?;
        debug!(prompt_length = prompt.user_text.len(), "Requesting narrative analysis");

        let response = self.provider.generate(prompt).await?;
        if response.text.is_empty() {
            info!("AI provider returned no content");
            return Ok(NO_RESPONSE_TEXT.to_string());
        }

        Ok(response.text)
    }
}
