//! Credential handling for the hub and the AI provider
//!
//! Resolves keys from configuration or environment variables and rejects
//! the placeholder values shipped in sample configuration files.

use crate::ports::ai::AIError;
use std::env;
use std::fmt;

/// Environment variable name for the Google AI API key
pub const GOOGLE_AI_API_KEY_ENV: &str = "GOOGLE_AI_API_KEY";

/// Environment variable name for the Home Assistant long-lived access token
pub const HASS_TOKEN_ENV: &str = "HASS_TOKEN";

/// Marker found in unedited sample keys (`PASTE_YOUR_API_KEY_HERE`)
pub const PLACEHOLDER_MARKER: &str = "PASTE_YOUR";

/// A wrapper for secrets that prevents accidental logging
///
/// The `Debug` and `Display` implementations mask the actual value
/// to prevent sensitive data from appearing in logs.
#[derive(Clone)]
pub struct SecretApiKey {
    key: String,
}

impl SecretApiKey {
    /// Creates a new SecretApiKey from a string
    ///
    /// # Returns
    /// * `Some(SecretApiKey)` if the key is non-empty and not a placeholder
    /// * `None` if the key is empty, whitespace-only, or contains [`PLACEHOLDER_MARKER`]
    pub fn new(key: String) -> Option<Self> {
        let trimmed = key.trim();
        if trimmed.is_empty() || is_placeholder(trimmed) {
            None
        } else {
            Some(Self {
                key: trimmed.to_string(),
            })
        }
    }

    /// Returns the actual secret value
    ///
    /// Use this only when actually making API calls.
    /// Never log the returned value.
    pub fn expose(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for SecretApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretApiKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SecretApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED API KEY]")
    }
}

/// Returns true for values that were never replaced with a real key
pub fn is_placeholder(value: &str) -> bool {
    value.contains(PLACEHOLDER_MARKER)
}

/// Resolves credentials from configuration and environment
pub struct ApiKeyManager;

impl ApiKeyManager {
    /// Resolves the Gemini API key
    ///
    /// The configured value wins when present; otherwise `GOOGLE_AI_API_KEY`
    /// is read. A configured placeholder does not fall through to the
    /// environment: it means "not configured".
    ///
    /// # Example
    /// ```no_run
    /// use warden_core::api_key::ApiKeyManager;
    ///
    /// let key = ApiKeyManager::resolve_ai_key(Some("AIza-real-key"))
    ///     .expect("API key not set");
    /// ```
    pub fn resolve_ai_key(configured: Option<&str>) -> Result<SecretApiKey, AIError> {
        let from_env = env::var(GOOGLE_AI_API_KEY_ENV).ok();
        Self::pick_ai_key(configured, from_env.as_deref())
    }

    fn pick_ai_key(
        configured: Option<&str>,
        from_env: Option<&str>,
    ) -> Result<SecretApiKey, AIError> {
        configured
            .or(from_env)
            .and_then(|raw| SecretApiKey::new(raw.to_string()))
            .ok_or(AIError::Unauthorized)
    }

    /// Resolves the hub access token; `HASS_TOKEN` overrides the configured value
    pub fn resolve_hub_token(configured: Option<&str>) -> Option<SecretApiKey> {
        let from_env = env::var(HASS_TOKEN_ENV).ok();
        Self::pick_hub_token(configured, from_env.as_deref())
    }

    fn pick_hub_token(configured: Option<&str>, from_env: Option<&str>) -> Option<SecretApiKey> {
        from_env
            .and_then(|raw| SecretApiKey::new(raw.to_string()))
            .or_else(|| configured.and_then(|raw| SecretApiKey::new(raw.to_string())))
    }

    /// Generates a helpful message when the AI key is missing
    pub fn missing_key_guidance() -> String {
        format!(
            r#"Google Gemini API key is not configured; narrative analysis is disabled.

To set up your API key, either:

1. Add it to ~/.warden/config.toml:
   [ai]
   api_key = "your-api-key-here"

2. Or set the environment variable:
   export {GOOGLE_AI_API_KEY_ENV}=your-api-key-here

Keys can be created at https://aistudio.google.com/"#
        )
    }
}
