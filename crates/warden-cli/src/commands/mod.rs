//! CLI command implementations
//!
//! Each subcommand has its own module; wiring shared by all of them lives here.

pub mod daemon;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use warden_adapters::{GeminiAdapter, HassRestAdapter};
use warden_core::ports::AIProviderPort;
use warden_core::{ApiKeyManager, Config, NarrativeGenerator, ReportRunner};

/// Report runner wired to the hub REST adapter
pub type HubRunner = ReportRunner<HassRestAdapter, HassRestAdapter>;

/// Creates the hub client from configuration and `HASS_TOKEN`
pub fn build_hub_adapter(config: &Config) -> Result<Arc<HassRestAdapter>> {
    let token = ApiKeyManager::resolve_hub_token(config.hub.token.as_deref());
    let adapter = HassRestAdapter::new(
        config.hub.url.clone(),
        token,
        Duration::from_secs(config.hub.request_timeout_seconds),
    )
    .context("Failed to create Home Assistant client")?;
    Ok(Arc::new(adapter))
}

/// Creates the narrative generator, or `None` when no usable key is configured
pub fn build_narrative(config: &Config) -> Option<NarrativeGenerator> {
    let model = config.ai.model.clone();
    NarrativeGenerator::from_credential(
        ApiKeyManager::resolve_ai_key(config.ai.api_key.as_deref()),
        move |key| -> Arc<dyn AIProviderPort> { Arc::new(GeminiAdapter::new(key, model)) },
    )
}

/// Wires a report runner to `hub`
pub fn build_runner(config: &Config, hub: Arc<HassRestAdapter>) -> HubRunner {
    ReportRunner::new(Arc::clone(&hub), hub, config.sensors.clone())
        .with_narrative(build_narrative(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_hub_adapter_uses_configured_url() {
        let mut config = Config::default();
        config.hub.url = "http://ha.test:8123/".to_string();

        let adapter = build_hub_adapter(&config).unwrap();
        assert_eq!(adapter.base_url(), "http://ha.test:8123");
    }

    #[test]
    fn test_configured_placeholder_key_disables_narrative() {
        let mut config = Config::default();
        config.ai.api_key = Some("PASTE_YOUR_GOOGLE_AI_KEY_HERE".to_string());

        let hub = build_hub_adapter(&config).unwrap();
        let runner = build_runner(&config, hub);
        assert!(!runner.narrative_enabled());
    }

    #[test]
    fn test_configured_key_enables_narrative() {
        let mut config = Config::default();
        config.ai.api_key = Some("AIza-configured".to_string());

        assert!(build_narrative(&config).is_some());
    }
}
