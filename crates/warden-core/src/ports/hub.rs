//! Home Assistant hub port definitions
//!
//! The hub is the only shared resource Warden touches. Reads are side-effect
//! free; the single write is creating a persistent notification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Current state of a single hub entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Entity identifier (e.g., "light.kitchen")
    pub entity_id: String,

    /// State value (e.g., "on", "23.5", "unavailable")
    pub state: String,

    /// Arbitrary attributes reported by the integration
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,

    /// When the state value last changed
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,

    /// When the entity was last written, even without a value change
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl EntityState {
    /// Creates a state record with no attributes or timestamps
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: serde_json::Map::new(),
            last_changed: None,
            last_updated: None,
        }
    }
}

/// Full entity mapping as supplied by the hub, ordered by entity id
pub type EntitySnapshot = BTreeMap<String, EntityState>;

/// Builds a snapshot from the list form returned by `GET /api/states`
///
/// Later duplicates of the same entity id replace earlier ones.
pub fn snapshot_from_states(states: Vec<EntityState>) -> EntitySnapshot {
    states
        .into_iter()
        .map(|state| (state.entity_id.clone(), state))
        .collect()
}

/// Errors that can occur while talking to the hub
#[derive(Debug, Error)]
pub enum HubError {
    /// Token missing or rejected
    #[error("Hub rejected the access token (check hub.token or HASS_TOKEN)")]
    Unauthorized,

    /// Transport-level failure
    #[error("Hub request failed: {0}")]
    RequestFailed(String),

    /// Non-success HTTP status
    #[error("Hub returned status {0}: {1}")]
    UnexpectedStatus(u16, String),

    /// Body could not be decoded
    #[error("Invalid hub response: {0}")]
    InvalidResponse(String),
}

/// Read-only access to hub state
#[async_trait]
pub trait StatePort: Send + Sync {
    /// Reads every entity the hub knows about
    async fn get_states(&self) -> Result<EntitySnapshot, HubError>;

    /// Reads one entity; `Ok(None)` when the hub does not know it
    async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>, HubError>;
}

/// Hub notification service
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Creates a persistent notification. Success means "accepted".
    async fn create_notification(&self, title: &str, message: &str) -> Result<(), HubError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_states_orders_and_dedupes() {
        let snapshot = snapshot_from_states(vec![
            EntityState::new("switch.b", "off"),
            EntityState::new("light.a", "on"),
            EntityState::new("switch.b", "on"),
        ]);

        assert_eq!(snapshot.len(), 2);
        let ids: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(ids, vec!["light.a", "switch.b"]);
        assert_eq!(snapshot["switch.b"].state, "on");
    }

    #[test]
    fn test_entity_state_deserializes_hub_payload() {
        let json = r#"{
            "entity_id": "sensor.outdoor_temp",
            "state": "21.4",
            "attributes": {"unit_of_measurement": "°C", "friendly_name": "Outdoor"},
            "last_changed": "2024-06-15T13:30:45.123456+00:00",
            "last_updated": "2024-06-15T13:30:45.123456+00:00",
            "context": {"id": "01J0", "parent_id": null, "user_id": null}
        }"#;

        let state: EntityState = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(state.entity_id, "sensor.outdoor_temp");
        assert_eq!(state.state, "21.4");
        assert_eq!(state.attributes["friendly_name"], "Outdoor");
        assert!(state.last_changed.is_some());
    }

    #[test]
    fn test_entity_state_minimal_payload() {
        let json = r#"{"entity_id": "automation.morning", "state": "on"}"#;
        let state: EntityState = serde_json::from_str(json).expect("Failed to deserialize");
        assert!(state.attributes.is_empty());
        assert!(state.last_updated.is_none());
    }

    #[test]
    fn test_hub_error_messages() {
        assert!(HubError::Unauthorized.to_string().contains("HASS_TOKEN"));
        let err = HubError::UnexpectedStatus(502, "Bad Gateway".to_string());
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad Gateway"));
    }
}
