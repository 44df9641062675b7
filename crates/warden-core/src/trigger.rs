//! Trigger sources and state-change handlers
//!
//! Every trigger source pushes a [`Trigger`] onto one channel; a single
//! dispatcher drains it so report runs never overlap.

use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What started a report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Service start
    Startup,
    /// Daily timer
    Daily,
    /// Watched entity changed state
    StateChange {
        entity_id: String,
        old: Option<String>,
        new: String,
    },
    /// Explicit request from the command line
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Startup => write!(f, "startup"),
            Trigger::Daily => write!(f, "daily schedule"),
            Trigger::StateChange { entity_id, .. } => write!(f, "state change of {}", entity_id),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

pub type TriggerSender = mpsc::UnboundedSender<Trigger>;
pub type TriggerReceiver = mpsc::UnboundedReceiver<Trigger>;

/// Creates the channel connecting trigger sources to the dispatcher
pub fn trigger_channel() -> (TriggerSender, TriggerReceiver) {
    mpsc::unbounded_channel()
}

/// Callback invoked when a watched entity changes state
///
/// `old` is `None` when the entity was previously absent from the hub.
pub trait StateChangeHandler: Send + Sync {
    fn on_state_change(&self, entity_id: &str, old: Option<&str>, new: &str);
}

/// Requests a report when a button-like entity reaches a given state
pub struct ButtonPressHandler {
    fire_on: Option<String>,
    sender: TriggerSender,
}

impl ButtonPressHandler {
    /// `fire_on` of `None` or `""` fires on every change
    pub fn new(fire_on: Option<String>, sender: TriggerSender) -> Self {
        let fire_on = fire_on.filter(|value| !value.is_empty());
        Self { fire_on, sender }
    }

    fn matches(&self, new: &str) -> bool {
        self.fire_on.as_deref().map_or(true, |expected| expected == new)
    }
}

impl StateChangeHandler for ButtonPressHandler {
    fn on_state_change(&self, entity_id: &str, old: Option<&str>, new: &str) {
        if !self.matches(new) {
            debug!(entity_id, new, "State change ignored");
            return;
        }

        info!(entity_id, "Manual trigger detected");
        let trigger = Trigger::StateChange {
            entity_id: entity_id.to_string(),
            old: old.map(str::to_string),
            new: new.to_string(),
        };
        if self.sender.send(trigger).is_err() {
            warn!(entity_id, "Dispatcher is gone, trigger dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_display() {
        assert_eq!(Trigger::Startup.to_string(), "startup");
        assert_eq!(Trigger::Daily.to_string(), "daily schedule");
        assert_eq!(Trigger::Manual.to_string(), "manual");
        let change = Trigger::StateChange {
            entity_id: "input_button.review_ha_logs".to_string(),
            old: None,
            new: "on".to_string(),
        };
        assert_eq!(
            change.to_string(),
            "state change of input_button.review_ha_logs"
        );
    }

    #[test]
    fn test_handler_fires_on_matching_state() {
        let (tx, mut rx) = trigger_channel();
        let handler = ButtonPressHandler::new(Some("on".to_string()), tx);

        handler.on_state_change("input_button.review_ha_logs", Some("off"), "on");

        assert_eq!(
            rx.try_recv().unwrap(),
            Trigger::StateChange {
                entity_id: "input_button.review_ha_logs".to_string(),
                old: Some("off".to_string()),
                new: "on".to_string(),
            }
        );
    }

    #[test]
    fn test_handler_ignores_other_states() {
        let (tx, mut rx) = trigger_channel();
        let handler = ButtonPressHandler::new(Some("Press".to_string()), tx);

        handler.on_state_change("input_select.mode", Some("Idle"), "Hold");
        handler.on_state_change("input_select.mode", Some("Hold"), "press");

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_handler_without_filter_fires_on_any_change() {
        let (tx, mut rx) = trigger_channel();
        let handler = ButtonPressHandler::new(Some(String::new()), tx);

        handler.on_state_change(
            "input_button.report",
            Some("2024-06-15T20:00:00+00:00"),
            "2024-06-15T20:01:00+00:00",
        );

        assert!(matches!(rx.try_recv(), Ok(Trigger::StateChange { .. })));
    }

    #[test]
    fn test_handler_survives_closed_channel() {
        let (tx, rx) = trigger_channel();
        drop(rx);
        let handler = ButtonPressHandler::new(None, tx);

        handler.on_state_change("input_button.report", None, "on");
    }
}
