//! Warden Core - Domain logic for the Home Assistant health digest
//!
//! This crate contains the analysis, report orchestration, trigger plumbing
//! and port definitions following the Hexagonal Architecture pattern.

pub mod analyzer;
pub mod api_key;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod narrative;
pub mod notifier;
pub mod orchestrator;
pub mod ports;
pub mod prompt;
pub mod scheduler;
pub mod service;
pub mod trigger;
pub mod watcher;

// Re-export primary types for convenient access
pub use analyzer::{HealthAnalyzer, HealthReport, SensorReadings};
pub use api_key::{ApiKeyManager, SecretApiKey, GOOGLE_AI_API_KEY_ENV, HASS_TOKEN_ENV};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    get_default_config_path, load_config, load_config_from_path, AiConfig, Config, HubConfig,
    LoadedConfig, ScheduleConfig, SensorConfig, StorageConfig, TriggerConfig,
};
pub use error::{AIError, ConfigError, HubError};
pub use logging::{init_logger, LogLevel, LoggerConfig, LoggerError, LoggerGuard};
pub use narrative::NarrativeGenerator;
pub use notifier::{Notification, Notifier};
pub use orchestrator::{NarrativeStatus, ReportOutcome, ReportRunner, RunFault};
pub use ports::{AIProviderPort, EntitySnapshot, EntityState, NotificationPort, StatePort};
pub use prompt::PromptBuilder;
pub use scheduler::{duration_until_next, DailyScheduler, SchedulerError};
pub use service::TriggerDispatcher;
pub use trigger::{trigger_channel, ButtonPressHandler, StateChangeHandler, Trigger};
pub use watcher::{build_watcher, StateWatcher};
