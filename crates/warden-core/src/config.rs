//! Configuration management for Warden
//!
//! Handles loading and validation of TOML configuration files.

use crate::error::ConfigError;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for Warden
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Hub connection settings
    #[serde(default)]
    pub hub: HubConfig,

    /// Daily schedule settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Manual trigger entities
    #[serde(default)]
    pub triggers: TriggerConfig,

    /// Named sensors read alongside the snapshot
    #[serde(default)]
    pub sensors: SensorConfig,

    /// AI provider settings
    #[serde(default)]
    pub ai: AiConfig,

    /// Storage-related settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Home Assistant connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HubConfig {
    /// Base URL of the hub (default: http://homeassistant.local:8123)
    #[serde(default = "default_hub_url")]
    pub url: String,

    /// Long-lived access token; `HASS_TOKEN` overrides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// HTTP timeout for hub requests in seconds (default: 10)
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// How often trigger entities are polled in seconds (default: 5)
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: default_hub_url(),
            token: None,
            request_timeout_seconds: default_request_timeout_seconds(),
            poll_interval_seconds: default_poll_interval_seconds(),
        }
    }
}

/// Daily schedule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Local time of the daily report, `HH:MM` or `HH:MM:SS` (default: 20:00)
    #[serde(default = "default_daily_at")]
    pub daily_at: String,

    /// Publish a report as soon as the daemon starts (default: true)
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_at: default_daily_at(),
            run_on_startup: default_run_on_startup(),
        }
    }
}

/// Entities whose state changes start a report
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerConfig {
    /// Helper button watched by default
    #[serde(default = "default_helper_button")]
    pub helper_button: String,

    /// New state of the helper button that fires a report; empty fires on any change
    #[serde(default = "default_helper_fire_on")]
    pub helper_fire_on: String,

    /// Optional externally configured trigger button
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_button: Option<String>,

    /// New state of the trigger button that fires a report; empty fires on any change
    #[serde(default = "default_trigger_fire_on")]
    pub trigger_fire_on: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            helper_button: default_helper_button(),
            helper_fire_on: default_helper_fire_on(),
            trigger_button: None,
            trigger_fire_on: default_trigger_fire_on(),
        }
    }
}

/// Sensor entity ids consulted by the analyzer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorConfig {
    #[serde(default = "default_device_count_sensor")]
    pub device_count: String,

    #[serde(default = "default_entity_count_sensor")]
    pub entity_count: String,

    #[serde(default = "default_uptime_sensor")]
    pub uptime: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device_count: default_device_count_sensor(),
            entity_count: default_entity_count_sensor(),
            uptime: default_uptime_sensor(),
        }
    }
}

/// AI provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// Gemini API key; `GOOGLE_AI_API_KEY` is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name to use
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Base data directory (default: ~/.warden/)
    #[serde(
        default = "default_data_dir",
        deserialize_with = "deserialize_data_dir"
    )]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Directory holding the rolling log files
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

// Default value functions
fn default_hub_url() -> String {
    "http://homeassistant.local:8123".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_daily_at() -> String {
    "20:00".to_string()
}

fn default_run_on_startup() -> bool {
    true
}

fn default_helper_button() -> String {
    "input_button.review_ha_logs".to_string()
}

fn default_helper_fire_on() -> String {
    "on".to_string()
}

fn default_trigger_fire_on() -> String {
    "Press".to_string()
}

fn default_device_count_sensor() -> String {
    "sensor.ha_device_count".to_string()
}

fn default_entity_count_sensor() -> String {
    "sensor.ha_entity_count".to_string()
}

fn default_uptime_sensor() -> String {
    "sensor.home_assistant_uptime".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".warden")
}

/// Expands tilde (~) in a path to the home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    path.to_path_buf()
}

/// Custom deserializer for data_dir that expands tilde
fn deserialize_data_dir<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path_str = String::deserialize(deserializer)?;
    let path = PathBuf::from(path_str);
    Ok(expand_tilde(&path))
}

/// Parses a time of day written as `HH:MM` or `HH:MM:SS`
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ConfigError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| {
            ConfigError::InvalidValue(format!(
                "daily_at must be HH:MM or HH:MM:SS, got '{}'",
                value
            ))
        })
}

fn validate_entity_id(field: &str, value: &str) -> Result<(), ConfigError> {
    match value.split_once('.') {
        Some((domain, object_id)) if !domain.is_empty() && !object_id.is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be an entity id like 'domain.object_id', got '{}'",
            field, value
        ))),
    }
}

impl HubConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "hub.url must start with http:// or https://".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "request_timeout_seconds must be > 0".to_string(),
            ));
        }

        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_seconds must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl ScheduleConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        parse_time_of_day(&self.daily_at).map(|_| ())
    }
}

impl TriggerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_entity_id("triggers.helper_button", &self.helper_button)?;
        if let Some(button) = &self.trigger_button {
            validate_entity_id("triggers.trigger_button", button)?;
        }
        Ok(())
    }
}

impl SensorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_entity_id("sensors.device_count", &self.device_count)?;
        validate_entity_id("sensors.entity_count", &self.entity_count)?;
        validate_entity_id("sensors.uptime", &self.uptime)
    }
}

impl Config {
    /// Validates the configuration values
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if:
    /// - `hub.url` is not an http(s) URL
    /// - `hub.request_timeout_seconds` or `hub.poll_interval_seconds` is 0
    /// - `schedule.daily_at` is not a time of day
    /// - any trigger or sensor entity id is malformed
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hub.validate()?;
        self.schedule.validate()?;
        self.triggers.validate()?;
        self.sensors.validate()
    }

    /// Resets every invalid section to its defaults
    ///
    /// Valid sections are kept as read. Returns one message per reset section.
    pub fn reset_invalid_sections(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = self.hub.validate() {
            warnings.push(format!("{}. Using default [hub] settings.", e));
            self.hub = HubConfig::default();
        }
        if let Err(e) = self.schedule.validate() {
            warnings.push(format!("{}. Using default [schedule] settings.", e));
            self.schedule = ScheduleConfig::default();
        }
        if let Err(e) = self.triggers.validate() {
            warnings.push(format!("{}. Using default [triggers] settings.", e));
            self.triggers = TriggerConfig::default();
        }
        if let Err(e) = self.sensors.validate() {
            warnings.push(format!("{}. Using default [sensors] settings.", e));
            self.sensors = SensorConfig::default();
        }

        warnings
    }

    /// Returns the parsed daily report time
    pub fn daily_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time_of_day(&self.schedule.daily_at)
    }
}

/// A loaded configuration and the fallbacks applied while loading it
///
/// Loading happens before logging is set up, so fallbacks are returned to
/// the caller instead of being logged here.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<String>,
}

/// Returns the default configuration file path (`~/.warden/config.toml`)
pub fn get_default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".warden")
        .join("config.toml")
}

/// Loads configuration from the specified path
///
/// If the file doesn't exist, creates a default configuration file.
/// If the file is not valid TOML, the whole default configuration is used.
/// Sections with invalid values fall back to their defaults one by one.
///
/// # Returns
/// * `Ok(LoadedConfig)` - The configuration and any fallback warnings
/// * `Err(ConfigError)` - Only for IO errors during file creation or reading
pub fn load_config_from_path(path: &Path) -> Result<LoadedConfig, ConfigError> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let default_config = Config::default();
        let toml_str = toml::to_string_pretty(&default_config)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, &toml_str)?;

        return Ok(LoadedConfig {
            config: default_config,
            warnings: Vec::new(),
        });
    }

    let content = fs::read_to_string(path)?;

    let mut config: Config = match toml::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            return Ok(LoadedConfig {
                config: Config::default(),
                warnings: vec![format!(
                    "Failed to parse configuration file {}: {}. Using default configuration.",
                    path.display(),
                    e
                )],
            });
        }
    };

    if config.validate().is_ok() {
        return Ok(LoadedConfig {
            config,
            warnings: Vec::new(),
        });
    }

    let warnings = config
        .reset_invalid_sections()
        .into_iter()
        .map(|w| format!("Invalid configuration in {}: {}", path.display(), w))
        .collect();

    Ok(LoadedConfig { config, warnings })
}

/// Loads configuration from the default path (`~/.warden/config.toml`)
pub fn load_config() -> Result<LoadedConfig, ConfigError> {
    load_config_from_path(&get_default_config_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.hub.url, "http://homeassistant.local:8123");
        assert_eq!(config.hub.poll_interval_seconds, 5);
        assert_eq!(config.schedule.daily_at, "20:00");
        assert!(config.schedule.run_on_startup);
        assert_eq!(config.triggers.helper_button, "input_button.review_ha_logs");
        assert_eq!(config.triggers.helper_fire_on, "on");
        assert_eq!(config.triggers.trigger_fire_on, "Press");
        assert!(config.triggers.trigger_button.is_none());
        assert_eq!(config.sensors.device_count, "sensor.ha_device_count");
        assert_eq!(config.sensors.entity_count, "sensor.ha_entity_count");
        assert_eq!(config.sensors.uptime, "sensor.home_assistant_uptime");
        assert_eq!(config.ai.model, "gemini-1.5-flash");
        assert!(config.ai.api_key.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).expect("Failed to serialize");
        assert!(toml_str.contains("daily_at"));
        assert!(toml_str.contains("helper_button"));
        // Secrets are not written unless set
        assert!(!toml_str.contains("api_key"));
        assert!(!toml_str.contains("token"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
[hub]
url = "https://ha.example.net"
token = "abc"
poll_interval_seconds = 2

[schedule]
daily_at = "07:30"
run_on_startup = false

[triggers]
trigger_button = "input_button.summary"

[ai]
api_key = "AIza-real"
model = "gemini-2.0-flash"
"#;
        let config: Config = toml::from_str(toml_str).expect("Failed to parse");
        assert_eq!(config.hub.url, "https://ha.example.net");
        assert_eq!(config.hub.token.as_deref(), Some("abc"));
        assert_eq!(config.hub.poll_interval_seconds, 2);
        assert_eq!(config.hub.request_timeout_seconds, 10);
        assert_eq!(config.schedule.daily_at, "07:30");
        assert!(!config.schedule.run_on_startup);
        assert_eq!(
            config.triggers.trigger_button.as_deref(),
            Some("input_button.summary")
        );
        assert_eq!(config.triggers.helper_button, "input_button.review_ha_logs");
        assert_eq!(config.ai.api_key.as_deref(), Some("AIza-real"));
        assert_eq!(config.ai.model, "gemini-2.0-flash");
    }

    // === Validation ===

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_hub_url_scheme() {
        let mut config = Config::default();
        config.hub.url = "homeassistant.local:8123".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("hub.url"));
    }

    #[test]
    fn test_validate_zero_intervals_fail() {
        let mut config = Config::default();
        config.hub.poll_interval_seconds = 0;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("poll_interval_seconds"));

        let mut config = Config::default();
        config.hub.request_timeout_seconds = 0;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("request_timeout_seconds"));
    }

    #[test]
    fn test_validate_daily_at() {
        let mut config = Config::default();
        config.schedule.daily_at = "25:00".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("daily_at"));

        config.schedule.daily_at = "06:15:30".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_entity_ids() {
        let mut config = Config::default();
        config.triggers.trigger_button = Some("no_dot".to_string());
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("triggers.trigger_button"));

        let mut config = Config::default();
        config.sensors.uptime = "sensor.".to_string();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("sensors.uptime"));
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("20:00").unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time_of_day(" 07:05:09 ").unwrap(),
            NaiveTime::from_hms_opt(7, 5, 9).unwrap()
        );
        assert!(parse_time_of_day("8pm").is_err());
    }

    #[test]
    fn test_daily_time() {
        let config = Config::default();
        assert_eq!(
            config.daily_time().unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap()
        );
    }

    // === Loading ===

    #[test]
    fn test_load_config_creates_default_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        assert!(!config_path.exists());

        let loaded = load_config_from_path(&config_path).unwrap();
        assert_eq!(loaded.config.schedule.daily_at, "20:00");
        assert!(loaded.warnings.is_empty());
        assert!(config_path.exists());

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[hub]"));
        assert!(content.contains("[schedule]"));
    }

    #[test]
    fn test_load_config_reads_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"
[schedule]
daily_at = "21:15"

[triggers]
trigger_button = "input_button.report_now"
"#,
        )
        .unwrap();

        let loaded = load_config_from_path(&config_path).unwrap();
        let config = loaded.config;
        assert!(loaded.warnings.is_empty());
        assert_eq!(config.schedule.daily_at, "21:15");
        assert_eq!(
            config.triggers.trigger_button.as_deref(),
            Some("input_button.report_now")
        );
        assert_eq!(config.hub.poll_interval_seconds, 5);
    }

    #[test]
    fn test_load_config_invalid_toml_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&config_path, "this is not valid toml {{{").unwrap();

        let loaded = load_config_from_path(&config_path).unwrap();
        assert_eq!(loaded.config.schedule.daily_at, "20:00");
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("Failed to parse configuration file"));
    }

    #[test]
    fn test_load_config_invalid_values_reset_only_their_section() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");

        fs::write(
            &config_path,
            format!(
                r#"
[hub]
url = "http://my-ha.lan:8123"
token = "secret"

[schedule]
daily_at = "8pm"

[ai]
api_key = "AIza-test"

[storage]
data_dir = "{}"
"#,
                data_dir.display()
            ),
        )
        .unwrap();

        let loaded = load_config_from_path(&config_path).unwrap();
        let config = &loaded.config;

        assert_eq!(config.schedule.daily_at, "20:00");
        assert_eq!(config.hub.url, "http://my-ha.lan:8123");
        assert_eq!(config.hub.token.as_deref(), Some("secret"));
        assert_eq!(config.ai.api_key.as_deref(), Some("AIza-test"));
        assert_eq!(config.storage.data_dir, data_dir);

        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("daily_at must be HH:MM"));
        assert!(loaded.warnings[0].contains("Using default [schedule] settings"));
    }

    #[test]
    fn test_reset_invalid_sections_reports_each_section() {
        let mut config = Config::default();
        config.hub.poll_interval_seconds = 0;
        config.hub.url = "http://other:8123".to_string();
        config.sensors.uptime = "uptime".to_string();
        config.schedule.daily_at = "07:30".to_string();

        let warnings = config.reset_invalid_sections();

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("poll_interval_seconds"));
        assert!(warnings[1].contains("sensors.uptime"));
        assert_eq!(config.hub.url, "http://homeassistant.local:8123");
        assert_eq!(config.sensors.uptime, SensorConfig::default().uptime);
        assert_eq!(config.schedule.daily_at, "07:30");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        assert!(path.ends_with("config.toml"));
        assert!(path.to_string_lossy().contains(".warden"));
    }

    #[test]
    fn test_tilde_expansion_in_data_dir() {
        let toml_str = r#"
[storage]
data_dir = "~/my_custom/warden_data"
"#;
        let config: Config = toml::from_str(toml_str).expect("Failed to parse");

        let home = dirs::home_dir().expect("Failed to get home directory");
        assert_eq!(config.storage.data_dir, home.join("my_custom/warden_data"));
        assert!(config.storage.data_dir.is_absolute());
    }

    #[test]
    fn test_absolute_path_unchanged() {
        let toml_str = r#"
[storage]
data_dir = "/var/lib/warden"
"#;
        let config: Config = toml::from_str(toml_str).expect("Failed to parse");

        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/warden"));
        assert_eq!(config.storage.log_dir(), PathBuf::from("/var/lib/warden/logs"));
    }
}
