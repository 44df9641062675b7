//! Application initialization
//!
//! Loads configuration once, sets up logging and installs the fatal error
//! hook. Everything downstream receives the resulting [`AppContext`].

use anyhow::{Context, Result};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn};
use warden_core::{
    init_logger, load_config, load_config_from_path, Config, LoadedConfig, LogLevel, LoggerConfig,
    LoggerGuard,
};

/// Application context holding initialized components
pub struct AppContext {
    /// Application configuration
    pub config: Arc<Config>,
    /// Fallbacks applied while loading the configuration
    pub config_warnings: Vec<String>,
    /// Logger guard (keeps logger alive)
    #[allow(dead_code)]
    logger_guard: Option<LoggerGuard>,
}

impl AppContext {
    /// Returns reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Application initialization options
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Whether to initialize the logger
    pub init_logger: bool,
    /// Log level override
    pub log_level: Option<LogLevel>,
    /// Mirror logs to stdout
    pub log_to_stdout: bool,
}

impl InitOptions {
    /// Long-running service: file and stdout logging
    pub fn daemon() -> Self {
        Self {
            init_logger: true,
            log_level: Some(LogLevel::Info),
            log_to_stdout: true,
        }
    }

    /// One-shot command: file logging only, output goes to the terminal
    pub fn command() -> Self {
        Self {
            init_logger: true,
            log_level: None,
            log_to_stdout: false,
        }
    }

    /// `--verbose` raises the level to debug and mirrors logs to stdout
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.log_level = Some(LogLevel::Debug);
            self.log_to_stdout = true;
        }
        self
    }

    /// `--log-level` wins over both the command default and `--verbose`
    pub fn log_level(mut self, level: Option<LogLevel>) -> Self {
        if level.is_some() {
            self.log_level = level;
        }
        self
    }
}

/// Loads configuration from `path`, or from `~/.warden/config.toml` when absent
pub fn load_configuration(path: Option<&Path>) -> Result<LoadedConfig> {
    let loaded = match path {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    loaded.context("Failed to load configuration")
}

/// Initializes the Warden application
///
/// 1. Load configuration
/// 2. Initialize logging (if requested)
/// 3. Report configuration fallbacks
/// 4. Set up panic hook for fatal error handling
pub fn initialize(config_path: Option<&Path>, options: InitOptions) -> Result<AppContext> {
    let LoadedConfig { config, warnings } = load_configuration(config_path)?;
    let config = Arc::new(config);

    let logger_guard = if options.init_logger {
        let logger_config = LoggerConfig::new(config.storage.log_dir())
            .with_level(options.log_level.unwrap_or_default())
            .with_stdout(options.log_to_stdout);

        Some(init_logger(logger_config).context("Failed to initialize logger")?)
    } else {
        None
    };

    // Loading ran before any subscriber existed
    for warning in &warnings {
        warn!("{}", warning);
        if !options.log_to_stdout {
            eprintln!("Warning: {}", warning);
        }
    }

    setup_panic_hook(config.storage.log_dir());

    Ok(AppContext {
        config,
        config_warnings: warnings,
        logger_guard,
    })
}

/// Logs panics and points the user at the log directory
fn setup_panic_hook(log_dir: PathBuf) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic payload".to_string()
        };

        error!("FATAL ERROR at {}: {}", location, message);

        eprintln!();
        eprintln!("Warden encountered a fatal error and must exit.");
        eprintln!("Location: {}", location);
        eprintln!("Error: {}", message);
        eprintln!();
        eprintln!("Please check the log files in: {}", log_dir.display());
        eprintln!();

        default_hook(panic_info);
    }));
}
