//! Logging infrastructure for Warden
//!
//! Structured logging to a daily rolling file, optionally mirrored to stdout.
//! Uses `tracing` for instrumentation and `tracing-subscriber` for formatting.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Log file name prefix; files are named `warden.YYYY-MM-DD.log`
pub const LOG_FILE_PREFIX: &str = "warden";

/// Log file name suffix
pub const LOG_FILE_SUFFIX: &str = "log";

/// Number of daily log files kept before the oldest is removed
pub const DEFAULT_MAX_LOG_FILES: usize = 14;

/// Errors that can occur during logger initialization
#[derive(Debug, Error)]
pub enum LoggerError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(String),

    /// Failed to initialize the logger
    #[error("Failed to initialize logger: {0}")]
    InitializationFailed(String),

    /// Logger already initialized
    #[error("Logger has already been initialized")]
    AlreadyInitialized,
}

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Error level - critical failures
    Error,
    /// Warn level - warnings and recoverable issues
    Warn,
    /// Info level - general information (default)
    #[default]
    Info,
    /// Debug level - detailed debugging information
    Debug,
    /// Trace level - very detailed tracing
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Configuration for the Warden logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Log level filter
    pub level: LogLevel,
    /// Whether to also log to stdout
    pub log_to_stdout: bool,
    /// Daily files kept on disk
    pub max_log_files: usize,
}

impl LoggerConfig {
    /// Creates a new LoggerConfig with the specified log directory
    pub fn new(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            level: LogLevel::Info,
            log_to_stdout: false,
            max_log_files: DEFAULT_MAX_LOG_FILES,
        }
    }

    /// Sets the log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enables logging to stdout in addition to file
    pub fn with_stdout(mut self, enabled: bool) -> Self {
        self.log_to_stdout = enabled;
        self
    }

    /// Default `EnvFilter` directive covering every warden crate
    pub fn filter_directive(&self) -> String {
        format!("warden={}", self.level)
    }
}

/// Guard that keeps the logger alive
///
/// When dropped, buffered log lines are flushed.
pub struct LoggerGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initializes the Warden logger with the given configuration
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Returns
/// A `LoggerGuard` that must be kept alive for the duration of the program.
///
/// # Example
/// ```ignore
/// let config = LoggerConfig::new(data_dir.join("logs")).with_stdout(true);
/// let _guard = init_logger(config)?;
/// tracing::info!("Logger initialized");
/// ```
pub fn init_logger(config: LoggerConfig) -> Result<LoggerGuard, LoggerError> {
    use std::fs;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    if !config.log_dir.exists() {
        fs::create_dir_all(&config.log_dir).map_err(|e| {
            LoggerError::DirectoryCreationFailed(format!("{}: {}", config.log_dir.display(), e))
        })?;
    }

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(config.max_log_files)
        .build(&config.log_dir)
        .map_err(|e| LoggerError::InitializationFailed(e.to_string()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let stdout_layer = config.log_to_stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    tracing::info!(
        log_dir = %config.log_dir.display(),
        level = %config.level,
        "Warden logger initialized"
    );

    Ok(LoggerGuard { _guard: guard })
}
