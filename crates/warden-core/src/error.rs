//! Common error types for Warden
//!
//! Domain errors live in their own modules and are re-exported here.
//! The binary wraps them in `anyhow` at the command boundary.

use thiserror::Error;

// Re-export the port errors
pub use crate::ports::ai::AIError;
pub use crate::ports::hub::HubError;

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Parse error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("poll_interval_seconds must be > 0".to_string());
        assert!(err.to_string().contains("poll_interval_seconds"));
    }

    #[test]
    fn test_config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(err.to_string().contains("read-only"));
    }
}
