//! # Launcher Error Types
//!
//! Error types for autoconnect and launcher sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Launcher Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Device      │  │     File Index          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  NotConnected   │  │  IndexUnavailable       │ │
//! │  │  MissingSetting │  │  CommandFailed  │  │                         │ │
//! │  │  ConfigLoad/Save│  │  ListingFailed  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  None of these reach the event source: controllers log them and wait   │
//! │  for the next triggering event.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use hostprint_core::CoreError;
use thiserror::Error;

/// Result type alias for launcher operations.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Launcher error type covering collaborator and configuration failures.
#[derive(Debug, Error)]
pub enum LauncherError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid launcher or serial configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A settings key has no usable value.
    #[error("Setting '{key}' is missing or malformed")]
    MissingSetting { key: &'static str },

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Device Errors
    // =========================================================================
    /// Printer is not connected.
    #[error("Printer is not connected")]
    NotConnected,

    /// The command channel rejected a command batch.
    #[error("Device command failed: {0}")]
    CommandFailed(String),

    /// Printer storage could not be listed.
    #[error("Device storage listing failed: {0}")]
    ListingFailed(String),

    /// Opening the serial connection failed.
    #[error("Connection to {port} failed: {reason}")]
    ConnectFailed { port: String, reason: String },

    /// A command could not be rendered.
    #[error("Invalid device command: {0}")]
    InvalidCommand(#[from] CoreError),

    // =========================================================================
    // File Index Errors
    // =========================================================================
    /// The host file index could not be queried.
    #[error("File index unavailable: {0}")]
    IndexUnavailable(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Router is shutting down.
    #[error("Event router is shutting down")]
    ShuttingDown,

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for LauncherError {
    fn from(err: std::io::Error) -> Self {
        LauncherError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for LauncherError {
    fn from(err: toml::de::Error) -> Self {
        LauncherError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for LauncherError {
    fn from(err: toml::ser::Error) -> Self {
        LauncherError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl LauncherError {
    /// Returns true if the next triggering event may succeed where this failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LauncherError::NotConnected
                | LauncherError::CommandFailed(_)
                | LauncherError::ListingFailed(_)
                | LauncherError::ConnectFailed { .. }
                | LauncherError::IndexUnavailable(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LauncherError::InvalidConfig(_)
                | LauncherError::MissingSetting { .. }
                | LauncherError::ConfigLoadFailed(_)
                | LauncherError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(LauncherError::NotConnected.is_retryable());
        assert!(LauncherError::CommandFailed("queue closed".into()).is_retryable());
        assert!(!LauncherError::InvalidConfig("bad".into()).is_retryable());
        assert!(!LauncherError::ShuttingDown.is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(LauncherError::MissingSetting { key: "serial.port" }.is_config_error());
        assert!(!LauncherError::NotConnected.is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = LauncherError::ConnectFailed {
            port: "/dev/ttyUSB0".into(),
            reason: "busy".into(),
        };
        assert!(err.to_string().contains("/dev/ttyUSB0"));

        let err: LauncherError = CoreError::EmptyPath { command: "M28" }.into();
        assert!(matches!(err, LauncherError::InvalidCommand(_)));
    }
}
