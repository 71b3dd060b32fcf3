//! # Error Types
//!
//! Domain-specific error types for hostprint-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hostprint-core errors (this file)                                     │
//! │  └── CoreError        - Malformed names, paths and commands            │
//! │                                                                         │
//! │  hostprint-sync errors (separate crate)                                │
//! │  └── LauncherError    - Config, device and file index failures         │
//! │                                                                         │
//! │  Flow: CoreError → LauncherError → log line (never to the caller)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Pure-domain failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A G-code line would be split by an embedded line break.
    ///
    /// ## When This Occurs
    /// - A display message or transfer path coming from a file name that
    ///   contains `\n` or `\r`
    #[error("Command argument contains a line break: {0:?}")]
    MultilineArgument(String),

    /// A device path was empty where one is required.
    #[error("Empty device path for {command}")]
    EmptyPath { command: &'static str },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::EmptyPath { command: "M28" };
        assert_eq!(err.to_string(), "Empty device path for M28");

        let err = CoreError::MultilineArgument("a\nb".into());
        assert!(err.to_string().contains("line break"));
    }
}
