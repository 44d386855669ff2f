//! Error handling module for nixpi-setup
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the application should use these types for consistency.

use thiserror::Error;

/// Main error type for nixpi-setup
#[derive(Error, Debug)]
pub enum SetupError {
    /// IO errors (file operations, backups, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation errors (user input rejected with a reason)
    #[error("{0}")]
    Validation(String),

    /// Remote fetch errors (network failure, timeout, bad HTTP status)
    #[error("{0}")]
    Transport(String),

    /// External command errors (probe, git, nixos-rebuild)
    #[error("Command failed: {program} (exit={code:?}): {detail}")]
    ExternalTool {
        program: String,
        code: Option<i32>,
        detail: String,
    },

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// State errors (invalid wizard state, poisoned handles)
    #[error("State error: {0}")]
    State(String),

    /// JSON deserialization errors (flake metadata)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for setup operations
pub type Result<T> = std::result::Result<T, SetupError>;

// Convenient error constructors
impl SetupError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an external tool error
    pub fn external_tool(program: impl Into<String>, code: Option<i32>, detail: impl Into<String>) -> Self {
        Self::ExternalTool {
            program: program.into(),
            code,
            detail: detail.into(),
        }
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// True for errors the operator can correct by re-entering input
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SetupError::validation("Hostname must be 63 characters or less");
        assert_eq!(err.to_string(), "Hostname must be 63 characters or less");

        let err = SetupError::external_tool("nixos-rebuild", Some(1), "build failed");
        assert_eq!(
            err.to_string(),
            "Command failed: nixos-rebuild (exit=Some(1)): build failed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SetupError = io_err.into();
        assert!(matches!(err, SetupError::Io(_)));
    }

    #[test]
    fn test_user_correctable() {
        assert!(SetupError::validation("bad input").is_user_correctable());
        assert!(SetupError::transport("timed out").is_user_correctable());
        assert!(!SetupError::external_tool("git", Some(128), "clone failed").is_user_correctable());
    }
}
