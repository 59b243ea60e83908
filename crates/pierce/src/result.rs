//! Result and error types for Pierce.

use thiserror::Error;

/// Result type for Pierce operations
pub type PierceResult<T> = Result<T, PierceError>;

/// Errors that can occur while parsing, resolving, matching or waiting
#[derive(Debug, Error)]
pub enum PierceError {
    /// Malformed selector string (raised at parse time only)
    #[error("Invalid selector \"{selector}\": {message}")]
    Syntax {
        /// The selector as written by the caller
        selector: String,
        /// What went wrong
        message: String,
    },

    /// Selector references an engine nobody registered
    #[error("Unknown selector engine \"{name}\" in selector \"{selector}\"")]
    UnknownEngine {
        /// Engine name
        name: String,
        /// The selector as written by the caller
        selector: String,
    },

    /// Wait deadline passed without the target state being reached
    #[error("Timeout {ms}ms exceeded waiting for selector \"{selector}\"")]
    Timeout {
        /// Configured timeout in milliseconds
        ms: u64,
        /// Time actually spent waiting
        elapsed_ms: u64,
        /// The selector as written by the caller
        selector: String,
    },

    /// Wait abandoned by the caller
    #[error("Waiting for selector \"{selector}\" was cancelled")]
    Cancelled {
        /// The selector as written by the caller
        selector: String,
    },

    /// Strict wait resolved against more than one element
    #[error("Strict mode violation: selector \"{selector}\" resolved to {count} elements")]
    StrictModeViolation {
        /// The selector as written by the caller
        selector: String,
        /// Number of matching elements
        count: usize,
    },

    /// A single evaluation pass failed (user engine error, poisoned snapshot)
    #[error("Failed to evaluate selector \"{selector}\": {message}")]
    Evaluation {
        /// The selector as written by the caller
        selector: String,
        /// Error message
        message: String,
    },

    /// Engine name already taken (built-ins can never be overridden)
    #[error("Selector engine \"{name}\" is already registered")]
    EngineAlreadyRegistered {
        /// Engine name
        name: String,
    },

    /// Engine name does not match `[A-Za-z0-9_-]+`
    #[error("Invalid selector engine name \"{name}\"")]
    InvalidEngineName {
        /// Engine name
        name: String,
    },

    /// Document mutation that the tree model rejects
    #[error("Invalid document operation: {message}")]
    InvalidOperation {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl PierceError {
    /// Create a syntax error for `selector`
    #[must_use]
    pub fn syntax(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create an invalid document operation error
    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Whether a wait loop may retry after this error
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Evaluation { .. })
    }
}
