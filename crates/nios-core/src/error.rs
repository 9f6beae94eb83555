//! Error types for the nios-host system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the nios-host system
#[derive(Error, Debug)]
pub enum Error {
    /// A declared parameter set failed validation (e.g. a required field is missing)
    #[error("Validation error: {0}")]
    Validation(String),

    /// More than one remote object survived disambiguation
    #[error("Ambiguous match: {candidates} {object_type} objects match name '{name}'")]
    AmbiguousMatch {
        /// WAPI object type (e.g. "record:host")
        object_type: String,
        /// Name the lookup was keyed on
        name: String,
        /// Number of remaining candidates
        candidates: usize,
    },

    /// Transport failure reported by a lookup or mutate collaborator
    #[error("Transport error ({provider}): {message}")]
    Transport {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an ambiguous match error
    pub fn ambiguous(object_type: impl Into<String>, name: impl Into<String>, candidates: usize) -> Self {
        Self::AmbiguousMatch {
            object_type: object_type.into(),
            name: name.into(),
            candidates,
        }
    }

    /// Create a transport error
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error came from the transport rather than from the decision logic
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Authentication(_) | Self::NotFound(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
