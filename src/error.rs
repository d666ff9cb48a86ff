//! Error types for taskvault
//!
//! Two kinds of failure never show up here: "not found" lookups (operations
//! return `Option`) and state conflicts such as deleting a completed task
//! (operations return a structured report with a reason). The `Error` enum
//! covers validation failures, which reject an operation before any mutation,
//! and terminal I/O or parse failures.

use thiserror::Error;

/// Main error type for taskvault operations
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors: rejected before any mutation
    #[error("invalid requirement name \"{name}\": {reason}")]
    InvalidRequirementName {
        name: String,
        reason: String,
        suggestion: Option<String>,
    },

    #[error("duplicate task name in batch: \"{0}\"")]
    DuplicateTaskName(String),

    // Operation failures
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn invalid_name(
        name: impl Into<String>,
        reason: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Error::InvalidRequirementName {
            name: name.into(),
            reason: reason.into(),
            suggestion,
        }
    }

    /// Rename suggestion attached to a name-validation failure, if any
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Error::InvalidRequirementName { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for taskvault operations
pub type Result<T> = std::result::Result<T, Error>;
