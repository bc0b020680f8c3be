//! Error types for the fixture store
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! None of these are fatal to the process. Each is scoped to the single
//! call that produced it:
//! - `Validation`: a malformed fixture blob; load skips it and continues
//! - `Resolution`: an external value reference could not be read at playback
//! - `Persistence`: a fixture write failed during record; propagated as-is

use std::io;
use thiserror::Error;

/// Result type alias for fixture store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the fixture store
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed fixture blob (missing/invalid key, parm, or value)
    #[error("Invalid fixture{}: {reason}", origin_suffix(.origin))]
    Validation {
        /// Name the blob was loaded from, if known
        origin: Option<String>,
        /// What was wrong with it
        reason: String,
    },

    /// External value blob could not be read or parsed
    #[error("Cannot resolve value '{name}': {reason}")]
    Resolution {
        /// Referenced blob name
        name: String,
        /// Underlying failure
        reason: String,
    },

    /// Fixture blob could not be written
    #[error("Cannot write fixture '{name}': {reason}")]
    Persistence {
        /// Blob name being written
        name: String,
        /// Underlying failure
        reason: String,
    },

    /// Text could not be rendered or parsed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn origin_suffix(origin: &Option<String>) -> String {
    match origin {
        Some(name) => format!(" {}", name),
        None => String::new(),
    }
}

impl Error {
    /// Build a validation error for a blob
    pub fn validation(origin: Option<&str>, reason: impl Into<String>) -> Self {
        Error::Validation {
            origin: origin.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Build a resolution error for an external reference
    pub fn resolution(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Resolution {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a persistence error for a blob write
    pub fn persistence(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Persistence {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// True if this is a per-blob validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
