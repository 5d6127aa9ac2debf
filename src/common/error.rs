//! Error types for the harness
//!
//! Only run-fatal conditions live here. Anything that goes wrong while a
//! single case is being adjudicated is an [`Outcome`](crate::gateway::Outcome)
//! and ends up in that case's verdict instead.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Fixture Store Errors ===
    #[error("Cannot read fixture store at '{}': {source}. Check --root or [store].root in the config", path.display())]
    Indexing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // === Gateway Errors ===
    #[error("Invalid outcome script '{path}': {reason}")]
    Script { path: String, reason: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an indexing error for an unreadable store directory
    pub fn indexing(path: &Path, source: io::Error) -> Self {
        Self::Indexing {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: &str, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a script error
    pub fn script(path: &Path, reason: impl ToString) -> Self {
        Self::Script {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_error_names_the_path() {
        let err = Error::indexing(
            Path::new("/srv/fixtures"),
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/srv/fixtures"));
        assert!(msg.contains("missing"));
    }
}
