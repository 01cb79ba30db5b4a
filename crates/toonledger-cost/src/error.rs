//! Error types for toonledger-cost

use std::path::PathBuf;
use thiserror::Error;

/// Cost engine error type
///
/// Recording a call never surfaces one of these; they are returned only by
/// explicit I/O operations such as export and snapshot reads.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure on a snapshot or export path
    #[error("io error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
