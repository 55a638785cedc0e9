//! Error types for silo-gt.
//!
//! Every failure in the toolkit is represented by [`GroundtruthError`]. All
//! variants are fatal for a groundtruth job: a partially computed answer is
//! never returned in place of an error.
//!
//! # Examples
//!
//! ```
//! use silo_gt::error::{GroundtruthError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(GroundtruthError::validation("query dimension 4 does not match shard dimension 8"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The main error type for silo-gt operations.
#[derive(Error, Debug)]
pub enum GroundtruthError {
    /// I/O errors without a known file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// I/O errors on a specific file (missing, unreadable, unwritable).
    #[error("I/O error on {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Structurally malformed or truncated input.
    #[error("Format error: {0}")]
    Format(String),

    /// Predicate or metadata does not agree with the declared schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Inputs that are well formed on their own but inconsistent with each other.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid job, split or workload configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with GroundtruthError.
pub type Result<T> = std::result::Result<T, GroundtruthError>;

impl GroundtruthError {
    /// Wrap an I/O error with the path of the file it happened on.
    pub fn io_at<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        GroundtruthError::IoAt {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new format error.
    pub fn format<S: Into<String>>(msg: S) -> Self {
        GroundtruthError::Format(msg.into())
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        GroundtruthError::Schema(msg.into())
    }

    /// Create a new validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        GroundtruthError::Validation(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        GroundtruthError::InvalidConfig(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        GroundtruthError::Other(format!("Internal error: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        GroundtruthError::Other(msg.into())
    }

    /// Whether this error came from the filesystem.
    pub fn is_io(&self) -> bool {
        matches!(self, GroundtruthError::Io(_) | GroundtruthError::IoAt { .. })
    }
}
