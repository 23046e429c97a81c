//! # Design
//!
//! - Provide structured, constant-message errors for the snapshot operations.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for snapshot maintenance operations.
pub type SnapOpsResult<T> = Result<T, SnapOpsError>;

/// Errors produced by snapshot maintenance operations.
#[derive(Debug, Error)]
pub enum SnapOpsError {
    /// IO failures while listing, deleting, moving, or staging snapshots.
    #[error("snapshot io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Request validation failures.
    #[error("invalid operation request")]
    InvalidRequest {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The encoder exited with a failure status.
    #[error("encoder failure")]
    Encoder {
        /// Destination artifact the encoder was writing.
        destination: PathBuf,
        /// Captured encoder diagnostics.
        detail: String,
    },
}

impl SnapOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
