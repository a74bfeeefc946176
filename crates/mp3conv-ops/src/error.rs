//! Patch application errors.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure of a single patch application.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A filesystem operation failed.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder could not be started.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder exited with a failure status.
    #[error("Encoder exited with {status} while writing {path}: {stderr}")]
    Encoder {
        path: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
}

impl ExecutionError {
    /// Create an I/O error with operation and path context.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
