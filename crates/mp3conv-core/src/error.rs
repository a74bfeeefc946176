//! Error types for scanning and planning.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while scanning a directory tree.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The directory walker reported an error.
    #[error("Error walking {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Failure to read the tags of a source file.
#[derive(Debug, Error)]
#[error("Cannot read tags of {path}: {message}")]
pub struct MetadataError {
    /// File whose tags could not be read.
    pub path: PathBuf,
    /// Human-readable cause.
    pub message: String,
}

impl MetadataError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A keep value that matches none of the known aliases.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unrecognized keep value: {value:?} (expected always, keep, bonus, never or skip)")]
pub struct UnrecognizedKeepValue {
    /// The rejected text.
    pub value: String,
}

impl UnrecognizedKeepValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Errors that abort plan construction.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// Scanning one of the trees failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Reading the tags of a source file failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A subfolder was inserted where one already exists.
    #[error("Folder already present in destination tree: {path}")]
    StructuralConflict { path: PathBuf },
}
