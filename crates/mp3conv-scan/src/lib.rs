//! Directory scanning and tag reading for mp3conv.
//!
//! This crate builds the in-memory [`FilesystemNode`] trees the planner
//! works on, and reads the `Convert-Keep` tag of source files.
//!
//! # Example
//!
//! ```rust,no_run
//! use mp3conv_scan::{JwalkScanner, ScanConfig};
//!
//! let config = ScanConfig::new("/path/to/music", ["flac", "m4a", "mp3"]);
//! let tree = JwalkScanner::new().scan(&config).unwrap();
//!
//! println!("Found {} input files", tree.leaf_count());
//! ```

mod scanner;
mod tags;

pub use scanner::JwalkScanner;
pub use tags::{TagKeepReader, ID3_KEEP_DESCRIPTION, KEEP_FIELD};

// Re-export core types for convenience
pub use mp3conv_core::{FilesystemLeaf, FilesystemNode, ScanConfig, ScanError};
