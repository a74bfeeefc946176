//! Core types and traits for mp3conv.
//!
//! This crate provides the fundamental data structures shared by the
//! scanner, the planner and the executor: the keep policy, the in-memory
//! directory tree, configuration, the error taxonomy and run metrics.

mod config;
mod error;
mod keep;
mod metadata;
mod metrics;
mod node;

pub use config::{ScanConfig, ScanConfigBuilder, SyncConfig, SyncConfigBuilder};
pub use error::{MetadataError, PlanningError, ScanError, UnrecognizedKeepValue};
pub use keep::ConvertKeep;
pub use metadata::{KeepReader, TagLookup, resolve_keep};
pub use metrics::{ConversionMetrics, Counters, RunStatus};
pub use node::{FilesystemLeaf, FilesystemNode, LeafMetadata};
