//! Tree diff and patch planning for mp3conv.
//!
//! The [`Planner`] walks a source tree and a destination tree in lock-step,
//! merging the sorted children of each directory pair by name, and emits the
//! ordered [`Patch`](mp3conv_ops::Patch) sequence that brings the destination
//! in line with the source:
//!
//! - files present on both sides are re-encoded only when the destination is
//!   strictly older than the source
//! - source-only files are encoded (or copied when already in the output
//!   format), inside a freshly created directory when needed
//! - destination-only files and folders are removed, when removal is enabled
//!
//! Before a source directory is diffed, its files go through the
//! [`KeepFilter`], which drops those whose keep tag is above the threshold.
//!
//! ```rust,ignore
//! use mp3conv_plan::Planner;
//!
//! let planner = Planner::new(&config, &TagKeepReader::new());
//! let patches = planner.plan(&mut source, &source_dir, &mut destination, &destination_dir, &mut metrics)?;
//! ```

mod diff;
mod filter;

pub use diff::Planner;
pub use filter::KeepFilter;
