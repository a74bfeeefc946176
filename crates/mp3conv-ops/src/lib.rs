//! Patch application engine for mp3conv.
//!
//! A [`Patch`] is one self-describing filesystem action. The
//! [`PatchExecutor`] applies a planned sequence strictly in order, stops at
//! the first failure and tallies what it did into the run metrics.
//! Encoding and copying go through the [`Transcoder`] capability so that
//! callers can substitute the external encoder.

mod error;
mod executor;
mod patch;
mod transcoder;

pub use error::ExecutionError;
pub use executor::{ExecutorError, PatchExecutor, PatchFailure};
pub use patch::{Patch, PatchKind};
pub use transcoder::{FfmpegTranscoder, Transcoder};
