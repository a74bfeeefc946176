//! Sequential patch executor.

use std::io::{self, Write};

use thiserror::Error;
use tracing::{error, info};

use mp3conv_core::{ConversionMetrics, RunStatus};

use crate::error::ExecutionError;
use crate::patch::Patch;
use crate::transcoder::Transcoder;

/// A patch failed; the patches before it stay applied.
#[derive(Debug, Error)]
#[error("{patch} failed after {applied} applied patches: {source}")]
pub struct PatchFailure {
    /// The failing patch.
    pub patch: Patch,
    /// Number of patches applied before the failure.
    pub applied: usize,
    #[source]
    pub source: ExecutionError,
}

/// Why a run stopped early.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Patch(#[from] PatchFailure),

    /// The patch log could not be written.
    #[error("Failed to write patch log: {0}")]
    Output(#[from] io::Error),
}

/// Applies (or previews) an ordered patch sequence.
pub struct PatchExecutor<'a> {
    transcoder: &'a dyn Transcoder,
    dry_run: bool,
}

impl<'a> PatchExecutor<'a> {
    /// Create an executor applying patches through `transcoder`.
    pub fn new(transcoder: &'a dyn Transcoder) -> Self {
        Self {
            transcoder,
            dry_run: false,
        }
    }

    /// Only describe patches instead of applying them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the patches in order, writing one description line per patch to
    /// `out`, and finalize `metrics`.
    ///
    /// The first failure aborts the remaining patches. Failing to write or
    /// flush `out` is a failure too. Metrics are finalized with
    /// [`RunStatus::Error`] on failure and [`RunStatus::Success`] otherwise.
    /// Returns the number of patches applied (or previewed).
    pub fn execute<W: Write>(
        &self,
        patches: &[Patch],
        metrics: &mut ConversionMetrics,
        out: &mut W,
    ) -> Result<usize, ExecutorError> {
        let result = self.run(patches, metrics, out).and_then(|count| {
            out.flush()?;
            Ok(count)
        });

        match &result {
            Ok(_) => metrics.finish(RunStatus::Success),
            Err(err) => {
                error!(%err, "Execution aborted");
                metrics.finish(RunStatus::Error)
            }
        };
        result
    }

    fn run<W: Write>(
        &self,
        patches: &[Patch],
        metrics: &mut ConversionMetrics,
        out: &mut W,
    ) -> Result<usize, ExecutorError> {
        if patches.is_empty() {
            writeln!(out, "Nothing to do")?;
            return Ok(0);
        }

        if self.dry_run {
            for patch in patches {
                writeln!(out, "{patch}")?;
                record(metrics, patch);
            }
            info!(patches = patches.len(), "Dry run complete");
            return Ok(patches.len());
        }

        for (applied, patch) in patches.iter().enumerate() {
            if let Err(source) = patch.apply(self.transcoder) {
                return Err(PatchFailure {
                    patch: patch.clone(),
                    applied,
                    source,
                }
                .into());
            }
            record(metrics, patch);
            writeln!(out, "{patch}")?;
        }

        info!(patches = patches.len(), "All patches applied");
        Ok(patches.len())
    }
}

fn record(metrics: &mut ConversionMetrics, patch: &Patch) {
    if let Some(kind) = patch.kind() {
        metrics.record_patch(kind.as_str());
    }
}
