//! Encoder and copy capability used by patch application.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use mp3conv_core::SyncConfig;

use crate::error::ExecutionError;

/// Number of trailing stderr lines kept in an encoder error.
const STDERR_TAIL_LINES: usize = 5;

/// External side effects of `Convert` and `Copy` patches.
pub trait Transcoder {
    /// Transcode `source` into the file `destination`, overwriting it.
    fn convert(&self, source: &Path, destination: &Path) -> Result<(), ExecutionError>;

    /// Copy `source` into the directory `destination_dir`, keeping its
    /// file name and overwriting any existing file.
    fn copy(&self, source: &Path, destination_dir: &Path) -> Result<(), ExecutionError>;
}

/// [`Transcoder`] running ffmpeg for conversions.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    quality: String,
}

impl FfmpegTranscoder {
    /// Create a transcoder running `program` with VBR quality `quality`.
    pub fn new(program: impl Into<PathBuf>, quality: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            quality: quality.into(),
        }
    }

    /// Create a transcoder from the run configuration.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.encoder, &config.encoder_quality)
    }

    fn command(&self, source: &Path, destination: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-q:a")
            .arg(&self.quality)
            .arg(destination)
            .stdin(Stdio::null());
        command
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn convert(&self, source: &Path, destination: &Path) -> Result<(), ExecutionError> {
        debug!(
            source = %source.display(),
            destination = %destination.display(),
            "Running encoder"
        );
        let output = self
            .command(source, destination)
            .output()
            .map_err(|e| ExecutionError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if output.status.success() {
            return Ok(());
        }

        // A partial output is newer than its source and would pass as up to
        // date on the next run.
        discard_partial(destination);

        Err(ExecutionError::Encoder {
            path: destination.to_path_buf(),
            status: output.status,
            stderr: stderr_tail(&output.stderr),
        })
    }

    fn copy(&self, source: &Path, destination_dir: &Path) -> Result<(), ExecutionError> {
        let file_name = source.file_name().ok_or_else(|| {
            ExecutionError::io(
                "copy",
                source,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name"),
            )
        })?;
        let destination = destination_dir.join(file_name);

        fs::copy(source, &destination).map_err(|e| ExecutionError::io("copy", &destination, e))?;
        Ok(())
    }
}

/// Remove whatever a failed encoder left at `destination`.
fn discard_partial(destination: &Path) {
    match fs::remove_file(destination) {
        Ok(()) => debug!(path = %destination.display(), "Removed partial output"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            path = %destination.display(),
            %err,
            "Failed to remove partial output"
        ),
    }
}

/// Last lines of the encoder's error output.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
