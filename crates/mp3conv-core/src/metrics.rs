//! Run metrics: counters, timing and final status.
//!
//! Counters are keyed by category label and keep their insertion order, so
//! both renderings list the well-known keys first, in a stable order, even
//! when their count is zero.

use std::io::{self, Write};

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::keep::ConvertKeep;
use crate::node::FilesystemNode;

/// Prefix of every exposed metric name.
const METRIC_PREFIX: &str = "mp3conv";

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RunStatus {
    Success,
    Error,
}

impl RunStatus {
    /// Numeric value used in the exposition (0 = OK, 1 = ERROR).
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
        }
    }
}

/// Insertion-ordered counters keyed by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Counters(IndexMap<String, u64>);

impl Counters {
    /// Create counters pre-seeded with zeroed keys.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(|k| (k.into(), 0)).collect())
    }

    /// Increment a counter, creating it when unknown.
    pub fn incr(&mut self, key: &str) {
        match self.0.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.0.insert(key.to_string(), 1);
            }
        }
    }

    /// Current value of a counter (0 when unknown).
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Sum of all counters.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterate over `(label, count)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Metrics of one conversion run.
///
/// Created at the start of the run and finalized exactly once with
/// [`ConversionMetrics::finish`].
#[derive(Debug, Clone, Serialize)]
pub struct ConversionMetrics {
    status: RunStatus,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    /// Source files found, by extension.
    pub input_files: Counters,
    /// Destination files found before the run, by extension.
    pub output_files: Counters,
    /// Keep decisions resolved while filtering.
    pub convert_tags: Counters,
    /// Source files excluded by the keep threshold, by extension.
    pub ignored_files: Counters,
    /// Patches applied (or planned, in dry-run), by kind.
    pub patches: Counters,
}

impl ConversionMetrics {
    /// Start a new run now.
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    /// Start a new run at a given time.
    pub fn started_at(start_time: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Success,
            start_time,
            end_time: None,
            input_files: Counters::with_keys(["mp3", "flac", "m4a"]),
            output_files: Counters::with_keys(["mp3"]),
            convert_tags: Counters::with_keys(["always", "bonus", "skip"]),
            ignored_files: Counters::with_keys(["mp3", "flac", "m4a"]),
            patches: Counters::with_keys(["convert", "copy", "mkdir", "remove"]),
        }
    }

    /// Count the leaves of the scanned source tree.
    pub fn record_input_tree(&mut self, tree: &FilesystemNode) {
        tree.walk_leaves(&mut |leaf| self.input_files.incr(leaf.extension()));
    }

    /// Count the leaves of the scanned destination tree.
    pub fn record_output_tree(&mut self, tree: &FilesystemNode) {
        tree.walk_leaves(&mut |leaf| self.output_files.incr(leaf.extension()));
    }

    /// Count a resolved keep decision.
    pub fn record_keep(&mut self, keep: ConvertKeep) {
        self.convert_tags.incr(keep.as_str());
    }

    /// Count a source file excluded by the keep threshold.
    pub fn record_ignored(&mut self, extension: &str) {
        self.ignored_files.incr(extension);
    }

    /// Count an applied patch by kind label.
    pub fn record_patch(&mut self, kind: &str) {
        self.patches.incr(kind);
    }

    /// Finalize the run with a status.
    ///
    /// Only the first call has an effect; returns whether this call
    /// finalized the metrics.
    pub fn finish(&mut self, status: RunStatus) -> bool {
        if self.end_time.is_some() {
            debug!(?status, "Metrics already finalized");
            return false;
        }
        self.status = status;
        self.end_time = Some(Utc::now().max(self.start_time));
        true
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Run duration; measured up to now while the run is not finished.
    pub fn duration(&self) -> TimeDelta {
        self.end_time.unwrap_or_else(Utc::now) - self.start_time
    }

    /// Write the short human-readable summary.
    pub fn write_summary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "Processed {} files from input directory",
            self.input_files.total()
        )?;
        for (extension, count) in self.input_files.iter().filter(|(_, c)| *c > 0) {
            writeln!(out, "  - {count} {extension}")?;
        }
        writeln!(
            out,
            "Found {} files in destination directory",
            self.output_files.total()
        )?;
        writeln!(
            out,
            "Performed {} conversions, {} copies, {} directories created and {} removals in {}ms",
            self.patches.get("convert"),
            self.patches.get("copy"),
            self.patches.get("mkdir"),
            self.patches.get("remove"),
            self.duration().num_milliseconds()
        )?;
        writeln!(out, "Ignored {} files", self.ignored_files.total())?;
        match self.status {
            RunStatus::Success => writeln!(out, "Done"),
            RunStatus::Error => writeln!(out, "Error"),
        }
    }

    /// Write the metrics in the Prometheus text exposition format.
    pub fn write_exposition<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let start = self.start_time.timestamp_millis() as f64 / 1000.0;
        let run_time = self.duration().num_milliseconds() as f64 / 1000.0;

        write_header(out, "exit_status", "counter", "Status of the last run (0=OK, 1=ERROR).")?;
        writeln!(out, "{METRIC_PREFIX}_exit_status {}", self.status.code())?;

        write_header(out, "start_time", "counter", "Timestamp of the last run of the converter.")?;
        writeln!(out, "{METRIC_PREFIX}_start_time {start}")?;

        write_header(out, "run_time", "gauge", "Total run time of the conversion.")?;
        writeln!(out, "{METRIC_PREFIX}_run_time {run_time}")?;

        write_family(
            out,
            "input_files_count",
            "Count of files in the input directory.",
            "extension",
            &self.input_files,
        )?;
        write_family(
            out,
            "output_files_count",
            "Count of files in the output directory before conversion.",
            "extension",
            &self.output_files,
        )?;
        write_family(
            out,
            "convert_tags",
            "Count of conversion tags found in input files.",
            "convert_tag",
            &self.convert_tags,
        )?;
        write_family(
            out,
            "ignored_files_count",
            "Number of files ignored by the converter.",
            "extension",
            &self.ignored_files,
        )?;
        write_family(
            out,
            "patches_count",
            "Count of patches applied by the converter.",
            "patch_type",
            &self.patches,
        )
    }
}

impl Default for ConversionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn write_header<W: Write>(out: &mut W, name: &str, kind: &str, help: &str) -> io::Result<()> {
    writeln!(out, "# TYPE {METRIC_PREFIX}_{name} {kind}")?;
    writeln!(out, "# HELP {METRIC_PREFIX}_{name} {help}")
}

fn write_family<W: Write>(
    out: &mut W,
    name: &str,
    help: &str,
    label: &str,
    counters: &Counters,
) -> io::Result<()> {
    write_header(out, name, "gauge", help)?;
    for (value, count) in counters.iter() {
        writeln!(out, "{METRIC_PREFIX}_{name}{{{label}=\"{value}\"}} {count}")?;
    }
    Ok(())
}
