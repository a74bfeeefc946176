//! mp3conv - Keep a tree of transcoded mp3 files in sync with a music library.
//!
//! Usage:
//!   mp3conv [OPTIONS] <SOURCE> <DESTINATION>
//!   mp3conv --dry-run ~/Music /media/player     Show what would be done
//!   mp3conv --keep-threshold bonus ...          Skip files tagged `skip`
//!   mp3conv --help                              Show help

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mp3conv_core::{
    ConversionMetrics, ConvertKeep, KeepReader, RunStatus, SyncConfig, UnrecognizedKeepValue,
};
use mp3conv_ops::{FfmpegTranscoder, PatchExecutor, Transcoder};
use mp3conv_plan::Planner;
use mp3conv_scan::{JwalkScanner, TagKeepReader};

#[derive(Parser)]
#[command(
    name = "mp3conv",
    version,
    about = "Keep a tree of transcoded mp3 files in sync with a music library",
    long_about = "mp3conv mirrors a library of flac, m4a and mp3 files into a tree of mp3 files.\n\n\
                  Stale or missing files are re-encoded, mp3 files are copied as is and \
                  destination files without a source are removed. Files can opt out of \
                  conversion through their Convert-Keep tag."
)]
struct Cli {
    /// Source music library
    source: PathBuf,

    /// Destination mp3 tree
    destination: PathBuf,

    /// Only print the patches, without applying them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Keep destination files and folders without a source counterpart
    #[arg(long)]
    no_remove: bool,

    /// Highest keep level still converted (always, bonus or all)
    #[arg(short, long, default_value = "all", value_parser = parse_threshold)]
    keep_threshold: ConvertKeep,

    /// Keep level of files without a valid Convert-Keep tag
    #[arg(long, default_value = "always", value_parser = parse_keep)]
    default_keep: ConvertKeep,

    /// Encoder program
    #[arg(long, default_value = "ffmpeg")]
    encoder: PathBuf,

    /// Encoder VBR quality
    #[arg(short, long, default_value = "2")]
    quality: String,

    /// Follow symbolic links in both trees
    #[arg(long)]
    follow_symlinks: bool,

    /// Ignore hidden files and folders in both trees
    #[arg(long)]
    skip_hidden: bool,

    /// Output format of the run report
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write Prometheus metrics of the run to this file
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

impl Cli {
    fn sync_config(&self) -> Result<SyncConfig> {
        SyncConfig::builder()
            .can_remove(!self.no_remove)
            .dry_run(self.dry_run)
            .keep_threshold(self.keep_threshold)
            .default_keep(self.default_keep)
            .encoder(self.encoder.clone())
            .encoder_quality(self.quality.clone())
            .follow_symlinks(self.follow_symlinks)
            .include_hidden(!self.skip_hidden)
            .build()
            .wrap_err("Invalid configuration")
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let config = cli.sync_config()?;

    let transcoder = FfmpegTranscoder::from_config(&config);
    let metrics = run(
        &cli,
        &config,
        &TagKeepReader::new(),
        &transcoder,
        &mut io::stdout().lock(),
    )?;

    Ok(exit_code(&metrics))
}

/// Logs go to stderr, filtered by `RUST_LOG` (warnings by default).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

/// Synchronize the trees, then report the run to `out` and the metrics file.
///
/// A failed synchronization still produces a report: the returned metrics
/// are finalized with [`RunStatus::Error`]. Only a failure to write the
/// report itself is returned as an error.
fn run<W: Write>(
    cli: &Cli,
    config: &SyncConfig,
    reader: &dyn KeepReader,
    transcoder: &dyn Transcoder,
    out: &mut W,
) -> Result<ConversionMetrics> {
    let mut metrics = ConversionMetrics::new();
    if let Err(err) = sync(cli, config, reader, transcoder, &mut metrics, out) {
        metrics.finish(RunStatus::Error);
        eprintln!("Error: {err:?}");
    }

    report(&metrics, cli.format, cli.metrics_file.as_deref(), out)?;
    Ok(metrics)
}

fn exit_code(metrics: &ConversionMetrics) -> ExitCode {
    ExitCode::from(metrics.status().code())
}

/// Scan both trees, plan and execute the patches.
fn sync<W: Write>(
    cli: &Cli,
    config: &SyncConfig,
    reader: &dyn KeepReader,
    transcoder: &dyn Transcoder,
    metrics: &mut ConversionMetrics,
    out: &mut W,
) -> Result<()> {
    let scanner = JwalkScanner::new();
    let mut source = scanner
        .scan(&config.source_scan(&cli.source))
        .wrap_err("Failed to scan source directory")?;
    let mut destination = scanner
        .scan(&config.destination_scan(&cli.destination))
        .wrap_err("Failed to scan destination directory")?;

    metrics.record_input_tree(&source);
    metrics.record_output_tree(&destination);
    info!(
        input = source.leaf_count(),
        output = destination.leaf_count(),
        "Scanned trees"
    );

    let patches = Planner::new(config, reader)
        .plan(
            &mut source,
            &cli.source,
            &mut destination,
            &cli.destination,
            metrics,
        )
        .wrap_err("Planning failed")?;

    let executor = PatchExecutor::new(transcoder).with_dry_run(config.dry_run);
    match cli.format {
        OutputFormat::Text => executor.execute(&patches, metrics, out)?,
        // Patch lines stay off stdout when it carries the JSON report.
        OutputFormat::Json => executor.execute(&patches, metrics, &mut io::stderr().lock())?,
    };

    Ok(())
}

/// Print the run report and write the metrics file.
fn report<W: Write>(
    metrics: &ConversionMetrics,
    format: OutputFormat,
    metrics_file: Option<&Path>,
    out: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Text => metrics.write_summary(out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, metrics)?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    if let Some(path) = metrics_file {
        let mut exposition = Vec::new();
        metrics.write_exposition(&mut exposition)?;
        fs::write(path, exposition)
            .wrap_err_with(|| format!("Failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "Metrics written");
    }

    Ok(())
}

/// Parse a keep threshold; `all` disables filtering.
fn parse_threshold(value: &str) -> Result<ConvertKeep, UnrecognizedKeepValue> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(ConvertKeep::lowest());
    }
    parse_keep(value)
}

fn parse_keep(value: &str) -> Result<ConvertKeep, UnrecognizedKeepValue> {
    value.parse()
}
