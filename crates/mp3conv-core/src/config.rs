//! Scan and synchronization configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::keep::ConvertKeep;

/// Extensions accepted as conversion input, most preferred first.
pub const DEFAULT_INPUT_EXTENSIONS: [&str; 3] = ["flac", "m4a", "mp3"];

/// Extension of every file in the destination tree.
pub const DEFAULT_OUTPUT_EXTENSION: &str = "mp3";

/// Configuration for scanning one directory tree.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Extensions to keep (without the dot, case-sensitive), most
    /// preferred first. When two files share a base name, the one with the
    /// preferred extension wins.
    pub extensions: Vec<String>,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        match self.extensions {
            Some(ref extensions) if extensions.is_empty() => {
                Err("At least one extension is required".to_string())
            }
            None => Err("Extensions are required".to_string()),
            _ => Ok(()),
        }
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new<I, S>(root: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            extensions: extensions.into_iter().map(Into::into).collect(),
            follow_symlinks: false,
            include_hidden: true,
        }
    }

    /// Preference rank of an extension (0 is the most preferred).
    pub fn priority(&self, extension: &str) -> Option<usize> {
        self.extensions.iter().position(|e| e == extension)
    }
}

/// Options of one synchronization run, threaded through planning and
/// execution.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SyncConfig {
    /// Remove destination files and folders with no source counterpart.
    #[builder(default = "true")]
    pub can_remove: bool,

    /// Only print the plan.
    #[builder(default = "false")]
    pub dry_run: bool,

    /// Highest keep level still converted.
    #[builder(default = "ConvertKeep::lowest()")]
    pub keep_threshold: ConvertKeep,

    /// Keep level of files carrying no (valid) keep tag.
    #[builder(default = "ConvertKeep::Always")]
    pub default_keep: ConvertKeep,

    /// Accepted input extensions, most preferred first.
    #[builder(default = "Self::default_input_extensions()")]
    pub input_extensions: Vec<String>,

    /// Extension of converted files.
    #[builder(default = "DEFAULT_OUTPUT_EXTENSION.to_string()")]
    pub output_extension: String,

    /// Encoder program.
    #[builder(default = "PathBuf::from(\"ffmpeg\")")]
    pub encoder: PathBuf,

    /// Encoder VBR quality (`-q:a`).
    #[builder(default = "\"2\".to_string()")]
    pub encoder_quality: String,

    /// Follow symbolic links while scanning both trees.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files and folders while scanning both trees.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

impl SyncConfigBuilder {
    fn default_input_extensions() -> Vec<String> {
        DEFAULT_INPUT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(ref extensions) = self.input_extensions {
            if extensions.is_empty() {
                return Err("At least one input extension is required".to_string());
            }
        }
        if let Some(ref output) = self.output_extension {
            if output.is_empty() || output.starts_with('.') {
                return Err(format!("Invalid output extension: {output:?}"));
            }
        }
        Ok(())
    }
}

impl SyncConfig {
    /// Create a new sync config builder.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Scan configuration for the source tree.
    pub fn source_scan(&self, root: impl Into<PathBuf>) -> ScanConfig {
        self.scan_options(ScanConfig::new(root, self.input_extensions.iter().cloned()))
    }

    /// Scan configuration for the destination tree.
    pub fn destination_scan(&self, root: impl Into<PathBuf>) -> ScanConfig {
        self.scan_options(ScanConfig::new(root, [self.output_extension.clone()]))
    }

    fn scan_options(&self, mut scan: ScanConfig) -> ScanConfig {
        scan.follow_symlinks = self.follow_symlinks;
        scan.include_hidden = self.include_hidden;
        scan
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            can_remove: true,
            dry_run: false,
            keep_threshold: ConvertKeep::lowest(),
            default_keep: ConvertKeep::Always,
            input_extensions: SyncConfigBuilder::default_input_extensions(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
            encoder: PathBuf::from("ffmpeg"),
            encoder_quality: "2".to_string(),
            follow_symlinks: false,
            include_hidden: true,
        }
    }
}
