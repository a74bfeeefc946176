//! JWalk-based directory scanner.

use std::cmp::Reverse;
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use jwalk::{Parallelism, WalkDir};
use tracing::{debug, info, warn};

use mp3conv_core::{FilesystemNode, ScanConfig, ScanError};

/// Number of matching files between two progress log lines.
const PROGRESS_INTERVAL: usize = 1000;

/// Scanner producing a [`FilesystemNode`] from the real filesystem.
///
/// Walks serially, in sorted order, so that repeated scans of an
/// unchanged directory always produce the same tree.
#[derive(Debug, Default)]
pub struct JwalkScanner;

impl JwalkScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        Self
    }

    /// Scan the configured root and build its tree.
    ///
    /// Only regular files whose extension is listed in the config are kept.
    /// When several files of one directory share a base name, the one with
    /// the most preferred extension wins.
    pub fn scan(&self, config: &ScanConfig) -> Result<FilesystemNode, ScanError> {
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let entries = self.collect_entries(config, &root_path)?;
        info!(
            root = %root_path.display(),
            files = entries.len(),
            "Scanned directory"
        );

        Ok(self.build_tree(&config.root, entries))
    }

    /// Collect all matching files using jwalk.
    fn collect_entries(
        &self,
        config: &ScanConfig,
        root_path: &Path,
    ) -> Result<Vec<EntryInfo>, ScanError> {
        let walker = WalkDir::new(root_path)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks);

        let mut entries = Vec::new();

        for entry_result in walker {
            let entry = entry_result.map_err(|err| ScanError::Walk {
                path: err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root_path.to_path_buf()),
                message: err.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(file_name) = entry.file_name().to_str() else {
                warn!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };
            let Some((name, extension)) = split_file_name(file_name) else {
                continue;
            };
            let Some(priority) = config.priority(extension) else {
                continue;
            };

            let metadata = entry.metadata().map_err(|err| ScanError::Walk {
                path: path.clone(),
                message: err.to_string(),
            })?;
            let modified = metadata
                .modified()
                .map_err(|e| ScanError::io(&path, e))?;

            let Some(dirs) = relative_dirs(root_path, &path) else {
                warn!(path = %path.display(), "Skipping file with non UTF-8 directory");
                continue;
            };

            debug!(path = %path.display(), "Found file");
            entries.push(EntryInfo {
                dirs,
                name: name.to_string(),
                extension: extension.to_string(),
                modification: DateTime::<Utc>::from(modified),
                priority,
            });

            if entries.len() % PROGRESS_INTERVAL == 0 {
                debug!(files = entries.len(), "Scan in progress");
            }
        }

        Ok(entries)
    }

    /// Build the tree from collected entries.
    fn build_tree(&self, root: &Path, mut entries: Vec<EntryInfo>) -> FilesystemNode {
        let mut tree = FilesystemNode::new(root.to_string_lossy());

        // Least preferred first: a later insertion replaces an earlier one.
        entries.sort_by_key(|e| Reverse(e.priority));

        for entry in entries {
            if let Some(existing) = tree.get_file(&entry.dirs, &entry.name) {
                debug!(
                    name = %entry.name,
                    kept = %entry.extension,
                    dropped = existing.extension(),
                    "Several input files share a name"
                );
            }
            tree.add_file(&entry.dirs, entry.name, entry.extension, entry.modification);
        }

        tree
    }
}

/// Temporary struct for collecting entry information.
struct EntryInfo {
    dirs: Vec<String>,
    name: String,
    extension: String,
    modification: DateTime<Utc>,
    priority: usize,
}

/// Split `name.ext` at the last dot. Names without a base name or without
/// an extension are rejected.
fn split_file_name(file_name: &str) -> Option<(&str, &str)> {
    let (name, extension) = file_name.rsplit_once('.')?;
    if name.is_empty() || extension.is_empty() {
        return None;
    }
    Some((name, extension))
}

/// Directory components between `root` and the parent of `path`.
fn relative_dirs(root: &Path, path: &Path) -> Option<Vec<String>> {
    let parent = path.parent()?.strip_prefix(root).ok()?;
    parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str().map(str::to_string)),
            _ => None,
        })
        .collect()
}
