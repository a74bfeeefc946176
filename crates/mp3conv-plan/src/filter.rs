//! Keep-policy filtering of source directories.

use std::path::Path;

use tracing::debug;

use mp3conv_core::{
    resolve_keep, ConversionMetrics, ConvertKeep, FilesystemNode, KeepReader, LeafMetadata,
    MetadataError, SyncConfig,
};

/// Drops source files whose keep decision is above the threshold.
pub struct KeepFilter<'a> {
    reader: &'a dyn KeepReader,
    threshold: ConvertKeep,
    default_keep: ConvertKeep,
}

impl<'a> KeepFilter<'a> {
    pub fn new(reader: &'a dyn KeepReader, threshold: ConvertKeep, default_keep: ConvertKeep) -> Self {
        Self {
            reader,
            threshold,
            default_keep,
        }
    }

    pub fn from_config(config: &SyncConfig, reader: &'a dyn KeepReader) -> Self {
        Self::new(reader, config.keep_threshold, config.default_keep)
    }

    /// Whether filtering can exclude anything at all.
    pub fn is_active(&self) -> bool {
        self.threshold != ConvertKeep::lowest()
    }

    /// Filter the direct files of `node`, located at `path`.
    ///
    /// Resolves (and attaches) the keep decision of every file, then drops
    /// the files above the threshold from `node`. Returns the number of
    /// dropped files.
    pub fn apply(
        &self,
        node: &mut FilesystemNode,
        path: &Path,
        metrics: &mut ConversionMetrics,
    ) -> Result<usize, MetadataError> {
        if !self.is_active() {
            return Ok(0);
        }

        let mut ignored = 0;
        for name in node.file_names() {
            let Some(leaf) = node.file_mut(&name) else {
                continue;
            };

            let keep = match leaf.metadata() {
                Some(metadata) => metadata.keep,
                None => {
                    let lookup = self.reader.read_keep(path, leaf)?;
                    let keep = resolve_keep(lookup, self.default_keep, path, leaf);
                    leaf.attach_metadata(LeafMetadata::new(keep));
                    metrics.record_keep(keep);
                    keep
                }
            };

            if keep <= self.threshold {
                continue;
            }

            let extension = leaf.extension().to_string();
            debug!(
                path = %path.join(leaf.filename()).display(),
                %keep,
                "Ignoring file"
            );
            node.drop_file(&name);
            metrics.record_ignored(&extension);
            ignored += 1;
        }

        Ok(ignored)
    }
}
