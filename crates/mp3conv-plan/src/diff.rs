//! Merge-based diff of a source tree against a destination tree.

use std::path::Path;

use itertools::{EitherOrBoth, Itertools};
use tracing::{debug, info, trace};

use mp3conv_core::{
    ConversionMetrics, FilesystemLeaf, FilesystemNode, KeepReader, PlanningError, SyncConfig,
};
use mp3conv_ops::Patch;

use crate::filter::KeepFilter;

/// Tells whether a destination directory already exists on disk.
type DirCheck<'a> = Box<dyn Fn(&Path) -> bool + 'a>;

/// Computes the patch sequence synchronizing a destination tree.
///
/// Both trees are mutated while planning: ignored source files are dropped,
/// destination entries scheduled for removal are dropped, and created
/// destination folders are inserted. After [`Planner::plan`] the destination
/// tree describes the expected post-execution state.
pub struct Planner<'a> {
    config: &'a SyncConfig,
    filter: KeepFilter<'a>,
    dir_exists: DirCheck<'a>,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a SyncConfig, reader: &'a dyn KeepReader) -> Self {
        Self {
            config,
            filter: KeepFilter::from_config(config, reader),
            dir_exists: Box::new(|path| path.is_dir()),
        }
    }

    /// Replace the on-disk directory check.
    pub fn with_dir_check(mut self, check: impl Fn(&Path) -> bool + 'a) -> Self {
        self.dir_exists = Box::new(check);
        self
    }

    /// Plan the synchronization of `destination` (rooted at
    /// `destination_path`) from `source` (rooted at `source_path`).
    ///
    /// Within every directory, file patches come before the patches of its
    /// subfolders, and subfolders are visited in name order.
    pub fn plan(
        &self,
        source: &mut FilesystemNode,
        source_path: &Path,
        destination: &mut FilesystemNode,
        destination_path: &Path,
        metrics: &mut ConversionMetrics,
    ) -> Result<Vec<Patch>, PlanningError> {
        info!(
            source = %source_path.display(),
            destination = %destination_path.display(),
            "Planning"
        );
        let patches =
            self.process_node(source, source_path, destination, destination_path, metrics)?;
        info!(patches = patches.len(), "Planning complete");
        Ok(patches)
    }

    fn process_node(
        &self,
        source: &mut FilesystemNode,
        source_path: &Path,
        destination: &mut FilesystemNode,
        destination_path: &Path,
        metrics: &mut ConversionMetrics,
    ) -> Result<Vec<Patch>, PlanningError> {
        self.filter.apply(source, source_path, metrics)?;

        let mut patches = self.process_files(source, source_path, destination, destination_path);
        patches.extend(self.process_folders(
            source,
            source_path,
            destination,
            destination_path,
            metrics,
        )?);
        Ok(patches)
    }

    fn process_files(
        &self,
        source: &FilesystemNode,
        source_path: &Path,
        destination: &mut FilesystemNode,
        destination_path: &Path,
    ) -> Vec<Patch> {
        let source_names = source.file_names();
        let destination_names = destination.file_names();
        let mut patches = Vec::new();

        for entry in source_names
            .iter()
            .merge_join_by(destination_names.iter(), |a, b| a.cmp(b))
        {
            match entry {
                EitherOrBoth::Both(name, _) => {
                    let (Some(src), Some(dst)) = (source.file(name), destination.file(name)) else {
                        continue;
                    };
                    if dst.modification() < src.modification() {
                        patches.push(self.file_patch(src, source_path, destination_path, true));
                    } else {
                        trace!(file = %src.filename(), "Up to date");
                    }
                }
                EitherOrBoth::Left(name) => {
                    if let Some(src) = source.file(name) {
                        patches.push(self.file_patch(src, source_path, destination_path, false));
                    }
                }
                EitherOrBoth::Right(name) => {
                    if !self.config.can_remove {
                        continue;
                    }
                    if let Some(dst) = destination.file(name) {
                        patches.push(Patch::remove(destination_path.join(dst.filename())));
                    }
                    destination.drop_file(name);
                }
            }
        }

        patches
    }

    fn process_folders(
        &self,
        source: &mut FilesystemNode,
        source_path: &Path,
        destination: &mut FilesystemNode,
        destination_path: &Path,
        metrics: &mut ConversionMetrics,
    ) -> Result<Vec<Patch>, PlanningError> {
        let source_names = source.folder_names();
        let destination_names = destination.folder_names();
        let mut patches = Vec::new();

        for entry in source_names
            .iter()
            .merge_join_by(destination_names.iter(), |a, b| a.cmp(b))
        {
            match entry {
                EitherOrBoth::Both(name, _) => {
                    let (Some(src), Some(dst)) =
                        (source.folder_mut(name), destination.folder_mut(name))
                    else {
                        continue;
                    };
                    patches.extend(self.process_node(
                        src,
                        &source_path.join(name.as_str()),
                        dst,
                        &destination_path.join(name.as_str()),
                        metrics,
                    )?);
                }
                EitherOrBoth::Left(name) => {
                    let Some(src) = source.folder_mut(name) else {
                        continue;
                    };
                    let sub_destination = destination_path.join(name.as_str());
                    let create = if (self.dir_exists)(&sub_destination) {
                        None
                    } else {
                        Some(Patch::create_dir(&sub_destination))
                    };

                    let dst = destination.add_empty_subfolder(name).ok_or_else(|| {
                        PlanningError::StructuralConflict {
                            path: sub_destination.clone(),
                        }
                    })?;
                    let nested = self.process_node(
                        src,
                        &source_path.join(name.as_str()),
                        dst,
                        &sub_destination,
                        metrics,
                    )?;

                    if nested.is_empty() {
                        debug!(folder = %sub_destination.display(), "Nothing to sync");
                        if create.is_some() {
                            destination.drop_folder(name);
                        }
                        continue;
                    }
                    patches.extend(create);
                    patches.extend(nested);
                }
                EitherOrBoth::Right(name) => {
                    if !self.config.can_remove {
                        continue;
                    }
                    if let Some(dst) = destination.folder(name) {
                        remove_recursive(dst, &destination_path.join(name.as_str()), &mut patches);
                    }
                    destination.drop_folder(name);
                }
            }
        }

        Ok(patches)
    }

    /// Convert or copy patch bringing `leaf` into `destination_path`.
    fn file_patch(
        &self,
        leaf: &FilesystemLeaf,
        source_path: &Path,
        destination_path: &Path,
        update: bool,
    ) -> Patch {
        let source = source_path.join(leaf.filename());
        if leaf.extension() == self.config.output_extension {
            Patch::copy(source, destination_path, update)
        } else {
            let target = format!("{}.{}", leaf.name(), self.config.output_extension);
            Patch::convert(source, destination_path.join(target), update)
        }
    }
}

/// Removal of a whole destination folder: its files, then its subfolders,
/// then the folder itself.
fn remove_recursive(node: &FilesystemNode, path: &Path, patches: &mut Vec<Patch>) {
    for leaf in node.list_files() {
        patches.push(Patch::remove(path.join(leaf.filename())));
    }
    for child in node.list_folders() {
        remove_recursive(child, &path.join(child.name()), patches);
    }
    patches.push(Patch::clear_dir(path));
}
