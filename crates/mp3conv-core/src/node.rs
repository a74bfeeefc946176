//! In-memory directory tree built from one scan.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::keep::ConvertKeep;

/// Resolved keep decision for a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafMetadata {
    /// Keep policy read from the file tags, or the default.
    pub keep: ConvertKeep,
}

impl LeafMetadata {
    pub fn new(keep: ConvertKeep) -> Self {
        Self { keep }
    }
}

/// A single file, identified within its directory by base name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemLeaf {
    name: CompactString,
    extension: CompactString,
    modification: DateTime<Utc>,
    metadata: Option<LeafMetadata>,
}

impl FilesystemLeaf {
    /// Create a leaf without metadata.
    pub fn new(
        name: impl Into<CompactString>,
        extension: impl Into<CompactString>,
        modification: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            modification,
            metadata: None,
        }
    }

    /// Base name, without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension, without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Last modification time.
    pub fn modification(&self) -> DateTime<Utc> {
        self.modification
    }

    /// Full file name (`name.extension`).
    pub fn filename(&self) -> String {
        format!("{}.{}", self.name, self.extension)
    }

    /// Keep decision, once attached.
    pub fn metadata(&self) -> Option<&LeafMetadata> {
        self.metadata.as_ref()
    }

    /// Attach the keep decision.
    ///
    /// Metadata is write-once: returns `false` and leaves the existing value
    /// untouched when a decision is already attached.
    pub fn attach_metadata(&mut self, metadata: LeafMetadata) -> bool {
        if self.metadata.is_some() {
            return false;
        }
        self.metadata = Some(metadata);
        true
    }
}

/// A directory snapshot.
///
/// Children are keyed by name and always listed in ascending name order,
/// whatever the insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesystemNode {
    name: CompactString,
    subfolders: BTreeMap<CompactString, FilesystemNode>,
    files: BTreeMap<CompactString, FilesystemLeaf>,
    file_count: usize,
}

impl FilesystemNode {
    /// Create an empty directory node.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Directory name (the scanned path for a root node).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of direct file and subfolder entries.
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Check if the directory has no entry at all.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.subfolders.is_empty()
    }

    /// Insert a file below this node, creating intermediate directories.
    ///
    /// `path` lists the directories between this node and the file; empty
    /// components are ignored. An existing leaf with the same name is
    /// replaced, even when its extension differs.
    pub fn add_file<I, S>(
        &mut self,
        path: I,
        name: impl Into<CompactString>,
        extension: impl Into<CompactString>,
        modification: DateTime<Utc>,
    ) where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node = self;
        for folder in path {
            let folder = folder.as_ref();
            if folder.is_empty() {
                continue;
            }
            node = node.subfolder_or_insert(folder);
        }
        node.insert_leaf(FilesystemLeaf::new(name, extension, modification));
    }

    /// Insert an empty subfolder.
    ///
    /// Returns `None` when a subfolder with that name already exists.
    pub fn add_empty_subfolder(&mut self, name: &str) -> Option<&mut FilesystemNode> {
        if self.subfolders.contains_key(name) {
            return None;
        }
        Some(self.subfolder_or_insert(name))
    }

    /// Remove a file entry; returns whether it existed.
    pub fn drop_file(&mut self, name: &str) -> bool {
        let removed = self.files.remove(name).is_some();
        if removed {
            self.file_count -= 1;
        }
        removed
    }

    /// Remove a subfolder and its contents; returns whether it existed.
    pub fn drop_folder(&mut self, name: &str) -> bool {
        let removed = self.subfolders.remove(name).is_some();
        if removed {
            self.file_count -= 1;
        }
        removed
    }

    /// Files sorted by ascending name.
    pub fn list_files(&self) -> Vec<&FilesystemLeaf> {
        self.files.values().collect()
    }

    /// Subfolders sorted by ascending name.
    pub fn list_folders(&self) -> Vec<&FilesystemNode> {
        self.subfolders.values().collect()
    }

    /// Snapshot of the file names, sorted ascending.
    pub fn file_names(&self) -> Vec<CompactString> {
        self.files.keys().cloned().collect()
    }

    /// Snapshot of the subfolder names, sorted ascending.
    pub fn folder_names(&self) -> Vec<CompactString> {
        self.subfolders.keys().cloned().collect()
    }

    pub fn file(&self, name: &str) -> Option<&FilesystemLeaf> {
        self.files.get(name)
    }

    pub fn file_mut(&mut self, name: &str) -> Option<&mut FilesystemLeaf> {
        self.files.get_mut(name)
    }

    pub fn folder(&self, name: &str) -> Option<&FilesystemNode> {
        self.subfolders.get(name)
    }

    pub fn folder_mut(&mut self, name: &str) -> Option<&mut FilesystemNode> {
        self.subfolders.get_mut(name)
    }

    /// Look up a file by directory path and base name.
    pub fn get_file<I, S>(&self, path: I, name: &str) -> Option<&FilesystemLeaf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node = self;
        for folder in path {
            let folder = folder.as_ref();
            if folder.is_empty() {
                continue;
            }
            node = node.subfolders.get(folder)?;
        }
        node.files.get(name)
    }

    /// Visit every leaf: own files first, then each subfolder recursively.
    pub fn walk_leaves<F>(&self, visitor: &mut F)
    where
        F: FnMut(&FilesystemLeaf),
    {
        for leaf in self.files.values() {
            visitor(leaf);
        }
        for folder in self.subfolders.values() {
            folder.walk_leaves(visitor);
        }
    }

    /// Total number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.walk_leaves(&mut |_| count += 1);
        count
    }

    fn subfolder_or_insert(&mut self, name: &str) -> &mut FilesystemNode {
        if !self.subfolders.contains_key(name) {
            self.file_count += 1;
        }
        self.subfolders
            .entry(CompactString::from(name))
            .or_insert_with(|| FilesystemNode::new(name))
    }

    fn insert_leaf(&mut self, leaf: FilesystemLeaf) {
        if self.files.insert(leaf.name.clone(), leaf).is_none() {
            self.file_count += 1;
        }
    }
}
