use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use mp3conv_core::{
    ConversionMetrics, ConvertKeep, FilesystemLeaf, FilesystemNode, KeepReader, MetadataError,
    PlanningError, SyncConfig, TagLookup,
};
use mp3conv_ops::Patch;
use mp3conv_plan::Planner;

const SRC: &str = "/music";
const DST: &str = "/mp3";

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn tree(root: &str, files: &[(&str, i64)]) -> FilesystemNode {
    let mut node = FilesystemNode::new(root);
    for (path, secs) in files {
        let (dirs, file) = path.rsplit_once('/').unwrap_or(("", *path));
        let (name, extension) = file.rsplit_once('.').unwrap();
        node.add_file(dirs.split('/'), name, extension, at(*secs));
    }
    node
}

/// Keep tags keyed by full source path, counting lookups.
#[derive(Default)]
struct MapReader {
    tags: HashMap<PathBuf, String>,
    failing: Option<PathBuf>,
    calls: Cell<usize>,
}

impl MapReader {
    fn tag(mut self, path: &str, value: &str) -> Self {
        self.tags.insert(PathBuf::from(path), value.to_string());
        self
    }
}

impl KeepReader for MapReader {
    fn read_keep(&self, directory: &Path, leaf: &FilesystemLeaf) -> Result<TagLookup, MetadataError> {
        self.calls.set(self.calls.get() + 1);
        let path = directory.join(leaf.filename());
        if self.failing.as_deref() == Some(path.as_path()) {
            return Err(MetadataError::new(path, "truncated header"));
        }
        Ok(match self.tags.get(&path) {
            Some(value) => TagLookup::Found(value.clone()),
            None => TagLookup::Missing,
        })
    }
}

struct Run {
    patches: Vec<Patch>,
    source: FilesystemNode,
    destination: FilesystemNode,
    metrics: ConversionMetrics,
}

fn run_with(
    config: &SyncConfig,
    reader: &MapReader,
    existing_dirs: &[&str],
    mut source: FilesystemNode,
    mut destination: FilesystemNode,
) -> Result<Run, PlanningError> {
    let existing: Vec<PathBuf> = existing_dirs.iter().map(PathBuf::from).collect();
    let planner =
        Planner::new(config, reader).with_dir_check(move |path| existing.iter().any(|d| d == path));
    let mut metrics = ConversionMetrics::new();
    let patches = planner.plan(
        &mut source,
        Path::new(SRC),
        &mut destination,
        Path::new(DST),
        &mut metrics,
    )?;
    Ok(Run {
        patches,
        source,
        destination,
        metrics,
    })
}

fn run(source: FilesystemNode, destination: FilesystemNode) -> Run {
    run_with(&SyncConfig::default(), &MapReader::default(), &[], source, destination).unwrap()
}

fn describe(patches: &[Patch]) -> Vec<String> {
    patches.iter().map(Patch::describe).collect()
}

#[test]
fn test_stale_destination_is_updated() {
    let result = run(
        tree(SRC, &[("a/song.flac", 200)]),
        tree(DST, &[("a/song.mp3", 100)]),
    );

    assert_eq!(
        result.patches,
        [Patch::convert("/music/a/song.flac", "/mp3/a/song.mp3", true)]
    );
}

#[test]
fn test_orphan_folder_is_removed() {
    let result = run(tree(SRC, &[]), tree(DST, &[("b/old.mp3", 100)]));

    assert_eq!(
        result.patches,
        [Patch::remove("/mp3/b/old.mp3"), Patch::clear_dir("/mp3/b")]
    );
    assert!(result.destination.folder("b").is_none());
}

#[test]
fn test_new_folder_is_created_before_its_content() {
    let result = run(tree(SRC, &[("c/x.flac", 100)]), tree(DST, &[]));

    assert_eq!(
        result.patches,
        [
            Patch::create_dir("/mp3/c"),
            Patch::convert("/music/c/x.flac", "/mp3/c/x.mp3", false),
        ]
    );
    // The destination tree now mirrors the expected outcome.
    assert!(result.destination.folder("c").is_some());
}

#[test]
fn test_existing_directory_is_not_recreated() {
    let result = run_with(
        &SyncConfig::default(),
        &MapReader::default(),
        &["/mp3/c"],
        tree(SRC, &[("c/x.flac", 100)]),
        tree(DST, &[]),
    )
    .unwrap();

    assert_eq!(
        result.patches,
        [Patch::convert("/music/c/x.flac", "/mp3/c/x.mp3", false)]
    );
}

#[test]
fn test_staleness_is_strict() {
    let result = run(
        tree(SRC, &[("same.flac", 100), ("older.flac", 100), ("newer.flac", 100)]),
        tree(DST, &[("same.mp3", 100), ("older.mp3", 99), ("newer.mp3", 101)]),
    );

    assert_eq!(describe(&result.patches), ["CONVERT /music/older.flac (update)"]);
}

#[test]
fn test_mp3_sources_are_copied() {
    let result = run(
        tree(SRC, &[("a/live.mp3", 100), ("a/studio.m4a", 100)]),
        tree(DST, &[("a/live.mp3", 50)]),
    );

    assert_eq!(
        result.patches,
        [
            Patch::copy("/music/a/live.mp3", "/mp3/a", true),
            Patch::convert("/music/a/studio.m4a", "/mp3/a/studio.mp3", false),
        ]
    );
}

#[test]
fn test_files_come_before_folders() {
    let result = run(
        tree(
            SRC,
            &[
                ("z.flac", 100),
                ("a/one.flac", 100),
                ("a/deep/two.flac", 100),
                ("b/three.flac", 100),
            ],
        ),
        tree(DST, &[("b/three.mp3", 100), ("y.mp3", 100)]),
    );

    assert_eq!(
        describe(&result.patches),
        [
            "REMOVE /mp3/y.mp3",
            "CONVERT /music/z.flac",
            "CREATE /mp3/a",
            "CONVERT /music/a/one.flac",
            "CREATE /mp3/a/deep",
            "CONVERT /music/a/deep/two.flac",
        ]
    );
}

#[test]
fn test_no_empty_directory_creation() {
    let config = SyncConfig::builder()
        .keep_threshold(ConvertKeep::Always)
        .build()
        .unwrap();
    let reader = MapReader::default()
        .tag("/music/bonus/x.flac", "bonus")
        .tag("/music/keep/y.flac", "always");

    let result = run_with(
        &config,
        &reader,
        &[],
        tree(SRC, &[("bonus/x.flac", 100), ("keep/y.flac", 100)]),
        tree(DST, &[]),
    )
    .unwrap();

    assert_eq!(
        describe(&result.patches),
        ["CREATE /mp3/keep", "CONVERT /music/keep/y.flac"]
    );
    // Every CreateDir is immediately followed by a patch below it.
    for (i, patch) in result.patches.iter().enumerate() {
        if let Patch::CreateDir { path } = patch {
            let next = &result.patches[i + 1];
            let target = match next {
                Patch::Convert { destination, .. } => destination.as_path(),
                Patch::Copy { destination_dir, .. } => destination_dir.as_path(),
                other => other.path(),
            };
            assert!(target.starts_with(path));
        }
    }
    assert!(result.destination.folder("bonus").is_none());
    assert!(result.destination.folder("keep").is_some());
    assert_eq!(result.metrics.ignored_files.get("flac"), 1);
}

#[test]
fn test_second_run_is_empty() {
    let source = tree(
        SRC,
        &[("a/one.flac", 100), ("a/two.mp3", 100), ("b/c/three.m4a", 100)],
    );
    let first = run(source.clone(), tree(DST, &[("stale.mp3", 10)]));
    assert_eq!(first.patches.len(), 7);

    // Destination as left by the first run.
    let synced = tree(
        DST,
        &[("a/one.mp3", 100), ("a/two.mp3", 100), ("b/c/three.mp3", 100)],
    );
    let second = run(source, synced);
    assert!(second.patches.is_empty());
}

#[test]
fn test_keep_threshold_filters_sources() {
    let config = SyncConfig::builder()
        .keep_threshold(ConvertKeep::Bonus)
        .build()
        .unwrap();
    let reader = MapReader::default()
        .tag("/music/a.flac", "ALWAYS")
        .tag("/music/b.flac", " bonus ")
        .tag("/music/c.flac", "skip")
        .tag("/music/d.flac", "sometimes");

    let result = run_with(
        &config,
        &reader,
        &[],
        tree(SRC, &[("a.flac", 1), ("b.flac", 1), ("c.flac", 1), ("d.flac", 1), ("e.flac", 1)]),
        tree(DST, &[]),
    )
    .unwrap();

    assert_eq!(
        describe(&result.patches),
        [
            "CONVERT /music/a.flac",
            "CONVERT /music/b.flac",
            "CONVERT /music/d.flac",
            "CONVERT /music/e.flac",
        ]
    );
    assert!(result.source.file("c").is_none());
    assert_eq!(result.metrics.ignored_files.get("flac"), 1);
    assert_eq!(result.metrics.convert_tags.get("always"), 3);
    assert_eq!(result.metrics.convert_tags.get("bonus"), 1);
    assert_eq!(result.metrics.convert_tags.get("skip"), 1);
}

#[test]
fn test_ignored_source_removes_destination() {
    let config = SyncConfig::builder()
        .keep_threshold(ConvertKeep::Always)
        .build()
        .unwrap();
    let reader = MapReader::default().tag("/music/a/x.flac", "skip");

    let result = run_with(
        &config,
        &reader,
        &[],
        tree(SRC, &[("a/x.flac", 100), ("a/y.flac", 100)]),
        tree(DST, &[("a/x.mp3", 100), ("a/y.mp3", 100)]),
    )
    .unwrap();

    assert_eq!(describe(&result.patches), ["REMOVE /mp3/a/x.mp3"]);
}

#[test]
fn test_no_tag_reads_without_filtering() {
    let reader = MapReader::default().tag("/music/a.flac", "skip");
    let result = run_with(
        &SyncConfig::default(),
        &reader,
        &[],
        tree(SRC, &[("a.flac", 1), ("d/b.flac", 1)]),
        tree(DST, &[]),
    )
    .unwrap();

    assert_eq!(reader.calls.get(), 0);
    assert_eq!(result.patches.len(), 3);
    assert_eq!(result.metrics.convert_tags.total(), 0);
}

#[test]
fn test_metadata_error_aborts_planning() {
    let config = SyncConfig::builder()
        .keep_threshold(ConvertKeep::Bonus)
        .build()
        .unwrap();
    let reader = MapReader {
        failing: Some(PathBuf::from("/music/a/broken.flac")),
        ..Default::default()
    };

    let err = run_with(
        &config,
        &reader,
        &[],
        tree(SRC, &[("a/broken.flac", 1)]),
        tree(DST, &[]),
    )
    .err()
    .unwrap();

    assert!(matches!(err, PlanningError::Metadata(_)));
}

#[test]
fn test_removal_disabled() {
    let config = SyncConfig::builder().can_remove(false).build().unwrap();
    let result = run_with(
        &config,
        &MapReader::default(),
        &[],
        tree(SRC, &[("a/keep.flac", 100)]),
        tree(
            DST,
            &[("a/keep.mp3", 100), ("a/extra.mp3", 100), ("gone/old.mp3", 100)],
        ),
    )
    .unwrap();

    assert!(result.patches.is_empty());
    assert_eq!(result.destination.leaf_count(), 3);
    assert!(result.destination.folder("gone").is_some());
}

#[test]
fn test_nested_orphans_are_removed_depth_first() {
    let result = run(
        tree(SRC, &[]),
        tree(DST, &[("x/a.mp3", 1), ("x/y/b.mp3", 1), ("x/z.mp3", 1)]),
    );

    assert_eq!(
        describe(&result.patches),
        [
            "REMOVE /mp3/x/a.mp3",
            "REMOVE /mp3/x/z.mp3",
            "REMOVE /mp3/x/y/b.mp3",
            "CLEAR /mp3/x/y",
            "CLEAR /mp3/x",
        ]
    );
    assert!(result.destination.is_empty());
}
