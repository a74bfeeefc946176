//! Patch types.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::error::ExecutionError;
use crate::transcoder::Transcoder;

/// Category of a user-visible patch, used as metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PatchKind {
    Convert,
    Copy,
    Mkdir,
    Remove,
}

impl PatchKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// One filesystem action bringing the destination closer to the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Patch {
    /// Transcode `source` into `destination`.
    Convert {
        source: PathBuf,
        destination: PathBuf,
        update: bool,
    },
    /// Copy `source` as is into `destination_dir`.
    Copy {
        source: PathBuf,
        destination_dir: PathBuf,
        update: bool,
    },
    /// Create a destination directory.
    CreateDir { path: PathBuf },
    /// Delete a destination file.
    Remove { path: PathBuf },
    /// Remove a destination directory if it ended up empty.
    ClearDir { path: PathBuf },
}

impl Patch {
    /// Create a convert patch.
    pub fn convert(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, update: bool) -> Self {
        Self::Convert {
            source: source.into(),
            destination: destination.into(),
            update,
        }
    }

    /// Create a copy patch.
    pub fn copy(source: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>, update: bool) -> Self {
        Self::Copy {
            source: source.into(),
            destination_dir: destination_dir.into(),
            update,
        }
    }

    /// Create a directory creation patch.
    pub fn create_dir(path: impl Into<PathBuf>) -> Self {
        Self::CreateDir { path: path.into() }
    }

    /// Create a file removal patch.
    pub fn remove(path: impl Into<PathBuf>) -> Self {
        Self::Remove { path: path.into() }
    }

    /// Create a directory cleanup patch.
    pub fn clear_dir(path: impl Into<PathBuf>) -> Self {
        Self::ClearDir { path: path.into() }
    }

    /// Metric category of this patch.
    ///
    /// `ClearDir` is advisory cleanup and has no category.
    pub fn kind(&self) -> Option<PatchKind> {
        match self {
            Self::Convert { .. } => Some(PatchKind::Convert),
            Self::Copy { .. } => Some(PatchKind::Copy),
            Self::CreateDir { .. } => Some(PatchKind::Mkdir),
            Self::Remove { .. } => Some(PatchKind::Remove),
            Self::ClearDir { .. } => None,
        }
    }

    /// Whether this patch replaces a stale destination file.
    pub fn is_update(&self) -> bool {
        match self {
            Self::Convert { update, .. } | Self::Copy { update, .. } => *update,
            _ => false,
        }
    }

    /// The path this patch is about, as shown in its description.
    pub fn path(&self) -> &Path {
        match self {
            Self::Convert { source, .. } | Self::Copy { source, .. } => source,
            Self::CreateDir { path } | Self::Remove { path } | Self::ClearDir { path } => path,
        }
    }

    /// One-line human-readable rendering.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Perform the filesystem action.
    ///
    /// A `ClearDir` failure is ignored: the directory may legitimately
    /// still hold files that were not removed.
    pub fn apply(&self, transcoder: &dyn Transcoder) -> Result<(), ExecutionError> {
        match self {
            Self::Convert {
                source,
                destination,
                ..
            } => transcoder.convert(source, destination),
            Self::Copy {
                source,
                destination_dir,
                ..
            } => transcoder.copy(source, destination_dir),
            Self::CreateDir { path } => {
                fs::create_dir(path).map_err(|e| ExecutionError::io("mkdir", path, e))
            }
            Self::Remove { path } => {
                fs::remove_file(path).map_err(|e| ExecutionError::io("remove", path, e))
            }
            Self::ClearDir { path } => {
                if let Err(err) = fs::remove_dir(path) {
                    debug!(path = %path.display(), %err, "Directory left in place");
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Convert { .. } => "CONVERT",
            Self::Copy { .. } => "COPY",
            Self::CreateDir { .. } => "CREATE",
            Self::Remove { .. } => "REMOVE",
            Self::ClearDir { .. } => "CLEAR",
        };
        write!(f, "{verb} {}", self.path().display())?;
        if self.is_update() {
            write!(f, " (update)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl Transcoder for Recorder {
        fn convert(&self, source: &Path, destination: &Path) -> Result<(), ExecutionError> {
            self.calls
                .borrow_mut()
                .push(format!("convert {} {}", source.display(), destination.display()));
            Ok(())
        }

        fn copy(&self, source: &Path, destination_dir: &Path) -> Result<(), ExecutionError> {
            self.calls
                .borrow_mut()
                .push(format!("copy {} {}", source.display(), destination_dir.display()));
            Ok(())
        }
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            Patch::convert("/src/a.flac", "/dst/a.mp3", false).describe(),
            "CONVERT /src/a.flac"
        );
        assert_eq!(
            Patch::convert("/src/a.flac", "/dst/a.mp3", true).describe(),
            "CONVERT /src/a.flac (update)"
        );
        assert_eq!(
            Patch::copy("/src/b.mp3", "/dst", true).describe(),
            "COPY /src/b.mp3 (update)"
        );
        assert_eq!(Patch::create_dir("/dst/c").describe(), "CREATE /dst/c");
        assert_eq!(Patch::remove("/dst/old.mp3").describe(), "REMOVE /dst/old.mp3");
        assert_eq!(Patch::clear_dir("/dst/b").describe(), "CLEAR /dst/b");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Patch::convert("a", "b", false).kind(), Some(PatchKind::Convert));
        assert_eq!(Patch::copy("a", "b", false).kind(), Some(PatchKind::Copy));
        assert_eq!(Patch::create_dir("a").kind(), Some(PatchKind::Mkdir));
        assert_eq!(Patch::remove("a").kind(), Some(PatchKind::Remove));
        assert_eq!(Patch::clear_dir("a").kind(), None);
        assert_eq!(PatchKind::Mkdir.as_str(), "mkdir");
    }

    #[test]
    fn test_apply_delegates_to_transcoder() {
        let recorder = Recorder::default();
        Patch::convert("/src/a.flac", "/dst/a.mp3", false)
            .apply(&recorder)
            .unwrap();
        Patch::copy("/src/b.mp3", "/dst", false).apply(&recorder).unwrap();

        assert_eq!(
            *recorder.calls.borrow(),
            ["convert /src/a.flac /dst/a.mp3", "copy /src/b.mp3 /dst"]
        );
    }

    #[test]
    fn test_apply_filesystem_patches() {
        let temp = TempDir::new().unwrap();
        let recorder = Recorder::default();
        let dir = temp.path().join("album");
        let file = dir.join("song.mp3");

        Patch::create_dir(&dir).apply(&recorder).unwrap();
        assert!(dir.is_dir());
        assert!(Patch::create_dir(&dir).apply(&recorder).is_err());

        fs::write(&file, "mp3").unwrap();
        // Not empty yet: silently left in place.
        Patch::clear_dir(&dir).apply(&recorder).unwrap();
        assert!(dir.is_dir());

        Patch::remove(&file).apply(&recorder).unwrap();
        assert!(!file.exists());
        assert!(Patch::remove(&file).apply(&recorder).is_err());

        Patch::clear_dir(&dir).apply(&recorder).unwrap();
        assert!(!dir.exists());
        Patch::clear_dir(&dir).apply(&recorder).unwrap();
    }
}
