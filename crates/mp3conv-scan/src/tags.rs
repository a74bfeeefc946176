//! `Convert-Keep` tag reading for the supported containers.

use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use lofty::config::ParseOptions;
use lofty::file::AudioFile;
use lofty::flac::FlacFile;
use lofty::mp4::{AtomData, AtomIdent, Mp4File};
use lofty::mpeg::MpegFile;
use tracing::debug;

use mp3conv_core::{FilesystemLeaf, KeepReader, MetadataError, TagLookup};

/// Description of the ID3v2 `TXXX` frame holding the keep value.
pub const ID3_KEEP_DESCRIPTION: &str = "Convert-Keep";

/// Vorbis comment and iTunes freeform atom name holding the keep value.
pub const KEEP_FIELD: &str = "CONVERT-KEEP";

const ITUNES_MEAN: &str = "com.apple.iTunes";

/// [`KeepReader`] backed by the tags embedded in audio containers.
///
/// | Extension | Tag |
/// |---|---|
/// | `mp3` | ID3v2 `TXXX:Convert-Keep` |
/// | `flac` | Vorbis comment `CONVERT-KEEP` |
/// | `m4a` | freeform atom `----:com.apple.iTunes:CONVERT-KEEP` |
#[derive(Debug, Default, Clone, Copy)]
pub struct TagKeepReader;

impl TagKeepReader {
    pub fn new() -> Self {
        Self
    }
}

impl KeepReader for TagKeepReader {
    fn read_keep(&self, directory: &Path, leaf: &FilesystemLeaf) -> Result<TagLookup, MetadataError> {
        let path = directory.join(leaf.filename());
        let raw = match leaf.extension() {
            "mp3" => read_id3v2(&path)?,
            "flac" => read_vorbis_comment(&path)?,
            "m4a" => read_freeform_atom(&path)?,
            _ => return Ok(TagLookup::Unsupported),
        };

        debug!(path = %path.display(), keep = ?raw, "Read keep tag");
        Ok(match raw {
            Some(value) => TagLookup::Found(value.trim().to_string()),
            None => TagLookup::Missing,
        })
    }
}

fn parse_options() -> ParseOptions {
    ParseOptions::new().read_properties(false)
}

fn open(path: &Path) -> Result<File, MetadataError> {
    File::open(path).map_err(|e| MetadataError::new(path, e.to_string()))
}

fn read_id3v2(path: &Path) -> Result<Option<String>, MetadataError> {
    let mut file = open(path)?;
    let mpeg = MpegFile::read_from(&mut file, parse_options())
        .map_err(|e| MetadataError::new(path, e.to_string()))?;

    Ok(mpeg
        .id3v2()
        .and_then(|tag| tag.get_user_text(ID3_KEEP_DESCRIPTION))
        .map(str::to_string))
}

fn read_vorbis_comment(path: &Path) -> Result<Option<String>, MetadataError> {
    let mut file = open(path)?;
    let flac = FlacFile::read_from(&mut file, parse_options())
        .map_err(|e| MetadataError::new(path, e.to_string()))?;

    Ok(flac
        .vorbis_comments()
        .and_then(|comments| comments.get(KEEP_FIELD))
        .map(str::to_string))
}

fn read_freeform_atom(path: &Path) -> Result<Option<String>, MetadataError> {
    let mut file = open(path)?;
    let mp4 = Mp4File::read_from(&mut file, parse_options())
        .map_err(|e| MetadataError::new(path, e.to_string()))?;

    let ident = AtomIdent::Freeform {
        mean: Cow::Borrowed(ITUNES_MEAN),
        name: Cow::Borrowed(KEEP_FIELD),
    };
    let value = mp4
        .ilst()
        .and_then(|ilst| ilst.get(&ident))
        .and_then(|atom| {
            atom.data().find_map(|data| match data {
                AtomData::UTF8(text) => Some(text.clone()),
                _ => None,
            })
        });

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_unsupported_extension() {
        let temp = TempDir::new().unwrap();
        let leaf = FilesystemLeaf::new("song", "ogg", Utc::now());

        let lookup = TagKeepReader::new().read_keep(temp.path(), &leaf).unwrap();
        assert_eq!(lookup, TagLookup::Unsupported);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        for extension in ["mp3", "flac", "m4a"] {
            let leaf = FilesystemLeaf::new("missing", extension, Utc::now());
            let err = TagKeepReader::new().read_keep(temp.path(), &leaf).unwrap_err();
            assert!(err.path.ends_with(format!("missing.{extension}")));
        }
    }

    #[test]
    fn test_corrupt_flac_is_an_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.flac"), b"not a flac stream").unwrap();
        let leaf = FilesystemLeaf::new("broken", "flac", Utc::now());

        assert!(TagKeepReader::new().read_keep(temp.path(), &leaf).is_err());
    }
}
