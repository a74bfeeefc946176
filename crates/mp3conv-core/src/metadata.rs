//! Keep decisions read from file tags.

use std::path::Path;

use tracing::warn;

use crate::error::MetadataError;
use crate::keep::ConvertKeep;
use crate::node::FilesystemLeaf;

/// Outcome of looking up the keep tag of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagLookup {
    /// The tag is present, with its raw (trimmed) text.
    Found(String),
    /// The container was read but carries no keep tag.
    Missing,
    /// No tag reader exists for this extension.
    Unsupported,
}

/// Reads the raw keep tag of a source file.
pub trait KeepReader {
    /// Read the keep tag of `leaf`, located in `directory`.
    fn read_keep(&self, directory: &Path, leaf: &FilesystemLeaf) -> Result<TagLookup, MetadataError>;
}

/// Turn a tag lookup into a keep decision.
///
/// Unparsable tag values are reported and replaced by `default_keep`, as
/// are missing tags and unsupported containers.
pub fn resolve_keep(
    lookup: TagLookup,
    default_keep: ConvertKeep,
    directory: &Path,
    leaf: &FilesystemLeaf,
) -> ConvertKeep {
    match lookup {
        TagLookup::Found(raw) => match ConvertKeep::parse(&raw) {
            Some(keep) => keep,
            None => {
                warn!(
                    path = %directory.join(leaf.filename()).display(),
                    "Bad Convert-Keep tag {raw:?}, using {default_keep}"
                );
                default_keep
            }
        },
        TagLookup::Missing => default_keep,
        TagLookup::Unsupported => {
            warn!(
                extension = leaf.extension(),
                "Unsupported extension for metadata parsing"
            );
            default_keep
        }
    }
}
