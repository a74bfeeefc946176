//! Keep policy attached to source files.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::error::UnrecognizedKeepValue;

/// How eagerly a source file should be excluded from conversion.
///
/// Variants are ordered by declaration: `Always < Bonus < Skip`. A lower
/// value means the file is more important to convert. A file takes part in
/// a run when its decision is `<=` the active keep threshold.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConvertKeep {
    /// Always converted, whatever the threshold.
    Always,
    /// Converted only when bonus files are requested.
    Bonus,
    /// Converted only when no filtering is requested.
    Skip,
}

impl ConvertKeep {
    /// The highest keep level.
    ///
    /// Used as the "no filtering requested" threshold: every decision is
    /// `<=` to it.
    pub const fn lowest() -> Self {
        Self::Skip
    }

    /// Parse a keep value, accepting the case-insensitive aliases
    /// `always`/`keep`, `bonus` and `never`/`skip`.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "always" | "keep" => Some(Self::Always),
            "bonus" => Some(Self::Bonus),
            "never" | "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    /// Label used for metric keys.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl FromStr for ConvertKeep {
    type Err = UnrecognizedKeepValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnrecognizedKeepValue::new(s))
    }
}
