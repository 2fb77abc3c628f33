//! Virtual disk image and volume types

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use appxtract_errors::PlatformError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a mounted volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(Uuid);

impl VolumeId {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// A fresh random volume id
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for VolumeId {
    type Err = PlatformError;

    /// Accepts plain or brace-wrapped GUIDs, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed);
        Uuid::parse_str(inner)
            .map(Self)
            .map_err(|_| PlatformError::InvalidVolumeId {
                value: s.to_string(),
            })
    }
}

/// Output format of a staged image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Vhd,
    Vhdx,
    Cim,
}

impl ImageKind {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vhd => "vhd",
            Self::Vhdx => "vhdx",
            Self::Cim => "cim",
        }
    }

    /// Single-file virtual disks need an explicit size
    #[must_use]
    pub fn requires_size(self) -> bool {
        matches!(self, Self::Vhd | Self::Vhdx)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vhd" => Ok(Self::Vhd),
            "vhdx" => Ok(Self::Vhdx),
            "cim" => Ok(Self::Cim),
            other => Err(other.to_string()),
        }
    }
}

impl clap::ValueEnum for ImageKind {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Vhd, Self::Vhdx, Self::Cim]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.extension()))
    }
}

/// Everything the image builder needs besides the staged tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub kind: ImageKind,
    pub output: PathBuf,
    /// Directory inside the image that receives the staged tree
    pub root_directory: Option<String>,
    pub size_mb: Option<u64>,
}
