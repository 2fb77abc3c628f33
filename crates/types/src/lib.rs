#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for appxtract
//!
//! This crate provides the data model shared by the extraction pipeline:
//! package identities and their canonical folder names, bundle membership
//! rows, reader options, and the image/volume types used for staging.

pub mod encoding;
pub mod image;
pub mod options;
pub mod package;

// Re-export commonly used types
pub use encoding::publisher_id;
pub use image::{ImageKind, ImageSpec, VolumeId};
pub use options::{ApplicabilityMode, ValidationMode};
pub use package::{Architecture, BundleMember, ContainerKind, MemberType, PackageIdentity};
pub use uuid::Uuid;

use serde::{Deserialize, Serialize};

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "auto" => Ok(Self::Auto),
            "never" => Ok(Self::Never),
            other => Err(other.to_string()),
        }
    }
}

impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}
