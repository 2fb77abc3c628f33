//! Package and bundle identity types

use std::fmt;
use std::str::FromStr;

use appxtract_errors::PlatformError;
use serde::{Deserialize, Serialize};

use crate::encoding::publisher_id;

/// Resource id carried by every bundle identity.
pub const BUNDLE_RESOURCE_ID: &str = "~";

/// What a path on disk holds, judged by its extension alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Package,
    Bundle,
    Unrecognized,
}

impl ContainerKind {
    /// Whether this is a container the pipeline can extract
    #[must_use]
    pub fn is_container(self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package => write!(f, "package"),
            Self::Bundle => write!(f, "bundle"),
            Self::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Processor architecture declared by a manifest identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    X64,
    Arm,
    Arm64,
    #[default]
    Neutral,
}

impl Architecture {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::Neutral => "neutral",
        }
    }

    /// Architecture of the running process
    #[must_use]
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86" => Self::X86,
            "x86_64" => Self::X64,
            "arm" => Self::Arm,
            "aarch64" => Self::Arm64,
            _ => Self::Neutral,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86" => Ok(Self::X86),
            "x64" => Ok(Self::X64),
            "arm" => Ok(Self::Arm),
            "arm64" => Ok(Self::Arm64),
            "neutral" | "" => Ok(Self::Neutral),
            other => Err(PlatformError::ManifestParseFailed {
                message: format!("unknown processor architecture: {other}"),
            }),
        }
    }
}

/// Identity read from a package or bundle manifest
///
/// The pipeline never fabricates one of these; they only come out of a
/// container reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
    pub architecture: Architecture,
    pub resource_id: Option<String>,
    pub publisher: String,
}

impl PackageIdentity {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        architecture: Architecture,
        publisher: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            architecture,
            resource_id: None,
            publisher: publisher.into(),
        }
    }

    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        let resource_id = resource_id.into();
        self.resource_id = (!resource_id.is_empty()).then_some(resource_id);
        self
    }

    /// Mark this identity as a bundle identity (resource id `~`)
    #[must_use]
    pub fn into_bundle(self) -> Self {
        self.with_resource_id(BUNDLE_RESOURCE_ID)
    }

    /// Hash of the publisher used in full and family names
    #[must_use]
    pub fn publisher_id(&self) -> String {
        publisher_id(&self.publisher)
    }

    /// `name_version_architecture_resourceId_publisherId`
    ///
    /// An absent resource id leaves the field empty, which yields the
    /// double underscore seen in most installed folder names.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.name,
            self.version,
            self.architecture,
            self.resource_id.as_deref().unwrap_or_default(),
            self.publisher_id()
        )
    }

    /// `name_publisherId`
    #[must_use]
    pub fn family_name(&self) -> String {
        format!("{}_{}", self.name, self.publisher_id())
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Kind of package a bundle member holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    #[default]
    Application,
    Resource,
}

impl FromStr for MemberType {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("application") {
            Ok(Self::Application)
        } else if s.eq_ignore_ascii_case("resource") {
            Ok(Self::Resource)
        } else {
            Err(PlatformError::ManifestParseFailed {
                message: format!("unknown bundle member type: {s}"),
            })
        }
    }
}

/// One row of a bundle's declared membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMember {
    pub file_name: String,
    pub identity: PackageIdentity,
    pub member_type: MemberType,
    /// Resource language tags in manifest order
    pub languages: Vec<String>,
}

impl BundleMember {
    pub fn new(
        file_name: impl Into<String>,
        identity: PackageIdentity,
        member_type: MemberType,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            identity,
            member_type,
            languages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn is_application(&self) -> bool {
        self.member_type == MemberType::Application
    }
}
