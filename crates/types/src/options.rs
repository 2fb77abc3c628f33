//! Options handed to the container reader

use serde::{Deserialize, Serialize};

use crate::package::Architecture;

/// How strictly a container is validated when opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Require a signature and a well-formed container
    #[default]
    Full,
    /// Accept unsigned or test-signed containers
    SkipSignature,
}

impl ValidationMode {
    #[must_use]
    pub fn from_flag(validate_signature: bool) -> Self {
        if validate_signature {
            Self::Full
        } else {
            Self::SkipSignature
        }
    }

    #[must_use]
    pub fn requires_signature(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Platform and language filters applied when a bundle is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicabilityMode {
    pub skip_platform: bool,
    pub skip_language: bool,
    /// Preferred languages as lower-cased BCP-47 tags, most preferred first
    pub languages: Vec<String>,
    /// Architectures the target machine can run
    pub architectures: Vec<Architecture>,
}

impl ApplicabilityMode {
    /// Accept every member of a bundle
    #[must_use]
    pub fn all() -> Self {
        Self {
            skip_platform: true,
            skip_language: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.languages = languages
            .into_iter()
            .map(|l| l.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn with_architectures(mut self, architectures: Vec<Architecture>) -> Self {
        self.architectures = architectures;
        self
    }

    /// Whether a member of `architecture` can run under these filters
    #[must_use]
    pub fn accepts_architecture(&self, architecture: Architecture) -> bool {
        self.skip_platform
            || architecture == Architecture::Neutral
            || self.architectures.is_empty()
            || self.architectures.contains(&architecture)
    }
}
