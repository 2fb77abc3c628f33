#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for appxtract
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/appxtract/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod core;

pub use crate::core::{
    ApplicabilityConfig, GeneralConfig, ImageConfig, StagingConfig, ToolCommand, ToolsConfig,
    UnpackConfig,
};

use appxtract_errors::{ConfigError, Error};
use appxtract_types::{ApplicabilityMode, ColorChoice, ValidationMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub unpack: UnpackConfig,

    #[serde(default)]
    pub applicability: ApplicabilityConfig,

    #[serde(default)]
    pub staging: StagingConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("appxtract").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// describes an unusable extension table.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or parsed.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an `APPXTRACT_*` variable holds a value that
    /// cannot be parsed into the expected type.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(value) = std::env::var("APPXTRACT_VALIDATE_SIGNATURE") {
            self.unpack.validate_signature = parse_bool("APPXTRACT_VALIDATE_SIGNATURE", value)?;
        }

        if let Ok(value) = std::env::var("APPXTRACT_APPLY_ACLS") {
            self.unpack.apply_acls = parse_bool("APPXTRACT_APPLY_ACLS", value)?;
        }

        if let Ok(root) = std::env::var("APPXTRACT_STAGING_ROOT") {
            if root.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "APPXTRACT_STAGING_ROOT".to_string(),
                    value: root,
                }
                .into());
            }
            self.staging.root = Some(PathBuf::from(root));
        }

        if let Ok(color) = std::env::var("APPXTRACT_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "APPXTRACT_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        Ok(())
    }

    /// Check the extension tables and image bounds
    ///
    /// # Errors
    ///
    /// Returns an error if either extension set is empty, an extension is
    /// claimed by both kinds, or the image size bounds are inverted.
    pub fn validate(&self) -> Result<(), Error> {
        let packages = normalized(&self.unpack.package_extensions);
        let bundles = normalized(&self.unpack.bundle_extensions);

        if packages.is_empty() {
            return Err(ConfigError::EmptyExtensionSet {
                kind: "package".to_string(),
            }
            .into());
        }
        if bundles.is_empty() {
            return Err(ConfigError::EmptyExtensionSet {
                kind: "bundle".to_string(),
            }
            .into());
        }
        if let Some(extension) = packages.intersection(&bundles).next() {
            return Err(ConfigError::OverlappingExtension {
                extension: extension.clone(),
            }
            .into());
        }
        if self.image.min_size_mb > self.image.max_size_mb {
            return Err(ConfigError::InvalidValue {
                field: "image.min_size_mb".to_string(),
                value: self.image.min_size_mb.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Validation mode implied by `unpack.validate_signature`
    #[must_use]
    pub fn validation_mode(&self) -> ValidationMode {
        ValidationMode::from_flag(self.unpack.validate_signature)
    }

    /// Applicability filters handed to bundle readers
    #[must_use]
    pub fn applicability_mode(&self) -> ApplicabilityMode {
        ApplicabilityMode {
            skip_platform: self.applicability.skip_platform,
            skip_language: self.applicability.skip_language,
            ..ApplicabilityMode::default()
        }
        .with_languages(&self.applicability.languages)
        .with_architectures(self.applicability.architectures.clone())
    }

    /// Get the staging root (with default)
    #[must_use]
    pub fn staging_root(&self) -> PathBuf {
        self.staging
            .root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}

fn normalized(extensions: &[String]) -> HashSet<String> {
    extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
