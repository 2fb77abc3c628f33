//! Configuration sections and their defaults

use appxtract_types::{Architecture, ColorChoice};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
    #[serde(default)]
    pub json: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
            json: false,
        }
    }
}

/// Extraction defaults and the container extension tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpackConfig {
    #[serde(default = "default_validate_signature")]
    pub validate_signature: bool,
    #[serde(default)]
    pub apply_acls: bool,
    #[serde(default = "default_package_extensions")]
    pub package_extensions: Vec<String>,
    #[serde(default = "default_bundle_extensions")]
    pub bundle_extensions: Vec<String>,
}

impl Default for UnpackConfig {
    fn default() -> Self {
        Self {
            validate_signature: default_validate_signature(),
            apply_acls: false,
            package_extensions: default_package_extensions(),
            bundle_extensions: default_bundle_extensions(),
        }
    }
}

/// Bundle applicability filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicabilityConfig {
    #[serde(default)]
    pub skip_platform: bool,
    #[serde(default)]
    pub skip_language: bool,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_architectures")]
    pub architectures: Vec<Architecture>,
}

impl Default for ApplicabilityConfig {
    fn default() -> Self {
        Self {
            skip_platform: false,
            skip_language: false,
            languages: default_languages(),
            architectures: default_architectures(),
        }
    }
}

/// Where staging directories are created
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StagingConfig {
    /// Defaults to the current working directory
    pub root: Option<PathBuf>,
}

/// Size bounds for single-file virtual disks, in MB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_min_size_mb")]
    pub min_size_mb: u64,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            min_size_mb: default_min_size_mb(),
            max_size_mb: default_max_size_mb(),
        }
    }
}

/// An external program plus its argument template
///
/// Arguments may contain placeholders such as `{path}` or `{output}`,
/// substituted by the adapter that runs the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// External tools behind the ACL, image and mount capabilities
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    /// Run once per folder with `{path}`
    pub acl_command: Option<ToolCommand>,
    /// `{staging}`, `{output}`, `{root}`, `{size_mb}`, `{kind}`
    pub image_command: Option<ToolCommand>,
    /// `{path}` and `{read_only}`; prints the volume id on stdout
    pub mount_command: Option<ToolCommand>,
    /// `{volume}`
    pub unmount_command: Option<ToolCommand>,
    /// `{path}`; prints the volume id on stdout, nothing when not mounted
    pub volume_query_command: Option<ToolCommand>,
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_validate_signature() -> bool {
    true
}

fn default_package_extensions() -> Vec<String> {
    vec!["appx".to_string(), "msix".to_string()]
}

fn default_bundle_extensions() -> Vec<String> {
    vec!["appxbundle".to_string(), "msixbundle".to_string()]
}

/// Preferred language from `LANG` (`en_US.UTF-8` becomes `en-us`)
fn default_languages() -> Vec<String> {
    let from_env = std::env::var("LANG").ok().and_then(|lang| {
        let tag = lang.split('.').next()?.replace('_', "-").to_ascii_lowercase();
        (!tag.is_empty() && tag != "c" && tag != "posix").then_some(tag)
    });
    vec![from_env.unwrap_or_else(|| "en-us".to_string())]
}

fn default_architectures() -> Vec<Architecture> {
    vec![Architecture::current()]
}

fn default_min_size_mb() -> u64 {
    5
}

fn default_max_size_mb() -> u64 {
    2_040_000
}
