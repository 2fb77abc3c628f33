//! Container classification by file extension

use appxtract_config::UnpackConfig;
use appxtract_types::ContainerKind;
use std::path::Path;

/// Known package and bundle extensions
///
/// Classification is a pure function of the path's last extension, compared
/// case-insensitively. It never touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    package_extensions: Vec<String>,
    bundle_extensions: Vec<String>,
}

impl ContainerHandle {
    /// Create a handle from explicit extension sets
    ///
    /// Extensions are normalized to lower case without a leading dot.
    #[must_use]
    pub fn new<P, B, S, T>(package_extensions: P, bundle_extensions: B) -> Self
    where
        P: IntoIterator<Item = S>,
        B: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            package_extensions: package_extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            bundle_extensions: bundle_extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    /// Build the extension sets from configuration
    #[must_use]
    pub fn from_config(config: &UnpackConfig) -> Self {
        Self::new(&config.package_extensions, &config.bundle_extensions)
    }

    /// Classify `path` by its extension
    #[must_use]
    pub fn classify(&self, path: &Path) -> ContainerKind {
        let Some(extension) = get_extension(path) else {
            return ContainerKind::Unrecognized;
        };

        if self.package_extensions.contains(&extension) {
            ContainerKind::Package
        } else if self.bundle_extensions.contains(&extension) {
            ContainerKind::Bundle
        } else {
            ContainerKind::Unrecognized
        }
    }

    #[must_use]
    pub fn package_extensions(&self) -> &[String] {
        &self.package_extensions
    }

    #[must_use]
    pub fn bundle_extensions(&self) -> &[String] {
        &self.bundle_extensions
    }
}

impl Default for ContainerHandle {
    fn default() -> Self {
        Self::new(["appx", "msix"], ["appxbundle", "msixbundle"])
    }
}

/// Gets the file extension as a lowercase string
fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}
