//! Container reading capability

use async_trait::async_trait;
use appxtract_errors::PlatformError;
use appxtract_types::{ApplicabilityMode, BundleMember, PackageIdentity, ValidationMode};
use std::path::Path;

/// Opens package and bundle containers
#[async_trait]
pub trait ContainerReader: Send + Sync {
    /// Open a single package, validating it under `validation`
    async fn open_package(
        &self,
        path: &Path,
        validation: ValidationMode,
    ) -> Result<Box<dyn PackageReader>, PlatformError>;

    /// Open a bundle and select its applicable payloads
    async fn open_bundle(
        &self,
        path: &Path,
        validation: ValidationMode,
        applicability: &ApplicabilityMode,
    ) -> Result<Box<dyn BundleReader>, PlatformError>;
}

/// An opened package
#[async_trait]
pub trait PackageReader: Send + Sync {
    /// Identity from the package manifest
    fn identity(&self) -> &PackageIdentity;

    /// Names of packages this one declares a dependency on
    fn dependencies(&self) -> &[String];

    /// Extract every entry to `destination/FullName`
    async fn extract_all(&self, destination: &Path) -> Result<(), PlatformError>;
}

/// An opened bundle
#[async_trait]
pub trait BundleReader: Send + Sync {
    /// Identity from the bundle manifest
    fn identity(&self) -> &PackageIdentity;

    /// Every package the manifest declares, in manifest order
    fn members(&self) -> &[BundleMember];

    /// File names of the payloads selected for this run, in selection order
    fn applicable_payloads(&self) -> &[String];

    /// Declared dependencies of one payload; empty when unknown
    fn payload_dependencies(&self, file_name: &str) -> &[String];

    /// Extract the bundle footprint to `destination/BundleFullName` and each
    /// applicable payload to `destination/PayloadFullName`
    async fn extract_all(&self, destination: &Path) -> Result<(), PlatformError>;
}
