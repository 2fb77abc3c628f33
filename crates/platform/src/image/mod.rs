//! Image build and mount capabilities

use async_trait::async_trait;
use appxtract_errors::PlatformError;
use appxtract_types::{ImageSpec, VolumeId};
use std::path::Path;

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build `spec.output` from the tree under `staging_root`
    async fn create_image(&self, staging_root: &Path, spec: &ImageSpec)
        -> Result<(), PlatformError>;
}

#[async_trait]
pub trait ImageMounter: Send + Sync {
    async fn mount_image(&self, path: &Path, read_only: bool) -> Result<VolumeId, PlatformError>;

    async fn unmount_volume(&self, volume: VolumeId) -> Result<(), PlatformError>;

    /// Volume currently backed by `path`, if the platform knows of one
    async fn volume_for_image(&self, path: &Path) -> Result<Option<VolumeId>, PlatformError>;
}
