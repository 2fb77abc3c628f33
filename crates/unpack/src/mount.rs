//! Mount and unmount of built images

use appxtract_errors::{PlatformError, UnpackError};
use appxtract_events::{EventEmitter, EventSender, ImageEvent};
use appxtract_platform::ImageMounter;
use appxtract_types::VolumeId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Mounts images and remembers which volume backs which image
///
/// Every operation is a single call into the mount capability; nothing is
/// retried here.
pub struct MountLifecycle {
    mounter: Arc<dyn ImageMounter>,
    mounted: HashMap<PathBuf, VolumeId>,
    event_sender: Option<EventSender>,
}

impl std::fmt::Debug for MountLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountLifecycle")
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for MountLifecycle {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl MountLifecycle {
    #[must_use]
    pub fn new(mounter: Arc<dyn ImageMounter>) -> Self {
        Self {
            mounter,
            mounted: HashMap::new(),
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Mount `image` and return the volume backing it
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` if the mount capability fails.
    pub async fn mount(&mut self, image: &Path, read_only: bool) -> Result<VolumeId, UnpackError> {
        let volume = self
            .mounter
            .mount_image(image, read_only)
            .await
            .map_err(|e| platform_failure("mount", &e))?;

        debug!(image = %image.display(), %volume, "mounted image");
        self.mounted.insert(image.to_path_buf(), volume);
        self.emit_image(ImageEvent::Mounted {
            image: image.to_path_buf(),
            volume,
        });
        Ok(volume)
    }

    /// Unmount the volume backing `image`
    ///
    /// Images mounted through this lifecycle are resolved from memory;
    /// anything else is looked up through the mount capability.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no volume can be resolved for `image`, including
    /// when the lookup itself fails, so the caller can retry with an explicit
    /// volume id. Returns `Unexpected` if the unmount itself fails.
    pub async fn unmount_by_path(&mut self, image: &Path) -> Result<VolumeId, UnpackError> {
        let volume = match self.mounted.get(image) {
            Some(volume) => *volume,
            None => self
                .mounter
                .volume_for_image(image)
                .await
                .map_err(|e| UnpackError::NotFound {
                    what: format!("volume for image {} ({e})", image.display()),
                })?
                .ok_or_else(|| UnpackError::NotFound {
                    what: format!("volume for image {}", image.display()),
                })?,
        };

        self.unmount_by_volume(volume).await?;
        Ok(volume)
    }

    /// Unmount `volume`
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` if the mount capability fails.
    pub async fn unmount_by_volume(&mut self, volume: VolumeId) -> Result<(), UnpackError> {
        self.mounter
            .unmount_volume(volume)
            .await
            .map_err(|e| platform_failure("unmount", &e))?;

        debug!(%volume, "unmounted volume");
        self.mounted.retain(|_, mounted| *mounted != volume);
        self.emit_image(ImageEvent::Unmounted { volume });
        Ok(())
    }

    /// Images mounted through this lifecycle and not yet unmounted
    #[must_use]
    pub fn mounted(&self) -> &HashMap<PathBuf, VolumeId> {
        &self.mounted
    }
}

fn platform_failure(operation: &str, err: &PlatformError) -> UnpackError {
    UnpackError::unexpected(operation, err.to_string())
}
