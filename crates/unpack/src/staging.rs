//! Staged extraction into a throwaway directory followed by an image build
//!
//! Images cannot be extracted into directly. The stager extracts into a
//! uniquely named directory under the staging root, hands that tree to an
//! image builder, and removes the directory on every exit path.

use crate::batch::{BatchExtractor, ExtractionOutcome};
use crate::extract::ExtractOptions;
use appxtract_config::ImageConfig;
use appxtract_errors::UnpackError;
use appxtract_events::{EventEmitter, EventSender, FailureContext, ImageEvent};
use appxtract_platform::ImageBuilder;
use appxtract_types::{ImageKind, ImageSpec};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// RAII guard for automatic staging directory cleanup
///
/// Dropping the guard removes the directory synchronously, so the tree is
/// gone even when the owning future is dropped or unwinds from a panic.
#[derive(Debug)]
pub struct StagingGuard {
    path: Option<PathBuf>,
}

impl StagingGuard {
    /// Create a fresh `root/<uuid>` directory
    ///
    /// # Errors
    ///
    /// Returns `StagingDirectoryCreateFailed` if the directory cannot be
    /// created. Creation is never retried.
    pub async fn create(root: &Path) -> Result<Self, UnpackError> {
        let path = root.join(Uuid::new_v4().to_string());
        fs::create_dir(&path)
            .await
            .map_err(|e| UnpackError::StagingDirectoryCreateFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { path: Some(path) })
    }

    /// Get the staging directory, if it has not been cleaned up yet
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Remove the staging directory now
    ///
    /// The guard gives up the path before removing it, so a failed removal
    /// is not retried on drop.
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` if the tree could not be removed.
    pub async fn cleanup(mut self) -> Result<PathBuf, UnpackError> {
        let Some(path) = self.path.take() else {
            return Err(UnpackError::unexpected(
                "staging cleanup",
                "staging directory already removed",
            ));
        };
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(path),
            Err(e) => Err(UnpackError::unexpected(
                "staging cleanup",
                format!("{}: {e}", path.display()),
            )),
        }
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            // Best effort cleanup - ignore errors in destructor
            let _ = std::fs::remove_dir_all(&path);
        }
    }
}

/// A staged image build that succeeded
#[derive(Clone, Debug, Default)]
pub struct StagedImage {
    /// What the extraction step produced, including skipped and failed items
    pub outcome: ExtractionOutcome,
    /// Set when the staging directory could not be removed
    pub cleanup_error: Option<String>,
}

/// Parameters of an image build, checked before anything is extracted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRequest {
    pub spec: ImageSpec,
    pub apply_acls: bool,
}

impl ImageRequest {
    #[must_use]
    pub fn new(spec: ImageSpec, apply_acls: bool) -> Self {
        Self { spec, apply_acls }
    }

    /// Check the request against the image limits
    ///
    /// # Errors
    ///
    /// Returns `InvalidImageRequest` if:
    /// - a CIM request has no root directory, asks for ACLs, or has an
    ///   output name without the `.cim` extension
    /// - a VHD/VHDX request has no size, or a size outside the limits
    pub fn validate(&self, limits: &ImageConfig) -> Result<(), UnpackError> {
        match self.spec.kind {
            ImageKind::Cim => {
                if self
                    .spec
                    .root_directory
                    .as_deref()
                    .is_none_or(|root| root.trim().is_empty())
                {
                    return Err(invalid_request(
                        "creating a CIM image requires a root directory",
                    ));
                }
                if self.apply_acls {
                    return Err(invalid_request("applying ACLs is not applicable for CIM images"));
                }
                let has_cim_extension = self
                    .spec
                    .output
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("cim"));
                if !has_cim_extension {
                    return Err(invalid_request(format!(
                        "invalid CIM file name: {}",
                        self.spec.output.display()
                    )));
                }
            }
            ImageKind::Vhd | ImageKind::Vhdx => {
                let Some(size) = self.spec.size_mb else {
                    return Err(invalid_request(format!(
                        "creating a {} image requires a size",
                        self.spec.kind
                    )));
                };
                if size < limits.min_size_mb || size > limits.max_size_mb {
                    return Err(invalid_request(format!(
                        "invalid image size {size} MB: must be at least {} MB and at most {} MB",
                        limits.min_size_mb, limits.max_size_mb
                    )));
                }
            }
        }
        Ok(())
    }
}

fn invalid_request(message: impl Into<String>) -> UnpackError {
    UnpackError::InvalidImageRequest {
        message: message.into(),
    }
}

/// Runs a batch into a staging directory and builds an image from it
#[derive(Clone, Debug)]
pub struct VirtualDiskStager {
    batch: BatchExtractor,
    staging_root: PathBuf,
}

impl EventEmitter for VirtualDiskStager {
    fn event_sender(&self) -> Option<&EventSender> {
        self.batch.event_sender()
    }
}

impl VirtualDiskStager {
    #[must_use]
    pub fn new(batch: BatchExtractor, staging_root: impl Into<PathBuf>) -> Self {
        Self {
            batch,
            staging_root: staging_root.into(),
        }
    }

    #[must_use]
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Extract `source` into a fresh staging directory and run `build` on it
    ///
    /// The staging directory is removed on every exit path. An extraction
    /// error is returned as-is without running `build`; otherwise the result
    /// of `build` is returned. A failed removal is reported as a warning and
    /// never replaces that result.
    ///
    /// # Errors
    ///
    /// Returns `StagingDirectoryCreateFailed` if the staging directory
    /// cannot be created, the batch error if extraction itself fails, or
    /// whatever `build` returns.
    pub async fn stage_and_build<F, Fut>(
        &self,
        source: &Path,
        options: &ExtractOptions,
        build: F,
    ) -> Result<StagedImage, UnpackError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<(), UnpackError>>,
    {
        let guard = StagingGuard::create(&self.staging_root).await?;
        let staging = guard
            .path()
            .map(Path::to_path_buf)
            .ok_or_else(|| UnpackError::unexpected("staging", "staging directory missing"))?;
        debug!(staging = %staging.display(), "created staging directory");
        self.emit_image(ImageEvent::StagingCreated {
            path: staging.clone(),
        });

        let result = match self.batch.run(source, &staging, options).await {
            Ok(outcome) => build(staging.clone()).await.map(|()| outcome),
            Err(err) => Err(err),
        };

        let cleanup_error = match guard.cleanup().await {
            Ok(path) => {
                self.emit_image(ImageEvent::StagingRemoved { path });
                None
            }
            Err(err) => {
                let message = err.to_string();
                warn!(staging = %staging.display(), error = %message, "failed to remove staging directory");
                self.emit_image(ImageEvent::StagingCleanupFailed {
                    path: staging,
                    message: message.clone(),
                });
                Some(message)
            }
        };

        result.map(|outcome| StagedImage {
            outcome,
            cleanup_error,
        })
    }

    /// Validate `request`, then stage `source` and build the image with `builder`
    ///
    /// # Errors
    ///
    /// Returns `InvalidImageRequest` before touching the filesystem if the
    /// request is invalid, `ImageBuildFailed` if the builder fails, or any
    /// error from [`Self::stage_and_build`].
    pub async fn build_image(
        &self,
        source: &Path,
        options: &ExtractOptions,
        request: &ImageRequest,
        limits: &ImageConfig,
        builder: &dyn ImageBuilder,
    ) -> Result<StagedImage, UnpackError> {
        request.validate(limits)?;
        let spec = &request.spec;

        self.stage_and_build(source, options, |staging| async move {
            self.emit_image(ImageEvent::BuildStarted {
                output: spec.output.clone(),
                kind: spec.kind,
            });
            match builder.create_image(&staging, spec).await {
                Ok(()) => {
                    self.emit_image(ImageEvent::BuildCompleted {
                        output: spec.output.clone(),
                    });
                    Ok(())
                }
                Err(e) => {
                    let err = UnpackError::ImageBuildFailed {
                        output: spec.output.display().to_string(),
                        message: e.to_string(),
                    };
                    self.emit_image(ImageEvent::BuildFailed {
                        output: spec.output.clone(),
                        failure: FailureContext::from_error(&err),
                    });
                    Err(err)
                }
            }
        })
        .await
    }
}
