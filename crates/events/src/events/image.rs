use std::path::PathBuf;

use appxtract_types::{ImageKind, VolumeId};
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Staging, image build and mount events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageEvent {
    StagingCreated { path: PathBuf },

    StagingRemoved { path: PathBuf },

    /// Removing the staging tree failed; the build result is unaffected
    StagingCleanupFailed { path: PathBuf, message: String },

    BuildStarted { output: PathBuf, kind: ImageKind },

    BuildCompleted { output: PathBuf },

    BuildFailed {
        output: PathBuf,
        failure: FailureContext,
    },

    Mounted { image: PathBuf, volume: VolumeId },

    Unmounted { volume: VolumeId },
}
