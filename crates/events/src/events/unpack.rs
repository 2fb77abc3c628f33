use std::path::PathBuf;

use appxtract_types::ContainerKind;
use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Extraction events, one item at a time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnpackEvent {
    /// A container is about to be opened
    ItemStarted { source: PathBuf, kind: ContainerKind },

    /// A container was extracted; `folders` lists every folder it produced
    ItemExtracted {
        source: PathBuf,
        full_name: String,
        folders: Vec<PathBuf>,
    },

    /// An item failed and was recorded in the batch outcome
    ItemFailed {
        source: PathBuf,
        failure: FailureContext,
    },

    /// A directory entry that is not a regular file
    ItemSkipped { path: PathBuf },

    /// The manifest declares packages that this extraction does not provide
    DependenciesDeclared {
        full_name: String,
        dependencies: Vec<String>,
    },

    /// ACL remediation finished for one item
    AclsApplied { folders: Vec<PathBuf> },

    /// A batch run finished
    BatchCompleted {
        extracted: usize,
        skipped: usize,
        failed: usize,
    },
}
