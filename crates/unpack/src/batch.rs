//! Batch extraction over a single file or a directory

use crate::container::ContainerHandle;
use crate::extract::{ExtractOptions, ExtractedItem, Extractor, FolderClaims};
use appxtract_errors::UnpackError;
use appxtract_events::{EventEmitter, EventSender, FailureContext, UnpackEvent};
use appxtract_types::ContainerKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Result of one batch run
///
/// A batch with failed items is still a successful run; callers decide
/// whether any recorded failure is fatal.
#[derive(Clone, Debug, Default)]
pub struct ExtractionOutcome {
    pub extracted: Vec<ExtractedItem>,
    /// Entries that were not containers, in enumeration order
    pub skipped: Vec<PathBuf>,
    /// Items that failed, in enumeration order
    pub failed: Vec<(PathBuf, UnpackError)>,
}

impl ExtractionOutcome {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No item failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

/// Runs the extractor over a source file or every file in a source directory
#[derive(Clone, Debug)]
pub struct BatchExtractor {
    handle: ContainerHandle,
    extractor: Extractor,
}

impl EventEmitter for BatchExtractor {
    fn event_sender(&self) -> Option<&EventSender> {
        self.extractor.event_sender()
    }
}

impl BatchExtractor {
    #[must_use]
    pub fn new(handle: ContainerHandle, extractor: Extractor) -> Self {
        Self { handle, extractor }
    }

    #[must_use]
    pub fn handle(&self) -> &ContainerHandle {
        &self.handle
    }

    /// Extract `source` into `destination`
    ///
    /// A file source is extracted on its own. A directory source has its
    /// immediate entries processed one at a time, sorted by path: entries
    /// that are not regular files, and files that are not containers, are
    /// skipped; containers are extracted with per-item failure isolation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSource` if `source` does not exist, cannot be read,
    /// or is neither a file nor a directory. Per-item problems never fail
    /// the run.
    pub async fn run(
        &self,
        source: &Path,
        destination: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractionOutcome, UnpackError> {
        let metadata = fs::metadata(source)
            .await
            .map_err(|e| invalid_source(source, &e.to_string()))?;

        let mut outcome = ExtractionOutcome::new();
        let mut claims = FolderClaims::default();

        if metadata.is_file() {
            debug!(source = %source.display(), "single-file extraction");
            if let Err(err) = self
                .extract_one(source, destination, options, &mut claims, &mut outcome)
                .await
            {
                self.record_failure(&mut outcome, source, err);
            }
        } else if metadata.is_dir() {
            debug!(source = %source.display(), "directory extraction");
            for (path, is_file) in list_entries(source).await? {
                if !is_file || self.handle.classify(&path) == ContainerKind::Unrecognized {
                    self.emit_unpack(UnpackEvent::ItemSkipped { path: path.clone() });
                    outcome.skipped.push(path);
                    continue;
                }

                if let Err(err) = self
                    .extract_one(&path, destination, options, &mut claims, &mut outcome)
                    .await
                {
                    self.record_failure(&mut outcome, &path, err);
                }
            }
        } else {
            return Err(invalid_source(source, "not a file or directory"));
        }

        self.emit_unpack(UnpackEvent::BatchCompleted {
            extracted: outcome.extracted.len(),
            skipped: outcome.skipped.len(),
            failed: outcome.failed.len(),
        });
        Ok(outcome)
    }

    async fn extract_one(
        &self,
        path: &Path,
        destination: &Path,
        options: &ExtractOptions,
        claims: &mut FolderClaims,
        outcome: &mut ExtractionOutcome,
    ) -> Result<(), UnpackError> {
        let item = match self.handle.classify(path) {
            ContainerKind::Package => {
                self.extractor
                    .extract_package_claimed(path, destination, options, claims)
                    .await?
            }
            ContainerKind::Bundle => {
                self.extractor
                    .extract_bundle_claimed(path, destination, options, claims)
                    .await?
            }
            ContainerKind::Unrecognized => {
                return Err(invalid_source(path, "unsupported container extension"));
            }
        };
        outcome.extracted.push(item);
        Ok(())
    }

    fn record_failure(&self, outcome: &mut ExtractionOutcome, path: &Path, err: UnpackError) {
        warn!(source = %path.display(), error = %err, "item failed");
        self.emit_unpack(UnpackEvent::ItemFailed {
            source: path.to_path_buf(),
            failure: FailureContext::from_error(&err),
        });
        outcome.failed.push((path.to_path_buf(), err));
    }
}

/// Immediate entries of `dir` with a regular-file flag, sorted by path
async fn list_entries(dir: &Path) -> Result<Vec<(PathBuf, bool)>, UnpackError> {
    let mut reader = fs::read_dir(dir)
        .await
        .map_err(|e| invalid_source(dir, &e.to_string()))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| invalid_source(dir, &e.to_string()))?
    {
        // Symlinks are not followed: only plain files count as items
        let is_file = entry
            .file_type()
            .await
            .is_ok_and(|file_type| file_type.is_file());
        entries.push((entry.path(), is_file));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn invalid_source(path: &Path, reason: &str) -> UnpackError {
    UnpackError::InvalidSource {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
