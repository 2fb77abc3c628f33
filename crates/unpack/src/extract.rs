//! Single container extraction

use crate::identity::IdentityResolver;
use appxtract_errors::UnpackError;
use appxtract_events::{EventEmitter, EventSender, UnpackEvent};
use appxtract_platform::{AclApplier, ContainerReader};
use appxtract_types::{ApplicabilityMode, ContainerKind, ValidationMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-run extraction options
#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    /// Hand every produced folder to the ACL applier after extraction
    pub apply_acls: bool,
    pub validation: ValidationMode,
    /// Only consulted for bundles
    pub applicability: ApplicabilityMode,
}

impl ExtractOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable ACL remediation
    #[must_use]
    pub fn with_acls(mut self, apply_acls: bool) -> Self {
        self.apply_acls = apply_acls;
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }

    #[must_use]
    pub fn with_applicability(mut self, applicability: ApplicabilityMode) -> Self {
        self.applicability = applicability;
        self
    }
}

/// A container that was extracted successfully
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedItem {
    pub source: PathBuf,
    pub kind: ContainerKind,
    /// Full name of the package, or of the bundle itself
    pub full_name: String,
    /// Every folder the extraction produced; this is the exact list handed
    /// to ACL remediation
    pub folders: Vec<PathBuf>,
    /// Declared dependencies, reported as advisories only
    pub dependencies: Vec<String>,
}

/// Output folders claimed by earlier items of the same batch
#[derive(Debug, Default)]
pub(crate) struct FolderClaims {
    claimed: HashMap<PathBuf, PathBuf>,
}

impl FolderClaims {
    /// Claim every folder for `source`, or fail without claiming any
    fn claim(
        &mut self,
        source: &Path,
        destination: &Path,
        folders: &[PathBuf],
    ) -> Result<(), UnpackError> {
        for folder in folders {
            if let Some(owner) = self.claimed.get(folder) {
                if owner != source {
                    let full_name = folder
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    return Err(UnpackError::IdentityCollision {
                        full_name,
                        destination: destination.display().to_string(),
                    });
                }
            }
        }
        for folder in folders {
            self.claimed.insert(folder.clone(), source.to_path_buf());
        }
        Ok(())
    }
}

/// Extracts one package or bundle through the container reader capability
#[derive(Clone)]
pub struct Extractor {
    reader: Arc<dyn ContainerReader>,
    acl: Arc<dyn AclApplier>,
    event_sender: Option<EventSender>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("has_event_sender", &self.event_sender.is_some())
            .finish_non_exhaustive()
    }
}

impl EventEmitter for Extractor {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl Extractor {
    #[must_use]
    pub fn new(reader: Arc<dyn ContainerReader>, acl: Arc<dyn AclApplier>) -> Self {
        Self {
            reader,
            acl,
            event_sender: None,
        }
    }

    /// Set the event sender for advisories and progress
    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Extract one package to `destination/FullName`
    ///
    /// # Errors
    ///
    /// Returns `ContainerCorruptOrUnsigned` if the reader rejects the
    /// container, or `AclApplicationFailed` if remediation fails after a
    /// successful extraction. Extracted files are not rolled back.
    pub async fn extract_package(
        &self,
        source: &Path,
        destination: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractedItem, UnpackError> {
        self.extract_package_claimed(source, destination, options, &mut FolderClaims::default())
            .await
    }

    /// Extract one bundle: its footprint plus every applicable payload
    ///
    /// Applicable payloads are joined against the member table whether or
    /// not ACLs were requested. The joined folders feed collision checks and
    /// `ExtractedItem::folders`, so a payload the manifest does not declare
    /// fails the bundle even when no remediation runs.
    ///
    /// # Errors
    ///
    /// Returns `ContainerCorruptOrUnsigned` if the reader rejects the
    /// bundle or one of its payloads, `UndeclaredPayload` if an applicable
    /// payload has no manifest row, or `AclApplicationFailed` if
    /// remediation fails.
    pub async fn extract_bundle(
        &self,
        source: &Path,
        destination: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractedItem, UnpackError> {
        self.extract_bundle_claimed(source, destination, options, &mut FolderClaims::default())
            .await
    }

    pub(crate) async fn extract_package_claimed(
        &self,
        source: &Path,
        destination: &Path,
        options: &ExtractOptions,
        claims: &mut FolderClaims,
    ) -> Result<ExtractedItem, UnpackError> {
        let source_display = source.display().to_string();
        self.emit_unpack(UnpackEvent::ItemStarted {
            source: source.to_path_buf(),
            kind: ContainerKind::Package,
        });

        let package = self
            .reader
            .open_package(source, options.validation)
            .await
            .map_err(|e| e.into_container_error(&source_display))?;

        let full_name = package.identity().full_name();
        let folders = vec![destination.join(&full_name)];
        claims.claim(source, destination, &folders)?;

        debug!(source = %source_display, %full_name, "extracting package");
        package
            .extract_all(destination)
            .await
            .map_err(|e| e.into_container_error(&source_display))?;

        let dependencies = package.dependencies().to_vec();
        drop(package);

        self.report_dependencies(&full_name, &dependencies);
        self.finish(source, ContainerKind::Package, full_name, folders, dependencies, options)
            .await
    }

    pub(crate) async fn extract_bundle_claimed(
        &self,
        source: &Path,
        destination: &Path,
        options: &ExtractOptions,
        claims: &mut FolderClaims,
    ) -> Result<ExtractedItem, UnpackError> {
        let source_display = source.display().to_string();
        self.emit_unpack(UnpackEvent::ItemStarted {
            source: source.to_path_buf(),
            kind: ContainerKind::Bundle,
        });

        let bundle = self
            .reader
            .open_bundle(source, options.validation, &options.applicability)
            .await
            .map_err(|e| e.into_container_error(&source_display))?;

        let full_name = bundle.identity().full_name();
        let folders = IdentityResolver::new(bundle.members()).resolve(
            destination,
            &full_name,
            bundle.applicable_payloads(),
        )?;
        claims.claim(source, destination, &folders)?;

        debug!(
            source = %source_display,
            %full_name,
            payloads = bundle.applicable_payloads().len(),
            "extracting bundle"
        );
        bundle
            .extract_all(destination)
            .await
            .map_err(|e| e.into_container_error(&source_display))?;

        // Only the first application package's dependencies are reported.
        let dependencies = bundle
            .members()
            .iter()
            .find(|member| member.is_application())
            .map(|member| bundle.payload_dependencies(&member.file_name).to_vec())
            .unwrap_or_default();
        drop(bundle);

        self.report_dependencies(&full_name, &dependencies);
        self.finish(source, ContainerKind::Bundle, full_name, folders, dependencies, options)
            .await
    }

    /// Advisory only: dependencies never fail an extraction
    fn report_dependencies(&self, full_name: &str, dependencies: &[String]) {
        if dependencies.is_empty() {
            return;
        }
        warn!(
            %full_name,
            dependencies = %dependencies.join(", "),
            "package declares dependencies that are not extracted"
        );
        self.emit_unpack(UnpackEvent::DependenciesDeclared {
            full_name: full_name.to_string(),
            dependencies: dependencies.to_vec(),
        });
    }

    async fn finish(
        &self,
        source: &Path,
        kind: ContainerKind,
        full_name: String,
        folders: Vec<PathBuf>,
        dependencies: Vec<String>,
        options: &ExtractOptions,
    ) -> Result<ExtractedItem, UnpackError> {
        if options.apply_acls {
            self.acl
                .apply_acls(&folders)
                .await
                .map_err(|e| UnpackError::AclApplicationFailed {
                    folders: folders.len(),
                    message: e.to_string(),
                })?;
            self.emit_unpack(UnpackEvent::AclsApplied {
                folders: folders.clone(),
            });
        }

        self.emit_unpack(UnpackEvent::ItemExtracted {
            source: source.to_path_buf(),
            full_name: full_name.clone(),
            folders: folders.clone(),
        });

        Ok(ExtractedItem {
            source: source.to_path_buf(),
            kind,
            full_name,
            folders,
            dependencies,
        })
    }
}
