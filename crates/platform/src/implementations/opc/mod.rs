//! OPC container adapter (ZIP archives)
//!
//! Packages and bundles are ZIP archives. Manifests are parsed when a
//! container is opened; extraction re-opens the archive so that no file
//! handle outlives the call that needed it. All archive work runs on the
//! blocking pool.

mod applicability;
mod entries;
mod manifest;

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use appxtract_errors::PlatformError;
use appxtract_types::{ApplicabilityMode, BundleMember, PackageIdentity, ValidationMode};
use tokio::task;
use zip::ZipArchive;

use crate::container::{BundleReader, ContainerReader, PackageReader};
use entries::{entry_index, read_entry, write_entries, SIGNATURE};
use manifest::{
    parse_bundle_manifest, parse_package_manifest, DeclaredPackage, PackageManifest,
    BUNDLE_MANIFEST, PACKAGE_MANIFEST,
};

/// Reads `.appx`/`.msix` packages and `.appxbundle`/`.msixbundle` bundles
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipContainerReader;

impl ZipContainerReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContainerReader for ZipContainerReader {
    async fn open_package(
        &self,
        path: &Path,
        validation: ValidationMode,
    ) -> Result<Box<dyn PackageReader>, PlatformError> {
        let owned = path.to_path_buf();
        let manifest = blocking(move || open_package_blocking(&owned, validation)).await?;
        tracing::debug!(
            path = %path.display(),
            full_name = %manifest.identity.full_name(),
            "opened package"
        );
        Ok(Box::new(ZipPackageReader {
            path: path.to_path_buf(),
            manifest,
        }))
    }

    async fn open_bundle(
        &self,
        path: &Path,
        validation: ValidationMode,
        applicability: &ApplicabilityMode,
    ) -> Result<Box<dyn BundleReader>, PlatformError> {
        let owned = path.to_path_buf();
        let mode = applicability.clone();
        let reader = blocking(move || open_bundle_blocking(&owned, validation, &mode)).await?;
        tracing::debug!(
            path = %path.display(),
            full_name = %reader.identity.full_name(),
            members = reader.members.len(),
            applicable = reader.applicable.len(),
            "opened bundle"
        );
        Ok(Box::new(reader))
    }
}

struct ZipPackageReader {
    path: PathBuf,
    manifest: PackageManifest,
}

#[async_trait]
impl PackageReader for ZipPackageReader {
    fn identity(&self) -> &PackageIdentity {
        &self.manifest.identity
    }

    fn dependencies(&self) -> &[String] {
        &self.manifest.dependencies
    }

    async fn extract_all(&self, destination: &Path) -> Result<(), PlatformError> {
        let source = self.path.clone();
        let target = destination.join(self.manifest.identity.full_name());
        let written = blocking(move || {
            let mut archive = open_archive(&source)?;
            write_entries(&mut archive, &target, |_| true)
        })
        .await?;
        tracing::debug!(path = %self.path.display(), files = written, "extracted package");
        Ok(())
    }
}

/// Where a payload's bytes live
#[derive(Debug, Clone)]
enum PayloadSource {
    Embedded,
    /// Flat bundles keep payloads next to the bundle file
    Sibling(PathBuf),
}

#[derive(Debug, Clone)]
struct Payload {
    source: PayloadSource,
    full_name: String,
    dependencies: Vec<String>,
}

#[derive(Debug, Clone)]
struct ZipBundleReader {
    path: PathBuf,
    identity: PackageIdentity,
    members: Vec<BundleMember>,
    applicable: Vec<String>,
    payloads: HashMap<String, Payload>,
}

#[async_trait]
impl BundleReader for ZipBundleReader {
    fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    fn members(&self) -> &[BundleMember] {
        &self.members
    }

    fn applicable_payloads(&self) -> &[String] {
        &self.applicable
    }

    fn payload_dependencies(&self, file_name: &str) -> &[String] {
        self.payloads
            .get(file_name)
            .map(|p| p.dependencies.as_slice())
            .unwrap_or_default()
    }

    async fn extract_all(&self, destination: &Path) -> Result<(), PlatformError> {
        let bundle = self.clone();
        let destination = destination.to_path_buf();
        blocking(move || bundle.extract_blocking(&destination)).await
    }
}

impl ZipBundleReader {
    fn extract_blocking(&self, destination: &Path) -> Result<(), PlatformError> {
        let mut archive = open_archive(&self.path)?;
        let index = entry_index(&mut archive)?;

        let declared: HashSet<String> = self
            .members
            .iter()
            .map(|m| m.file_name.to_ascii_lowercase())
            .collect();
        let footprint = write_entries(
            &mut archive,
            &destination.join(self.identity.full_name()),
            |name| !declared.contains(&name.to_ascii_lowercase()),
        )?;
        tracing::debug!(path = %self.path.display(), files = footprint, "extracted bundle footprint");

        for file_name in &self.applicable {
            let payload = self.payloads.get(file_name).ok_or_else(|| {
                PlatformError::MissingEntry {
                    path: self.path.display().to_string(),
                    entry: file_name.clone(),
                }
            })?;
            let bytes = match &payload.source {
                PayloadSource::Embedded => read_entry(&mut archive, &index, file_name)?
                    .ok_or_else(|| PlatformError::MissingEntry {
                        path: self.path.display().to_string(),
                        entry: file_name.clone(),
                    })?,
                PayloadSource::Sibling(path) => read_sibling(path)?,
            };
            let mut inner = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
                PlatformError::ArchiveReadFailed {
                    message: format!("{file_name}: {e}"),
                }
            })?;
            let written =
                write_entries(&mut inner, &destination.join(&payload.full_name), |_| true)?;
            tracing::debug!(payload = %file_name, files = written, "extracted payload");
        }
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> Result<T, PlatformError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PlatformError> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| PlatformError::FilesystemOperationFailed {
            operation: "container task".to_string(),
            message: format!("task join error: {e}"),
        })?
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, PlatformError> {
    let file = File::open(path).map_err(|e| PlatformError::ArchiveReadFailed {
        message: format!("failed to open {}: {e}", path.display()),
    })?;
    ZipArchive::new(file).map_err(|e| PlatformError::ArchiveReadFailed {
        message: format!("{}: {e}", path.display()),
    })
}

fn read_sibling(path: &Path) -> Result<Vec<u8>, PlatformError> {
    std::fs::read(path).map_err(|_| PlatformError::MissingEntry {
        path: path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        entry: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })
}

fn check_signature(
    path: &Path,
    index: &HashMap<String, usize>,
    validation: ValidationMode,
) -> Result<(), PlatformError> {
    if validation.requires_signature() && !index.contains_key(&SIGNATURE.to_ascii_lowercase()) {
        return Err(PlatformError::MissingEntry {
            path: path.display().to_string(),
            entry: SIGNATURE.to_string(),
        });
    }
    Ok(())
}

fn required_entry(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
    index: &HashMap<String, usize>,
    path: &str,
    name: &str,
) -> Result<Vec<u8>, PlatformError> {
    read_entry(archive, index, name)?.ok_or_else(|| PlatformError::MissingEntry {
        path: path.to_string(),
        entry: name.to_string(),
    })
}

fn open_package_blocking(
    path: &Path,
    validation: ValidationMode,
) -> Result<PackageManifest, PlatformError> {
    let mut archive = open_archive(path)?;
    let index = entry_index(&mut archive)?;
    check_signature(path, &index, validation)?;
    let bytes = required_entry(
        &mut archive,
        &index,
        &path.display().to_string(),
        PACKAGE_MANIFEST,
    )?;
    parse_package_manifest(&bytes)
}

fn open_bundle_blocking(
    path: &Path,
    validation: ValidationMode,
    applicability: &ApplicabilityMode,
) -> Result<ZipBundleReader, PlatformError> {
    let mut archive = open_archive(path)?;
    let index = entry_index(&mut archive)?;
    check_signature(path, &index, validation)?;
    let bytes = required_entry(
        &mut archive,
        &index,
        &path.display().to_string(),
        BUNDLE_MANIFEST,
    )?;
    let manifest = parse_bundle_manifest(&bytes)?;

    let mut payloads = HashMap::with_capacity(manifest.packages.len());
    for declared in &manifest.packages {
        let file_name = &declared.member.file_name;
        let (bytes, source) = if index.contains_key(&file_name.to_ascii_lowercase()) {
            let bytes = required_entry(&mut archive, &index, &path.display().to_string(), file_name)?;
            (bytes, PayloadSource::Embedded)
        } else if declared.offset == 0 {
            let sibling = path.with_file_name(file_name);
            (read_sibling(&sibling)?, PayloadSource::Sibling(sibling))
        } else {
            return Err(PlatformError::MissingEntry {
                path: path.display().to_string(),
                entry: file_name.clone(),
            });
        };
        let inner = inspect_payload(declared, bytes)?;
        payloads.insert(
            file_name.clone(),
            Payload {
                source,
                full_name: declared.member.identity.full_name(),
                dependencies: inner.dependencies,
            },
        );
    }

    let applicable = applicability::select_applicable(&manifest.packages, applicability);
    Ok(ZipBundleReader {
        path: path.to_path_buf(),
        identity: manifest.identity,
        members: manifest.packages.into_iter().map(|p| p.member).collect(),
        applicable,
        payloads,
    })
}

/// Parse a payload's own manifest and check it agrees with the bundle row
fn inspect_payload(
    declared: &DeclaredPackage,
    bytes: Vec<u8>,
) -> Result<PackageManifest, PlatformError> {
    let file_name = &declared.member.file_name;
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| PlatformError::ArchiveReadFailed {
            message: format!("{file_name}: {e}"),
        })?;
    let index = entry_index(&mut archive)?;
    let manifest_bytes = required_entry(&mut archive, &index, file_name, PACKAGE_MANIFEST)?;
    let inner = parse_package_manifest(&manifest_bytes)?;

    let expected = &declared.member.identity;
    let actual = &inner.identity;
    let mismatch = if actual.name != expected.name {
        Some("name")
    } else if actual.publisher != expected.publisher {
        Some("publisher")
    } else if actual.version != expected.version {
        Some("version")
    } else if actual.architecture != expected.architecture {
        Some("architecture")
    } else {
        None
    };
    if let Some(field) = mismatch {
        return Err(PlatformError::ManifestParseFailed {
            message: format!("{file_name}: bundle and package manifests disagree on {field}"),
        });
    }
    Ok(inner)
}
