//! In-memory capabilities shared by the integration tests

#![allow(dead_code)]

use appxtract_errors::PlatformError;
use appxtract_platform::{
    AclApplier, BundleReader, ContainerReader, ImageBuilder, ImageMounter, PackageReader,
};
use appxtract_types::{
    ApplicabilityMode, Architecture, BundleMember, ImageSpec, MemberType, PackageIdentity,
    ValidationMode, VolumeId,
};
use appxtract_unpack::{BatchExtractor, ContainerHandle, Extractor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const PUBLISHER: &str = "CN=Contoso, O=Contoso, C=US";

pub fn identity(name: &str, architecture: Architecture) -> PackageIdentity {
    PackageIdentity::new(name, "1.0.0.0", architecture, PUBLISHER)
}

/// What the fake reader returns for one container file name
#[derive(Clone, Debug)]
pub enum FakeContainer {
    Package {
        identity: PackageIdentity,
        dependencies: Vec<String>,
    },
    Bundle {
        identity: PackageIdentity,
        members: Vec<BundleMember>,
        applicable: Vec<String>,
        dependencies: HashMap<String, Vec<String>>,
    },
    /// Opening fails as a corrupt or unsigned container
    Corrupt { code: Option<i32> },
}

impl FakeContainer {
    pub fn package(name: &str) -> Self {
        Self::Package {
            identity: identity(name, Architecture::X64),
            dependencies: Vec::new(),
        }
    }

    pub fn package_with_dependencies(name: &str, dependencies: &[&str]) -> Self {
        Self::Package {
            identity: identity(name, Architecture::X64),
            dependencies: dependencies.iter().map(ToString::to_string).collect(),
        }
    }

    /// Bundle with `Main.appx`, `Lang-en.appx` and `Lang-fr.appx`, where
    /// `applicable` is the reader's selection in its own order
    pub fn suite_bundle(applicable: &[&str]) -> Self {
        let main = identity("Suite", Architecture::X64);
        let members = vec![
            BundleMember::new("Main.appx", main.clone(), MemberType::Application),
            BundleMember::new(
                "Lang-en.appx",
                main.clone().with_resource_id("split.language-en"),
                MemberType::Resource,
            )
            .with_languages(["en"]),
            BundleMember::new(
                "Lang-fr.appx",
                main.with_resource_id("split.language-fr"),
                MemberType::Resource,
            )
            .with_languages(["fr"]),
        ];
        Self::Bundle {
            identity: identity("Suite", Architecture::Neutral).into_bundle(),
            members,
            applicable: applicable.iter().map(ToString::to_string).collect(),
            dependencies: HashMap::new(),
        }
    }
}

/// Log of everything the fake capabilities were asked to do
#[derive(Debug, Default)]
pub struct CallLog {
    pub opened: Vec<(PathBuf, ValidationMode)>,
    pub written: Vec<PathBuf>,
    pub acl_calls: Vec<Vec<PathBuf>>,
}

#[derive(Clone, Default)]
pub struct FakeReader {
    containers: Arc<Mutex<HashMap<String, FakeContainer>>>,
    pub log: Arc<Mutex<CallLog>>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, file_name: &str, container: FakeContainer) -> Self {
        self.containers
            .lock()
            .unwrap()
            .insert(file_name.to_string(), container);
        self
    }

    fn lookup(&self, path: &Path) -> Result<FakeContainer, PlatformError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.containers
            .lock()
            .unwrap()
            .get(&file_name)
            .cloned()
            .ok_or_else(|| PlatformError::ArchiveReadFailed {
                message: format!("no fake container named {file_name}"),
            })
    }
}

#[async_trait]
impl ContainerReader for FakeReader {
    async fn open_package(
        &self,
        path: &Path,
        validation: ValidationMode,
    ) -> Result<Box<dyn PackageReader>, PlatformError> {
        self.log
            .lock()
            .unwrap()
            .opened
            .push((path.to_path_buf(), validation));
        match self.lookup(path)? {
            FakeContainer::Package {
                identity,
                dependencies,
            } => Ok(Box::new(FakePackage {
                identity,
                dependencies,
                log: Arc::clone(&self.log),
            })),
            FakeContainer::Corrupt { code } => Err(corrupt(code)),
            FakeContainer::Bundle { .. } => Err(PlatformError::ManifestParseFailed {
                message: "expected a package manifest".into(),
            }),
        }
    }

    async fn open_bundle(
        &self,
        path: &Path,
        validation: ValidationMode,
        _applicability: &ApplicabilityMode,
    ) -> Result<Box<dyn BundleReader>, PlatformError> {
        self.log
            .lock()
            .unwrap()
            .opened
            .push((path.to_path_buf(), validation));
        match self.lookup(path)? {
            FakeContainer::Bundle {
                identity,
                members,
                applicable,
                dependencies,
            } => Ok(Box::new(FakeBundle {
                identity,
                members,
                applicable,
                dependencies,
                log: Arc::clone(&self.log),
            })),
            FakeContainer::Corrupt { code } => Err(corrupt(code)),
            FakeContainer::Package { .. } => Err(PlatformError::ManifestParseFailed {
                message: "expected a bundle manifest".into(),
            }),
        }
    }
}

fn corrupt(code: Option<i32>) -> PlatformError {
    match code {
        Some(code) => PlatformError::ProcessExecutionFailed {
            command: "reader".into(),
            exit_code: Some(code),
            message: "signature check failed".into(),
        },
        None => PlatformError::ArchiveReadFailed {
            message: "invalid central directory".into(),
        },
    }
}

fn write_folder(log: &Mutex<CallLog>, folder: PathBuf) -> Result<(), PlatformError> {
    std::fs::create_dir_all(&folder).map_err(|e| PlatformError::FilesystemOperationFailed {
        operation: "create folder".into(),
        message: e.to_string(),
    })?;
    std::fs::write(folder.join("AppxManifest.xml"), b"<Package/>").map_err(|e| {
        PlatformError::FilesystemOperationFailed {
            operation: "write manifest".into(),
            message: e.to_string(),
        }
    })?;
    log.lock().unwrap().written.push(folder);
    Ok(())
}

struct FakePackage {
    identity: PackageIdentity,
    dependencies: Vec<String>,
    log: Arc<Mutex<CallLog>>,
}

#[async_trait]
impl PackageReader for FakePackage {
    fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    async fn extract_all(&self, destination: &Path) -> Result<(), PlatformError> {
        write_folder(&self.log, destination.join(self.identity.full_name()))
    }
}

struct FakeBundle {
    identity: PackageIdentity,
    members: Vec<BundleMember>,
    applicable: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
    log: Arc<Mutex<CallLog>>,
}

#[async_trait]
impl BundleReader for FakeBundle {
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
        self.dependencies
            .get(file_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    async fn extract_all(&self, destination: &Path) -> Result<(), PlatformError> {
        write_folder(&self.log, destination.join(self.identity.full_name()))?;
        for file_name in &self.applicable {
            if let Some(member) = self.members.iter().find(|m| &m.file_name == file_name) {
                write_folder(&self.log, destination.join(member.identity.full_name()))?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeAcl {
    pub log: Arc<Mutex<CallLog>>,
    pub fail: bool,
}

#[async_trait]
impl AclApplier for FakeAcl {
    async fn apply_acls(&self, folders: &[PathBuf]) -> Result<(), PlatformError> {
        self.log.lock().unwrap().acl_calls.push(folders.to_vec());
        if self.fail {
            return Err(PlatformError::ProcessExecutionFailed {
                command: "acl".into(),
                exit_code: Some(5),
                message: "access denied".into(),
            });
        }
        Ok(())
    }
}

/// Extractor wired to `reader` with an ACL fake sharing its log
pub fn extractor(reader: &FakeReader, acl_fails: bool) -> Extractor {
    let acl = FakeAcl {
        log: Arc::clone(&reader.log),
        fail: acl_fails,
    };
    Extractor::new(Arc::new(reader.clone()), Arc::new(acl))
}

pub fn batch(reader: &FakeReader) -> BatchExtractor {
    BatchExtractor::new(ContainerHandle::default(), extractor(reader, false))
}

/// Create empty files so the batch sees regular files with these names
pub fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), b"").unwrap();
    }
}

/// Records the staged tree it was handed; optionally fails
#[derive(Clone, Default)]
pub struct FakeImageBuilder {
    pub fail: bool,
    pub seen: Arc<Mutex<Vec<(PathBuf, Vec<String>)>>>,
}

#[async_trait]
impl ImageBuilder for FakeImageBuilder {
    async fn create_image(
        &self,
        staging_root: &Path,
        _spec: &ImageSpec,
    ) -> Result<(), PlatformError> {
        let mut names: Vec<String> = std::fs::read_dir(staging_root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        self.seen
            .lock()
            .unwrap()
            .push((staging_root.to_path_buf(), names));
        if self.fail {
            return Err(PlatformError::ProcessExecutionFailed {
                command: "image-tool".into(),
                exit_code: Some(1),
                message: "disk full".into(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMounter {
    pub volumes: Mutex<HashMap<PathBuf, VolumeId>>,
    pub unmounted: Mutex<Vec<VolumeId>>,
    pub lookups: Mutex<Vec<PathBuf>>,
    /// Volume lookups fail the way an unconfigured query tool does
    pub lookup_fails: bool,
}

#[async_trait]
impl ImageMounter for FakeMounter {
    async fn mount_image(&self, path: &Path, _read_only: bool) -> Result<VolumeId, PlatformError> {
        let volume = VolumeId::random();
        self.volumes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), volume);
        Ok(volume)
    }

    async fn unmount_volume(&self, volume: VolumeId) -> Result<(), PlatformError> {
        let mut volumes = self.volumes.lock().unwrap();
        let before = volumes.len();
        volumes.retain(|_, v| *v != volume);
        if volumes.len() == before {
            return Err(PlatformError::ProcessExecutionFailed {
                command: "unmount".into(),
                exit_code: Some(2),
                message: format!("no volume {volume}"),
            });
        }
        self.unmounted.lock().unwrap().push(volume);
        Ok(())
    }

    async fn volume_for_image(&self, path: &Path) -> Result<Option<VolumeId>, PlatformError> {
        self.lookups.lock().unwrap().push(path.to_path_buf());
        if self.lookup_fails {
            return Err(PlatformError::CommandNotConfigured {
                capability: "volume_query_command".into(),
            });
        }
        Ok(self.volumes.lock().unwrap().get(path).copied())
    }
}
