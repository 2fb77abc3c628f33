//! Adapters that delegate to externally configured tools

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use appxtract_config::{ToolCommand, ToolsConfig};
use appxtract_errors::PlatformError;
use appxtract_types::{ImageSpec, VolumeId};

use crate::acl::AclApplier;
use crate::image::{ImageBuilder, ImageMounter};
use crate::process::{execute, PlatformCommand};

fn configured<'a>(
    tool: Option<&'a ToolCommand>,
    capability: &str,
) -> Result<&'a ToolCommand, PlatformError> {
    tool.ok_or_else(|| PlatformError::CommandNotConfigured {
        capability: capability.to_string(),
    })
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Runs `tools.acl_command` once per folder
#[derive(Debug, Clone, Default)]
pub struct CommandAclApplier {
    command: Option<ToolCommand>,
}

impl CommandAclApplier {
    #[must_use]
    pub fn new(command: Option<ToolCommand>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl AclApplier for CommandAclApplier {
    async fn apply_acls(&self, folders: &[PathBuf]) -> Result<(), PlatformError> {
        let tool = configured(self.command.as_ref(), "acl_command")?;
        for folder in folders {
            let path = path_arg(folder);
            execute(&PlatformCommand::from_template(tool, &[("path", path.as_str())])).await?;
        }
        Ok(())
    }
}

/// Runs `tools.image_command`
#[derive(Debug, Clone, Default)]
pub struct CommandImageBuilder {
    command: Option<ToolCommand>,
}

impl CommandImageBuilder {
    #[must_use]
    pub fn new(command: Option<ToolCommand>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ImageBuilder for CommandImageBuilder {
    async fn create_image(
        &self,
        staging_root: &Path,
        spec: &ImageSpec,
    ) -> Result<(), PlatformError> {
        let tool = configured(self.command.as_ref(), "image_command")?;
        let staging = path_arg(staging_root);
        let output = path_arg(&spec.output);
        let root = spec.root_directory.clone().unwrap_or_default();
        let size = spec.size_mb.map(|s| s.to_string()).unwrap_or_default();
        let kind = spec.kind.to_string();
        let cmd = PlatformCommand::from_template(
            tool,
            &[
                ("staging", staging.as_str()),
                ("output", output.as_str()),
                ("root", root.as_str()),
                ("size_mb", size.as_str()),
                ("kind", kind.as_str()),
            ],
        );
        execute(&cmd).await?;
        Ok(())
    }
}

/// Runs the mount, unmount and volume query tools
#[derive(Debug, Clone, Default)]
pub struct CommandImageMounter {
    mount: Option<ToolCommand>,
    unmount: Option<ToolCommand>,
    query: Option<ToolCommand>,
}

impl CommandImageMounter {
    #[must_use]
    pub fn new(
        mount: Option<ToolCommand>,
        unmount: Option<ToolCommand>,
        query: Option<ToolCommand>,
    ) -> Self {
        Self {
            mount,
            unmount,
            query,
        }
    }

    /// Build from the `[tools]` configuration section
    #[must_use]
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(
            tools.mount_command.clone(),
            tools.unmount_command.clone(),
            tools.volume_query_command.clone(),
        )
    }
}

#[async_trait]
impl ImageMounter for CommandImageMounter {
    async fn mount_image(&self, path: &Path, read_only: bool) -> Result<VolumeId, PlatformError> {
        let tool = configured(self.mount.as_ref(), "mount_command")?;
        let image = path_arg(path);
        let read_only = read_only.to_string();
        let output = execute(&PlatformCommand::from_template(
            tool,
            &[("path", image.as_str()), ("read_only", read_only.as_str())],
        ))
        .await?;
        output.stdout_text().parse()
    }

    async fn unmount_volume(&self, volume: VolumeId) -> Result<(), PlatformError> {
        let tool = configured(self.unmount.as_ref(), "unmount_command")?;
        let volume = volume.to_string();
        execute(&PlatformCommand::from_template(tool, &[("volume", volume.as_str())])).await?;
        Ok(())
    }

    async fn volume_for_image(&self, path: &Path) -> Result<Option<VolumeId>, PlatformError> {
        let Some(tool) = self.query.as_ref() else {
            return Ok(None);
        };
        let image = path_arg(path);
        let output = execute(&PlatformCommand::from_template(tool, &[("path", image.as_str())])).await?;
        let text = output.stdout_text();
        if text.is_empty() {
            Ok(None)
        } else {
            text.parse().map(Some)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use appxtract_types::ImageKind;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", ["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_acl_applier_runs_per_folder() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("acl.log");
        let applier = CommandAclApplier::new(Some(sh(&format!(
            "echo {{path}} >> {}",
            log.display()
        ))));
        applier
            .apply_acls(&[PathBuf::from("/a/One"), PathBuf::from("/a/Two")])
            .await
            .unwrap();
        let logged = std::fs::read_to_string(&log).unwrap();
        assert_eq!(logged, "/a/One\n/a/Two\n");
    }

    #[tokio::test]
    async fn test_unconfigured_tool() {
        let applier = CommandAclApplier::default();
        assert!(matches!(
            applier.apply_acls(&[PathBuf::from("/a")]).await,
            Err(PlatformError::CommandNotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_image_builder_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");
        let builder = CommandImageBuilder::new(Some(sh(&format!(
            "echo {{kind}} {{root}} {{size_mb}} > {}",
            out.display()
        ))));
        let spec = ImageSpec {
            kind: ImageKind::Vhdx,
            output: dir.path().join("apps.vhdx"),
            root_directory: Some("apps".to_string()),
            size_mb: Some(100),
        };
        builder.create_image(dir.path(), &spec).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "vhdx apps 100\n");
    }

    #[tokio::test]
    async fn test_mounter_parses_volume() {
        let mounter = CommandImageMounter::new(
            Some(sh("echo '{6f1c2a4e-0a8b-4f4e-9b51-3f3e0c6d2a11}'")),
            Some(sh("test {volume} = 6f1c2a4e-0a8b-4f4e-9b51-3f3e0c6d2a11")),
            Some(sh("true")),
        );
        let volume = mounter
            .mount_image(Path::new("/images/apps.cim"), true)
            .await
            .unwrap();
        assert_eq!(volume.to_string(), "6f1c2a4e-0a8b-4f4e-9b51-3f3e0c6d2a11");
        mounter.unmount_volume(volume).await.unwrap();
        assert_eq!(
            mounter
                .volume_for_image(Path::new("/images/apps.cim"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_volume_query_without_tool() {
        let mounter = CommandImageMounter::default();
        assert_eq!(
            mounter.volume_for_image(Path::new("x.cim")).await.unwrap(),
            None
        );
    }
}
