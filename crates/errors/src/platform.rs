//! Capability adapter errors

use std::borrow::Cow;

use crate::{UnpackError, UserFacingError};
use thiserror::Error;

/// Errors raised by the adapters behind the container, ACL, image and mount capabilities
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("failed to read archive: {message}")]
    ArchiveReadFailed { message: String },

    #[error("failed to parse manifest: {message}")]
    ManifestParseFailed { message: String },

    #[error("required entry {entry} missing from {path}")]
    MissingEntry { path: String, entry: String },

    #[error("entry {entry} escapes the extraction root")]
    UnsafeEntryPath { entry: String },

    #[error("process execution failed: {command} - {message}")]
    ProcessExecutionFailed {
        command: String,
        exit_code: Option<i32>,
        message: String,
    },

    #[error("command not configured: {capability}")]
    CommandNotConfigured { capability: String },

    #[error("filesystem operation failed: {operation} - {message}")]
    FilesystemOperationFailed { operation: String, message: String },

    #[error("invalid volume id: {value}")]
    InvalidVolumeId { value: String },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CommandNotConfigured { .. } => {
                Some("Configure the external tool under [tools] in the configuration file.")
            }
            Self::InvalidVolumeId { .. } => {
                Some("Volume ids are GUIDs, e.g. 6f1c2a4e-0a8b-4f4e-9b51-3f3e0c6d2a11.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProcessExecutionFailed { .. } | Self::FilesystemOperationFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ArchiveReadFailed { .. } => "platform.archive_read_failed",
            Self::ManifestParseFailed { .. } => "platform.manifest_parse_failed",
            Self::MissingEntry { .. } => "platform.missing_entry",
            Self::UnsafeEntryPath { .. } => "platform.unsafe_entry_path",
            Self::ProcessExecutionFailed { .. } => "platform.process_failed",
            Self::CommandNotConfigured { .. } => "platform.command_not_configured",
            Self::FilesystemOperationFailed { .. } => "platform.filesystem_failed",
            Self::InvalidVolumeId { .. } => "platform.invalid_volume_id",
        };
        Some(code)
    }
}

impl PlatformError {
    /// Map a reader-side failure on `path` into the container-corrupt taxonomy entry.
    #[must_use]
    pub fn into_container_error(self, path: &str) -> UnpackError {
        match self {
            PlatformError::ProcessExecutionFailed {
                exit_code, message, ..
            } => UnpackError::ContainerCorruptOrUnsigned {
                path: path.to_string(),
                code: exit_code.and_then(|c| u32::try_from(c).ok()),
                message,
            },
            PlatformError::FilesystemOperationFailed { operation, message } => {
                UnpackError::Unexpected { operation, message }
            }
            other => UnpackError::corrupt(path, other.to_string()),
        }
    }
}
