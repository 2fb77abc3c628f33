//! Extraction, staging and mount error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum UnpackError {
    #[error("invalid source {path}: {reason}")]
    InvalidSource { path: String, reason: String },

    #[error("container {path} is corrupt or unsigned: {message}")]
    ContainerCorruptOrUnsigned {
        path: String,
        /// Reader-specific code, surfaced verbatim when present.
        code: Option<u32>,
        message: String,
    },

    #[error("payload {file_name} is not declared in the bundle manifest")]
    UndeclaredPayload { file_name: String },

    #[error("{full_name} was already extracted to {destination} by another item in this batch")]
    IdentityCollision {
        full_name: String,
        destination: String,
    },

    #[error("failed to apply ACLs to {folders} folder(s): {message}")]
    AclApplicationFailed { folders: usize, message: String },

    #[error("failed to create staging directory {path}: {message}")]
    StagingDirectoryCreateFailed { path: String, message: String },

    #[error("failed to build image {output}: {message}")]
    ImageBuildFailed { output: String, message: String },

    #[error("invalid image request: {message}")]
    InvalidImageRequest { message: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("unexpected failure during {operation}: {message}")]
    Unexpected { operation: String, message: String },
}

impl UnpackError {
    /// Build a corrupt-container error without a reader code.
    pub fn corrupt(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContainerCorruptOrUnsigned {
            path: path.into(),
            code: None,
            message: message.into(),
        }
    }

    /// Build an unexpected-failure error for a named operation.
    pub fn unexpected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unexpected {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl UserFacingError for UnpackError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidSource { .. } => {
                Some("Pass a .appx/.msix/.appxbundle/.msixbundle file or a directory containing them.")
            }
            Self::ContainerCorruptOrUnsigned { .. } => Some(
                "Check the container is intact; use --skip-signature for test-signed containers.",
            ),
            Self::IdentityCollision { .. } => {
                Some("Unpack one of the colliding items into a different destination.")
            }
            Self::AclApplicationFailed { .. } => {
                Some("Re-run with elevated privileges or apply ACLs separately with `apply-acls`.")
            }
            Self::NotFound { .. } => Some("Retry the unmount with an explicit --volume-id."),
            Self::InvalidImageRequest { .. } => {
                Some("Check --file-type, --root-directory and --vhd-size.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AclApplicationFailed { .. }
                | Self::StagingDirectoryCreateFailed { .. }
                | Self::ImageBuildFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidSource { .. } => "unpack.invalid_source",
            Self::ContainerCorruptOrUnsigned { .. } => "unpack.container_corrupt_or_unsigned",
            Self::UndeclaredPayload { .. } => "unpack.undeclared_payload",
            Self::IdentityCollision { .. } => "unpack.identity_collision",
            Self::AclApplicationFailed { .. } => "unpack.acl_application_failed",
            Self::StagingDirectoryCreateFailed { .. } => "unpack.staging_create_failed",
            Self::ImageBuildFailed { .. } => "unpack.image_build_failed",
            Self::InvalidImageRequest { .. } => "unpack.invalid_image_request",
            Self::NotFound { .. } => "unpack.not_found",
            Self::Unexpected { .. } => "unpack.unexpected",
        };
        Some(code)
    }
}
