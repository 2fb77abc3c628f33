use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventSource};
use appxtract_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code, when the error has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod image;
pub mod unpack;

pub use image::*;
pub use unpack::*;

/// Every event the pipeline emits, tagged by domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Per-item and batch extraction events
    Unpack(UnpackEvent),

    /// Staging, image build and mount events
    Image(ImageEvent),
}

impl AppEvent {
    #[must_use]
    pub fn source(&self) -> EventSource {
        match self {
            Self::Unpack(_) => EventSource::Unpack,
            Self::Image(_) => EventSource::Image,
        }
    }

    /// Severity this event is logged and rendered at
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::Image(ImageEvent::BuildFailed { .. }) => EventLevel::Error,

            // Failed items do not fail the batch, so they stay at warning level
            Self::Unpack(UnpackEvent::ItemFailed { .. } | UnpackEvent::DependenciesDeclared { .. })
            | Self::Image(ImageEvent::StagingCleanupFailed { .. }) => EventLevel::Warn,

            Self::Unpack(UnpackEvent::ItemStarted { .. } | UnpackEvent::ItemSkipped { .. })
            | Self::Image(ImageEvent::StagingCreated { .. } | ImageEvent::StagingRemoved { .. }) => {
                EventLevel::Debug
            }

            _ => EventLevel::Info,
        }
    }
}
