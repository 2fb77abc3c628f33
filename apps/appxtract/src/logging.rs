//! Structured logging integration for events
//!
//! Every event received by the CLI is also written to the tracing
//! subscriber with structured fields, so `--debug` and `RUST_LOG` capture
//! the full run even when terminal output is suppressed.

use appxtract_events::{AppEvent, EventMessage, ImageEvent, UnpackEvent};
use tracing::{debug, error, info, warn, Level};

/// Log an `EventMessage` at its own level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let meta = &message.meta;
    let source = meta.source.as_str();
    let summary = summarize(&message.event);

    match meta.tracing_level() {
        Level::ERROR => error!(source, event_id = %meta.event_id, "{summary}"),
        Level::WARN => warn!(source, event_id = %meta.event_id, "{summary}"),
        Level::INFO => info!(source, event_id = %meta.event_id, "{summary}"),
        _ => debug!(source, event_id = %meta.event_id, "{summary}"),
    }
}

/// One-line description of an event
pub fn summarize(event: &AppEvent) -> String {
    match event {
        AppEvent::Unpack(unpack) => match unpack {
            UnpackEvent::ItemStarted { source, kind } => {
                format!("unpacking {kind} {}", source.display())
            }
            UnpackEvent::ItemExtracted {
                source,
                full_name,
                folders,
            } => format!(
                "unpacked {} as {full_name} ({} folder(s))",
                source.display(),
                folders.len()
            ),
            UnpackEvent::ItemFailed { source, failure } => format!(
                "{} failed [{}]: {}",
                source.display(),
                failure.code.as_deref().unwrap_or("unknown"),
                failure.message
            ),
            UnpackEvent::ItemSkipped { path } => format!("skipped {}", path.display()),
            UnpackEvent::DependenciesDeclared {
                full_name,
                dependencies,
            } => format!(
                "{full_name} depends on packages that were not unpacked: {}",
                dependencies.join(", ")
            ),
            UnpackEvent::AclsApplied { folders } => {
                format!("applied ACLs to {} folder(s)", folders.len())
            }
            UnpackEvent::BatchCompleted {
                extracted,
                skipped,
                failed,
            } => format!("batch finished: {extracted} unpacked, {skipped} skipped, {failed} failed"),
        },
        AppEvent::Image(image) => match image {
            ImageEvent::StagingCreated { path } => {
                format!("created staging directory {}", path.display())
            }
            ImageEvent::StagingRemoved { path } => {
                format!("removed staging directory {}", path.display())
            }
            ImageEvent::StagingCleanupFailed { path, message } => format!(
                "could not remove staging directory {}: {message}",
                path.display()
            ),
            ImageEvent::BuildStarted { output, kind } => {
                format!("building {kind} image {}", output.display())
            }
            ImageEvent::BuildCompleted { output } => format!("built {}", output.display()),
            ImageEvent::BuildFailed { output, failure } => {
                format!("failed to build {}: {}", output.display(), failure.message)
            }
            ImageEvent::Mounted { image, volume } => {
                format!("mounted {} as volume {volume}", image.display())
            }
            ImageEvent::Unmounted { volume } => format!("unmounted volume {volume}"),
        },
    }
}
