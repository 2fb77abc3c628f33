//! Event handling and user feedback

use crate::logging::{log_event_with_tracing, summarize};
use appxtract_events::{AppEvent, EventMessage, ImageEvent, UnpackEvent};
use console::{style, Term};

/// Renders pipeline events to stderr as they arrive
pub struct EventHandler {
    /// Colored output
    colors_enabled: bool,
    /// Show debug-level events as well
    debug_enabled: bool,
    /// Suppress terminal output (JSON mode)
    quiet: bool,
    term: Term,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
            quiet,
            term: Term::stderr(),
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);
        if self.quiet {
            return;
        }

        let line = summarize(&message.event);
        match &message.event {
            AppEvent::Unpack(UnpackEvent::ItemFailed { failure, .. }) => {
                self.show_warning(&line);
                if let Some(hint) = &failure.hint {
                    self.show_detail(&format!("hint: {hint}"));
                }
            }
            AppEvent::Unpack(UnpackEvent::DependenciesDeclared { .. })
            | AppEvent::Image(ImageEvent::StagingCleanupFailed { .. }) => self.show_warning(&line),

            AppEvent::Image(ImageEvent::BuildFailed { .. }) => self.show_error(&line),

            AppEvent::Unpack(UnpackEvent::ItemExtracted { .. })
            | AppEvent::Image(
                ImageEvent::BuildCompleted { .. }
                | ImageEvent::Mounted { .. }
                | ImageEvent::Unmounted { .. },
            ) => self.show_status(&line),

            _ => {
                if self.debug_enabled {
                    self.show_detail(&line);
                }
            }
        }
    }

    fn show_status(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("ok").green().bold())
        } else {
            format!("ok {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_warning(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("warning:").yellow().bold())
        } else {
            format!("warning: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_error(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("error:").red().bold())
        } else {
            format!("error: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_detail(&self, message: &str) {
        let line = if self.colors_enabled {
            style(format!("  {message}")).dim().to_string()
        } else {
            format!("  {message}")
        };
        let _ = self.term.write_line(&line);
    }
}
