//! Output rendering and formatting

use appxtract_errors::UserFacingError;
use appxtract_types::VolumeId;
use appxtract_unpack::{ExtractionOutcome, StagedImage};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};

/// Result of one CLI command
pub enum CommandResult {
    Unpacked(ExtractionOutcome),
    ImageBuilt { output: PathBuf, staged: StagedImage },
    AclsApplied(Vec<PathBuf>),
    Mounted { image: PathBuf, volume: VolumeId },
    Unmounted { volume: VolumeId },
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color the table cells
    colors_enabled: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors_enabled: bool) -> Self {
        Self {
            json_output,
            colors_enabled,
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(&to_json(result)).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Unpacked(outcome) => self.render_outcome(outcome),
            CommandResult::ImageBuilt { output, staged } => {
                self.render_outcome(&staged.outcome);
                println!("Image created: {}", output.display());
                if let Some(error) = &staged.cleanup_error {
                    eprintln!("warning: staging directory was not removed: {error}");
                }
            }
            CommandResult::AclsApplied(folders) => {
                println!("Applied ACLs to {} folder(s).", folders.len());
            }
            CommandResult::Mounted { image, volume } => {
                println!("Image successfully mounted: {}", image.display());
                println!("Volume: {volume}");
                println!();
                println!("To unmount, run the following command:");
                println!("  appxtract unmount-image --volume-id {volume}");
            }
            CommandResult::Unmounted { volume } => {
                println!("Volume {volume} successfully unmounted.");
            }
        }
        Ok(())
    }

    fn render_outcome(&self, outcome: &ExtractionOutcome) {
        if outcome.extracted.is_empty() && outcome.failed.is_empty() {
            println!("Nothing to unpack.");
        } else {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("Source").add_attribute(Attribute::Bold),
                Cell::new("Status").add_attribute(Attribute::Bold),
                Cell::new("Result").add_attribute(Attribute::Bold),
            ]);

            for item in &outcome.extracted {
                table.add_row(vec![
                    Cell::new(item.source.display()),
                    self.status_cell("unpacked", Color::Green),
                    Cell::new(&item.full_name),
                ]);
            }
            for (path, error) in &outcome.failed {
                table.add_row(vec![
                    Cell::new(path.display()),
                    self.status_cell("failed", Color::Red),
                    Cell::new(format!(
                        "{} ({})",
                        error.user_message(),
                        error.user_code().unwrap_or("unknown")
                    )),
                ]);
            }
            println!("{table}");
        }

        if !outcome.skipped.is_empty() {
            println!("Skipped {} non-container entr(ies):", outcome.skipped.len());
            for path in &outcome.skipped {
                println!("  {}", path.display());
            }
        }
        if !outcome.is_clean() {
            eprintln!(
                "warning: {} item(s) failed; re-run with only the failed sources to retry",
                outcome.failure_count()
            );
        }
    }

    fn status_cell(&self, text: &str, color: Color) -> Cell {
        let cell = Cell::new(text);
        if self.colors_enabled {
            cell.fg(color)
        } else {
            cell
        }
    }
}

fn path_json(path: &Path) -> Value {
    Value::String(path.display().to_string())
}

fn paths_json(paths: &[PathBuf]) -> Value {
    Value::Array(paths.iter().map(|p| path_json(p)).collect())
}

fn outcome_json(outcome: &ExtractionOutcome) -> Value {
    json!({
        "extracted": outcome.extracted.iter().map(|item| json!({
            "source": path_json(&item.source),
            "kind": item.kind.to_string(),
            "full_name": item.full_name,
            "folders": paths_json(&item.folders),
            "dependencies": item.dependencies,
        })).collect::<Vec<_>>(),
        "skipped": paths_json(&outcome.skipped),
        "failed": outcome.failed.iter().map(|(path, error)| json!({
            "source": path_json(path),
            "code": error.user_code(),
            "message": error.user_message(),
            "hint": error.user_hint(),
        })).collect::<Vec<_>>(),
    })
}

fn to_json(result: &CommandResult) -> Value {
    match result {
        CommandResult::Unpacked(outcome) => outcome_json(outcome),
        CommandResult::ImageBuilt { output, staged } => json!({
            "image": path_json(output),
            "outcome": outcome_json(&staged.outcome),
            "cleanup_error": staged.cleanup_error,
        }),
        CommandResult::AclsApplied(folders) => json!({ "acls_applied": paths_json(folders) }),
        CommandResult::Mounted { image, volume } => json!({
            "image": path_json(image),
            "volume_id": volume.to_string(),
        }),
        CommandResult::Unmounted { volume } => json!({ "unmounted": volume.to_string() }),
    }
}
