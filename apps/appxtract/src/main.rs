//! appxtract - unpack MSIX/APPX packages and bundles
//!
//! This is the CLI application. It wires the production capability
//! adapters into the extraction pipeline, renders pipeline events while a
//! command runs, and maps the final result to an exit status.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, UnpackArgs};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use appxtract_config::Config;
use appxtract_events::{EventReceiver, EventSender};
use appxtract_platform::{
    AclApplier, CommandAclApplier, CommandImageBuilder, CommandImageMounter, ZipContainerReader,
};
use appxtract_types::{ColorChoice, ImageSpec, ValidationMode};
use appxtract_unpack::{
    BatchExtractor, ContainerHandle, ExtractOptions, Extractor, ImageRequest, MountLifecycle,
    VirtualDiskStager,
};
use clap::Parser;
use std::future::Future;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    // Exit status is non-zero only when the command itself failed; failed
    // items of a batch are reported as warnings.
    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if json_mode {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting appxtract v{}", env!("CARGO_PKG_VERSION"));

    // 1. File config (or defaults), 2. environment, 3. CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    if let Some(color) = cli.global.color {
        config.general.color = color;
    }
    if cli.global.json {
        config.general.json = true;
    }

    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };

    let (event_sender, event_receiver) = appxtract_events::channel();
    let mut event_handler =
        EventHandler::new(colors_enabled, cli.global.debug, config.general.json);
    let renderer = OutputRenderer::new(config.general.json, colors_enabled);

    let command = execute_command(cli.command, config, event_sender);
    let result = run_with_events(command, event_receiver, &mut event_handler).await?;

    renderer.render_result(&result)?;
    info!("Command completed successfully");
    Ok(())
}

/// Drive `command` while rendering its events
async fn run_with_events<F>(
    command: F,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError>
where
    F: Future<Output = Result<CommandResult, CliError>>,
{
    let mut command_future = Box::pin(command);

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    config: Config,
    event_sender: EventSender,
) -> Result<CommandResult, CliError> {
    match command {
        Commands::Unpack(args) => unpack(args, &config, event_sender).await,

        Commands::ApplyAcls { folders } => {
            let applier = CommandAclApplier::new(config.tools.acl_command.clone());
            applier
                .apply_acls(&folders)
                .await
                .map_err(|e| appxtract_errors::UnpackError::AclApplicationFailed {
                    folders: folders.len(),
                    message: e.to_string(),
                })?;
            Ok(CommandResult::AclsApplied(folders))
        }

        Commands::MountImage {
            image_path,
            read_only,
        } => {
            let mut lifecycle = mount_lifecycle(&config, event_sender);
            let volume = lifecycle.mount(&image_path, read_only).await?;
            Ok(CommandResult::Mounted {
                image: image_path,
                volume,
            })
        }

        Commands::UnmountImage {
            image_path,
            volume_id,
        } => {
            let mut lifecycle = mount_lifecycle(&config, event_sender);
            let volume = match (volume_id, image_path) {
                (Some(volume), _) => {
                    lifecycle.unmount_by_volume(volume).await?;
                    volume
                }
                (None, Some(image_path)) => lifecycle.unmount_by_path(&image_path).await?,
                (None, None) => {
                    return Err(CliError::InvalidArguments(
                        "pass --image-path or --volume-id".to_string(),
                    ));
                }
            };
            Ok(CommandResult::Unmounted { volume })
        }
    }
}

async fn unpack(
    args: UnpackArgs,
    config: &Config,
    event_sender: EventSender,
) -> Result<CommandResult, CliError> {
    let validation =
        ValidationMode::from_flag(args.signature_required(config.unpack.validate_signature));
    let options = ExtractOptions::new()
        .with_acls(args.apply_acls || config.unpack.apply_acls)
        .with_validation(validation)
        .with_applicability(config.applicability_mode());

    let extractor = Extractor::new(
        Arc::new(ZipContainerReader::new()),
        Arc::new(CommandAclApplier::new(config.tools.acl_command.clone())),
    )
    .with_event_sender(event_sender);
    let batch = BatchExtractor::new(ContainerHandle::from_config(&config.unpack), extractor);

    if args.create {
        let Some(kind) = args.file_type else {
            return Err(CliError::InvalidArguments(
                "--create requires --file-type".to_string(),
            ));
        };
        let request = ImageRequest::new(
            ImageSpec {
                kind,
                output: args.destination.clone(),
                root_directory: args.root_directory.clone(),
                size_mb: args.vhd_size,
            },
            options.apply_acls,
        );
        let builder = CommandImageBuilder::new(config.tools.image_command.clone());
        let stager = VirtualDiskStager::new(batch, config.staging_root());
        let staged = stager
            .build_image(&args.source, &options, &request, &config.image, &builder)
            .await?;
        return Ok(CommandResult::ImageBuilt {
            output: args.destination,
            staged,
        });
    }

    tokio::fs::create_dir_all(&args.destination)
        .await
        .map_err(|e| appxtract_errors::Error::io_with_path(&e, &args.destination))?;
    let outcome = batch.run(&args.source, &args.destination, &options).await?;
    Ok(CommandResult::Unpacked(outcome))
}

fn mount_lifecycle(config: &Config, event_sender: EventSender) -> MountLifecycle {
    MountLifecycle::new(Arc::new(CommandImageMounter::from_config(&config.tools)))
        .with_event_sender(event_sender)
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    let default_filter = if debug_enabled {
        "info,appxtract=debug,appxtract_unpack=debug,appxtract_platform=debug"
    } else {
        "warn,appxtract=warn,appxtract_unpack=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        if debug_enabled {
            // JSON logs on stderr keep stdout clean for the JSON result
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_writer(std::io::sink)
                .with_env_filter("off")
                .init();
        }
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}
