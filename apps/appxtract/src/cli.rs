//! Command line interface definition

use appxtract_types::{ColorChoice, ImageKind, VolumeId};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// appxtract - unpack MSIX/APPX packages and bundles
#[derive(Parser)]
#[command(name = "appxtract")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Unpack MSIX/APPX packages and bundles into folders or virtual disk images")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Unpack a package, a bundle, or a directory of them
    Unpack(UnpackArgs),

    /// Apply package ACLs to already unpacked folders
    #[command(name = "apply-acls")]
    ApplyAcls {
        /// Folders to remediate
        #[arg(required = true, value_name = "FOLDER")]
        folders: Vec<PathBuf>,
    },

    /// Mount a virtual disk or CIM image
    #[command(name = "mount-image")]
    MountImage {
        /// Image to mount
        #[arg(long, value_name = "PATH")]
        image_path: PathBuf,

        /// Mount without write access
        #[arg(long)]
        read_only: bool,
    },

    /// Unmount an image by path or by volume id
    #[command(name = "unmount-image")]
    UnmountImage {
        /// Image to unmount
        #[arg(
            long,
            value_name = "PATH",
            conflicts_with = "volume_id",
            required_unless_present = "volume_id"
        )]
        image_path: Option<PathBuf>,

        /// Volume to unmount (GUID, braces optional)
        #[arg(long, value_name = "GUID")]
        volume_id: Option<VolumeId>,
    },
}

/// Arguments of the unpack command
#[derive(Args)]
pub struct UnpackArgs {
    /// Package, bundle, or directory containing them
    #[arg(short = 'p', long, value_name = "PATH")]
    pub source: PathBuf,

    /// Destination directory, or image file with --create
    #[arg(short = 'd', long, value_name = "PATH")]
    pub destination: PathBuf,

    /// Apply package ACLs to every unpacked folder
    #[arg(long)]
    pub apply_acls: bool,

    /// Require a valid signature (default unless configured otherwise)
    #[arg(long, conflicts_with = "skip_signature")]
    pub validate_signature: bool,

    /// Accept unsigned or test-signed containers
    #[arg(long)]
    pub skip_signature: bool,

    /// Build an image at the destination instead of unpacking into it
    #[arg(long, requires = "file_type")]
    pub create: bool,

    /// Image format to create
    #[arg(long, value_enum, value_name = "TYPE")]
    pub file_type: Option<ImageKind>,

    /// Directory inside the image that receives the unpacked folders
    #[arg(long, value_name = "DIR")]
    pub root_directory: Option<String>,

    /// Size of a VHD/VHDX image in MB
    #[arg(long, value_name = "MB")]
    pub vhd_size: Option<u64>,
}

impl UnpackArgs {
    /// Signature flag after CLI overrides, falling back to `configured`
    pub fn signature_required(&self, configured: bool) -> bool {
        if self.skip_signature {
            false
        } else if self.validate_signature {
            true
        } else {
            configured
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_parses_image_flags() {
        let cli = Cli::try_parse_from([
            "appxtract",
            "unpack",
            "-p",
            "Suite.msixbundle",
            "-d",
            "apps.vhdx",
            "--create",
            "--file-type",
            "vhdx",
            "--vhd-size",
            "512",
            "--skip-signature",
        ])
        .unwrap();

        let Commands::Unpack(args) = cli.command else {
            panic!("expected unpack");
        };
        assert!(args.create);
        assert_eq!(args.file_type, Some(ImageKind::Vhdx));
        assert_eq!(args.vhd_size, Some(512));
        assert!(!args.signature_required(true));
    }

    #[test]
    fn test_create_requires_file_type() {
        assert!(Cli::try_parse_from(["appxtract", "unpack", "-p", "a", "-d", "b", "--create"]).is_err());
    }

    #[test]
    fn test_unmount_requires_a_target() {
        assert!(Cli::try_parse_from(["appxtract", "unmount-image"]).is_err());
        let cli = Cli::try_parse_from([
            "appxtract",
            "unmount-image",
            "--volume-id",
            "{6f1c2a4e-0a8b-4f4e-9b51-3f3e0c6d2a11}",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::UnmountImage {
                volume_id: Some(_),
                image_path: None
            }
        ));
    }

    #[test]
    fn test_signature_flag_precedence() {
        let cli = Cli::try_parse_from(["appxtract", "unpack", "-p", "a", "-d", "b"]).unwrap();
        let Commands::Unpack(args) = cli.command else {
            panic!("expected unpack");
        };
        assert!(args.signature_required(true));
        assert!(!args.signature_required(false));
    }
}
