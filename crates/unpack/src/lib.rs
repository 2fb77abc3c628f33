#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package and bundle extraction pipeline for appxtract
//!
//! The pipeline is layered bottom-up:
//!
//! - [`ContainerHandle`] classifies a path as package, bundle or neither
//! - [`Extractor`] extracts one container and resolves its output folders
//!   (with [`IdentityResolver`] for bundles)
//! - [`BatchExtractor`] runs the extractor over a file or a directory and
//!   collects per-item failures into an [`ExtractionOutcome`]
//! - [`VirtualDiskStager`] runs a batch into a throwaway staging directory
//!   and hands the tree to an image builder
//! - [`MountLifecycle`] mounts and unmounts the resulting images
//!
//! All platform work goes through the capability traits in
//! `appxtract-platform`; nothing here talks to the OS beyond plain
//! filesystem calls.

mod batch;
mod container;
mod extract;
mod identity;
mod mount;
mod staging;

pub use batch::{BatchExtractor, ExtractionOutcome};
pub use container::ContainerHandle;
pub use extract::{ExtractOptions, ExtractedItem, Extractor};
pub use identity::IdentityResolver;
pub use mount::MountLifecycle;
pub use staging::{ImageRequest, StagedImage, StagingGuard, VirtualDiskStager};

// Re-export EventSender so callers can wire components without another import
pub use appxtract_events::EventSender;
