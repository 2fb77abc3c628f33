#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Capability traits consumed by the extraction pipeline, with one
//! production adapter per capability.
//!
//! - Container reading (`ContainerReader`, `PackageReader`, `BundleReader`),
//!   backed by the ZIP/OPC adapter in [`implementations::opc`]
//! - ACL remediation (`AclApplier`)
//! - Image building and mounting (`ImageBuilder`, `ImageMounter`)
//!
//! The ACL, image and mount adapters run externally configured tools
//! through [`process`].

pub mod acl;
pub mod container;
pub mod image;
pub mod implementations;
pub mod process;

pub use acl::AclApplier;
pub use container::{BundleReader, ContainerReader, PackageReader};
pub use image::{ImageBuilder, ImageMounter};
pub use implementations::command::{CommandAclApplier, CommandImageBuilder, CommandImageMounter};
pub use implementations::opc::ZipContainerReader;
