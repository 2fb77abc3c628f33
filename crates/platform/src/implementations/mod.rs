//! Production adapters

pub mod command;
pub mod opc;
