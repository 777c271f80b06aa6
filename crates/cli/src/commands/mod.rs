//! CLI command implementations

pub mod catalog;
pub mod predict;
pub mod verify;
