//! Command implementations for Converge CLI

pub mod apply;
pub mod completions;
pub mod status;
pub mod version;
