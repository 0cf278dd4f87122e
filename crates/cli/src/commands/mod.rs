//! CLI command implementations.

pub mod doctor;
pub mod setup;
pub mod status;
