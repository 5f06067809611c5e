//! Command-line interface for snapshot transfers

pub mod commands;
pub mod error;
