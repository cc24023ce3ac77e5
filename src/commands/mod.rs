//! CLI command implementations for herakles-host-exporter.
//!
//! - `check`: host and configuration validation
//! - `config`: configuration file generation
//! - `test`: one-off sampling passes against the live host

pub mod check;
pub mod config;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use test::command_test;
