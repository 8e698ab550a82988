//! Shared plumbing for the `door-lock`, `enroll` and `doorctl` binaries.
//!
//! - [`config`] - the YAML configuration file
//! - [`logging`] - tracing subscriber setup
//! - [`shutdown`] - SIGINT/SIGTERM handling
//! - [`enroll`] - key enrollment and its exit statuses
//! - [`commands`] - `doorctl` subcommands
//! - [`output`] - plain text and JSON rendering

pub mod commands;
pub mod config;
pub mod enroll;
pub mod logging;
pub mod output;
pub mod prompt;
pub mod shutdown;

pub use config::{Config, LoggingConfig};
pub use output::OutputFormat;
