//! Shared domain types for the Doorkeeper access controller.
//!
//! Everything in here is free of I/O: card identifiers, audit event kinds,
//! user status values and the defaults the rest of the workspace agrees on.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
