//! Defaults shared by the engine, the hardware backends and the tools.
//!
//! The timing values reproduce the behaviour of the door controller that
//! has been running on the Raspberry Pi: a reader poll of 20 attempts spaced
//! half a second apart, a two second unlock and three quarter-second blinks
//! on a rejected card.
//!
//! ```
//! use doorkeeper_core::constants::*;
//! use std::time::Duration;
//!
//! let hold = Duration::from_secs(DEFAULT_UNLOCK_HOLD_SECS);
//! assert_eq!(hold.as_secs(), 2);
//! assert_eq!(DEFAULT_READ_ATTEMPTS, 20);
//! ```

// ============================================================================
// Card reader
// ============================================================================

/// Number of reader attempts in a single read window.
pub const DEFAULT_READ_ATTEMPTS: u32 = 20;

/// Delay between two reader attempts in milliseconds.
pub const DEFAULT_READ_INTERVAL_MS: u64 = 500;

/// Minimum UID length in bytes (ISO 14443).
pub const MIN_UID_BYTES: usize = 4;

/// Maximum UID length in bytes (ISO 14443).
pub const MAX_UID_BYTES: usize = 10;

// ============================================================================
// Lock and indicators
// ============================================================================

/// Time the lock stays released after a granted read, in seconds.
pub const DEFAULT_UNLOCK_HOLD_SECS: u64 = 2;

/// Number of deny blinks after a rejected read.
pub const DEFAULT_DENY_BLINKS: u32 = 3;

/// On and off duration of one deny blink in milliseconds.
pub const DEFAULT_BLINK_PERIOD_MS: u64 = 250;

/// Number of monitored doors.
pub const DEFAULT_DOOR_COUNT: usize = 2;

// ============================================================================
// Storage
// ============================================================================

/// Status value that grants access. Every other status denies.
pub const STATUS_ACTIVE: &str = "active";

/// Status assigned to users created without an explicit status.
pub const STATUS_INACTIVE: &str = "inactive";

/// Default SQLite database path used by the tools.
pub const DEFAULT_DATABASE_PATH: &str = "/var/lib/doorkeeper/doorkeeper.db";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/doorkeeper/doorkeeper.yml";

/// Environment variable that overrides the configuration path.
pub const CONFIG_PATH_ENV: &str = "DOORKEEPER_CONFIG";
