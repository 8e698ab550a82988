use doorkeeper_core::constants::{
    DEFAULT_BLINK_PERIOD_MS, DEFAULT_DENY_BLINKS, DEFAULT_READ_ATTEMPTS, DEFAULT_READ_INTERVAL_MS,
    DEFAULT_UNLOCK_HOLD_SECS,
};
use doorkeeper_hardware::ReadBudget;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of one access cycle.
///
/// Deserialized from the `engine` section of the configuration file. Every
/// field is optional there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reader attempts per cycle
    pub read_attempts: u32,

    /// Delay between reader attempts, in milliseconds
    pub read_interval_ms: u64,

    /// How long the lock stays released, in seconds
    pub unlock_hold_secs: u64,

    /// Number of deny blinks
    pub deny_blinks: u32,

    /// On (and off) time of one deny blink, in milliseconds
    pub blink_period_ms: u64,

    /// Also write door open/close events to the audit log
    pub audit_door_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_attempts: DEFAULT_READ_ATTEMPTS,
            read_interval_ms: DEFAULT_READ_INTERVAL_MS,
            unlock_hold_secs: DEFAULT_UNLOCK_HOLD_SECS,
            deny_blinks: DEFAULT_DENY_BLINKS,
            blink_period_ms: DEFAULT_BLINK_PERIOD_MS,
            audit_door_events: false,
        }
    }
}

impl EngineConfig {
    pub fn read_budget(&self) -> ReadBudget {
        ReadBudget::new(self.read_attempts, Duration::from_millis(self.read_interval_ms))
    }

    pub fn unlock_hold(&self) -> Duration {
        Duration::from_secs(self.unlock_hold_secs)
    }

    pub fn blink_period(&self) -> Duration {
        Duration::from_millis(self.blink_period_ms)
    }
}
