//! Common types shared across the door hardware backends.
//!
//! This module defines the output indicators, the card read budget and the
//! serde-backed configuration of the hardware section.

use doorkeeper_core::constants::{DEFAULT_READ_ATTEMPTS, DEFAULT_READ_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// User-facing signal outputs next to the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Green LED shown while the door is released.
    UnlockLed,
    /// Red LED. Doubles as the reader power indicator.
    DenyLed,
    /// Buzzer.
    Buzzer,
}

impl Indicator {
    /// Every indicator.
    pub const ALL: [Indicator; 3] = [Indicator::UnlockLed, Indicator::DenyLed, Indicator::Buzzer];
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Indicator::UnlockLed => write!(f, "unlock LED"),
            Indicator::DenyLed => write!(f, "deny LED"),
            Indicator::Buzzer => write!(f, "buzzer"),
        }
    }
}

/// How long a single card read may poll the reader.
///
/// A read makes at most `attempts` tries with `interval` between two
/// consecutive tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBudget {
    pub attempts: u32,
    pub interval: Duration,
}

impl ReadBudget {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// A budget that tries exactly once.
    pub fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Upper bound on the wall-clock time of a read that finds no card.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}

impl Default for ReadBudget {
    fn default() -> Self {
        Self::new(
            DEFAULT_READ_ATTEMPTS,
            Duration::from_millis(DEFAULT_READ_INTERVAL_MS),
        )
    }
}

/// Which hardware backend to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory simulation.
    #[default]
    Mock,
    /// Linux sysfs GPIO with an external reader command.
    Sysfs,
    /// PC/SC reader with sysfs GPIO outputs.
    Pcsc,
}

/// A GPIO output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPin {
    /// Kernel GPIO number.
    pub pin: u32,
    /// Drive the line low to switch the output on.
    #[serde(default)]
    pub active_low: bool,
}

impl OutputPin {
    pub fn new(pin: u32, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    /// Raw line level for a logical state.
    pub fn level(&self, on: bool) -> bool {
        on != self.active_low
    }
}

/// GPIO pin assignment.
///
/// Defaults follow the original board wiring translated to BCM numbering:
/// latch on physical pin 7, unlock LED 15, deny LED 13, buzzer 12 and door
/// contacts on 19 and 21. Both LEDs are wired active-low.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// Root of the sysfs GPIO class.
    pub base_path: PathBuf,
    pub latch: OutputPin,
    pub unlock_led: OutputPin,
    pub deny_led: OutputPin,
    pub buzzer: OutputPin,
    /// Door contact inputs, in door order.
    pub door_sensors: Vec<u32>,
    /// Treat a low input level as "open".
    pub door_open_low: bool,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/sys/class/gpio"),
            latch: OutputPin::new(4, false),
            unlock_led: OutputPin::new(22, true),
            deny_led: OutputPin::new(27, true),
            buzzer: OutputPin::new(18, false),
            door_sensors: vec![10, 9],
            door_open_low: false,
        }
    }
}

/// Card reader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Command run once per read attempt; its trimmed stdout is the UID.
    pub command: String,
    pub args: Vec<String>,
    /// Kill an attempt that runs longer than this.
    pub command_timeout_ms: u64,
    /// PC/SC reader name. The first reader is used when unset.
    pub pcsc_reader: Option<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            command: "nfc-read".to_string(),
            args: Vec::new(),
            command_timeout_ms: 2000,
            pcsc_reader: None,
        }
    }
}

/// The `hardware` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub backend: BackendKind,
    pub gpio: GpioConfig,
    pub reader: ReaderConfig,
    /// Number of doors simulated by the mock backend.
    pub mock_doors: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, true, true)]
    #[case(false, false, false)]
    #[case(true, true, false)]
    #[case(true, false, true)]
    fn test_output_pin_level(#[case] active_low: bool, #[case] on: bool, #[case] level: bool) {
        assert_eq!(OutputPin::new(1, active_low).level(on), level);
    }

    #[test]
    fn test_default_budget() {
        let budget = ReadBudget::default();
        assert_eq!(budget.attempts, 20);
        assert_eq!(budget.interval, Duration::from_millis(500));
        assert_eq!(budget.max_wait(), Duration::from_millis(9500));
    }

    #[test]
    fn test_default_leds_are_active_low() {
        let gpio = GpioConfig::default();
        assert!(gpio.unlock_led.active_low);
        assert!(gpio.deny_led.active_low);
        assert!(!gpio.latch.active_low);
        assert_eq!(gpio.door_sensors.len(), 2);
    }

    #[test]
    fn test_hardware_config_partial_yaml() {
        let yaml = "backend: sysfs\ngpio:\n  latch:\n    pin: 17\nreader:\n  command: /usr/local/bin/nfc-read\n";
        let config: HardwareConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.backend, BackendKind::Sysfs);
        assert_eq!(config.gpio.latch, OutputPin::new(17, false));
        assert_eq!(config.gpio.deny_led, GpioConfig::default().deny_led);
        assert_eq!(config.reader.command, "/usr/local/bin/nfc-read");
        assert_eq!(config.reader.command_timeout_ms, 2000);
    }

    #[test]
    fn test_indicator_serde() {
        let json = serde_json::to_string(&Indicator::UnlockLed).unwrap();
        assert_eq!(json, "\"unlock_led\"");
    }
}
