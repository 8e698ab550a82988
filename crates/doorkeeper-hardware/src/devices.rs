//! Enum wrapper for door hardware dispatch.
//!
//! Native `async fn` in traits (RPITIT) are not object-safe, so the backend
//! chosen at startup is held in [`AnyDoorHardware`] instead of a
//! `Box<dyn DoorHardware>`.
//!
//! # Examples
//!
//! ```
//! use doorkeeper_hardware::devices::AnyDoorHardware;
//! use doorkeeper_hardware::mock::MockDoor;
//! use doorkeeper_hardware::traits::DoorHardware;
//!
//! let (door, _handle) = MockDoor::new();
//! let hardware = AnyDoorHardware::Mock(door);
//! assert_eq!(hardware.door_count(), 2);
//! ```

use crate::mock::MockDoor;
use crate::sysfs::SysfsDoor;
use crate::traits::DoorHardware;
use crate::types::{BackendKind, HardwareConfig, Indicator, ReadBudget};
use crate::Result;
use doorkeeper_core::{CardUid, constants::DEFAULT_DOOR_COUNT};
use tracing::info;

#[cfg(feature = "pcsc")]
use crate::pcsc::PcscDoor;

/// Any supported door backend.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDoorHardware {
    /// Simulated hardware for development and testing.
    Mock(MockDoor),
    /// sysfs GPIO with a command-line reader.
    Sysfs(SysfsDoor),
    /// PC/SC reader with sysfs GPIO outputs.
    #[cfg(feature = "pcsc")]
    Pcsc(PcscDoor),
}

impl AnyDoorHardware {
    /// Build the backend selected by the configuration.
    ///
    /// A mock built this way has no handle attached, so it never sees a card.
    ///
    /// # Errors
    ///
    /// Returns an error if the GPIO lines or the reader cannot be opened, or
    /// if the selected backend was not compiled in.
    pub async fn from_config(config: &HardwareConfig) -> Result<Self> {
        let hardware = match config.backend {
            BackendKind::Mock => {
                let doors = config.mock_doors.unwrap_or(DEFAULT_DOOR_COUNT);
                let (door, _handle) = MockDoor::with_doors(doors);
                Self::Mock(door)
            }
            BackendKind::Sysfs => {
                Self::Sysfs(SysfsDoor::open(config.gpio.clone(), config.reader.clone()).await?)
            }
            #[cfg(feature = "pcsc")]
            BackendKind::Pcsc => Self::Pcsc(
                PcscDoor::open(config.gpio.clone(), config.reader.pcsc_reader.clone()).await?,
            ),
            #[cfg(not(feature = "pcsc"))]
            BackendKind::Pcsc => {
                return Err(crate::HardwareError::configuration(
                    "PC/SC backend requested but built without the `pcsc` feature",
                ));
            }
        };

        info!(backend = ?config.backend, doors = hardware.door_count(), "door hardware ready");
        Ok(hardware)
    }
}

macro_rules! dispatch {
    ($self:ident, $device:ident => $call:expr) => {
        match $self {
            Self::Mock($device) => $call,
            Self::Sysfs($device) => $call,
            #[cfg(feature = "pcsc")]
            Self::Pcsc($device) => $call,
        }
    };
}

impl DoorHardware for AnyDoorHardware {
    async fn read_card_uid(&mut self, budget: ReadBudget) -> Result<Option<CardUid>> {
        dispatch!(self, device => device.read_card_uid(budget).await)
    }

    async fn set_reader_power(&mut self, on: bool) -> Result<()> {
        dispatch!(self, device => device.set_reader_power(on).await)
    }

    async fn set_lock(&mut self, released: bool) -> Result<()> {
        dispatch!(self, device => device.set_lock(released).await)
    }

    async fn set_indicator(&mut self, indicator: Indicator, on: bool) -> Result<()> {
        dispatch!(self, device => device.set_indicator(indicator, on).await)
    }

    async fn read_door_sensor(&mut self, door: usize) -> Result<bool> {
        dispatch!(self, device => device.read_door_sensor(door).await)
    }

    fn door_count(&self) -> usize {
        dispatch!(self, device => device.door_count())
    }

    async fn cleanup_all_outputs(&mut self) -> Result<()> {
        dispatch!(self, device => device.cleanup_all_outputs().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HardwareError;
    use crate::mock::OutputEvent;

    #[tokio::test]
    async fn test_any_door_dispatches_to_mock() {
        let (door, handle) = MockDoor::with_doors(1);
        let mut hardware = AnyDoorHardware::Mock(door);

        hardware.set_lock(true).await.unwrap();
        hardware.set_indicator(Indicator::Buzzer, true).await.unwrap();
        hardware.cleanup_all_outputs().await.unwrap();

        assert_eq!(hardware.door_count(), 1);
        assert_eq!(
            handle.history(),
            vec![
                OutputEvent::Lock(true),
                OutputEvent::Indicator(Indicator::Buzzer, true),
                OutputEvent::Cleanup,
            ]
        );
    }

    #[tokio::test]
    async fn test_from_config_mock() {
        let config = HardwareConfig {
            mock_doors: Some(3),
            ..HardwareConfig::default()
        };
        let mut hardware = AnyDoorHardware::from_config(&config).await.unwrap();

        assert!(matches!(hardware, AnyDoorHardware::Mock(_)));
        assert_eq!(hardware.door_count(), 3);
        let read = hardware.read_card_uid(ReadBudget::single()).await.unwrap();
        assert_eq!(read, None);
    }

    #[cfg(not(feature = "pcsc"))]
    #[tokio::test]
    async fn test_from_config_pcsc_without_feature() {
        let config = HardwareConfig {
            backend: BackendKind::Pcsc,
            ..HardwareConfig::default()
        };
        let err = AnyDoorHardware::from_config(&config).await.unwrap_err();
        assert!(matches!(err, HardwareError::Configuration { .. }));
    }
}
