//! Door hardware abstraction layer.
//!
//! This crate exposes the peripherals of a single door controller (an NFC
//! card reader, the lock latch, the unlock and deny LEDs, a buzzer and the
//! door contacts) through the [`DoorHardware`] trait, and ships three
//! backends:
//!
//! - [`mock::MockDoor`]: in-memory simulation driven by a
//!   [`mock::MockDoorHandle`], used by tests and `backend: mock`.
//! - [`sysfs::SysfsDoor`]: Linux `/sys/class/gpio` lines plus an external
//!   reader command such as `nfc-read`.
//! - `pcsc::PcscDoor` (feature `pcsc`): a PC/SC contactless reader plus sysfs
//!   GPIO lines.
//!
//! The backend selected at startup is wrapped in
//! [`devices::AnyDoorHardware`].
//!
//! # Example
//!
//! ```no_run
//! use doorkeeper_hardware::{DoorHardware, Indicator, ReadBudget, Result};
//!
//! async fn flash_on_card<H: DoorHardware>(hardware: &mut H) -> Result<()> {
//!     hardware.set_reader_power(true).await?;
//!     let uid = hardware.read_card_uid(ReadBudget::default()).await?;
//!     hardware.set_reader_power(false).await?;
//!
//!     if uid.is_some() {
//!         hardware.set_indicator(Indicator::UnlockLed, true).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod error;
pub mod mock;
#[cfg(feature = "pcsc")]
pub mod pcsc;
pub mod sysfs;
pub mod traits;
pub mod types;

pub use devices::AnyDoorHardware;
pub use error::{HardwareError, Result};
pub use traits::DoorHardware;
pub use types::{
    BackendKind, GpioConfig, HardwareConfig, Indicator, OutputPin, ReadBudget, ReaderConfig,
};
