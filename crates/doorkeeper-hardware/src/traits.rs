//! Hardware capability trait.
//!
//! The access engine drives every peripheral of a door through
//! [`DoorHardware`]. Backends implement it with native `async fn` methods
//! (Edition 2024 RPITIT), so they are dispatched through
//! [`AnyDoorHardware`](crate::devices::AnyDoorHardware) rather than trait
//! objects.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{Indicator, ReadBudget};
use doorkeeper_core::CardUid;

/// The peripherals of one door controller.
///
/// Doors are addressed by zero-based index in `0..door_count()`.
pub trait DoorHardware: Send {
    /// Poll the card reader until a card is seen or the budget is spent.
    ///
    /// Returns `Ok(None)` when no card was presented within the budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader failed. Callers usually treat
    /// [`HardwareError::is_transient_read_failure`](crate::HardwareError::is_transient_read_failure)
    /// errors as "no card".
    async fn read_card_uid(&mut self, budget: ReadBudget) -> Result<Option<CardUid>>;

    /// Switch the reader and its power indicator on or off.
    ///
    /// Powering on also forces the lock and the unlock LED off.
    async fn set_reader_power(&mut self, on: bool) -> Result<()>;

    /// Release (`true`) or engage (`false`) the lock.
    async fn set_lock(&mut self, released: bool) -> Result<()>;

    /// Switch an indicator.
    async fn set_indicator(&mut self, indicator: Indicator, on: bool) -> Result<()>;

    /// Sample a door contact. `true` means open.
    async fn read_door_sensor(&mut self, door: usize) -> Result<bool>;

    /// Number of monitored doors.
    fn door_count(&self) -> usize;

    /// Drive every output to its inactive level.
    ///
    /// Must be safe to call repeatedly and after a failed operation.
    async fn cleanup_all_outputs(&mut self) -> Result<()>;
}
