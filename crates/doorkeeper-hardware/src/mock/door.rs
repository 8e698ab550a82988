//! Mock door controller for testing and development.
//!
//! [`MockDoor`] simulates the reader, the lock, the indicators and the door
//! contacts. The paired [`MockDoorHandle`] presents cards, flips door sensors,
//! injects failures and observes every output change.

use crate::{
    HardwareError, Result,
    traits::DoorHardware,
    types::{Indicator, ReadBudget},
};
use doorkeeper_core::{CardUid, constants::DEFAULT_DOOR_COUNT};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

/// One change applied to a mock output, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    ReaderPower(bool),
    Lock(bool),
    Indicator(Indicator, bool),
    Cleanup,
}

#[derive(Debug, Default)]
struct MockState {
    reader_powered: bool,
    lock_released: bool,
    unlock_led: bool,
    deny_led: bool,
    buzzer: bool,
    doors: Vec<bool>,
    history: Vec<OutputEvent>,
    read_failures: VecDeque<String>,
    output_failures: VecDeque<String>,
    read_calls: usize,
}

impl MockState {
    fn indicator_mut(&mut self, indicator: Indicator) -> &mut bool {
        match indicator {
            Indicator::UnlockLed => &mut self.unlock_led,
            Indicator::DenyLed => &mut self.deny_led,
            Indicator::Buzzer => &mut self.buzzer,
        }
    }

    fn take_output_failure(&mut self) -> Result<()> {
        match self.output_failures.pop_front() {
            Some(message) => Err(HardwareError::Io(std::io::Error::other(message))),
            None => Ok(()),
        }
    }
}

fn lock_state(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simulated door controller.
///
/// # Examples
///
/// ```
/// use doorkeeper_core::CardUid;
/// use doorkeeper_hardware::mock::MockDoor;
/// use doorkeeper_hardware::traits::DoorHardware;
/// use doorkeeper_hardware::types::ReadBudget;
///
/// #[tokio::main]
/// async fn main() -> doorkeeper_hardware::Result<()> {
///     let (mut door, handle) = MockDoor::new();
///
///     let uid = CardUid::parse("04abcdef").unwrap();
///     handle.present_card(uid.clone()).await?;
///
///     let read = door.read_card_uid(ReadBudget::single()).await?;
///     assert_eq!(read, Some(uid));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockDoor {
    card_rx: mpsc::Receiver<CardUid>,
    state: Arc<Mutex<MockState>>,
    door_count: usize,
}

impl MockDoor {
    /// Create a mock with the default number of doors.
    pub fn new() -> (Self, MockDoorHandle) {
        Self::with_doors(DEFAULT_DOOR_COUNT)
    }

    /// Create a mock with `door_count` doors, all closed.
    pub fn with_doors(door_count: usize) -> (Self, MockDoorHandle) {
        let (card_tx, card_rx) = mpsc::channel(32);
        let state = Arc::new(Mutex::new(MockState {
            doors: vec![false; door_count],
            ..MockState::default()
        }));

        let door = Self {
            card_rx,
            state: Arc::clone(&state),
            door_count,
        };
        let handle = MockDoorHandle { card_tx, state };

        (door, handle)
    }
}

impl DoorHardware for MockDoor {
    async fn read_card_uid(&mut self, budget: ReadBudget) -> Result<Option<CardUid>> {
        {
            let mut state = lock_state(&self.state);
            state.read_calls += 1;
            if let Some(message) = state.read_failures.pop_front() {
                return Err(HardwareError::card_read(message));
            }
        }

        for attempt in 0..budget.attempts {
            // A dropped handle just means nobody presents cards any more.
            if let Ok(uid) = self.card_rx.try_recv() {
                debug!(%uid, attempt, "mock reader returned card");
                return Ok(Some(uid));
            }

            if attempt + 1 < budget.attempts {
                tokio::time::sleep(budget.interval).await;
            }
        }

        Ok(None)
    }

    async fn set_reader_power(&mut self, on: bool) -> Result<()> {
        let mut state = lock_state(&self.state);
        state.take_output_failure()?;
        state.reader_powered = on;
        state.deny_led = on;
        if on {
            state.unlock_led = false;
            state.lock_released = false;
        }
        state.history.push(OutputEvent::ReaderPower(on));
        Ok(())
    }

    async fn set_lock(&mut self, released: bool) -> Result<()> {
        let mut state = lock_state(&self.state);
        state.take_output_failure()?;
        state.lock_released = released;
        state.history.push(OutputEvent::Lock(released));
        Ok(())
    }

    async fn set_indicator(&mut self, indicator: Indicator, on: bool) -> Result<()> {
        let mut state = lock_state(&self.state);
        state.take_output_failure()?;
        *state.indicator_mut(indicator) = on;
        state.history.push(OutputEvent::Indicator(indicator, on));
        Ok(())
    }

    async fn read_door_sensor(&mut self, door: usize) -> Result<bool> {
        let state = lock_state(&self.state);
        state
            .doors
            .get(door)
            .copied()
            .ok_or(HardwareError::UnknownDoor {
                door,
                count: self.door_count,
            })
    }

    fn door_count(&self) -> usize {
        self.door_count
    }

    async fn cleanup_all_outputs(&mut self) -> Result<()> {
        let mut state = lock_state(&self.state);
        state.reader_powered = false;
        state.lock_released = false;
        state.unlock_led = false;
        state.deny_led = false;
        state.buzzer = false;
        state.history.push(OutputEvent::Cleanup);
        Ok(())
    }
}

/// Handle for driving and observing a [`MockDoor`].
#[derive(Debug, Clone)]
pub struct MockDoorHandle {
    card_tx: mpsc::Sender<CardUid>,
    state: Arc<Mutex<MockState>>,
}

impl MockDoorHandle {
    /// Queue a card for the next read.
    ///
    /// # Errors
    ///
    /// Returns an error if the mock door has been dropped.
    pub async fn present_card(&self, uid: CardUid) -> Result<()> {
        self.card_tx
            .send(uid)
            .await
            .map_err(|_| HardwareError::reader_unavailable("mock card channel closed"))
    }

    /// Set a door contact. Out-of-range doors are ignored.
    pub fn set_door_open(&self, door: usize, open: bool) {
        if let Some(slot) = lock_state(&self.state).doors.get_mut(door) {
            *slot = open;
        }
    }

    /// Make the next read fail with a card read error.
    pub fn fail_next_read(&self, message: impl Into<String>) {
        lock_state(&self.state).read_failures.push_back(message.into());
    }

    /// Make the next output change fail with an I/O error.
    pub fn fail_next_output(&self, message: impl Into<String>) {
        lock_state(&self.state)
            .output_failures
            .push_back(message.into());
    }

    pub fn is_lock_released(&self) -> bool {
        lock_state(&self.state).lock_released
    }

    pub fn is_reader_powered(&self) -> bool {
        lock_state(&self.state).reader_powered
    }

    pub fn indicator(&self, indicator: Indicator) -> bool {
        *lock_state(&self.state).indicator_mut(indicator)
    }

    /// Returns `true` if any output is currently asserted.
    pub fn any_output_on(&self) -> bool {
        let state = lock_state(&self.state);
        state.reader_powered
            || state.lock_released
            || state.unlock_led
            || state.deny_led
            || state.buzzer
    }

    /// Every output change so far.
    pub fn history(&self) -> Vec<OutputEvent> {
        lock_state(&self.state).history.clone()
    }

    pub fn clear_history(&self) {
        lock_state(&self.state).history.clear();
    }

    /// Number of `read_card_uid` calls so far.
    pub fn read_calls(&self) -> usize {
        lock_state(&self.state).read_calls
    }
}
