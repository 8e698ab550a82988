//! Access engine state machine.
//!
//! One access cycle walks through these states:
//! - `Idle`: between cycles
//! - `Reading`: reader powered, polling for a card
//! - `Deciding`: reader off, door contacts sampled, card being resolved
//! - `Actuating`: lock released for the unlock hold
//!
//! # Valid Transitions
//!
//! - Idle → Reading → Deciding → Idle
//! - Deciding → Actuating → Idle
//!
//! # Examples
//!
//! ```
//! use doorkeeper_engine::{EngineState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.current_state(), EngineState::Idle);
//!
//! machine.transition_to(EngineState::Reading).unwrap();
//! assert!(machine.transition_to(EngineState::Actuating).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use doorkeeper_core::{Error, Result};

/// Maximum number of state transitions to keep in history.
///
/// A granted cycle takes four transitions, so this covers the last 25 or so
/// cycles.
const MAX_HISTORY_SIZE: usize = 100;

/// Phase of the access cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Reading,
    Deciding,
    Actuating,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            EngineState::Idle => "Idle",
            EngineState::Reading => "Reading",
            EngineState::Deciding => "Deciding",
            EngineState::Actuating => "Actuating",
        };
        write!(f, "{}", state_str)
    }
}

impl EngineState {
    /// Check if transition to target state is valid from this state.
    ///
    /// ```
    /// use doorkeeper_engine::EngineState;
    ///
    /// assert!(EngineState::Deciding.can_transition_to(&EngineState::Actuating));
    /// assert!(!EngineState::Idle.can_transition_to(&EngineState::Actuating));
    /// ```
    pub fn can_transition_to(&self, target: &EngineState) -> bool {
        matches!(
            (self, target),
            (EngineState::Idle, EngineState::Reading)
                | (EngineState::Reading, EngineState::Deciding)
                | (EngineState::Deciding, EngineState::Idle | EngineState::Actuating)
                | (EngineState::Actuating, EngineState::Idle)
        )
    }
}

/// Represents a single state transition with timestamp.
///
/// The `timestamp` field is not serialized as `Instant` is process-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: EngineState,
    pub to: EngineState,

    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: EngineState, to: EngineState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Time elapsed since the transition.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Validated state holder with a bounded transition history.
///
/// Not thread-safe: the engine owns its machine exclusively.
#[derive(Debug)]
pub struct StateMachine {
    current_state: EngineState,
    state_entered_at: Instant,
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self {
            current_state: EngineState::Idle,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> EngineState {
        self.current_state
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last N state transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition is not legal
    /// from the current state; the machine is left unchanged.
    pub fn transition_to(&mut self, new_state: EngineState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.perform_state_change(new_state, transition.clone());
        Ok(transition)
    }

    /// Force the machine back to Idle after an aborted cycle.
    ///
    /// Recorded in history only when the machine was not already idle.
    pub fn reset(&mut self) -> Option<StateTransition> {
        if self.current_state == EngineState::Idle {
            return None;
        }
        let transition = StateTransition::new(self.current_state, EngineState::Idle);
        self.perform_state_change(EngineState::Idle, transition.clone());
        Some(transition)
    }

    fn perform_state_change(&mut self, new_state: EngineState, transition: StateTransition) {
        self.current_state = new_state;
        self.state_entered_at = Instant::now();

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
