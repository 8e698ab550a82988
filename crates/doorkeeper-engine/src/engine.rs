//! The access decision loop.
//!
//! [`AccessEngine`] owns the door hardware and a credential store and runs
//! one access cycle after another:
//!
//! 1. power the reader and poll for a card within the read budget
//! 2. power the reader off and sample the door contacts
//! 3. resolve the card and append exactly one `unlock` or `deny` entry
//! 4. release the lock for the unlock hold, or blink the deny indicator
//!
//! The audit entry is always written before any output reacts to the
//! decision.

use crate::config::EngineConfig;
use crate::door_monitor::{DoorMonitor, DoorTransition};
use crate::error::Result;
use crate::messages::DenyReason;
use crate::state_machine::{EngineState, StateMachine, StateTransition};
use doorkeeper_core::{CardUid, LogKind, UserId};
use doorkeeper_hardware::{DoorHardware, Indicator};
use doorkeeper_storage::{CredentialStore, NewLogEntry};
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What happened to the card presented in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No card within the read budget, or the read failed.
    NoCard,
    /// The card was refused.
    Denied {
        uid: CardUid,
        user_id: Option<UserId>,
        reason: DenyReason,
    },
    /// The lock was released for the card's owner.
    Unlocked { uid: CardUid, user_id: UserId },
}

/// Result of one [`AccessEngine::run_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Door contacts that changed since the previous cycle.
    pub door_transitions: Vec<DoorTransition>,
}

/// Polls the reader and decides who may open the door.
pub struct AccessEngine<H: DoorHardware, S: CredentialStore> {
    hardware: H,
    store: S,
    config: EngineConfig,
    machine: StateMachine,
    doors: DoorMonitor,
}

impl<H: DoorHardware, S: CredentialStore> AccessEngine<H, S> {
    pub fn new(hardware: H, store: S, config: EngineConfig) -> Self {
        let doors = DoorMonitor::new(hardware.door_count());
        Self {
            hardware,
            store,
            config,
            machine: StateMachine::new(),
            doors,
        }
    }

    pub fn state(&self) -> EngineState {
        self.machine.current_state()
    }

    /// Recent state transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        self.machine.history()
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Take the hardware and store back, e.g. for a final cleanup.
    pub fn into_parts(self) -> (H, S) {
        (self.hardware, self.store)
    }

    /// Run cycles until `shutdown` fires or a cycle fails.
    ///
    /// Cancellation interrupts whatever the cycle is waiting on, including
    /// an unlock hold. Every output is driven inactive before returning, in
    /// both cases.
    ///
    /// # Errors
    ///
    /// Returns the first error that is not a transient card read failure,
    /// or a cleanup failure after a clean shutdown.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            doors = self.hardware.door_count(),
            attempts = self.config.read_attempts,
            "access engine started"
        );

        let result = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("shutdown requested");
                    break Ok(());
                }
                report = self.run_cycle() => match report {
                    Ok(report) => debug!(outcome = ?report.outcome, "cycle complete"),
                    Err(e) => {
                        error!(error = %e, "access engine stopped");
                        break Err(e);
                    }
                },
            }
        };

        self.machine.reset();
        let cleanup = self.hardware.cleanup_all_outputs().await;
        match (result, cleanup) {
            (Ok(()), Err(e)) => {
                error!(error = %e, "output cleanup failed");
                Err(e.into())
            }
            (result, Err(e)) => {
                error!(error = %e, "output cleanup failed");
                result
            }
            (result, Ok(())) => {
                info!("outputs cleaned up");
                result
            }
        }
    }

    /// Run a single access cycle, from Idle back to Idle.
    ///
    /// # Errors
    ///
    /// Any hardware error other than a transient read failure, and any store
    /// error. The machine is back in Idle afterwards either way.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let result = self.cycle().await;
        if result.is_err() {
            self.machine.reset();
        }
        result
    }

    async fn cycle(&mut self) -> Result<CycleReport> {
        self.machine.transition_to(EngineState::Reading)?;
        self.hardware.set_reader_power(true).await?;

        debug!("starting card read");
        let uid = match self.hardware.read_card_uid(self.config.read_budget()).await {
            Ok(uid) => uid,
            Err(e) if e.is_transient_read_failure() => {
                warn!(error = %e, "card read failed");
                None
            }
            Err(e) => return Err(e.into()),
        };
        debug!("finished card read");

        self.hardware.set_reader_power(false).await?;
        self.machine.transition_to(EngineState::Deciding)?;

        let door_transitions = self.sample_doors().await?;

        let outcome = match uid {
            None => {
                self.machine.transition_to(EngineState::Idle)?;
                CycleOutcome::NoCard
            }
            Some(uid) => self.decide(uid).await?,
        };

        Ok(CycleReport {
            outcome,
            door_transitions,
        })
    }

    async fn sample_doors(&mut self) -> Result<Vec<DoorTransition>> {
        let mut sample = Vec::with_capacity(self.hardware.door_count());
        for door in 0..self.hardware.door_count() {
            sample.push(self.hardware.read_door_sensor(door).await?);
        }

        let transitions = self.doors.observe(&sample);
        for transition in &transitions {
            info!(door = transition.door + 1, open = transition.open, "{transition}");
            if self.config.audit_door_events {
                let entry = NewLogEntry::new(LogKind::Message).with_message(transition.to_string());
                self.store.append_log(&entry).await?;
            }
        }
        Ok(transitions)
    }

    async fn decide(&mut self, uid: CardUid) -> Result<CycleOutcome> {
        info!(key_uid = %uid, "scanned card");

        self.store.ensure_connection().await.inspect_err(|e| {
            error!(error = %e, "credential store unavailable");
        })?;
        let user = self.store.resolve_by_key_id(&uid).await.inspect_err(|e| {
            error!(error = %e, key_uid = %uid, "card lookup failed");
        })?;

        match user {
            None => self.deny(uid, None, DenyReason::UnknownCard).await,
            Some(user) if !user.is_active() => {
                warn!(user = %user.full_name(), status = %user.status, "user is not active");
                self.deny(uid, Some(user.id), DenyReason::InactiveUser).await
            }
            Some(user) => {
                let entry = NewLogEntry::new(LogKind::Unlock)
                    .with_key(uid.clone())
                    .with_user(user.id);
                self.store.append_log(&entry).await?;
                info!(key_uid = %uid, user = %user.full_name(), "access granted");

                self.machine.transition_to(EngineState::Actuating)?;
                self.unlock().await?;
                self.machine.transition_to(EngineState::Idle)?;

                Ok(CycleOutcome::Unlocked {
                    uid,
                    user_id: user.id,
                })
            }
        }
    }

    async fn deny(
        &mut self,
        uid: CardUid,
        user_id: Option<UserId>,
        reason: DenyReason,
    ) -> Result<CycleOutcome> {
        let mut entry = NewLogEntry::new(LogKind::Deny)
            .with_key(uid.clone())
            .with_message(reason.message());
        entry.user_id = user_id;
        self.store.append_log(&entry).await?;
        warn!(key_uid = %uid, %reason, "access denied");

        self.show_bad_read().await?;
        self.machine.transition_to(EngineState::Idle)?;

        Ok(CycleOutcome::Denied {
            uid,
            user_id,
            reason,
        })
    }

    /// Release the lock with the unlock LED and buzzer, hold, then switch
    /// all three off even if switching them on failed.
    async fn unlock(&mut self) -> Result<()> {
        let asserted = self.set_unlock_outputs(true).await;
        if asserted.is_ok() {
            info!("door unlocked");
            tokio::time::sleep(self.config.unlock_hold()).await;
        }
        let released = self.set_unlock_outputs(false).await;
        info!("door locked");

        asserted?;
        released
    }

    async fn set_unlock_outputs(&mut self, on: bool) -> Result<()> {
        let lock = self.hardware.set_lock(on).await;
        let led = self.hardware.set_indicator(Indicator::UnlockLed, on).await;
        let buzzer = self.hardware.set_indicator(Indicator::Buzzer, on).await;
        lock?;
        led?;
        buzzer?;
        Ok(())
    }

    async fn show_bad_read(&mut self) -> Result<()> {
        let period = self.config.blink_period();
        for _ in 0..self.config.deny_blinks {
            self.set_deny_outputs(true).await?;
            tokio::time::sleep(period).await;
            self.set_deny_outputs(false).await?;
            tokio::time::sleep(period).await;
        }
        Ok(())
    }

    async fn set_deny_outputs(&mut self, on: bool) -> Result<()> {
        self.hardware.set_indicator(Indicator::DenyLed, on).await?;
        self.hardware.set_indicator(Indicator::Buzzer, on).await?;
        Ok(())
    }
}
