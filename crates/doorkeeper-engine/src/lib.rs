//! Access decision engine for the door controller.
//!
//! [`AccessEngine`] ties a [`DoorHardware`](doorkeeper_hardware::DoorHardware)
//! backend to a [`CredentialStore`](doorkeeper_storage::CredentialStore): it
//! polls the reader, watches the door contacts, logs every access attempt
//! and drives the lock and indicators. Each cycle moves through the
//! validated [`StateMachine`].
//!
//! # Example
//!
//! ```no_run
//! use doorkeeper_engine::{AccessEngine, EngineConfig};
//! use doorkeeper_hardware::mock::MockDoor;
//! use doorkeeper_storage::{Database, SqliteCredentialStore};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteCredentialStore::from_database(Database::in_memory().await?);
//! let (door, _handle) = MockDoor::new();
//!
//! let mut engine = AccessEngine::new(door, store, EngineConfig::default());
//! engine.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod door_monitor;
pub mod engine;
pub mod error;
pub mod messages;
pub mod state_machine;

pub use config::EngineConfig;
pub use door_monitor::{DoorMonitor, DoorTransition};
pub use engine::{AccessEngine, CycleOutcome, CycleReport};
pub use error::{EngineError, Result};
pub use messages::DenyReason;
pub use state_machine::{EngineState, StateMachine, StateTransition};
