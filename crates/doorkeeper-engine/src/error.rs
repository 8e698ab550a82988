use doorkeeper_hardware::HardwareError;
use doorkeeper_storage::StorageError;
use thiserror::Error;

/// Errors that end the access loop.
///
/// Transient card read failures never surface here; the engine treats them
/// as "no card".
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("State error: {0}")]
    State(#[from] doorkeeper_core::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
