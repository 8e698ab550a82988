use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid card UID '{uid}': {reason}")]
    InvalidCardUid { uid: String, reason: String },

    #[error("Invalid log kind: {0}")]
    InvalidLogKind(String),

    #[error("Invalid user status: {0}")]
    InvalidStatus(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;
