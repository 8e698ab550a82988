//! Reasons recorded in the audit log when a card is refused.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a presented card did not open the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No user owns the UID.
    UnknownCard,
    /// The owner's status is not `active`.
    InactiveUser,
}

impl DenyReason {
    pub const UNKNOWN_CARD: &'static str = "card not registered";
    pub const INACTIVE_USER: &'static str = "user is not active";

    /// Text stored in the `message` column of the deny entry.
    pub fn message(self) -> &'static str {
        match self {
            DenyReason::UnknownCard => Self::UNKNOWN_CARD,
            DenyReason::InactiveUser => Self::INACTIVE_USER,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}
