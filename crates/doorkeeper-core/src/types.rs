use crate::{
    Result,
    constants::{MAX_UID_BYTES, MIN_UID_BYTES, STATUS_ACTIVE},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database identifier of a user.
pub type UserId = i64;

/// UID of an NFC key (the card's physical serial).
///
/// Stored as lowercase hexadecimal, two digits per byte, which is the format
/// the readers print and the one already present in the key database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardUid(String);

impl CardUid {
    /// Parse a UID typed by an operator or printed by a reader tool.
    ///
    /// Surrounding whitespace and `:`/`-`/space separators are dropped and the
    /// result is lowercased.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardUid` if the value is not hexadecimal or its
    /// length is outside 4-10 bytes.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        let invalid = |reason: String| Error::InvalidCardUid {
            uid: raw.to_string(),
            reason,
        };

        if normalized.is_empty() {
            return Err(invalid("UID is empty".to_string()));
        }

        if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("UID must be hexadecimal".to_string()));
        }

        if normalized.len() % 2 != 0 {
            return Err(invalid("UID must have an even number of digits".to_string()));
        }

        let bytes = normalized.len() / 2;
        if !(MIN_UID_BYTES..=MAX_UID_BYTES).contains(&bytes) {
            return Err(invalid(format!(
                "UID must be {MIN_UID_BYTES}-{MAX_UID_BYTES} bytes, got {bytes}"
            )));
        }

        Ok(CardUid(normalized))
    }

    /// Build a UID from the raw bytes returned by a reader.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardUid` if the byte count is outside 4-10.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self::parse(&hex)
    }

    /// Get the UID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardUid::parse(s)
    }
}

impl TryFrom<String> for CardUid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardUid::parse(&value)
    }
}

impl From<CardUid> for String {
    fn from(uid: CardUid) -> String {
        uid.0
    }
}

/// Kind of an audit log entry.
///
/// The set is closed: anything else is rejected before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// A key was bound to a user.
    Assign,
    /// A user was set active.
    Activate,
    /// A user was set inactive.
    Deactivate,
    /// The door was released for a user.
    Unlock,
    /// A read was rejected.
    Deny,
    /// Free-form informational entry.
    Message,
    /// Free-form error entry.
    Error,
}

impl LogKind {
    /// Every kind, in declaration order.
    pub const ALL: [LogKind; 7] = [
        LogKind::Assign,
        LogKind::Activate,
        LogKind::Deactivate,
        LogKind::Unlock,
        LogKind::Deny,
        LogKind::Message,
        LogKind::Error,
    ];

    /// The value stored in the `kind` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Assign => "assign",
            LogKind::Activate => "activate",
            LogKind::Deactivate => "deactivate",
            LogKind::Unlock => "unlock",
            LogKind::Deny => "deny",
            LogKind::Message => "message",
            LogKind::Error => "error",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogKind {
    type Err = Error;

    /// Parse a log kind. The legacy spelling `de-activate` is accepted.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assign" => Ok(LogKind::Assign),
            "activate" => Ok(LogKind::Activate),
            "deactivate" | "de-activate" => Ok(LogKind::Deactivate),
            "unlock" => Ok(LogKind::Unlock),
            "deny" => Ok(LogKind::Deny),
            "message" => Ok(LogKind::Message),
            "error" => Ok(LogKind::Error),
            _ => Err(Error::InvalidLogKind(s.to_string())),
        }
    }
}

/// Membership status of a user.
///
/// The legal values are owned by the database (`user_statuses` table); the
/// application only relies on `active` granting access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserStatus(String);

impl UserStatus {
    /// Create a status value.
    ///
    /// # Errors
    /// Returns `Error::InvalidStatus` for empty or non-lowercase-ASCII values.
    pub fn new(status: &str) -> Result<Self> {
        let status = status.trim();
        if status.is_empty()
            || !status
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '-' || c == '_')
        {
            return Err(Error::InvalidStatus(status.to_string()));
        }
        Ok(UserStatus(status.to_string()))
    }

    /// The `active` status.
    #[must_use]
    pub fn active() -> Self {
        UserStatus(STATUS_ACTIVE.to_string())
    }

    /// Returns `true` if this status grants access.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.0 == STATUS_ACTIVE
    }

    /// Get the status as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        UserStatus::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a1b2c3d4", "a1b2c3d4")]
    #[case("A1B2C3D4", "a1b2c3d4")]
    #[case("  04:ab:cd:ef \n", "04abcdef")]
    #[case("04-AB-CD-EF-01-02-03", "04abcdef010203")]
    fn test_card_uid_valid(#[case] input: &str, #[case] expected: &str) {
        let uid = CardUid::parse(input).unwrap();
        assert_eq!(uid.as_str(), expected);
    }

    #[rstest]
    #[case("")] // empty
    #[case("a1b2c3")] // 3 bytes
    #[case("a1b2c3d")] // odd digit count
    #[case("zzzzzzzz")] // not hex
    #[case("0102030405060708090a0b")] // 11 bytes
    fn test_card_uid_invalid(#[case] input: &str) {
        assert!(CardUid::parse(input).is_err());
    }

    #[test]
    fn test_card_uid_from_bytes() {
        let uid = CardUid::from_bytes(&[0x04, 0xAB, 0x0C, 0xEF]).unwrap();
        assert_eq!(uid.to_string(), "04ab0cef");

        assert!(CardUid::from_bytes(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn test_card_uid_serde_validates() {
        let parsed: std::result::Result<CardUid, _> =
            serde_json::from_str::<CardUid>("\"not-a-uid\"");
        assert!(parsed.is_err());
    }

    #[rstest]
    #[case("assign", LogKind::Assign)]
    #[case("activate", LogKind::Activate)]
    #[case("deactivate", LogKind::Deactivate)]
    #[case("de-activate", LogKind::Deactivate)]
    #[case("UNLOCK", LogKind::Unlock)]
    #[case("deny", LogKind::Deny)]
    #[case("message", LogKind::Message)]
    #[case("error", LogKind::Error)]
    fn test_log_kind_parse(#[case] input: &str, #[case] expected: LogKind) {
        assert_eq!(input.parse::<LogKind>().unwrap(), expected);
    }

    #[test]
    fn test_log_kind_rejects_unknown() {
        let err = "open".parse::<LogKind>().unwrap_err();
        assert_eq!(err, Error::InvalidLogKind("open".to_string()));
    }

    #[test]
    fn test_log_kind_names_are_canonical() {
        for kind in LogKind::ALL {
            assert_eq!(kind.as_str().parse::<LogKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_user_status() {
        assert!(UserStatus::active().is_active());
        assert!(!UserStatus::new("inactive").unwrap().is_active());
        assert!(UserStatus::new("").is_err());
        assert!(UserStatus::new("Active").is_err());
    }
}
