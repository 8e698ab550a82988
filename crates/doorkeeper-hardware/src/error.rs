//! Errors raised by the door peripherals.

pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The reader (or the service in front of it) cannot be reached.
    #[error("Card reader unavailable: {reader}")]
    ReaderUnavailable { reader: String },

    /// A single reader attempt did not finish in time.
    #[error("Card reader did not answer within {after_ms}ms")]
    ReadTimeout { after_ms: u64 },

    /// The reader answered with an error.
    #[error("Card reader error: {message}")]
    Reader { message: String },

    /// The reader returned something that is not a card UID.
    #[error("Invalid card UID from reader: {message}")]
    InvalidUid { message: String },

    /// The card was seen but could not be read.
    #[error("Card read failed: {message}")]
    CardRead { message: String },

    #[error("Hardware configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown door {door} (configured doors: {count})")]
    UnknownDoor { door: usize, count: usize },

    #[error("GPIO {pin}: {message}")]
    Gpio { pin: u32, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn reader_unavailable(reader: impl Into<String>) -> Self {
        Self::ReaderUnavailable {
            reader: reader.into(),
        }
    }

    pub fn read_timeout(after_ms: u64) -> Self {
        Self::ReadTimeout { after_ms }
    }

    pub fn reader(message: impl Into<String>) -> Self {
        Self::Reader {
            message: message.into(),
        }
    }

    pub fn invalid_uid(message: impl Into<String>) -> Self {
        Self::InvalidUid {
            message: message.into(),
        }
    }

    pub fn card_read(message: impl Into<String>) -> Self {
        Self::CardRead {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn gpio(pin: u32, message: impl Into<String>) -> Self {
        Self::Gpio {
            pin,
            message: message.into(),
        }
    }

    /// Returns `true` for failures of a single read that the caller may
    /// treat as "no card presented".
    pub fn is_transient_read_failure(&self) -> bool {
        matches!(
            self,
            Self::CardRead { .. }
                | Self::ReadTimeout { .. }
                | Self::Reader { .. }
                | Self::InvalidUid { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HardwareError::card_read("antenna off"), true)]
    #[case(HardwareError::read_timeout(3000), true)]
    #[case(HardwareError::reader("SW 6A81"), true)]
    #[case(HardwareError::invalid_uid("zz"), true)]
    #[case(HardwareError::reader_unavailable("ACR122U"), false)]
    #[case(HardwareError::configuration("bad pin"), false)]
    #[case(HardwareError::gpio(4, "permission denied"), false)]
    #[case(HardwareError::UnknownDoor { door: 3, count: 2 }, false)]
    fn test_transient_read_failures(#[case] error: HardwareError, #[case] transient: bool) {
        assert_eq!(error.is_transient_read_failure(), transient);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            HardwareError::read_timeout(3000).to_string(),
            "Card reader did not answer within 3000ms"
        );
        assert_eq!(
            HardwareError::gpio(4, "permission denied").to_string(),
            "GPIO 4: permission denied"
        );
        assert_eq!(
            HardwareError::UnknownDoor { door: 3, count: 2 }.to_string(),
            "Unknown door 3 (configured doors: 2)"
        );
    }
}
