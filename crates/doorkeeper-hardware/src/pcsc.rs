//! PC/SC card reader backend.
//!
//! Reads the UID with the pseudo-APDU `GET DATA` (`FF CA 00 00 00`) that
//! contactless PC/SC readers such as the ACR122U answer with the card's
//! serial number. Lock, indicators and door contacts stay on sysfs GPIO.

use crate::{
    HardwareError, Result,
    sysfs::{GpioOutputs, poll_reader},
    traits::DoorHardware,
    types::{GpioConfig, Indicator, ReadBudget},
};
use doorkeeper_core::CardUid;
use pcsc::{Context, Protocols, Scope, ShareMode};
use tracing::{debug, info};

/// `GET DATA` for the UID of the card in the field.
pub const GET_UID_APDU: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// PC/SC contactless reader.
pub struct PcscReader {
    context: Context,
    reader_name: Option<String>,
}

impl std::fmt::Debug for PcscReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscReader")
            .field("reader_name", &self.reader_name)
            .finish_non_exhaustive()
    }
}

impl PcscReader {
    /// Connect to the PC/SC service.
    pub fn establish(reader_name: Option<String>) -> Result<Self> {
        let context = Context::establish(Scope::User)
            .map_err(|e| HardwareError::reader_unavailable(format!("PC/SC service: {e}")))?;
        info!(reader = reader_name.as_deref().unwrap_or("<first>"), "PC/SC context established");
        Ok(Self {
            context,
            reader_name,
        })
    }

    /// Ask the reader once for the UID of the card in its field.
    pub async fn attempt(&self) -> Result<Option<CardUid>> {
        let context = self.context.clone();
        let reader_name = self.reader_name.clone();

        tokio::task::spawn_blocking(move || read_uid_blocking(&context, reader_name.as_deref()))
            .await
            .map_err(|e| HardwareError::reader(format!("reader task failed: {e}")))?
    }
}

fn read_uid_blocking(context: &Context, reader_name: Option<&str>) -> Result<Option<CardUid>> {
    let readers = context
        .list_readers_owned()
        .map_err(|e| HardwareError::reader(format!("cannot list readers: {e}")))?;

    let reader = match reader_name {
        Some(name) => readers.iter().find(|r| r.to_string_lossy() == name),
        None => readers.first(),
    }
    .ok_or_else(|| HardwareError::reader_unavailable(reader_name.unwrap_or("PC/SC reader")))?;

    let card = match context.connect(reader, ShareMode::Shared, Protocols::ANY) {
        Ok(card) => card,
        Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard | pcsc::Error::Timeout) => {
            return Ok(None);
        }
        Err(e) => return Err(HardwareError::card_read(e.to_string())),
    };

    let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
    let response = card
        .transmit(&GET_UID_APDU, &mut buffer)
        .map_err(|e| HardwareError::card_read(format!("GET DATA failed: {e}")))?;

    debug!(len = response.len(), "GET DATA response");
    parse_uid_response(response).map(Some)
}

/// Split a `GET DATA` response into the UID and check the status word.
pub fn parse_uid_response(response: &[u8]) -> Result<CardUid> {
    let Some((data, status)) = response.split_last_chunk::<2>() else {
        return Err(HardwareError::invalid_uid("response shorter than status word"));
    };

    if *status != [0x90, 0x00] {
        return Err(HardwareError::card_read(format!(
            "reader returned status {:02X}{:02X}",
            status[0], status[1]
        )));
    }

    CardUid::from_bytes(data).map_err(|e| HardwareError::invalid_uid(e.to_string()))
}

/// Door controller with a PC/SC reader and sysfs GPIO outputs.
#[derive(Debug)]
pub struct PcscDoor {
    outputs: GpioOutputs,
    reader: PcscReader,
}

impl PcscDoor {
    pub async fn open(gpio: GpioConfig, reader_name: Option<String>) -> Result<Self> {
        let reader = PcscReader::establish(reader_name)?;
        Ok(Self {
            outputs: GpioOutputs::open(gpio).await?,
            reader,
        })
    }
}

impl DoorHardware for PcscDoor {
    async fn read_card_uid(&mut self, budget: ReadBudget) -> Result<Option<CardUid>> {
        let reader = &self.reader;
        poll_reader(budget, || reader.attempt()).await
    }

    async fn set_reader_power(&mut self, on: bool) -> Result<()> {
        self.outputs.set_reader_power(on).await
    }

    async fn set_lock(&mut self, released: bool) -> Result<()> {
        self.outputs.set_lock(released).await
    }

    async fn set_indicator(&mut self, indicator: Indicator, on: bool) -> Result<()> {
        self.outputs.set_indicator(indicator, on).await
    }

    async fn read_door_sensor(&mut self, door: usize) -> Result<bool> {
        self.outputs.read_door_sensor(door).await
    }

    fn door_count(&self) -> usize {
        self.outputs.door_count()
    }

    async fn cleanup_all_outputs(&mut self) -> Result<()> {
        self.outputs.cleanup().await
    }
}
