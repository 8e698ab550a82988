//! Linux sysfs GPIO backend.
//!
//! Outputs and door contacts are driven through `/sys/class/gpio`; the card
//! reader is an external command (for example `nfc-read` from libnfc) that is
//! run once per attempt and prints the UID of the card in the field, or
//! nothing.

use crate::{
    HardwareError, Result,
    traits::DoorHardware,
    types::{GpioConfig, Indicator, OutputPin, ReadBudget, ReaderConfig},
};
use doorkeeper_core::CardUid;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Raw access to sysfs GPIO lines.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    base: PathBuf,
}

impl SysfsGpio {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.base.join(format!("gpio{pin}"))
    }

    /// Export `pin` unless the kernel already has it exported.
    pub async fn export(&self, pin: u32) -> Result<()> {
        let exists = tokio::fs::try_exists(self.pin_dir(pin))
            .await
            .map_err(|e| HardwareError::gpio(pin, e.to_string()))?;
        if exists {
            return Ok(());
        }

        tokio::fs::write(self.base.join("export"), pin.to_string())
            .await
            .map_err(|e| HardwareError::gpio(pin, format!("export failed: {e}")))
    }

    pub async fn unexport(&self, pin: u32) -> Result<()> {
        tokio::fs::write(self.base.join("unexport"), pin.to_string())
            .await
            .map_err(|e| HardwareError::gpio(pin, format!("unexport failed: {e}")))
    }

    pub async fn set_direction(&self, pin: u32, output: bool) -> Result<()> {
        let direction = if output { "out" } else { "in" };
        tokio::fs::write(self.pin_dir(pin).join("direction"), direction)
            .await
            .map_err(|e| HardwareError::gpio(pin, format!("set direction failed: {e}")))
    }

    pub async fn write(&self, pin: u32, high: bool) -> Result<()> {
        let value = if high { "1" } else { "0" };
        trace!(pin, value, "gpio write");
        tokio::fs::write(self.pin_dir(pin).join("value"), value)
            .await
            .map_err(|e| HardwareError::gpio(pin, format!("write failed: {e}")))
    }

    pub async fn read(&self, pin: u32) -> Result<bool> {
        let raw = tokio::fs::read_to_string(self.pin_dir(pin).join("value"))
            .await
            .map_err(|e| HardwareError::gpio(pin, format!("read failed: {e}")))?;

        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(HardwareError::gpio(pin, format!("unexpected value '{other}'"))),
        }
    }
}

/// Lock, indicators and door contacts wired to GPIO lines.
///
/// Shared by every backend that talks to the board through sysfs.
#[derive(Debug)]
pub struct GpioOutputs {
    gpio: SysfsGpio,
    config: GpioConfig,
}

impl GpioOutputs {
    /// Export and configure every configured line and switch all outputs off.
    pub async fn open(config: GpioConfig) -> Result<Self> {
        let gpio = SysfsGpio::new(config.base_path.clone());

        for output in Self::outputs(&config) {
            gpio.export(output.pin).await?;
            gpio.set_direction(output.pin, true).await?;
            gpio.write(output.pin, output.level(false)).await?;
        }
        for &pin in &config.door_sensors {
            gpio.export(pin).await?;
            gpio.set_direction(pin, false).await?;
        }

        debug!(base = %config.base_path.display(), "gpio lines configured");
        Ok(Self { gpio, config })
    }

    fn outputs(config: &GpioConfig) -> [OutputPin; 4] {
        [
            config.latch,
            config.unlock_led,
            config.deny_led,
            config.buzzer,
        ]
    }

    fn indicator_pin(&self, indicator: Indicator) -> OutputPin {
        match indicator {
            Indicator::UnlockLed => self.config.unlock_led,
            Indicator::DenyLed => self.config.deny_led,
            Indicator::Buzzer => self.config.buzzer,
        }
    }

    async fn set_output(&self, output: OutputPin, on: bool) -> Result<()> {
        self.gpio.write(output.pin, output.level(on)).await
    }

    pub async fn set_reader_power(&self, on: bool) -> Result<()> {
        self.set_output(self.config.deny_led, on).await?;
        if on {
            self.set_output(self.config.unlock_led, false).await?;
            self.set_output(self.config.latch, false).await?;
        }
        Ok(())
    }

    pub async fn set_lock(&self, released: bool) -> Result<()> {
        self.set_output(self.config.latch, released).await
    }

    pub async fn set_indicator(&self, indicator: Indicator, on: bool) -> Result<()> {
        self.set_output(self.indicator_pin(indicator), on).await
    }

    pub async fn read_door_sensor(&self, door: usize) -> Result<bool> {
        let pin = *self
            .config
            .door_sensors
            .get(door)
            .ok_or(HardwareError::UnknownDoor {
                door,
                count: self.config.door_sensors.len(),
            })?;
        let high = self.gpio.read(pin).await?;
        Ok(high != self.config.door_open_low)
    }

    pub fn door_count(&self) -> usize {
        self.config.door_sensors.len()
    }

    /// Switch every output off, attempting all of them even if one fails.
    pub async fn cleanup(&self) -> Result<()> {
        let mut first_error = None;
        for output in Self::outputs(&self.config) {
            if let Err(e) = self.set_output(output, false).await {
                warn!(pin = output.pin, error = %e, "failed to reset output");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Card reader backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandReader {
    config: ReaderConfig,
}

impl CommandReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Run the reader command once.
    ///
    /// Empty output or a non-zero exit status means no card. Output that is
    /// not a UID is an `InvalidUid` error.
    pub async fn attempt(&self) -> Result<Option<CardUid>> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let timeout = Duration::from_millis(self.config.command_timeout_ms);
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| HardwareError::read_timeout(self.config.command_timeout_ms))?
            .map_err(|e| {
                HardwareError::card_read(format!("cannot run '{}': {e}", self.config.command))
            })?;

        if !output.status.success() {
            trace!(status = ?output.status, "reader command reported no card");
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        if text.is_empty() {
            return Ok(None);
        }

        CardUid::parse(text)
            .map(Some)
            .map_err(|e| HardwareError::invalid_uid(e.to_string()))
    }
}

/// Run `attempt` up to `budget.attempts` times, sleeping between attempts,
/// and return the first card seen.
///
/// A transient read failure uses up one attempt; it is returned only when
/// the last attempt fails.
pub(crate) async fn poll_reader<F, Fut>(budget: ReadBudget, mut attempt: F) -> Result<Option<CardUid>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<CardUid>>>,
{
    for n in 0..budget.attempts {
        let last = n + 1 >= budget.attempts;
        match attempt().await {
            Ok(Some(uid)) => {
                debug!(%uid, attempt = n, "card read");
                return Ok(Some(uid));
            }
            Ok(None) => {}
            Err(e) if e.is_transient_read_failure() && !last => {
                debug!(error = %e, attempt = n, "read attempt failed, retrying");
            }
            Err(e) => return Err(e),
        }
        if !last {
            tokio::time::sleep(budget.interval).await;
        }
    }
    Ok(None)
}

/// Door controller on sysfs GPIO with a command-line card reader.
#[derive(Debug)]
pub struct SysfsDoor {
    outputs: GpioOutputs,
    reader: CommandReader,
}

impl SysfsDoor {
    pub async fn open(gpio: GpioConfig, reader: ReaderConfig) -> Result<Self> {
        Ok(Self {
            outputs: GpioOutputs::open(gpio).await?,
            reader: CommandReader::new(reader),
        })
    }
}

impl DoorHardware for SysfsDoor {
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
