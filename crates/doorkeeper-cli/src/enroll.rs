//! Key enrollment: bind an NFC key to a user and activate them.
//!
//! The `enroll` binary is a thin wrapper over [`Enrollment`]; this module
//! holds everything that can be exercised without a terminal or real
//! hardware.

use std::io::{self, BufRead, Write};

use doorkeeper_core::{CardUid, UserId};
use doorkeeper_hardware::{DoorHardware, HardwareError, ReadBudget};
use doorkeeper_storage::{CredentialStore, StorageError, User};
use thiserror::Error;
use tracing::{info, warn};

use crate::prompt::Prompt;

pub const EXIT_ENROLLED: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_KEY_ASSIGNED: u8 = 2;
pub const EXIT_USER_NOT_FOUND: u8 = 3;
pub const EXIT_NO_KEY: u8 = 4;
pub const EXIT_NOT_ROOT: u8 = 5;

#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("Root is required to enroll keys")]
    NotRoot,

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("No key read; user not enrolled")]
    NoKey,

    #[error("Key {key_uid} is already assigned to user {owner}; use --steal to reassign it")]
    KeyAssigned { key_uid: String, owner: UserId },

    #[error("Invalid key UID: {0}")]
    InvalidUid(String),

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error("Terminal error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EnrollError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotRoot => EXIT_NOT_ROOT,
            Self::UserNotFound(_) => EXIT_USER_NOT_FOUND,
            Self::NoKey => EXIT_NO_KEY,
            Self::KeyAssigned { .. } => EXIT_KEY_ASSIGNED,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<StorageError> for EnrollError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Conflict { key_uid, owner } => Self::KeyAssigned { key_uid, owner },
            StorageError::NotFound {
                entity_type, value, ..
            } if entity_type.eq_ignore_ascii_case("user") => Self::UserNotFound(value),
            other => Self::Storage(other),
        }
    }
}

/// Whether the process runs with an effective uid of 0.
pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and always succeeds.
    unsafe { libc::geteuid() == 0 }
}

/// Where the key UID comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Given on the command line.
    Given(String),
    /// Read from the NFC reader.
    Reader,
    /// Typed at the prompt.
    Prompt,
}

/// Look a user up by numeric id, or by email when `user` is not a number.
pub async fn resolve_user<S: CredentialStore>(store: &S, user: &str) -> Result<User, EnrollError> {
    let found = match user.trim().parse::<UserId>() {
        Ok(id) => store.resolve_by_user_id(id).await?,
        Err(_) => store.resolve_by_email(user.trim()).await?,
    };
    found.ok_or_else(|| EnrollError::UserNotFound(user.to_string()))
}

/// Power the reader, wait for one card within `budget`, then power it down
/// and clean up every output, even when the read failed.
pub async fn read_key<H: DoorHardware>(
    hardware: &mut H,
    budget: ReadBudget,
) -> Result<Option<CardUid>, EnrollError> {
    hardware.set_reader_power(true).await?;
    let read = hardware.read_card_uid(budget).await;

    let power_off = hardware.set_reader_power(false).await;
    let cleanup = hardware.cleanup_all_outputs().await;

    let uid = match read {
        Ok(uid) => uid,
        Err(e) if e.is_transient_read_failure() => {
            warn!(error = %e, "card read failed");
            None
        }
        Err(e) => return Err(e.into()),
    };
    power_off?;
    cleanup?;
    Ok(uid)
}

/// One enrollment run.
pub struct Enrollment<'a, S, R, W> {
    store: &'a S,
    prompt: Prompt<R, W>,
    quiet: bool,
    steal: bool,
}

impl<'a, S, R, W> Enrollment<'a, S, R, W>
where
    S: CredentialStore,
    R: BufRead,
    W: Write,
{
    pub fn new(store: &'a S, prompt: Prompt<R, W>) -> Self {
        Self {
            store,
            prompt,
            quiet: false,
            steal: false,
        }
    }

    /// Suppress prompts and progress messages.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Reassign keys already bound to someone else.
    pub fn steal(mut self, steal: bool) -> Self {
        self.steal = steal;
        self
    }

    fn message(&mut self, message: &str) -> Result<(), EnrollError> {
        if !self.quiet {
            self.prompt.say(message)?;
        }
        Ok(())
    }

    /// The user to enroll. Without `--user` the user is asked for, unless quiet.
    pub async fn user(&mut self, user: Option<&str>) -> Result<User, EnrollError> {
        let query = match user {
            Some(user) => user.to_string(),
            None if self.quiet => return Err(EnrollError::UserNotFound(String::new())),
            None => self.prompt.ask("User ID or email")?,
        };
        if query.is_empty() {
            return Err(EnrollError::UserNotFound(query));
        }
        resolve_user(self.store, &query).await
    }

    /// Obtain the key UID from `source`. `hardware` is only touched for
    /// [`KeySource::Reader`]; a failed read is retried while the operator
    /// confirms.
    pub async fn key<H: DoorHardware>(
        &mut self,
        source: KeySource,
        hardware: Option<&mut H>,
        budget: ReadBudget,
    ) -> Result<CardUid, EnrollError> {
        let raw = match source {
            KeySource::Given(uid) => Some(uid),
            KeySource::Prompt if self.quiet => None,
            KeySource::Prompt => Some(self.prompt.ask("Enter key UID")?).filter(|s| !s.is_empty()),
            KeySource::Reader => {
                let hardware = hardware.ok_or_else(|| {
                    EnrollError::Other(anyhow::anyhow!("no card reader available"))
                })?;
                loop {
                    self.message("Swipe card now")?;
                    match read_key(hardware, budget).await? {
                        Some(uid) => break Some(uid.to_string()),
                        None if self.quiet => break None,
                        None => {
                            if !self.prompt.confirm("Couldn't read card. Retry?")? {
                                break None;
                            }
                        }
                    }
                }
            }
        };

        let raw = raw.ok_or(EnrollError::NoKey)?;
        CardUid::parse(&raw).map_err(|_| EnrollError::InvalidUid(raw))
    }

    /// Bind `uid` to `user`, log it and activate the user.
    pub async fn bind(&mut self, uid: &CardUid, user: &User) -> Result<(), EnrollError> {
        self.store.bind_key(uid, user.id, self.steal).await?;
        info!(user_id = user.id, key_uid = %uid, steal = self.steal, "key enrolled");
        self.message(&format!("User [{}] enrolled with ID: {}", user.id, uid))?;
        Ok(())
    }

    pub fn into_prompt(self) -> Prompt<R, W> {
        self.prompt
    }
}
