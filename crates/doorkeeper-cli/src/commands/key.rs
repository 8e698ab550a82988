use anyhow::Result;
use clap::Subcommand;
use doorkeeper_core::CardUid;
use doorkeeper_storage::{CredentialStore, KeyRepository};
use tracing::info;

use super::Admin;
use crate::output::{print_records, print_success};

#[derive(Debug, Subcommand)]
pub enum KeyCommand {
    /// Bind a key to a member and activate them
    Bind {
        /// User id or email
        user: String,
        uid: CardUid,
        /// Reassign the key if another member holds it
        #[arg(short, long)]
        steal: bool,
    },
    /// Remove a key from a member
    Unbind {
        /// User id or email
        user: String,
        uid: CardUid,
    },
    /// List a member's keys
    List {
        /// User id or email
        user: String,
    },
}

impl KeyCommand {
    pub async fn execute(&self, admin: &Admin) -> Result<()> {
        let format = admin.format();
        match self {
            Self::Bind { user, uid, steal } => {
                let user = admin.find_user(user).await?;
                admin.store().bind_key(uid, user.id, *steal).await?;
                info!(user_id = user.id, key_uid = %uid, steal, "key bound");
                print_success(format, &format!("Key {uid} bound to user {}", user.id));
            }
            Self::Unbind { user, uid } => {
                let user = admin.find_user(user).await?;
                admin.store().unbind_key(uid, user.id).await?;
                info!(user_id = user.id, key_uid = %uid, "key unbound");
                print_success(format, &format!("Key {uid} removed from user {}", user.id));
            }
            Self::List { user } => {
                let user = admin.find_user(user).await?;
                print_records(format, &admin.keys().list_for_user(user.id).await?)?;
            }
        }
        Ok(())
    }
}
