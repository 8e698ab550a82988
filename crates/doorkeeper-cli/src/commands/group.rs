use anyhow::Result;
use clap::Subcommand;
use doorkeeper_storage::GroupRepository;
use tracing::info;

use super::Admin;
use crate::output::{print_records, print_success};

#[derive(Debug, Subcommand)]
pub enum GroupCommand {
    /// Create a group
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List groups with member counts and tags
    List,
    /// Delete a group and its memberships
    Delete { name: String },
    /// Grant a tag to a group
    Authorize { group: String, tag: String },
    /// Take a tag away from a group
    Revoke { group: String, tag: String },
    /// Add a member to a group
    Join {
        group: String,
        /// User id or email
        user: String,
    },
    /// Remove a member from a group
    Leave {
        group: String,
        /// User id or email
        user: String,
    },
}

impl GroupCommand {
    pub async fn execute(&self, admin: &Admin) -> Result<()> {
        let groups = admin.groups();
        let format = admin.format();

        match self {
            Self::Add { name, description } => {
                let id = groups.create(name, description.as_deref()).await?;
                info!(group_id = id, %name, "group created");
                print_success(format, &format!("Created group {name}"));
            }
            Self::List => print_records(format, &groups.list().await?)?,
            Self::Delete { name } => {
                let group = admin.find_group(name).await?;
                groups.delete(group.id).await?;
                info!(group_id = group.id, %name, "group deleted");
                print_success(format, &format!("Deleted group {name}"));
            }
            Self::Authorize { group, tag } | Self::Revoke { group, tag } => {
                let on = matches!(self, Self::Authorize { .. });
                let found = admin.find_group(group).await?;
                groups.set_authorization(found.id, tag, on).await?;
                info!(group_id = found.id, %tag, on, "group authorization changed");
                let verb = if on { "granted to" } else { "revoked from" };
                print_success(format, &format!("Tag {tag} {verb} group {group}"));
            }
            Self::Join { group, user } => {
                let found = admin.find_group(group).await?;
                let user = admin.find_user(user).await?;
                groups.add_member(found.id, user.id).await?;
                info!(group_id = found.id, user_id = user.id, "member joined group");
                print_success(format, &format!("User {} joined group {group}", user.id));
            }
            Self::Leave { group, user } => {
                let found = admin.find_group(group).await?;
                let user = admin.find_user(user).await?;
                groups.remove_member(found.id, user.id).await?;
                info!(group_id = found.id, user_id = user.id, "member left group");
                print_success(format, &format!("User {} left group {group}", user.id));
            }
        }
        Ok(())
    }
}
