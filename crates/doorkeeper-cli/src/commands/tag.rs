use anyhow::Result;
use clap::Subcommand;
use doorkeeper_storage::TagRepository;
use tracing::info;

use super::Admin;
use crate::output::{print_records, print_success};

#[derive(Debug, Subcommand)]
pub enum TagCommand {
    /// Create an authorization tag
    Add { name: String },
    /// List tags
    List,
}

impl TagCommand {
    pub async fn execute(&self, admin: &Admin) -> Result<()> {
        let tags = admin.tags();
        match self {
            Self::Add { name } => {
                let id = tags.create(name).await?;
                info!(tag_id = id, %name, "tag created");
                print_success(admin.format(), &format!("Created tag {name}"));
            }
            Self::List => print_records(admin.format(), &tags.list().await?)?,
        }
        Ok(())
    }
}
