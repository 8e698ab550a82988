use anyhow::Result;
use clap::{ArgGroup, Args, Subcommand};
use doorkeeper_core::CardUid;
use doorkeeper_storage::AuthorizationQuery;
use serde::Serialize;

use super::Admin;
use crate::output::OutputFormat;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Whether a member, or the holder of a key, may use a tag
    Check(CheckArgs),
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("subject").required(true).args(["user", "key"])))]
pub struct CheckArgs {
    /// User id or email
    #[arg(long)]
    pub user: Option<String>,
    /// Key UID
    #[arg(long)]
    pub key: Option<CardUid>,
    #[arg(long)]
    pub tag: String,
}

#[derive(Debug, Serialize)]
struct Verdict<'a> {
    subject: String,
    tag: &'a str,
    authorized: bool,
}

impl AuthCommand {
    pub async fn execute(&self, admin: &Admin) -> Result<()> {
        let Self::Check(args) = self;
        let authorized = check(admin, args).await?;

        let subject = match (&args.user, &args.key) {
            (Some(user), _) => format!("user {user}"),
            (None, Some(key)) => format!("key {key}"),
            (None, None) => String::new(),
        };
        match admin.format() {
            OutputFormat::Human => {
                let verdict = if authorized { "is" } else { "is not" };
                println!("{subject} {verdict} authorized for {}", args.tag);
            }
            OutputFormat::Json => {
                let verdict = Verdict {
                    subject,
                    tag: &args.tag,
                    authorized,
                };
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            }
        }
        Ok(())
    }
}

/// Run the authorization query for `args`.
///
/// A user argument must name an existing member; an unknown key is simply
/// not authorized.
pub async fn check(admin: &Admin, args: &CheckArgs) -> Result<bool> {
    let query = admin.authorization();
    match (&args.user, &args.key) {
        (Some(user), _) => {
            let user = admin.find_user(user).await?;
            Ok(query.user_has_tag(user.id, &args.tag).await?)
        }
        (None, Some(key)) => Ok(query.key_has_tag(key, &args.tag).await?),
        (None, None) => anyhow::bail!("either --user or --key is required"),
    }
}
