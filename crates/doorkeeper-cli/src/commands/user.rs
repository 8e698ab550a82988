use anyhow::{Result, bail};
use clap::Subcommand;
use doorkeeper_core::UserStatus;
use doorkeeper_storage::{KeyRepository, NewUser, UserField, UserRepository, UserUpdate};
use tracing::info;

use super::{Admin, parse_assignment, parse_date};
use crate::output::{print_record, print_records, print_success};
use crate::prompt::Prompt;

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a member
    Add {
        email: String,
        first_name: String,
        last_name: String,
        /// Initial status (defaults to inactive)
        #[arg(long)]
        status: Option<UserStatus>,
        /// Join date, YYYY-MM-DD
        #[arg(long)]
        join_date: Option<String>,
        /// Read a password from stdin
        #[arg(long)]
        password_stdin: bool,
    },
    /// List every member
    List,
    /// Show a member with their keys and groups
    Show {
        /// User id or email
        user: String,
    },
    /// Change fields: email, first_name, last_name, join_date, status
    Update {
        /// User id or email
        user: String,
        /// FIELD=VALUE pairs
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    /// Delete a member with their keys, memberships and log entries
    Delete {
        /// User id or email
        user: String,
    },
    /// Search members, e.g. `smith group:board tag:"front door"`
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Set a member's password
    Passwd {
        /// User id or email
        user: String,
        /// New password; read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// List the valid status values
    Statuses,
}

impl UserCommand {
    pub async fn execute(&self, admin: &Admin) -> Result<()> {
        let users = admin.users();
        let format = admin.format();

        match self {
            Self::Add {
                email,
                first_name,
                last_name,
                status,
                join_date,
                password_stdin,
            } => {
                let mut new_user = NewUser::new(email, first_name, last_name);
                if let Some(status) = status {
                    new_user = new_user.with_status(status.clone());
                }
                if let Some(date) = join_date {
                    new_user = new_user.with_join_date(parse_date(date)?);
                }
                if *password_stdin {
                    new_user = new_user.with_password(read_password()?);
                }

                let id = users.create(&new_user).await?;
                info!(user_id = id, %email, "user created");
                print_success(format, &format!("Created user {id}"));
            }
            Self::List => print_records(format, &users.list_all().await?)?,
            Self::Show { user } => {
                let user = admin.find_user(user).await?;
                print_record(format, &user)?;
                if format == crate::output::OutputFormat::Human {
                    for binding in admin.keys().list_for_user(user.id).await? {
                        println!("  key\t{}", binding);
                    }
                    for group in &user.groups {
                        println!("  group\t{group}");
                    }
                }
            }
            Self::Update { user, assignments } => {
                let user = admin.find_user(user).await?;
                let update = build_update(assignments)?;
                users.update(user.id, &update).await?;
                info!(user_id = user.id, "user updated");
                print_success(format, &format!("Updated user {}", user.id));
            }
            Self::Delete { user } => {
                let user = admin.find_user(user).await?;
                users.delete(user.id).await?;
                info!(user_id = user.id, "user deleted");
                print_success(format, &format!("Deleted user {}", user.id));
            }
            Self::Search { query } => {
                print_records(format, &users.search(&query.join(" ")).await?)?;
            }
            Self::Passwd { user, password } => {
                let user = admin.find_user(user).await?;
                let password = match password {
                    Some(password) => password.clone(),
                    None => read_password()?,
                };
                if password.is_empty() {
                    bail!("password must not be empty");
                }
                users.set_password(user.id, &password).await?;
                info!(user_id = user.id, "password changed");
                print_success(format, &format!("Password set for user {}", user.id));
            }
            Self::Statuses => print_records(format, &users.valid_statuses().await?)?,
        }
        Ok(())
    }
}

/// Turn `FIELD=VALUE` pairs into a validated update.
pub(crate) fn build_update(assignments: &[String]) -> Result<UserUpdate> {
    let mut update = UserUpdate::new();
    for raw in assignments {
        let (field, value) = parse_assignment(raw)?;
        let field: UserField = field.parse()?;
        update = update.set(field, value)?;
    }
    Ok(update)
}

fn read_password() -> Result<String> {
    let mut prompt = Prompt::stdio();
    Ok(prompt.ask("Password")?)
}
