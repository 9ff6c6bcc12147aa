//! User directory command handlers.

use anyhow::Result;
use clap::Subcommand;
use postport::security::{Capability, authorize};
use postport::storage::UserDirectory;

use super::Session;

/// User subcommands.
#[derive(Subcommand)]
pub enum UserAction {
    /// Add a user.
    Add {
        /// Login name, unique.
        #[arg(long)]
        login: String,

        /// Name matched against the CSV `Author` column.
        #[arg(long)]
        display_name: String,
    },
    /// List users.
    List,
}

/// Executes a user subcommand.
pub fn cmd_user(session: &Session, action: UserAction) -> Result<()> {
    authorize(&session.operator, Capability::ManageOptions)?;
    let directory = session.context.directory();

    match action {
        UserAction::Add {
            login,
            display_name,
        } => {
            let user = directory.add_user(login.trim(), display_name.trim())?;
            println!("Added user {} ({}) with ID {}", user.login, user.display_name, user.id);
        },
        UserAction::List => {
            let users = directory.list_users()?;
            if users.is_empty() {
                println!("No users.");
            }
            for user in users {
                println!("{:>6}  {:<20}  {}", user.id.get(), user.login, user.display_name);
            }
        },
    }
    Ok(())
}
