//! Outlay CLI - track expenses from the terminal
//!
//! Records land in the local cache first and are mirrored to the signed-in
//! user's Firebase collection when a profile is configured.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{open_context, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, ExpenseEdits};
use crate::commands::list::run_list;
use crate::commands::sync::{run_push, run_sync};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(command, profile),
        Commands::Auth { command } => run_auth(command, profile).await,
        command => {
            let db_path = resolve_db_path(cli.db_path)?;
            let context = open_context(&db_path, profile).await?;
            tracing::debug!(
                "Using {} with profile '{}'",
                db_path.display(),
                context.profile_name
            );

            match command {
                Commands::Add {
                    title,
                    amount,
                    date,
                    category,
                } => run_add(&context, &title, &amount, date.as_deref(), &category).await,
                Commands::List { grouped, json } => run_list(&context, grouped, json),
                Commands::Edit {
                    id,
                    title,
                    amount,
                    date,
                    category,
                } => {
                    let edits = ExpenseEdits {
                        title,
                        amount,
                        date,
                        category,
                    };
                    run_edit(&context, id, edits).await
                }
                Commands::Delete { id } => run_delete(&context, id).await,
                Commands::Sync => run_sync(&context).await,
                Commands::Push => run_push(&context).await,
                Commands::Completions { .. } | Commands::Config { .. } | Commands::Auth { .. } => {
                    Ok(())
                }
            }
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "outlay=info"
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
