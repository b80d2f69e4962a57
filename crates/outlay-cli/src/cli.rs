use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use outlay_core::LocalId;

#[derive(Parser)]
#[command(name = "outlay")]
#[command(about = "Track expenses offline and mirror them to your cloud account")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for Firebase auth/sync configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new expense
    #[command(alias = "new")]
    Add {
        /// What the money was spent on
        title: String,
        /// Amount spent
        amount: String,
        /// Day of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
        /// Category (Food, Transport, Utilities, Entertainment, Shopping, Other)
        #[arg(short, long, default_value = "Other")]
        category: String,
    },
    /// List expenses, newest first
    List {
        /// Group expenses under per-category totals
        #[arg(long)]
        grouped: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing expense
    Edit {
        /// Local expense ID
        id: LocalId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        /// Day of the expense (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Delete an expense locally and from the remote collection
    Delete {
        /// Local expense ID
        id: LocalId,
    },
    /// Replace the local cache with the remote collection
    Sync,
    /// Upload expenses saved while the remote store was unreachable
    Push,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate CLI profile with Firebase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Firebase project ID
        #[arg(long, value_name = "ID")]
        project_id: Option<String>,
        /// Firebase web API key
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
        /// Firestore REST root (e.g. <http://localhost:8080/v1> for the emulator)
        #[arg(long, value_name = "URL")]
        firestore_url: Option<String>,
        /// Auth emulator root (e.g. <http://localhost:9099>)
        #[arg(long, value_name = "URL")]
        auth_emulator_url: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile config
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Firebase email/password and store session in keychain
    Login {
        /// Firebase account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Firebase account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create a Firebase account and sign in
    Signup {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for profile
    Status,
    /// Logout profile and clear stored session
    Logout,
}
