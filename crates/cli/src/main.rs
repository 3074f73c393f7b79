//! MP RECORDS CLI - Database migrations, admin accounts and backups.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mp-cli migrate
//!
//! # Create an admin account
//! mp-cli admin create -u kasia -p 'long password' -r editor
//!
//! # Write a backup archive
//! mp-cli backup export -o mprecords.zip
//!
//! # Restore from an archive, replacing matched records
//! mp-cli backup import -i mprecords.zip --overwrite
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `UPLOADS_DIR` - Directory of uploaded media (default: uploads)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mp-cli")]
#[command(author, version, about = "MP RECORDS CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Export or import backup archives
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// Account role (`admin`, `editor`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Write every record and referenced upload to a ZIP archive
    Export {
        /// Output file (default: timestamped name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore records and uploads from a ZIP archive
    Import {
        /// Archive to read
        #[arg(short, long)]
        input: PathBuf,

        /// Replace records matched by natural key instead of skipping them
        #[arg(long)]
        overwrite: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                password,
                role,
            } => {
                commands::admin::create_user(&username, &password, &role).await?;
            }
        },
        Commands::Backup { action } => match action {
            BackupAction::Export { output } => {
                commands::backup::export(output).await?;
            }
            BackupAction::Import { input, overwrite } => {
                commands::backup::import(&input, overwrite).await?;
            }
        },
    }
    Ok(())
}
