pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::config;
use crate::database::{DatabaseManager, DocumentStore};

#[derive(Parser)]
#[command(name = "cms")]
#[command(about = "Maintenance tasks for the association CMS")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Provision an admin account")]
    CreateAdmin {
        #[arg(help = "Admin email address")]
        email: String,
        #[arg(help = "Initial password")]
        password: String,
    },

    #[command(about = "Remove placeholder image URLs from every content collection")]
    CleanupPlaceholders {
        #[arg(long, help = "Report what would change without writing")]
        dry_run: bool,
    },

    #[command(about = "Sign in to a running server and upload an image")]
    Upload {
        #[arg(help = "Image file to upload")]
        file: PathBuf,
        #[arg(long, default_value = "misc", help = "Storage prefix, e.g. news or gallery")]
        path: String,
        #[arg(long, default_value = "http://localhost:3000", help = "Server base URL")]
        server: String,
        #[arg(long, help = "Admin email")]
        email: String,
        #[arg(long, help = "Admin password")]
        password: String,
        #[arg(long, help = "Fall back to an inline data URI if the server upload fails")]
        allow_fallback: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Configured document store. Maintenance against the in-process store would
/// be lost on exit, so a database URL is required.
async fn open_store() -> anyhow::Result<Arc<dyn DocumentStore>> {
    let database = &config().database;
    if database.url.is_none() {
        anyhow::bail!("DATABASE_URL must be set for maintenance commands");
    }
    Ok(DatabaseManager::open(database).await?)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::CreateAdmin { email, password } => {
            let store = open_store().await?;
            commands::admin::handle(store.as_ref(), &email, &password, output_format).await
        }
        Commands::CleanupPlaceholders { dry_run } => {
            let store = open_store().await?;
            commands::cleanup::handle(store.as_ref(), dry_run, output_format).await
        }
        Commands::Upload {
            file,
            path,
            server,
            email,
            password,
            allow_fallback,
        } => {
            let args = commands::upload::UploadArgs {
                file,
                path,
                server,
                email,
                password,
                allow_fallback,
            };
            commands::upload::handle(args, output_format).await
        }
    }
}
