//! Sonda Control - CLI client for the Sonda forensic toolkit.
//!
//! Detects the local environment, reports on the companion agent, and
//! drives the case management backend.

mod auth;
mod backend;
mod commands;
mod errors;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sondactl")]
#[command(about = "Sonda - system detection and companion agent control", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the local system and show its profile
    Detect {
        /// Emit the raw profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the companion agent's status
    Agent,

    /// Show the recommended installer for this system
    Recommend,

    /// Generate the agent installer on the backend and download it
    Download {
        /// Write the installer to this path instead of the default name
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Ask the backend to open a case folder
    OpenFolder {
        /// Case session identifier
        session_id: String,
    },

    /// Finalize a case and remove it from the active list
    CompleteCase {
        /// Case session identifier
        session_id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { json } => commands::detect(json),
        Commands::Agent => commands::agent().await,
        Commands::Recommend => commands::recommend(),
        Commands::Download { output } => commands::download(output).await,
        Commands::OpenFolder { session_id } => commands::open_folder(&session_id).await,
        Commands::CompleteCase { session_id, yes } => {
            commands::complete_case(&session_id, yes).await
        }
    }
}
