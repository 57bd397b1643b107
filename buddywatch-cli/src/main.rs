//! BuddyWatch CLI.
//!
//! This binary provides a command-line interface to the BuddyWatch
//! library: roster management plus the long-running watch mode.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod error;

#[derive(Parser)]
#[command(name = "buddywatch")]
#[command(version = buddywatch::VERSION)]
#[command(about = "Watch buddy vessels and raise proximity alerts", long_about = None)]
struct Cli {
    /// Path to the configuration file (default: ~/.buddywatch/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the buddy roster
    List,

    /// Add a buddy to the roster
    Add {
        /// Vessel identifier (e.g. urn:mrn:imo:mmsi:123456789)
        id: String,

        /// Display name used in notifications
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove a buddy from the roster
    Remove {
        /// Vessel identifier
        id: String,
    },

    /// Change a buddy's display name (omit --name to clear it)
    Rename {
        /// Vessel identifier
        id: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Watch for buddy positions and publish proximity alerts
    Watch {
        /// UDP port to listen on (overrides the configured port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Command::List => commands::roster::list(config_path),
        Command::Add { id, name } => commands::roster::add(config_path, &id, name),
        Command::Remove { id } => commands::roster::remove(config_path, &id),
        Command::Rename { id, name } => commands::roster::rename(config_path, &id, name),
        Command::Watch { port } => commands::watch::run(config_path, port).await,
    };

    if let Err(e) = result {
        e.exit();
    }
}
