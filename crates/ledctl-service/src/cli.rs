//! `ledctld` command line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ledctld")]
#[command(about = "LED panel display rotation and arbitration daemon")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the display engine in the foreground until a shutdown signal arrives.
    Run {
        /// Directory containing plugin manifest files (`*.json`).
        #[arg(long, default_value = "/etc/ledctl/plugins")]
        plugins_dir: PathBuf,
        /// Path to the engine configuration file.
        #[arg(long, default_value = "/etc/ledctl/config.json")]
        config: PathBuf,
    },
}
