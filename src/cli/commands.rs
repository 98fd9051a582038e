use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "notice-relay")]
#[command(about = "Tracks notice boards and relays new notices to Telegram channels")]
#[command(version)]
pub struct Cli {
    /// Path or URL of the YAML config file
    #[arg(short, long, global = true, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Directory holding per-source history and the failure log
    #[arg(long, global = true, env = "NOTICE_DUMP_DIR")]
    pub dump_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every source and dispatch new notices
    Run {
        /// Dry run - don't send or record anything, just show what is new
        #[arg(long)]
        dry_run: bool,

        /// Skip notifications but still record new notices as sent
        #[arg(long, conflicts_with = "dry_run")]
        skip_notify: bool,
    },

    /// List configured sources with their dispatchers and history
    List,

    /// Show failed deliveries from the failure log
    Failures {
        /// Only show the most recent N records
        #[arg(short, long)]
        limit: Option<usize>,
    },
}
