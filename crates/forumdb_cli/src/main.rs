//! ForumDB CLI
//!
//! Command-line tools for ForumDB store files.
//!
//! # Commands
//!
//! - `init` - Create a store with the forum buckets
//! - `inspect` - Display log and bucket statistics
//! - `verify` - Check the log and decode every forum record
//! - `compact` - Rewrite the log as a single snapshot
//! - `list` - Print categories, topics or replies

mod commands;

use clap::{Parser, Subcommand};
use commands::list::ListKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ForumDB command-line tools.
#[derive(Parser)]
#[command(name = "forumdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a store with the forum buckets
    Init,

    /// Display log and bucket statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check the log and decode every forum record
    Verify,

    /// Rewrite the log as a single snapshot transaction
    Compact {
        /// Dry run - show what would be reclaimed
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Print categories, topics or replies
    List {
        /// What to list
        #[arg(value_enum)]
        kind: ListKind,

        /// Only topics filed under this category id
        #[arg(long)]
        category: Option<String>,

        /// Only replies to this topic id
        #[arg(long)]
        topic: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init => {
            let path = cli.path.ok_or("Store path required for init")?;
            commands::init::run(&path)?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Compact { dry_run } => {
            let path = cli.path.ok_or("Store path required for compact")?;
            commands::compact::run(&path, dry_run)?;
        }
        Commands::List {
            kind,
            category,
            topic,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for list")?;
            let filter = match kind {
                ListKind::Topics => category,
                ListKind::Replies => topic,
                ListKind::Categories => None,
            };
            commands::list::run(&path, kind, filter.as_deref(), &format)?;
        }
        Commands::Version => {
            println!("ForumDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("ForumDB v{}", forumdb::VERSION);
            println!("ForumDB Core v{}", forumdb_core::VERSION);
        }
    }

    Ok(())
}
