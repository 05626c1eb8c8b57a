//! Inspects a snapshot database: lists saved bots, dumps a bot's engine
//! blobs, or deletes a stale snapshot after a retired bot is decommissioned.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use grid_core::snapshot::SnapshotStore;
use grid_core::utils::init_logger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect a bot snapshot database")]
struct Args {
    /// Path to the SQLite snapshot database.
    #[arg(short, long)]
    db: PathBuf,

    /// Log level (e.g. info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON instead of pretty text.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every bot with a saved snapshot.
    List,
    /// Show the saved engine blobs for one bot.
    Show {
        /// Bot name as it appears in the `[[bin]]` config.
        bot_name: String,
    },
    /// Delete a bot's saved snapshot.
    Delete {
        /// Bot name as it appears in the `[[bin]]` config.
        bot_name: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, args.json_logs);

    let store = SnapshotStore::open(&args.db)?;

    match args.command {
        Command::List => {
            let bots = store.list_bots()?;
            if bots.is_empty() {
                println!("no snapshots found in {}", args.db.display());
            } else {
                for name in bots {
                    println!("{name}");
                }
            }
        }
        Command::Show { bot_name } => {
            let Some(snapshot) = store.load(&bot_name)? else {
                bail!("no snapshot found for bot '{bot_name}'");
            };
            println!("bot_name: {}", snapshot.bot_name);
            println!("saved_at: {}", snapshot.saved_at.to_rfc3339());
            for (engine, blob) in &snapshot.engines {
                println!("--- {engine} ---");
                println!("{blob}");
            }
        }
        Command::Delete { bot_name } => {
            store.delete(&bot_name)?;
            tracing::info!(bot_name = %bot_name, "deleted snapshot");
        }
    }

    Ok(())
}
