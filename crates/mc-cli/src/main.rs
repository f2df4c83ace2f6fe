mod calendar;
mod memory;
mod task;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use mc_store::MissionStore;
use serde_json::{json, Value};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Default window the calendar views look at: two weeks back, a month ahead.
const WINDOW_BACK_MS: i64 = 14 * DAY_MS;
const WINDOW_AHEAD_MS: i64 = 30 * DAY_MS;

#[derive(Parser)]
#[command(name = "mc")]
#[command(about = "Mission Control CLI", long_about = None)]
struct Cli {
    /// Path to the mission database; defaults to the user data directory
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the task board
    Task {
        #[command(subcommand)]
        action: task::TaskCommand,
    },
    /// Manage the calendar and tracked cron jobs
    Calendar {
        #[command(subcommand)]
        action: calendar::CalendarCommand,
    },
    /// Manage the memory store
    Mem {
        #[command(subcommand)]
        action: memory::MemCommand,
    },
    /// Aggregate counts across all three boards
    Summary,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = open_store(cli.db)?;

    match cli.command {
        Commands::Task { action } => task::run(&store, action),
        Commands::Calendar { action } => calendar::run(&store, action),
        Commands::Mem { action } => memory::run(&store, action),
        Commands::Summary => summary(&store),
    }
}

fn summary(store: &MissionStore) -> Result<()> {
    let now = now_ms();
    let payload = json!({
        "tasks": store.task_summary()?,
        "calendar": store.calendar_summary(now - WINDOW_BACK_MS, now + WINDOW_AHEAD_MS)?,
        "memory": store.memory_summary()?,
    });
    print_json(&payload)
}

fn open_store(db: Option<PathBuf>) -> Result<MissionStore> {
    let path = match db {
        Some(path) => path,
        None => default_db_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    MissionStore::open(&path)
        .with_context(|| format!("Failed to open mission db at {}", path.display()))
}

fn default_db_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Could not resolve a user data directory")?;
    Ok(base.join("mission-control").join("mission.db"))
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn default_window(now: i64) -> (i64, i64) {
    (now - WINDOW_BACK_MS, now + WINDOW_AHEAD_MS)
}

pub(crate) fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn format_ts(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| format!("{ms}ms"))
}

/// Read a JSON payload from a file, or from stdin when the path is `-`.
pub(crate) fn read_payload(path: &str) -> Result<Value> {
    let raw = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read payload from stdin")?;
        buffer
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read payload from {path}"))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Payload in {path} is not valid JSON"))
}
