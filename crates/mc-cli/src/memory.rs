use crate::{format_ts, now_ms, print_json, read_payload};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use ignore::WalkBuilder;
use mc_core::memory::{automation_source_path, MemoryCreate, MemorySourceDoc, MemoryUpsert};
use mc_core::SyncReport;
use mc_store::MissionStore;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum MemCommand {
    /// List documents, optionally filtered by a search term
    #[command(alias = "search")]
    List(MemListArgs),
    Add(MemAddArgs),
    /// Upsert an automation memory from a JSON payload keyed by `autoKey`
    Upsert(MemUpsertArgs),
    /// Sync MEMORY.md and memory/**/*.md from a workspace directory
    Sync(MemSyncArgs),
    Summary,
}

#[derive(Args, Debug)]
pub struct MemListArgs {
    pub term: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MemAddArgs {
    pub title: String,
    pub content: String,
    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,
    #[arg(long)]
    pub source_path: Option<String>,
}

#[derive(Args, Debug)]
pub struct MemUpsertArgs {
    /// Payload file, or `-` for stdin
    #[arg(default_value = "-")]
    pub payload: String,
}

#[derive(Args, Debug)]
pub struct MemSyncArgs {
    /// Workspace root containing MEMORY.md and the memory/ directory
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

pub fn run(store: &MissionStore, command: MemCommand) -> Result<()> {
    match command {
        MemCommand::List(args) => list(store, args),
        MemCommand::Add(args) => add(store, args),
        MemCommand::Upsert(args) => upsert(store, args),
        MemCommand::Sync(args) => sync(store, args),
        MemCommand::Summary => print_json(&store.memory_summary()?),
    }
}

fn list(store: &MissionStore, args: MemListArgs) -> Result<()> {
    let docs = store.search_memory_docs(args.term.as_deref())?;
    if args.json {
        return print_json(&docs);
    }

    println!("Found {} documents:", docs.len());
    for doc in &docs {
        println!(
            "- {} {} [{}] ({})",
            format_ts(doc.updated_at),
            doc.title,
            doc.tags.join(", "),
            doc.source_path.as_deref().unwrap_or("unfiled")
        );
    }
    Ok(())
}

fn add(store: &MissionStore, args: MemAddArgs) -> Result<()> {
    let draft = MemoryCreate {
        title: args.title,
        content: args.content,
        tags: args.tags,
        source_path: args.source_path,
    };
    let id = store.create_memory_doc(&draft, now_ms())?;
    println!("{id}");
    Ok(())
}

fn upsert(store: &MissionStore, args: MemUpsertArgs) -> Result<()> {
    let payload = read_payload(&args.payload)?;
    let (auto_key, draft) = MemoryUpsert::from_automation_value(&payload)?;
    let id = store.upsert_automation_memory(&auto_key, &draft, now_ms())?;
    info!(source_path = %automation_source_path(&auto_key), "automation memory upserted");
    print_json(&json!({ "ok": true, "id": id }))
}

fn sync(store: &MissionStore, args: MemSyncArgs) -> Result<()> {
    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("Workspace root {} not found", args.root.display()))?;

    let candidates = discover_markdown(&root);
    info!(
        root = %root.display(),
        files = candidates.len(),
        "syncing workspace memory"
    );

    let mut docs = Vec::new();
    let mut read_failures: Vec<(String, String)> = Vec::new();

    for path in candidates {
        let source_path = relative_source_path(&root, &path);
        match fs::read_to_string(&path) {
            Ok(content) => docs.push(MemorySourceDoc {
                doc: MemoryUpsert {
                    title: title_for(&path),
                    content,
                    tags: Some(tags_for(&source_path)),
                },
                source_path,
            }),
            Err(err) => read_failures.push((source_path, err.to_string())),
        }
    }

    let mut report: SyncReport = store.sync_memory_docs(&docs, now_ms());
    for (source_path, error) in read_failures {
        report.record_failure(source_path, error);
    }

    for failure in &report.failures {
        warn!(key = %failure.key, error = %failure.error, "memory doc not synced");
    }
    print_json(&report)
}

/// MEMORY.md at the workspace root plus every markdown file under memory/,
/// sorted so sync order is stable across runs.
fn discover_markdown(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let long_term = root.join("MEMORY.md");
    if long_term.is_file() {
        files.push(long_term);
    }

    let daily_dir = root.join("memory");
    if daily_dir.is_dir() {
        for entry in WalkBuilder::new(&daily_dir).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable walk entry");
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_some_and(|t| t.is_file())
                && path.extension().and_then(|e| e.to_str()) == Some("md")
            {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files
}

fn relative_source_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn title_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.to_uppercase() == "MEMORY" {
        return "Long-term Memory".to_string();
    }
    stem
}

fn tags_for(source_path: &str) -> Vec<String> {
    let mut tags = vec!["memory".to_string()];
    if source_path.starts_with("memory/") {
        tags.push("daily".to_string());
    }
    if source_path == "MEMORY.md" {
        tags.push("long-term".to_string());
    }
    tags
}
