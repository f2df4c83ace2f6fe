use crate::{default_window, format_ts, now_ms, print_json, read_payload};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use mc_core::calendar::{
    CronJobSync, CronRun, ItemCreate, ItemKind, ItemSource, ItemStatus, RunStatus,
    ScheduledEntryUpsert,
};
use mc_core::Assignee;
use mc_store::{MissionStore, RunOutcome};
use serde_json::json;
use tracing::{info, warn};

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum CalendarCommand {
    List(CalendarListArgs),
    Add(CalendarAddArgs),
    #[command(alias = "set-status")]
    Status(CalendarStatusArgs),
    Assign(CalendarAssignArgs),
    /// Upsert a tracked cron job from a JSON payload keyed by `cronJobId`
    UpsertCron(PayloadArgs),
    /// Upsert an automation-scheduled entry from a JSON payload keyed by `autoKey`
    UpsertScheduled(PayloadArgs),
    /// Sync a JSON array of cron jobs; bad items fail alone
    SyncCron(PayloadArgs),
    /// Record an execution outcome reported by an external scheduler
    RecordRun(RecordRunArgs),
    Summary,
}

#[derive(Args, Debug)]
pub struct CalendarListArgs {
    /// Window start in epoch milliseconds; defaults to two weeks back
    #[arg(long)]
    pub start: Option<i64>,
    /// Window end in epoch milliseconds; defaults to a month ahead
    #[arg(long)]
    pub end: Option<i64>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CalendarAddArgs {
    pub title: String,
    /// Nominal occurrence time in epoch milliseconds
    #[arg(long)]
    pub at: i64,
    #[arg(long, default_value = "scheduled_task")]
    pub kind: ItemKind,
    #[arg(long, default_value = "operator")]
    pub assignee: Assignee,
    #[arg(long, alias = "description")]
    pub desc: Option<String>,
    #[arg(long)]
    pub status: Option<ItemStatus>,
    #[arg(long, default_value = "manual")]
    pub source: ItemSource,
    #[arg(long)]
    pub cron_expr: Option<String>,
    #[arg(long)]
    pub cron_job_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct CalendarStatusArgs {
    pub id: String,
    pub status: ItemStatus,
}

#[derive(Args, Debug)]
pub struct CalendarAssignArgs {
    pub id: String,
    pub assignee: Assignee,
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Payload file, or `-` for stdin
    #[arg(default_value = "-")]
    pub payload: String,
}

#[derive(Args, Debug)]
pub struct RecordRunArgs {
    pub cron_job_id: String,
    #[arg(long)]
    pub status: RunStatus,
    /// Run time in epoch milliseconds; defaults to now
    #[arg(long)]
    pub at: Option<i64>,
    #[arg(long)]
    pub summary: Option<String>,
    #[arg(long)]
    pub next_run_at: Option<i64>,
}

pub fn run(store: &MissionStore, command: CalendarCommand) -> Result<()> {
    match command {
        CalendarCommand::List(args) => list(store, args),
        CalendarCommand::Add(args) => add(store, args),
        CalendarCommand::Status(args) => {
            store.set_item_status(&args.id, args.status, now_ms())?;
            Ok(())
        }
        CalendarCommand::Assign(args) => {
            store.set_item_assignee(&args.id, args.assignee, now_ms())?;
            Ok(())
        }
        CalendarCommand::UpsertCron(args) => upsert_cron(store, args),
        CalendarCommand::UpsertScheduled(args) => upsert_scheduled(store, args),
        CalendarCommand::SyncCron(args) => sync_cron(store, args),
        CalendarCommand::RecordRun(args) => record_run(store, args),
        CalendarCommand::Summary => {
            let (start, end) = default_window(now_ms());
            print_json(&store.calendar_summary(start, end)?)
        }
    }
}

fn list(store: &MissionStore, args: CalendarListArgs) -> Result<()> {
    let (default_start, default_end) = default_window(now_ms());
    let start = args.start.unwrap_or(default_start);
    let end = args.end.unwrap_or(default_end);

    let items = store.list_items_in_range(start, end)?;
    if args.json {
        return print_json(&items);
    }

    println!("Found {} items:", items.len());
    for item in &items {
        println!(
            "- {} [{}] {} ({}, {})",
            format_ts(item.effective_time()),
            item.status,
            item.title,
            item.kind,
            item.id
        );
    }
    Ok(())
}

fn add(store: &MissionStore, args: CalendarAddArgs) -> Result<()> {
    let draft = ItemCreate {
        title: args.title,
        description: args.desc,
        kind: args.kind,
        assignee: args.assignee,
        status: args.status,
        scheduled_for: args.at,
        source: args.source,
        cron_expr: args.cron_expr,
        cron_job_id: args.cron_job_id,
    };
    let id = store.create_scheduled_item(&draft, now_ms())?;
    println!("{id}");
    Ok(())
}

fn upsert_cron(store: &MissionStore, args: PayloadArgs) -> Result<()> {
    let payload = read_payload(&args.payload)?;
    let sync = CronJobSync::from_value(&payload)?;
    let id = store.upsert_cron_entry(&sync.cron_job_id, &sync.entry, now_ms())?;
    print_json(&json!({ "ok": true, "id": id }))
}

fn upsert_scheduled(store: &MissionStore, args: PayloadArgs) -> Result<()> {
    let payload = read_payload(&args.payload)?;
    let (auto_key, draft) = ScheduledEntryUpsert::from_value(&payload)?;
    let id = store.upsert_scheduled_entry(&auto_key, &draft, now_ms())?;
    print_json(&json!({ "ok": true, "id": id }))
}

fn sync_cron(store: &MissionStore, args: PayloadArgs) -> Result<()> {
    let payload = read_payload(&args.payload)?;
    let Some(jobs) = payload.as_array() else {
        bail!("sync-cron payload must be a JSON array of jobs");
    };

    let report = store.sync_cron_jobs(jobs, now_ms());
    info!(
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        "cron sync finished"
    );
    for failure in &report.failures {
        warn!(key = %failure.key, error = %failure.error, "cron job not synced");
    }
    print_json(&report)
}

fn record_run(store: &MissionStore, args: RecordRunArgs) -> Result<()> {
    let run = CronRun {
        run_at: args.at.unwrap_or_else(now_ms),
        status: args.status,
        summary: args.summary,
        next_run_at: args.next_run_at,
    };

    let payload = match store.record_cron_run(&args.cron_job_id, &run, now_ms())? {
        RunOutcome::Recorded { id } => json!({ "ok": true, "id": id }),
        RunOutcome::UnknownJob => {
            json!({ "ok": false, "reason": RunOutcome::UNKNOWN_JOB_REASON })
        }
    };
    print_json(&payload)
}
