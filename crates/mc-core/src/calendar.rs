//! Calendar contracts: scheduled items, cron tracking, and the run-outcome
//! mapping shared by the store and the CLI.

use crate::{
    optional_enum, optional_i64, optional_str, require_enum, require_i64, require_str,
    require_text, Assignee, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    ScheduledTask,
    CronJob,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::ScheduledTask => "scheduled_task",
            ItemKind::CronJob => "cron_job",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "scheduled_task" | "scheduled-task" => Ok(ItemKind::ScheduledTask),
            "cron_job" | "cron-job" => Ok(ItemKind::CronJob),
            other => Err(format!("Unknown kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Scheduled,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl Default for ItemStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Scheduled => "scheduled",
            ItemStatus::Running => "running",
            ItemStatus::Completed => "completed",
            ItemStatus::Cancelled => "cancelled",
            ItemStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "scheduled" => Ok(ItemStatus::Scheduled),
            "running" => Ok(ItemStatus::Running),
            "completed" => Ok(ItemStatus::Completed),
            "cancelled" | "canceled" => Ok(ItemStatus::Cancelled),
            "failed" => Ok(ItemStatus::Failed),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    Manual,
    Cron,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSource::Manual => "manual",
            ItemSource::Cron => "cron",
        }
    }
}

impl fmt::Display for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemSource {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "manual" => Ok(ItemSource::Manual),
            "cron" => Ok(ItemSource::Cron),
            other => Err(format!("Unknown source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    Running,
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Running => "running",
            RunStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            "running" => Ok(RunStatus::Running),
            "skipped" => Ok(RunStatus::Skipped),
            other => Err(format!("Unknown run status: {other}")),
        }
    }
}

/// Translate a recorded run outcome into the item's lifecycle status.
/// `skipped` leaves the current status in place while `running` sets it;
/// that asymmetry is load-bearing for external schedulers that probe jobs
/// they intend to skip.
pub fn map_run_status(run: RunStatus, current: ItemStatus) -> ItemStatus {
    match run {
        RunStatus::Success => ItemStatus::Completed,
        RunStatus::Failed => ItemStatus::Failed,
        RunStatus::Running => ItemStatus::Running,
        RunStatus::Skipped => current,
    }
}

/// A calendar record: a one-off scheduled task or a tracked cron job.
/// `cron_job_id` and `auto_key` are the natural keys for the two upsert
/// flavors; run fields are overwritten wholesale on each recorded run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: ItemKind,
    pub assignee: Assignee,
    pub status: ItemStatus,
    pub scheduled_for: i64,
    pub source: ItemSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_status: Option<RunStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_summary: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ScheduledItem {
    /// The time this item sorts and filters by. A long-lived cron job keeps
    /// its original `scheduled_for` while `next_run_at` tracks the rolling
    /// next occurrence.
    pub fn effective_time(&self) -> i64 {
        match self.kind {
            ItemKind::CronJob => self.next_run_at.unwrap_or(self.scheduled_for),
            ItemKind::ScheduledTask => self.scheduled_for,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCreate {
    pub title: String,
    pub description: Option<String>,
    pub kind: ItemKind,
    pub assignee: Assignee,
    pub status: Option<ItemStatus>,
    pub scheduled_for: i64,
    pub source: ItemSource,
    pub cron_expr: Option<String>,
    pub cron_job_id: Option<String>,
}

impl ItemCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }
}

/// Upsert draft for a tracked cron job, keyed by `cron_job_id`. The nominal
/// time always follows the next occurrence: both `scheduled_for` and
/// `next_run_at` land on `next_run_at ?? scheduled_for`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronEntryUpsert {
    pub title: String,
    pub scheduled_for: i64,
    pub assignee: Assignee,
    pub cron_expr: Option<String>,
    pub status: Option<ItemStatus>,
    pub next_run_at: Option<i64>,
}

impl CronEntryUpsert {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }

    pub fn next_occurrence(&self) -> i64 {
        self.next_run_at.unwrap_or(self.scheduled_for)
    }
}

/// One element of a cron sync batch: the natural key plus the entry draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronJobSync {
    pub cron_job_id: String,
    pub entry: CronEntryUpsert,
}

impl CronJobSync {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let cron_job_id = require_str(value, "cronJobId")?;
        let entry = CronEntryUpsert {
            title: require_str(value, "title")?,
            scheduled_for: require_i64(value, "scheduledFor")?,
            assignee: require_enum(value, "assignee")?,
            cron_expr: optional_str(value, "cronExpr")?,
            status: optional_enum(value, "status")?,
            next_run_at: optional_i64(value, "nextRunAt")?,
        };
        entry.validate()?;
        Ok(CronJobSync { cron_job_id, entry })
    }
}

/// Upsert draft for an automation-scheduled one-off, keyed by `auto_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEntryUpsert {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_for: i64,
    pub assignee: Assignee,
    pub status: Option<ItemStatus>,
    pub next_run_at: Option<i64>,
}

impl ScheduledEntryUpsert {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }

    pub fn from_value(value: &Value) -> Result<(String, Self), ValidationError> {
        let auto_key = require_str(value, "autoKey")?;
        let draft = ScheduledEntryUpsert {
            title: require_str(value, "title")?,
            description: optional_str(value, "description")?,
            scheduled_for: require_i64(value, "scheduledFor")?,
            assignee: require_enum(value, "assignee")?,
            status: optional_enum(value, "status")?,
            next_run_at: optional_i64(value, "nextRunAt")?,
        };
        draft.validate()?;
        Ok((auto_key, draft))
    }
}

/// A single execution outcome reported by an external scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronRun {
    pub run_at: i64,
    pub status: RunStatus,
    pub summary: Option<String>,
    pub next_run_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSummary {
    pub cron_jobs: usize,
    pub scheduled_tasks: usize,
    pub running: usize,
    pub failed: usize,
    pub next_runs: usize,
    pub total: usize,
}

impl CalendarSummary {
    pub fn from_items(items: &[ScheduledItem]) -> Self {
        CalendarSummary {
            cron_jobs: items.iter().filter(|i| i.kind == ItemKind::CronJob).count(),
            scheduled_tasks: items
                .iter()
                .filter(|i| i.kind == ItemKind::ScheduledTask)
                .count(),
            running: items
                .iter()
                .filter(|i| i.status == ItemStatus::Running)
                .count(),
            failed: items
                .iter()
                .filter(|i| i.status == ItemStatus::Failed)
                .count(),
            next_runs: items.iter().filter(|i| i.next_run_at.is_some()).count(),
            total: items.len(),
        }
    }
}
