use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod calendar;
pub mod memory;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid value `{value}` for field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Assignee {
    Operator,
    Assistant,
}

impl Assignee {
    pub fn as_str(&self) -> &'static str {
        match self {
            Assignee::Operator => "operator",
            Assignee::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Assignee {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "operator" => Ok(Assignee::Operator),
            "assistant" => Ok(Assignee::Assistant),
            other => Err(format!("Unknown assignee: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" | "in-progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "blocked" => Ok(TaskStatus::Blocked),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    Manual,
    AssistantAuto,
}

impl TaskSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskSource::Manual => "manual",
            TaskSource::AssistantAuto => "assistant_auto",
        }
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskSource {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "manual" => Ok(TaskSource::Manual),
            "assistant_auto" | "assistant-auto" => Ok(TaskSource::AssistantAuto),
            other => Err(format!("Unknown source: {other}")),
        }
    }
}

/// A task-board record. `auto_key` is the natural key automation callers
/// upsert by; tasks created by hand carry none and never match an upsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee: Assignee,
    pub source: TaskSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCreate {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Assignee,
    pub status: Option<TaskStatus>,
}

impl TaskCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }
}

/// Fields an automation caller may supply when upserting by `auto_key`.
/// `None` means "leave the existing value in place" on a matched record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpsert {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Assignee,
    pub status: Option<TaskStatus>,
    pub last_event: Option<String>,
}

impl TaskUpsert {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)
    }

    pub fn from_value(value: &Value) -> Result<(String, Self), ValidationError> {
        let auto_key = require_str(value, "autoKey")?;
        let draft = TaskUpsert {
            title: require_str(value, "title")?,
            description: optional_str(value, "description")?,
            assignee: require_enum(value, "assignee")?,
            status: optional_enum(value, "status")?,
            last_event: optional_str(value, "lastEvent")?,
        };
        draft.validate()?;
        Ok((auto_key, draft))
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub done: usize,
    pub auto: usize,
    pub manual: usize,
}

impl TaskSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let auto = tasks
            .iter()
            .filter(|t| t.source == TaskSource::AssistantAuto)
            .count();
        TaskSummary {
            total: tasks.len(),
            todo: count(TaskStatus::Todo),
            in_progress: count(TaskStatus::InProgress),
            blocked: count(TaskStatus::Blocked),
            done: count(TaskStatus::Done),
            auto,
            manual: tasks.len() - auto,
        }
    }
}

/// Outcome of a batch sync. Partial failure is the expected steady state:
/// each failing item is reported by key and never hidden behind an overall
/// success flag.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub key: String,
    pub error: String,
}

impl SyncReport {
    pub fn record_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, key: impl Into<String>, error: impl fmt::Display) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(SyncFailure {
            key: key.into(),
            error: error.to_string(),
        });
    }
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn require_str(value: &Value, field: &'static str) -> Result<String, ValidationError> {
    match value.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Null) | None => Err(ValidationError::MissingField(field)),
        Some(Value::String(_)) => Err(ValidationError::MissingField(field)),
        Some(other) => Err(invalid(field, other, "expected a string")),
    }
}

pub(crate) fn optional_str(
    value: &Value,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match value.get(field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(invalid(field, other, "expected a string")),
    }
}

pub(crate) fn require_i64(value: &Value, field: &'static str) -> Result<i64, ValidationError> {
    match value.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| invalid(field, &value[field], "expected integer milliseconds")),
        Some(Value::Null) | None => Err(ValidationError::MissingField(field)),
        Some(other) => Err(invalid(field, other, "expected a number")),
    }
}

pub(crate) fn optional_i64(
    value: &Value,
    field: &'static str,
) -> Result<Option<i64>, ValidationError> {
    match value.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(field, &value[field], "expected integer milliseconds")),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(invalid(field, other, "expected a number")),
    }
}

pub(crate) fn optional_string_list(
    value: &Value,
    field: &'static str,
) -> Result<Option<Vec<String>>, ValidationError> {
    match value.get(field) {
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => return Err(invalid(field, item, "expected an array of strings")),
                }
            }
            Ok(Some(out))
        }
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(invalid(field, other, "expected an array of strings")),
    }
}

pub(crate) fn require_enum<T>(value: &Value, field: &'static str) -> Result<T, ValidationError>
where
    T: FromStr<Err = String>,
{
    let raw = require_str(value, field)?;
    raw.parse().map_err(|reason| ValidationError::InvalidField {
        field,
        value: raw,
        reason,
    })
}

pub(crate) fn optional_enum<T>(
    value: &Value,
    field: &'static str,
) -> Result<Option<T>, ValidationError>
where
    T: FromStr<Err = String>,
{
    match optional_str(value, field)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|reason| ValidationError::InvalidField {
                field,
                value: raw,
                reason,
            }),
        None => Ok(None),
    }
}

fn invalid(field: &'static str, value: &Value, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
