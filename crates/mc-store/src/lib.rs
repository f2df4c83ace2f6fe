use mc_core::calendar::{
    map_run_status, CalendarSummary, CronEntryUpsert, CronJobSync, CronRun, ItemCreate, ItemKind,
    ItemSource, ItemStatus, RunStatus, ScheduledEntryUpsert, ScheduledItem,
};
use mc_core::memory::{
    automation_source_path, MemoryCreate, MemoryDoc, MemorySourceDoc, MemorySummary, MemoryUpsert,
};
use mc_core::{
    Assignee, SyncReport, Task, TaskCreate, TaskSource, TaskStatus, TaskSummary, TaskUpsert,
    ValidationError,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

pub const MISSION_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("no {kind} record with id {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// Result of recording a run against a tracked cron job. A missing job is an
/// expected steady-state condition for external schedulers, so it is a typed
/// soft failure rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Recorded { id: String },
    UnknownJob,
}

impl RunOutcome {
    pub const UNKNOWN_JOB_REASON: &'static str = "cron_job_not_found";

    pub fn is_recorded(&self) -> bool {
        matches!(self, RunOutcome::Recorded { .. })
    }
}

/// Descriptor for one upsert-by-key record family: how to look a record up by
/// its natural key, insert a fresh one, and merge-patch an existing one.
/// The lookup/patch-or-insert/stamp-updated-at control flow lives once in
/// [`MissionStore::upsert_by_key`]; only the schema-specific pieces vary.
trait UpsertKind {
    const KEY_FIELD: &'static str;
    type Draft;
    type Existing;

    fn validate(draft: &Self::Draft) -> Result<(), ValidationError>;
    fn find(store: &MissionStore, key: &str) -> Result<Option<Self::Existing>, StoreError>;
    fn id(existing: &Self::Existing) -> &str;
    fn insert(
        store: &MissionStore,
        key: &str,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<String, StoreError>;
    fn merge(
        store: &MissionStore,
        existing: &Self::Existing,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<(), StoreError>;
}

struct AutomationTask;
struct CronEntry;
struct ScheduledEntry;
struct SourceDoc;

pub struct MissionStore {
    conn: Connection,
}

impl MissionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        let current = self.schema_version()?;
        if current > MISSION_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchemaVersion {
                found: current,
                supported: MISSION_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_mission_schema.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, StoreError> {
        let exists = self
            .conn
            .query_row(
                "
                SELECT 1
                FROM sqlite_master
                WHERE type='table' AND name = ?1
                LIMIT 1
                ",
                [table_name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    fn upsert_by_key<K: UpsertKind>(
        &self,
        key: &str,
        draft: &K::Draft,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        if key.trim().is_empty() {
            return Err(ValidationError::MissingField(K::KEY_FIELD).into());
        }
        K::validate(draft)?;

        match K::find(self, key)? {
            Some(existing) => {
                K::merge(self, &existing, draft, now_ms)?;
                Ok(K::id(&existing).to_string())
            }
            None => K::insert(self, key, draft, now_ms),
        }
    }

    // ---- task board ----

    pub fn create_task(&self, draft: &TaskCreate, now_ms: i64) -> Result<String, StoreError> {
        draft.validate()?;
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "
            INSERT INTO tasks (
                id, title, description, status, assignee, source,
                auto_key, last_event, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                id,
                draft.title,
                draft.description,
                draft.status.unwrap_or_default().as_str(),
                draft.assignee.as_str(),
                TaskSource::Manual.as_str(),
                Option::<String>::None,
                Option::<String>::None,
                now_ms,
                now_ms,
            ],
        )?;
        Ok(id)
    }

    pub fn upsert_automation_task(
        &self,
        auto_key: &str,
        draft: &TaskUpsert,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        self.upsert_by_key::<AutomationTask>(auto_key, draft, now_ms)
    }

    pub fn set_task_status(
        &self,
        id: &str,
        status: TaskStatus,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), now_ms],
        )?;
        require_found("task", id, changed)
    }

    pub fn set_task_assignee(
        &self,
        id: &str,
        assignee: Assignee,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET assignee = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, assignee.as_str(), now_ms],
        )?;
        require_found("task", id, changed)
    }

    pub fn update_task_details(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        if title.trim().is_empty() {
            return Err(ValidationError::MissingField("title").into());
        }
        let changed = self.conn.execute(
            "UPDATE tasks SET title = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, title, description, now_ms],
        )?;
        require_found("task", id, changed)
    }

    pub fn task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                [id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn task_by_auto_key(&self, auto_key: &str) -> Result<Option<Task>, StoreError> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE auto_key = ?1"),
                [auto_key],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY updated_at DESC, id ASC"
        ))?;
        let rows = statement.query_map([], task_from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    pub fn task_summary(&self) -> Result<TaskSummary, StoreError> {
        Ok(TaskSummary::from_tasks(&self.list_tasks()?))
    }

    // ---- calendar ----

    pub fn create_scheduled_item(
        &self,
        draft: &ItemCreate,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        draft.validate()?;
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            &format!(
                "
                INSERT INTO scheduled_items ({ITEM_COLUMNS})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                "
            ),
            params![
                id,
                draft.title,
                draft.description,
                draft.kind.as_str(),
                draft.assignee.as_str(),
                draft.status.unwrap_or_default().as_str(),
                draft.scheduled_for,
                draft.source.as_str(),
                draft.cron_expr,
                draft.cron_job_id,
                Option::<String>::None,
                // a fresh item's next occurrence is its nominal time
                draft.scheduled_for,
                Option::<i64>::None,
                Option::<String>::None,
                Option::<String>::None,
                now_ms,
                now_ms,
            ],
        )?;
        Ok(id)
    }

    pub fn upsert_cron_entry(
        &self,
        cron_job_id: &str,
        draft: &CronEntryUpsert,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        self.upsert_by_key::<CronEntry>(cron_job_id, draft, now_ms)
    }

    pub fn upsert_scheduled_entry(
        &self,
        auto_key: &str,
        draft: &ScheduledEntryUpsert,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        self.upsert_by_key::<ScheduledEntry>(auto_key, draft, now_ms)
    }

    /// Apply a batch of cron-job payloads sequentially. A bad item fails
    /// alone: its key and error land in the report and the rest of the batch
    /// still runs. There is no cross-item transaction.
    pub fn sync_cron_jobs(&self, jobs: &[Value], now_ms: i64) -> SyncReport {
        let mut report = SyncReport::default();

        for (index, value) in jobs.iter().enumerate() {
            let sync = match CronJobSync::from_value(value) {
                Ok(sync) => sync,
                Err(err) => {
                    report.record_failure(batch_key(value, index), err);
                    continue;
                }
            };
            match self.upsert_cron_entry(&sync.cron_job_id, &sync.entry, now_ms) {
                Ok(_) => report.record_success(),
                Err(err) => report.record_failure(sync.cron_job_id, err),
            }
        }

        report
    }

    /// Record an execution outcome against a tracked cron job. Unknown jobs
    /// resolve to [`RunOutcome::UnknownJob`] without touching the store.
    pub fn record_cron_run(
        &self,
        cron_job_id: &str,
        run: &CronRun,
        now_ms: i64,
    ) -> Result<RunOutcome, StoreError> {
        let Some(existing) = self.item_by_cron_job_id(cron_job_id)? else {
            return Ok(RunOutcome::UnknownJob);
        };

        let status = map_run_status(run.status, existing.status);
        let next_run_at = run.next_run_at.or(existing.next_run_at);
        let scheduled_for = run.next_run_at.unwrap_or(existing.scheduled_for);

        self.conn.execute(
            "
            UPDATE scheduled_items SET
                status = ?2,
                last_run_at = ?3,
                last_run_status = ?4,
                last_run_summary = ?5,
                next_run_at = ?6,
                scheduled_for = ?7,
                updated_at = ?8
            WHERE id = ?1
            ",
            params![
                existing.id,
                status.as_str(),
                run.run_at,
                run.status.as_str(),
                run.summary,
                next_run_at,
                scheduled_for,
                now_ms,
            ],
        )?;

        Ok(RunOutcome::Recorded { id: existing.id })
    }

    pub fn set_item_status(
        &self,
        id: &str,
        status: ItemStatus,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE scheduled_items SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), now_ms],
        )?;
        require_found("scheduled item", id, changed)
    }

    pub fn set_item_assignee(
        &self,
        id: &str,
        assignee: Assignee,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE scheduled_items SET assignee = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, assignee.as_str(), now_ms],
        )?;
        require_found("scheduled item", id, changed)
    }

    pub fn scheduled_item(&self, id: &str) -> Result<Option<ScheduledItem>, StoreError> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM scheduled_items WHERE id = ?1"),
                [id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn item_by_cron_job_id(
        &self,
        cron_job_id: &str,
    ) -> Result<Option<ScheduledItem>, StoreError> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM scheduled_items WHERE cron_job_id = ?1"),
                [cron_job_id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn item_by_auto_key(&self, auto_key: &str) -> Result<Option<ScheduledItem>, StoreError> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM scheduled_items WHERE auto_key = ?1"),
                [auto_key],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Items relevant to the closed window `[start, end]`: the union of
    /// records whose nominal time falls in range and records whose rolling
    /// next occurrence does. A long-lived cron job stays visible in a future
    /// window through `next_run_at` even though its `scheduled_for` is stale.
    /// Ascending by effective time; ties break on id so output is
    /// reproducible.
    pub fn list_items_in_range(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<ScheduledItem>, StoreError> {
        let mut merged: BTreeMap<String, ScheduledItem> = BTreeMap::new();

        for sql in [
            format!(
                "SELECT {ITEM_COLUMNS} FROM scheduled_items
                 WHERE scheduled_for >= ?1 AND scheduled_for <= ?2"
            ),
            format!(
                "SELECT {ITEM_COLUMNS} FROM scheduled_items
                 WHERE next_run_at >= ?1 AND next_run_at <= ?2"
            ),
        ] {
            let mut statement = self.conn.prepare(&sql)?;
            let rows = statement.query_map(params![start, end], item_from_row)?;
            for row in rows {
                let item = row?;
                merged.insert(item.id.clone(), item);
            }
        }

        let mut items: Vec<ScheduledItem> = merged.into_values().collect();
        items.sort_by(|a, b| {
            a.effective_time()
                .cmp(&b.effective_time())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(items)
    }

    pub fn calendar_summary(&self, start: i64, end: i64) -> Result<CalendarSummary, StoreError> {
        Ok(CalendarSummary::from_items(
            &self.list_items_in_range(start, end)?,
        ))
    }

    // ---- memory ----

    pub fn create_memory_doc(
        &self,
        draft: &MemoryCreate,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        draft.validate()?;
        let id = Uuid::new_v4().to_string();
        let tags_json = tags_to_json(draft.tags.as_deref().unwrap_or_default())?;
        self.conn.execute(
            "
            INSERT INTO memory_docs (
                id, title, content, tags_json, source_path, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                id,
                draft.title,
                draft.content,
                tags_json,
                draft.source_path,
                now_ms,
                now_ms,
            ],
        )?;
        Ok(id)
    }

    pub fn upsert_memory_from_source(
        &self,
        source_path: &str,
        draft: &MemoryUpsert,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        self.upsert_by_key::<SourceDoc>(source_path, draft, now_ms)
    }

    pub fn upsert_automation_memory(
        &self,
        auto_key: &str,
        draft: &MemoryUpsert,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        if auto_key.trim().is_empty() {
            return Err(ValidationError::MissingField("autoKey").into());
        }
        self.upsert_memory_from_source(&automation_source_path(auto_key), draft, now_ms)
    }

    /// Sync file-backed documents sequentially with per-item failure
    /// isolation, keyed by source path.
    pub fn sync_memory_docs(&self, docs: &[MemorySourceDoc], now_ms: i64) -> SyncReport {
        let mut report = SyncReport::default();

        for doc in docs {
            match self.upsert_memory_from_source(&doc.source_path, &doc.doc, now_ms) {
                Ok(_) => report.record_success(),
                Err(err) => report.record_failure(doc.source_path.clone(), err),
            }
        }

        report
    }

    pub fn memory_doc(&self, id: &str) -> Result<Option<MemoryDoc>, StoreError> {
        let doc = self
            .conn
            .query_row(
                &format!("SELECT {DOC_COLUMNS} FROM memory_docs WHERE id = ?1"),
                [id],
                doc_from_row,
            )
            .optional()?;
        Ok(doc)
    }

    pub fn memory_doc_by_source_path(
        &self,
        source_path: &str,
    ) -> Result<Option<MemoryDoc>, StoreError> {
        let doc = self
            .conn
            .query_row(
                &format!("SELECT {DOC_COLUMNS} FROM memory_docs WHERE source_path = ?1"),
                [source_path],
                doc_from_row,
            )
            .optional()?;
        Ok(doc)
    }

    /// All docs newest-first, optionally filtered by a case-insensitive
    /// substring match over title, content, and tags.
    pub fn search_memory_docs(&self, term: Option<&str>) -> Result<Vec<MemoryDoc>, StoreError> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {DOC_COLUMNS} FROM memory_docs ORDER BY updated_at DESC, id ASC"
        ))?;
        let rows = statement.query_map([], doc_from_row)?;

        let term = term.map(str::trim).filter(|t| !t.is_empty()).map(str::to_lowercase);
        let mut docs = Vec::new();
        for row in rows {
            let doc = row?;
            if term.as_deref().is_none_or(|t| doc.matches(t)) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    pub fn memory_summary(&self) -> Result<MemorySummary, StoreError> {
        Ok(MemorySummary::from_docs(&self.search_memory_docs(None)?))
    }
}

impl UpsertKind for AutomationTask {
    const KEY_FIELD: &'static str = "autoKey";
    type Draft = TaskUpsert;
    type Existing = Task;

    fn validate(draft: &Self::Draft) -> Result<(), ValidationError> {
        draft.validate()
    }

    fn find(store: &MissionStore, key: &str) -> Result<Option<Self::Existing>, StoreError> {
        store.task_by_auto_key(key)
    }

    fn id(existing: &Self::Existing) -> &str {
        &existing.id
    }

    fn insert(
        store: &MissionStore,
        key: &str,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        store.conn.execute(
            "
            INSERT INTO tasks (
                id, title, description, status, assignee, source,
                auto_key, last_event, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                id,
                draft.title,
                draft.description,
                draft.status.unwrap_or_default().as_str(),
                draft.assignee.as_str(),
                TaskSource::AssistantAuto.as_str(),
                key,
                draft.last_event,
                now_ms,
                now_ms,
            ],
        )?;
        Ok(id)
    }

    fn merge(
        store: &MissionStore,
        existing: &Self::Existing,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        store.conn.execute(
            "
            UPDATE tasks SET
                title = ?2,
                description = ?3,
                status = ?4,
                assignee = ?5,
                source = ?6,
                last_event = ?7,
                updated_at = ?8
            WHERE id = ?1
            ",
            params![
                existing.id,
                draft.title,
                draft.description.as_deref().or(existing.description.as_deref()),
                draft.status.unwrap_or(existing.status).as_str(),
                draft.assignee.as_str(),
                TaskSource::AssistantAuto.as_str(),
                draft.last_event.as_deref().or(existing.last_event.as_deref()),
                now_ms,
            ],
        )?;
        Ok(())
    }
}

impl UpsertKind for CronEntry {
    const KEY_FIELD: &'static str = "cronJobId";
    type Draft = CronEntryUpsert;
    type Existing = ScheduledItem;

    fn validate(draft: &Self::Draft) -> Result<(), ValidationError> {
        draft.validate()
    }

    fn find(store: &MissionStore, key: &str) -> Result<Option<Self::Existing>, StoreError> {
        store.item_by_cron_job_id(key)
    }

    fn id(existing: &Self::Existing) -> &str {
        &existing.id
    }

    fn insert(
        store: &MissionStore,
        key: &str,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let next = draft.next_occurrence();
        store.conn.execute(
            &format!(
                "
                INSERT INTO scheduled_items ({ITEM_COLUMNS})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                "
            ),
            params![
                id,
                draft.title,
                Option::<String>::None,
                ItemKind::CronJob.as_str(),
                draft.assignee.as_str(),
                draft.status.unwrap_or_default().as_str(),
                next,
                ItemSource::Cron.as_str(),
                draft.cron_expr,
                key,
                Option::<String>::None,
                next,
                Option::<i64>::None,
                Option::<String>::None,
                Option::<String>::None,
                now_ms,
                now_ms,
            ],
        )?;
        Ok(id)
    }

    fn merge(
        store: &MissionStore,
        existing: &Self::Existing,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        // the nominal time follows the next occurrence for tracked cron jobs
        let next = draft.next_occurrence();
        store.conn.execute(
            "
            UPDATE scheduled_items SET
                title = ?2,
                scheduled_for = ?3,
                assignee = ?4,
                cron_expr = ?5,
                status = ?6,
                next_run_at = ?7,
                updated_at = ?8
            WHERE id = ?1
            ",
            params![
                existing.id,
                draft.title,
                next,
                draft.assignee.as_str(),
                draft.cron_expr.as_deref().or(existing.cron_expr.as_deref()),
                draft.status.unwrap_or(existing.status).as_str(),
                next,
                now_ms,
            ],
        )?;
        Ok(())
    }
}

impl UpsertKind for ScheduledEntry {
    const KEY_FIELD: &'static str = "autoKey";
    type Draft = ScheduledEntryUpsert;
    type Existing = ScheduledItem;

    fn validate(draft: &Self::Draft) -> Result<(), ValidationError> {
        draft.validate()
    }

    fn find(store: &MissionStore, key: &str) -> Result<Option<Self::Existing>, StoreError> {
        store.item_by_auto_key(key)
    }

    fn id(existing: &Self::Existing) -> &str {
        &existing.id
    }

    fn insert(
        store: &MissionStore,
        key: &str,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        store.conn.execute(
            &format!(
                "
                INSERT INTO scheduled_items ({ITEM_COLUMNS})
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                "
            ),
            params![
                id,
                draft.title,
                draft.description,
                ItemKind::ScheduledTask.as_str(),
                draft.assignee.as_str(),
                draft.status.unwrap_or_default().as_str(),
                draft.scheduled_for,
                ItemSource::Manual.as_str(),
                Option::<String>::None,
                Option::<String>::None,
                key,
                draft.next_run_at.unwrap_or(draft.scheduled_for),
                Option::<i64>::None,
                Option::<String>::None,
                Option::<String>::None,
                now_ms,
                now_ms,
            ],
        )?;
        Ok(id)
    }

    fn merge(
        store: &MissionStore,
        existing: &Self::Existing,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        store.conn.execute(
            "
            UPDATE scheduled_items SET
                title = ?2,
                description = ?3,
                scheduled_for = ?4,
                assignee = ?5,
                status = ?6,
                next_run_at = ?7,
                updated_at = ?8
            WHERE id = ?1
            ",
            params![
                existing.id,
                draft.title,
                draft.description.as_deref().or(existing.description.as_deref()),
                draft.scheduled_for,
                draft.assignee.as_str(),
                draft.status.unwrap_or(existing.status).as_str(),
                draft.next_run_at.unwrap_or(draft.scheduled_for),
                now_ms,
            ],
        )?;
        Ok(())
    }
}

impl UpsertKind for SourceDoc {
    const KEY_FIELD: &'static str = "sourcePath";
    type Draft = MemoryUpsert;
    type Existing = MemoryDoc;

    fn validate(draft: &Self::Draft) -> Result<(), ValidationError> {
        draft.validate()
    }

    fn find(store: &MissionStore, key: &str) -> Result<Option<Self::Existing>, StoreError> {
        store.memory_doc_by_source_path(key)
    }

    fn id(existing: &Self::Existing) -> &str {
        &existing.id
    }

    fn insert(
        store: &MissionStore,
        key: &str,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let tags_json = tags_to_json(draft.tags.as_deref().unwrap_or_default())?;
        store.conn.execute(
            "
            INSERT INTO memory_docs (
                id, title, content, tags_json, source_path, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![id, draft.title, draft.content, tags_json, key, now_ms, now_ms],
        )?;
        Ok(id)
    }

    fn merge(
        store: &MissionStore,
        existing: &Self::Existing,
        draft: &Self::Draft,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        let tags_json = tags_to_json(draft.tags.as_deref().unwrap_or(&existing.tags))?;
        store.conn.execute(
            "
            UPDATE memory_docs SET
                title = ?2,
                content = ?3,
                tags_json = ?4,
                updated_at = ?5
            WHERE id = ?1
            ",
            params![existing.id, draft.title, draft.content, tags_json, now_ms],
        )?;
        Ok(())
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, assignee, source, \
     auto_key, last_event, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, title, description, kind, assignee, status, scheduled_for, \
     source, cron_expr, cron_job_id, auto_key, next_run_at, last_run_at, last_run_status, \
     last_run_summary, created_at, updated_at";

const DOC_COLUMNS: &str = "id, title, content, tags_json, source_path, created_at, updated_at";

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_column(row.get::<_, String>(3)?, 3)?,
        assignee: parse_column(row.get::<_, String>(4)?, 4)?,
        source: parse_column(row.get::<_, String>(5)?, 5)?,
        auto_key: row.get(6)?,
        last_event: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledItem> {
    let last_run_status = row
        .get::<_, Option<String>>(13)?
        .map(|raw| parse_column::<RunStatus>(raw, 13))
        .transpose()?;

    Ok(ScheduledItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        kind: parse_column(row.get::<_, String>(3)?, 3)?,
        assignee: parse_column(row.get::<_, String>(4)?, 4)?,
        status: parse_column(row.get::<_, String>(5)?, 5)?,
        scheduled_for: row.get(6)?,
        source: parse_column(row.get::<_, String>(7)?, 7)?,
        cron_expr: row.get(8)?,
        cron_job_id: row.get(9)?,
        auto_key: row.get(10)?,
        next_run_at: row.get(11)?,
        last_run_at: row.get(12)?,
        last_run_status,
        last_run_summary: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn doc_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryDoc> {
    let tags_json: String = row.get(3)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(err))
    })?;

    Ok(MemoryDoc {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        tags,
        source_path: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn parse_column<T>(raw: String, index: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(|message: String| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
        )
    })
}

fn tags_to_json(tags: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(tags).map_err(|err| StoreError::Serialization(err.to_string()))
}

fn require_found(kind: &'static str, id: &str, changed: usize) -> Result<(), StoreError> {
    if changed == 0 {
        return Err(StoreError::NotFound {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn batch_key(value: &Value, index: usize) -> String {
    value
        .get("cronJobId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    fn cron_draft(title: &str) -> CronEntryUpsert {
        CronEntryUpsert {
            title: title.to_string(),
            scheduled_for: 1_000,
            assignee: Assignee::Assistant,
            cron_expr: None,
            status: None,
            next_run_at: None,
        }
    }

    fn task_draft(title: &str) -> TaskUpsert {
        TaskUpsert {
            title: title.to_string(),
            description: None,
            assignee: Assignee::Assistant,
            status: None,
            last_event: None,
        }
    }

    #[test]
    fn migration_creates_mission_tables() {
        let db = MissionStore::open_in_memory().expect("open db");

        for table in ["tasks", "scheduled_items", "memory_docs"] {
            assert!(db.table_exists(table).expect("table check"));
        }
        assert_eq!(
            db.schema_version().expect("schema version"),
            MISSION_SCHEMA_VERSION
        );
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let file = NamedTempFile::new().expect("temp db");

        let id = {
            let db = MissionStore::open(file.path()).expect("open db");
            db.upsert_automation_task("report:weekly", &task_draft("Weekly report"), 10)
                .expect("upsert task")
        };

        let db = MissionStore::open(file.path()).expect("reopen db");
        let task = db.task(&id).expect("load").expect("task present");
        assert_eq!(task.title, "Weekly report");
        assert_eq!(task.auto_key.as_deref(), Some("report:weekly"));
    }

    #[test]
    fn upsert_task_is_idempotent_and_advances_updated_at() {
        let db = MissionStore::open_in_memory().expect("open db");
        let draft = task_draft("Triage inbox");

        let first = db
            .upsert_automation_task("inbox:triage", &draft, 1_000)
            .expect("first upsert");
        let second = db
            .upsert_automation_task("inbox:triage", &draft, 2_000)
            .expect("second upsert");

        assert_eq!(first, second);
        assert_eq!(db.list_tasks().expect("list").len(), 1);

        let task = db.task(&first).expect("load").expect("present");
        assert_eq!(task.created_at, 1_000);
        assert_eq!(task.updated_at, 2_000);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.source, TaskSource::AssistantAuto);
    }

    #[test]
    fn merge_patch_preserves_omitted_fields() {
        let db = MissionStore::open_in_memory().expect("open db");

        let mut draft = cron_draft("Nightly backup");
        draft.cron_expr = Some("0 2 * * *".to_string());
        db.upsert_cron_entry("job-backup", &draft, 100)
            .expect("seed entry");

        let id = db
            .upsert_cron_entry("job-backup", &cron_draft("Nightly backup v2"), 200)
            .expect("patch entry");

        let item = db.scheduled_item(&id).expect("load").expect("present");
        assert_eq!(item.title, "Nightly backup v2");
        assert_eq!(item.cron_expr.as_deref(), Some("0 2 * * *"));
        assert_eq!(item.updated_at, 200);
    }

    #[test]
    fn omitted_status_keeps_the_existing_status() {
        let db = MissionStore::open_in_memory().expect("open db");

        let mut seeded = cron_draft("Flaky job");
        seeded.status = Some(ItemStatus::Failed);
        db.upsert_cron_entry("job-flaky", &seeded, 100)
            .expect("seed entry");

        let id = db
            .upsert_cron_entry("job-flaky", &cron_draft("Flaky job"), 200)
            .expect("patch without status");

        let item = db.scheduled_item(&id).expect("load").expect("present");
        assert_eq!(item.status, ItemStatus::Failed);
    }

    #[test]
    fn keyless_records_never_collide() {
        let db = MissionStore::open_in_memory().expect("open db");

        let create = TaskCreate {
            title: "Handwritten".to_string(),
            description: None,
            assignee: Assignee::Operator,
            status: None,
        };
        let a = db.create_task(&create, 10).expect("first manual task");
        let b = db.create_task(&create, 20).expect("second manual task");
        assert_ne!(a, b);

        db.upsert_automation_task("auto:1", &task_draft("Automated"), 30)
            .expect("keyed upsert");

        let tasks = db.list_tasks().expect("list");
        assert_eq!(tasks.len(), 3);
        assert_eq!(
            tasks.iter().filter(|t| t.auto_key.is_none()).count(),
            2,
            "manual tasks must stay distinct records"
        );
    }

    #[test]
    fn repeated_upserts_keep_exactly_one_record_per_key() {
        let db = MissionStore::open_in_memory().expect("open db");

        for (title, now) in [("a", 1), ("b", 2), ("c", 3)] {
            db.upsert_cron_entry("job-one", &cron_draft(title), now)
                .expect("upsert");
        }

        let items = db.list_items_in_range(0, 10_000).expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "c");
    }

    #[test]
    fn cron_upsert_couples_nominal_time_to_next_occurrence() {
        let db = MissionStore::open_in_memory().expect("open db");

        let mut draft = cron_draft("Rolling job");
        draft.next_run_at = Some(5_000);
        let id = db
            .upsert_cron_entry("job-roll", &draft, 100)
            .expect("insert");

        let item = db.scheduled_item(&id).expect("load").expect("present");
        assert_eq!(item.scheduled_for, 5_000);
        assert_eq!(item.next_run_at, Some(5_000));

        let mut patch = cron_draft("Rolling job");
        patch.next_run_at = Some(9_000);
        db.upsert_cron_entry("job-roll", &patch, 200).expect("patch");

        let item = db.scheduled_item(&id).expect("load").expect("present");
        assert_eq!(item.scheduled_for, 9_000);
        assert_eq!(item.next_run_at, Some(9_000));
    }

    #[test]
    fn record_run_maps_outcomes_to_lifecycle_status() {
        let db = MissionStore::open_in_memory().expect("open db");
        db.upsert_cron_entry("job-1", &cron_draft("Job"), 100)
            .expect("seed");

        let run = CronRun {
            run_at: 500,
            status: RunStatus::Success,
            summary: Some("ok".to_string()),
            next_run_at: None,
        };
        let outcome = db.record_cron_run("job-1", &run, 600).expect("record");
        assert!(outcome.is_recorded());

        let item = db
            .item_by_cron_job_id("job-1")
            .expect("load")
            .expect("present");
        assert_eq!(item.status, ItemStatus::Completed);
        assert_eq!(item.last_run_at, Some(500));
        assert_eq!(item.last_run_status, Some(RunStatus::Success));
        assert_eq!(item.last_run_summary.as_deref(), Some("ok"));
        assert_eq!(item.updated_at, 600);
    }

    #[test]
    fn skipped_run_leaves_status_untouched() {
        let db = MissionStore::open_in_memory().expect("open db");

        let mut draft = cron_draft("Job");
        draft.status = Some(ItemStatus::Failed);
        db.upsert_cron_entry("job-1", &draft, 100).expect("seed");

        let run = CronRun {
            run_at: 500,
            status: RunStatus::Skipped,
            summary: None,
            next_run_at: None,
        };
        db.record_cron_run("job-1", &run, 600).expect("record");

        let item = db
            .item_by_cron_job_id("job-1")
            .expect("load")
            .expect("present");
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.last_run_status, Some(RunStatus::Skipped));
    }

    #[test]
    fn record_run_advances_schedule_only_when_supplied() {
        let db = MissionStore::open_in_memory().expect("open db");
        db.upsert_cron_entry("job-1", &cron_draft("Job"), 100)
            .expect("seed");

        let without_next = CronRun {
            run_at: 1_500,
            status: RunStatus::Success,
            summary: None,
            next_run_at: None,
        };
        db.record_cron_run("job-1", &without_next, 1_600)
            .expect("record");
        let item = db
            .item_by_cron_job_id("job-1")
            .expect("load")
            .expect("present");
        assert_eq!(item.scheduled_for, 1_000);
        assert_eq!(item.next_run_at, Some(1_000));

        let with_next = CronRun {
            run_at: 2_500,
            status: RunStatus::Success,
            summary: None,
            next_run_at: Some(86_400_000),
        };
        db.record_cron_run("job-1", &with_next, 2_600)
            .expect("record");
        let item = db
            .item_by_cron_job_id("job-1")
            .expect("load")
            .expect("present");
        assert_eq!(item.scheduled_for, 86_400_000);
        assert_eq!(item.next_run_at, Some(86_400_000));
    }

    #[test]
    fn recording_against_unknown_job_is_a_soft_failure() {
        let db = MissionStore::open_in_memory().expect("open db");

        let run = CronRun {
            run_at: 500,
            status: RunStatus::Success,
            summary: None,
            next_run_at: None,
        };
        let outcome = db
            .record_cron_run("no-such-key", &run, 600)
            .expect("soft failure, not an error");
        assert_eq!(outcome, RunOutcome::UnknownJob);
        assert!(db
            .list_items_in_range(i64::MIN, i64::MAX)
            .expect("list")
            .is_empty());
    }

    #[test]
    fn range_includes_items_matched_by_either_time_attribute() {
        let db = MissionStore::open_in_memory().expect("open db");

        let mut inside = cron_draft("inside by scheduled_for");
        inside.scheduled_for = 150;
        db.upsert_cron_entry("job-inside", &inside, 10).expect("seed");

        // nominal time outside the window, next occurrence inside it
        let diverged = ScheduledEntryUpsert {
            title: "inside by next_run_at".to_string(),
            description: None,
            scheduled_for: 900,
            assignee: Assignee::Assistant,
            status: None,
            next_run_at: Some(250),
        };
        db.upsert_scheduled_entry("auto:diverged", &diverged, 10)
            .expect("seed");

        let mut outside = cron_draft("outside entirely");
        outside.scheduled_for = 999;
        db.upsert_cron_entry("job-outside", &outside, 10).expect("seed");

        let items = db.list_items_in_range(200, 300).expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "inside by next_run_at");

        let items = db.list_items_in_range(100, 300).expect("list");
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert!(titles.contains(&"inside by scheduled_for"));
        assert!(titles.contains(&"inside by next_run_at"));
        assert!(!titles.contains(&"outside entirely"));
    }

    #[test]
    fn created_items_seed_next_occurrence_from_nominal_time() {
        let db = MissionStore::open_in_memory().expect("open db");

        let id = db
            .create_scheduled_item(
                &ItemCreate {
                    title: "One-off review".to_string(),
                    description: None,
                    kind: ItemKind::ScheduledTask,
                    assignee: Assignee::Operator,
                    status: None,
                    scheduled_for: 4_200,
                    source: ItemSource::Manual,
                    cron_expr: None,
                    cron_job_id: None,
                },
                100,
            )
            .expect("create");

        let item = db.scheduled_item(&id).expect("load").expect("present");
        assert_eq!(item.status, ItemStatus::Scheduled);
        assert_eq!(item.next_run_at, Some(4_200));
        assert_eq!(item.effective_time(), 4_200);
    }

    #[test]
    fn range_sorts_by_effective_time() {
        let db = MissionStore::open_in_memory().expect("open db");

        for (key, next) in [("job-a", 500), ("job-b", 100), ("job-c", 300)] {
            let mut draft = cron_draft(key);
            draft.next_run_at = Some(next);
            db.upsert_cron_entry(key, &draft, 10).expect("seed");
        }

        let items = db.list_items_in_range(0, 1_000).expect("list");
        let times: Vec<i64> = items.iter().map(ScheduledItem::effective_time).collect();
        assert_eq!(times, vec![100, 300, 500]);
    }

    #[test]
    fn batch_sync_isolates_the_failing_item() {
        let db = MissionStore::open_in_memory().expect("open db");

        let jobs = vec![
            json!({
                "cronJobId": "job-1",
                "title": "First",
                "scheduledFor": 100,
                "assignee": "assistant",
            }),
            json!({
                "cronJobId": "job-2",
                "title": "Second",
                "scheduledFor": 200,
                "assignee": "assistant",
                "status": "paused",
            }),
            json!({
                "cronJobId": "job-3",
                "title": "Third",
                "scheduledFor": 300,
                "assignee": "operator",
            }),
        ];

        let report = db.sync_cron_jobs(&jobs, 1_000);
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "job-2");
        assert!(report.failures[0].error.contains("status"));

        assert!(db.item_by_cron_job_id("job-1").expect("q").is_some());
        assert!(db.item_by_cron_job_id("job-2").expect("q").is_none());
        assert!(db.item_by_cron_job_id("job-3").expect("q").is_some());
    }

    #[test]
    fn batch_sync_reports_items_without_a_key_by_index() {
        let db = MissionStore::open_in_memory().expect("open db");

        let jobs = vec![json!({ "title": "No key", "scheduledFor": 1, "assignee": "operator" })];
        let report = db.sync_cron_jobs(&jobs, 10);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].key, "#0");
    }

    #[test]
    fn patch_by_id_rejects_unknown_ids() {
        let db = MissionStore::open_in_memory().expect("open db");

        let err = db
            .set_task_status("missing", TaskStatus::Done, 10)
            .expect_err("unknown id");
        assert!(matches!(err, StoreError::NotFound { kind: "task", .. }));

        let err = db
            .set_item_status("missing", ItemStatus::Cancelled, 10)
            .expect_err("unknown id");
        assert!(matches!(
            err,
            StoreError::NotFound {
                kind: "scheduled item",
                ..
            }
        ));
    }

    #[test]
    fn task_edits_by_id_stamp_updated_at() {
        let db = MissionStore::open_in_memory().expect("open db");
        let id = db
            .create_task(
                &TaskCreate {
                    title: "Draft".to_string(),
                    description: None,
                    assignee: Assignee::Operator,
                    status: None,
                },
                100,
            )
            .expect("create");

        db.set_task_status(&id, TaskStatus::InProgress, 200)
            .expect("status");
        db.set_task_assignee(&id, Assignee::Assistant, 300)
            .expect("assignee");
        db.update_task_details(&id, "Final", Some("polished"), 400)
            .expect("details");

        let task = db.task(&id).expect("load").expect("present");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.assignee, Assignee::Assistant);
        assert_eq!(task.title, "Final");
        assert_eq!(task.description.as_deref(), Some("polished"));
        assert_eq!(task.created_at, 100);
        assert_eq!(task.updated_at, 400);
    }

    #[test]
    fn validation_happens_before_any_mutation() {
        let db = MissionStore::open_in_memory().expect("open db");

        let err = db
            .upsert_automation_task("key", &task_draft("   "), 10)
            .expect_err("blank title");
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingField("title"))
        ));

        let err = db
            .upsert_automation_task("  ", &task_draft("Fine"), 10)
            .expect_err("blank key");
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::MissingField("autoKey"))
        ));

        assert!(db.list_tasks().expect("list").is_empty());
    }

    #[test]
    fn automation_memory_lands_under_the_automation_prefix() {
        let db = MissionStore::open_in_memory().expect("open db");

        let draft = MemoryUpsert {
            title: "Standup notes".to_string(),
            content: "short".to_string(),
            tags: Some(vec!["automation".to_string(), "memory".to_string()]),
        };
        let id = db
            .upsert_automation_memory("standup", &draft, 100)
            .expect("upsert");
        let again = db
            .upsert_automation_memory("standup", &draft, 200)
            .expect("upsert again");
        assert_eq!(id, again);

        let doc = db.memory_doc(&id).expect("load").expect("present");
        assert_eq!(doc.source_path.as_deref(), Some("automation/standup.md"));
        assert!(doc.is_automated());
        assert_eq!(doc.updated_at, 200);
    }

    #[test]
    fn memory_merge_keeps_tags_when_omitted() {
        let db = MissionStore::open_in_memory().expect("open db");

        let seeded = MemoryUpsert {
            title: "Daily".to_string(),
            content: "first".to_string(),
            tags: Some(vec!["memory".to_string(), "daily".to_string()]),
        };
        db.upsert_memory_from_source("memory/2026-08-07.md", &seeded, 100)
            .expect("seed");

        let patch = MemoryUpsert {
            title: "Daily".to_string(),
            content: "second".to_string(),
            tags: None,
        };
        let id = db
            .upsert_memory_from_source("memory/2026-08-07.md", &patch, 200)
            .expect("patch");

        let doc = db.memory_doc(&id).expect("load").expect("present");
        assert_eq!(doc.content, "second");
        assert_eq!(doc.tags, vec!["memory".to_string(), "daily".to_string()]);
    }

    #[test]
    fn memory_sync_reports_per_item_results() {
        let db = MissionStore::open_in_memory().expect("open db");

        let docs = vec![
            MemorySourceDoc {
                source_path: "MEMORY.md".to_string(),
                doc: MemoryUpsert {
                    title: "Long-term Memory".to_string(),
                    content: "notes".to_string(),
                    tags: Some(vec!["memory".to_string(), "long-term".to_string()]),
                },
            },
            MemorySourceDoc {
                source_path: "memory/bad.md".to_string(),
                doc: MemoryUpsert {
                    title: "Bad".to_string(),
                    content: "  ".to_string(),
                    tags: None,
                },
            },
        ];

        let report = db.sync_memory_docs(&docs, 100);
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].key, "memory/bad.md");

        assert!(db
            .memory_doc_by_source_path("MEMORY.md")
            .expect("q")
            .is_some());
    }

    #[test]
    fn memory_search_filters_and_sorts_newest_first() {
        let db = MissionStore::open_in_memory().expect("open db");

        let doc = |title: &str, content: &str| MemoryUpsert {
            title: title.to_string(),
            content: content.to_string(),
            tags: None,
        };
        db.upsert_memory_from_source("a.md", &doc("Older", "retro notes"), 100)
            .expect("a");
        db.upsert_memory_from_source("b.md", &doc("Newer", "roadmap draft"), 200)
            .expect("b");

        let all = db.search_memory_docs(None).expect("all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Newer");

        let hits = db.search_memory_docs(Some("RETRO")).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Older");

        let none = db.search_memory_docs(Some("nowhere")).expect("search");
        assert!(none.is_empty());
    }

    #[test]
    fn summaries_reflect_store_contents() {
        let db = MissionStore::open_in_memory().expect("open db");

        db.upsert_automation_task("t1", &task_draft("One"), 10)
            .expect("task");
        let mut done = task_draft("Two");
        done.status = Some(TaskStatus::Done);
        db.upsert_automation_task("t2", &done, 20).expect("task");

        let summary = db.task_summary().expect("summary");
        assert_eq!(summary.total, 2);
        assert_eq!(summary.todo, 1);
        assert_eq!(summary.done, 1);
        assert_eq!(summary.auto, 2);

        let mut job = cron_draft("Job");
        job.status = Some(ItemStatus::Running);
        db.upsert_cron_entry("job-1", &job, 30).expect("item");

        let summary = db.calendar_summary(0, 10_000).expect("summary");
        assert_eq!(summary.cron_jobs, 1);
        assert_eq!(summary.running, 1);
        assert_eq!(summary.next_runs, 1);
        assert_eq!(summary.total, 1);

        let memory = db.memory_summary().expect("summary");
        assert_eq!(memory.total, 0);
        assert_eq!(memory.last_updated_at, None);
    }
}
