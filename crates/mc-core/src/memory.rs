//! Memory-store contracts: markdown-backed documents and automation notes.

use crate::{optional_string_list, require_str, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix under which automation-written memories live; everything else is
/// treated as file-backed.
pub const AUTOMATION_PREFIX: &str = "automation/";

pub fn automation_source_path(auto_key: &str) -> String {
    format!("{AUTOMATION_PREFIX}{auto_key}.md")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDoc {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MemoryDoc {
    pub fn is_automated(&self) -> bool {
        self.source_path
            .as_deref()
            .is_some_and(|path| path.starts_with(AUTOMATION_PREFIX))
    }

    /// Case-insensitive substring match over title, content, and tags.
    pub fn matches(&self, term: &str) -> bool {
        let haystack = format!("{}\n{}\n{}", self.title, self.content, self.tags.join(" "))
            .to_lowercase();
        haystack.contains(term)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCreate {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub source_path: Option<String>,
}

impl MemoryCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }
}

/// Upsert draft keyed by `source_path`. `tags: None` keeps the existing tag
/// list on a matched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryUpsert {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
}

impl MemoryUpsert {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }

    /// Decode an automation payload keyed by `autoKey`; the caller derives
    /// the source path with [`automation_source_path`].
    pub fn from_automation_value(value: &Value) -> Result<(String, Self), ValidationError> {
        let auto_key = require_str(value, "autoKey")?;
        let draft = MemoryUpsert {
            title: require_str(value, "title")?,
            content: require_str(value, "content")?,
            tags: optional_string_list(value, "tags")?,
        };
        draft.validate()?;
        Ok((auto_key, draft))
    }

}

/// A document discovered on disk, ready to sync by source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySourceDoc {
    pub source_path: String,
    pub doc: MemoryUpsert,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemorySummary {
    pub total: usize,
    pub automated: usize,
    pub file_backed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<i64>,
}

impl MemorySummary {
    pub fn from_docs(docs: &[MemoryDoc]) -> Self {
        let automated = docs.iter().filter(|d| d.is_automated()).count();
        MemorySummary {
            total: docs.len(),
            automated,
            file_backed: docs.len() - automated,
            last_updated_at: docs.iter().map(|d| d.updated_at).max(),
        }
    }
}
