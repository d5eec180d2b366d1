// Status inspector: priority-ranked resolution of workflow task
// states over monotonic storage. Rules only add status triples, so a
// task may carry several; the highest-priority one is the effective
// status and no retraction is needed on the read side.

use atman_store::{GraphStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Workflow task status, ordered by resolution priority ascending.
/// When one task holds several status triples the greatest wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Archived,
    Pending,
    Blocked,
    Waiting,
    Active,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Parse a status literal, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "archived" => Some(TaskStatus::Archived),
            "pending" => Some(TaskStatus::Pending),
            "blocked" => Some(TaskStatus::Blocked),
            "waiting" => Some(TaskStatus::Waiting),
            "active" => Some(TaskStatus::Active),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Archived => "archived",
            TaskStatus::Pending => "pending",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Waiting => "waiting",
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SPARQL-backed inspector over a configurable status predicate
pub struct StatusInspector {
    predicate: String,
}

impl StatusInspector {
    pub fn new(predicate: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
        }
    }

    /// Effective status per task IRI. Unknown status literals are
    /// ignored; tasks whose literals are all unknown do not appear.
    pub fn inspect(&self, store: &GraphStore) -> StoreResult<BTreeMap<String, TaskStatus>> {
        let rows = store.select(&format!(
            "SELECT ?task ?status WHERE {{ ?task <{}> ?status }}",
            self.predicate
        ))?;

        let mut effective: BTreeMap<String, TaskStatus> = BTreeMap::new();
        for row in &rows {
            let (Some(task), Some(status)) = (row.get("task"), row.get("status")) else {
                continue;
            };
            let Some(task_iri) = strip_iri(task) else {
                continue;
            };
            let Some(status) = TaskStatus::parse(literal_value(status)) else {
                tracing::debug!(task = %task_iri, literal = %status, "unknown status literal ignored");
                continue;
            };
            effective
                .entry(task_iri.to_string())
                .and_modify(|current| {
                    if status > *current {
                        *current = status;
                    }
                })
                .or_insert(status);
        }
        Ok(effective)
    }

    /// Tasks whose effective status is Active
    pub fn active_tasks(&self, store: &GraphStore) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .inspect(store)?
            .into_iter()
            .filter(|(_, status)| *status == TaskStatus::Active)
            .map(|(task, _)| task)
            .collect())
    }

    /// Effective status of one task
    pub fn status_of(&self, store: &GraphStore, task_iri: &str) -> StoreResult<Option<TaskStatus>> {
        Ok(self.inspect(store)?.get(task_iri).copied())
    }
}

fn strip_iri(term: &str) -> Option<&str> {
    term.strip_prefix('<').and_then(|t| t.strip_suffix('>'))
}

/// Lexical value of a literal term rendering, quotes and any
/// datatype/language suffix removed
fn literal_value(term: &str) -> &str {
    match term.strip_prefix('"') {
        Some(rest) => rest.split('"').next().unwrap_or(""),
        None => term,
    }
}
