// SPDX-License-Identifier: MIT
//! Append-only transition history.
//!
//! One event per applied transition, written in the same transaction as the
//! task update so the audit trail never disagrees with the task table. `seq`
//! numbers are per task, starting at 1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{Error, Result};
use crate::storage::{ts_from_micros, ts_micros, with_timeout};
use crate::task::state::TaskState;
use crate::task::Task;

/// One recorded transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistoryEvent {
    pub id: String,
    pub task_id: String,
    /// Per-task sequence number. Assigned by the store on append.
    pub seq: i64,
    /// Dotted event name, e.g. `task.claimed` or `task.changes_requested`.
    pub event_type: String,
    /// User id of the caller that applied the transition.
    pub actor: String,
    pub old_state: TaskState,
    pub new_state: TaskState,
    pub old_owner: Option<String>,
    pub new_owner: Option<String>,
    pub created: DateTime<Utc>,
    /// Optional transition-specific JSON payload.
    pub details: Option<serde_json::Value>,
}

impl TaskHistoryEvent {
    /// Build the event describing `old` becoming `new`.
    pub fn transition(event_type: &str, old: &Task, new: &Task, actor: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            task_id: new.id.clone(),
            seq: 0,
            event_type: event_type.to_string(),
            actor: actor.to_string(),
            old_state: old.state,
            new_state: new.state,
            old_owner: old.owner.clone(),
            new_owner: new.owner.clone(),
            created: new.modified,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct HistoryRow {
    id: String,
    task_id: String,
    seq: i64,
    event_type: String,
    actor: String,
    old_state: String,
    new_state: String,
    old_owner: Option<String>,
    new_owner: Option<String>,
    created: i64,
    details: Option<String>,
}

fn decode_state(value: &str, column: &str) -> Result<TaskState> {
    value.parse().map_err(|e: String| {
        Error::Database(sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: e.into(),
        })
    })
}

impl HistoryRow {
    fn into_event(self) -> Result<TaskHistoryEvent> {
        let details = match self.details {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                Error::Database(sqlx::Error::ColumnDecode {
                    index: "details".into(),
                    source: Box::new(e),
                })
            })?),
            None => None,
        };
        Ok(TaskHistoryEvent {
            id: self.id,
            task_id: self.task_id,
            seq: self.seq,
            event_type: self.event_type,
            actor: self.actor,
            old_state: decode_state(&self.old_state, "old_state")?,
            new_state: decode_state(&self.new_state, "new_state")?,
            old_owner: self.old_owner,
            new_owner: self.new_owner,
            created: ts_from_micros(self.created, "created")?,
            details,
        })
    }
}

/// Insert one event inside an open transaction, assigning the next per-task
/// sequence number. The surrounding transaction serializes `seq` assignment.
pub(crate) async fn append_with(
    tx: &mut Transaction<'_, Sqlite>,
    event: &TaskHistoryEvent,
) -> Result<()> {
    let seq: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(seq), 0) + 1 FROM task_history_events WHERE task_id = ?",
    )
    .bind(&event.task_id)
    .fetch_one(&mut **tx)
    .await?;
    sqlx::query(
        "INSERT INTO task_history_events
             (id, task_id, seq, event_type, actor, old_state, new_state,
              old_owner, new_owner, created, details)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&event.id)
    .bind(&event.task_id)
    .bind(seq)
    .bind(&event.event_type)
    .bind(&event.actor)
    .bind(event.old_state.as_str())
    .bind(event.new_state.as_str())
    .bind(&event.old_owner)
    .bind(&event.new_owner)
    .bind(ts_micros(event.created))
    .bind(event.details.as_ref().map(|v| v.to_string()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a standalone event. Transitions applied through the service
    /// record their event atomically with the task update instead.
    pub async fn append(&self, event: &TaskHistoryEvent) -> Result<()> {
        with_timeout(async {
            let mut tx = self.pool.begin().await?;
            append_with(&mut tx, event).await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// All events for one task, oldest first.
    pub async fn events_for_task(&self, task_id: &str) -> Result<Vec<TaskHistoryEvent>> {
        with_timeout(async {
            let rows = sqlx::query_as::<_, HistoryRow>(
                "SELECT * FROM task_history_events WHERE task_id = ? ORDER BY seq ASC",
            )
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;
            rows.into_iter().map(HistoryRow::into_event).collect()
        })
        .await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
