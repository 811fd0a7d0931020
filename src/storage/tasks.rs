// SPDX-License-Identifier: MIT
//! Task persistence.
//!
//! `save_transition` is the only way a task row changes after insert. It
//! compares `modified` at write time, so two racing transitions cannot both
//! land on stale preconditions; the loser sees zero affected rows.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::storage::history::{self, TaskHistoryEvent};
use crate::storage::{ts_from_micros, ts_micros, with_timeout};
use crate::task::state::TaskState;
use crate::task::{ClassificationSummary, ObjectReference, Task};
use crate::workbasket::WorkbasketSummary;

#[derive(Debug, Clone, sqlx::FromRow)]
struct TaskRow {
    id: String,
    name: String,
    classification_id: String,
    classification_key: String,
    classification_name: String,
    workbasket_id: String,
    workbasket_key: String,
    workbasket_domain: String,
    workbasket_name: String,
    por_company: String,
    por_type: String,
    por_value: String,
    state: String,
    owner: Option<String>,
    created: i64,
    claimed: Option<i64>,
    completed: Option<i64>,
    modified: i64,
}

impl TaskRow {
    fn into_task(self) -> Result<Task> {
        let state: TaskState = self.state.parse().map_err(|e: String| {
            Error::Database(sqlx::Error::ColumnDecode {
                index: "state".into(),
                source: e.into(),
            })
        })?;
        Ok(Task {
            id: self.id,
            name: self.name,
            classification: ClassificationSummary {
                id: self.classification_id,
                key: self.classification_key,
                name: self.classification_name,
            },
            workbasket: WorkbasketSummary {
                id: self.workbasket_id,
                key: self.workbasket_key,
                domain: self.workbasket_domain,
                name: self.workbasket_name,
            },
            primary_object_reference: ObjectReference {
                company: self.por_company,
                ref_type: self.por_type,
                value: self.por_value,
            },
            state,
            owner: self.owner,
            created: ts_from_micros(self.created, "created")?,
            claimed: self.claimed.map(|v| ts_from_micros(v, "claimed")).transpose()?,
            completed: self
                .completed
                .map(|v| ts_from_micros(v, "completed"))
                .transpose()?,
            modified: ts_from_micros(self.modified, "modified")?,
        })
    }
}

#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, task: &Task) -> Result<()> {
        with_timeout(async {
            sqlx::query(
                "INSERT INTO tasks (id, name,
                     classification_id, classification_key, classification_name,
                     workbasket_id, workbasket_key, workbasket_domain, workbasket_name,
                     por_company, por_type, por_value,
                     state, owner, created, claimed, completed, modified)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&task.id)
            .bind(&task.name)
            .bind(&task.classification.id)
            .bind(&task.classification.key)
            .bind(&task.classification.name)
            .bind(&task.workbasket.id)
            .bind(&task.workbasket.key)
            .bind(&task.workbasket.domain)
            .bind(&task.workbasket.name)
            .bind(&task.primary_object_reference.company)
            .bind(&task.primary_object_reference.ref_type)
            .bind(&task.primary_object_reference.value)
            .bind(task.state.as_str())
            .bind(&task.owner)
            .bind(ts_micros(task.created))
            .bind(task.claimed.map(ts_micros))
            .bind(task.completed.map(ts_micros))
            .bind(ts_micros(task.modified))
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Task>> {
        with_timeout(async {
            let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            row.map(TaskRow::into_task).transpose()
        })
        .await
    }

    /// Persist a transition, comparing `modified` at write time.
    ///
    /// Returns `false` when the row was concurrently modified or deleted;
    /// nothing is written in that case, including the history event. The
    /// update and the event commit in one transaction.
    pub async fn save_transition(
        &self,
        task: &Task,
        expected_modified: DateTime<Utc>,
        event: Option<&TaskHistoryEvent>,
    ) -> Result<bool> {
        with_timeout(async {
            let mut tx = self.pool.begin().await?;
            let res = sqlx::query(
                "UPDATE tasks SET state = ?, owner = ?, claimed = ?, completed = ?, modified = ?
                 WHERE id = ? AND modified = ?",
            )
            .bind(task.state.as_str())
            .bind(&task.owner)
            .bind(task.claimed.map(ts_micros))
            .bind(task.completed.map(ts_micros))
            .bind(ts_micros(task.modified))
            .bind(&task.id)
            .bind(ts_micros(expected_modified))
            .execute(&mut *tx)
            .await?;
            if res.rows_affected() == 0 {
                return Ok(false);
            }
            if let Some(event) = event {
                history::append_with(&mut tx, event).await?;
            }
            tx.commit().await?;
            Ok(true)
        })
        .await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
