// SPDX-License-Identifier: MIT
//! Workbasket and access-item persistence.
//!
//! Insert plumbing plus the permission aggregation the guard runs on. No
//! update or delete: workbasket CRUD belongs to the surrounding application.

use std::collections::HashSet;

use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::storage::with_timeout;
use crate::workbasket::{WorkbasketAccessItem, WorkbasketPermission, WorkbasketSummary};

#[derive(Debug, Clone, sqlx::FromRow)]
struct AccessItemRow {
    access_id: String,
    permissions: String,
}

#[derive(Clone)]
pub struct WorkbasketStore {
    pool: SqlitePool,
}

impl WorkbasketStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert_workbasket(&self, workbasket: &WorkbasketSummary) -> Result<()> {
        with_timeout(async {
            sqlx::query("INSERT INTO workbaskets (id, key, domain, name) VALUES (?, ?, ?, ?)")
                .bind(&workbasket.id)
                .bind(&workbasket.key)
                .bind(&workbasket.domain)
                .bind(&workbasket.name)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
        .await
    }

    pub async fn get_workbasket(&self, id: &str) -> Result<Option<WorkbasketSummary>> {
        with_timeout(async {
            let row = sqlx::query_as::<_, WorkbasketSummary>(
                "SELECT id, key, domain, name FROM workbaskets WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        })
        .await
    }

    pub async fn insert_access_item(&self, item: &WorkbasketAccessItem) -> Result<()> {
        with_timeout(async {
            let permissions = serde_json::to_string(&item.permissions)
                .map_err(|e| Error::Config(format!("failed to encode permissions: {e}")))?;
            sqlx::query(
                "INSERT INTO workbasket_access_items (id, workbasket_id, access_id, permissions)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&item.id)
            .bind(&item.workbasket_id)
            .bind(&item.access_id)
            .bind(permissions)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// The union of permissions granted to any of `access_ids` on the
    /// workbasket. No matching access items yields the empty set.
    pub async fn permissions_of(
        &self,
        access_ids: &[&str],
        workbasket_id: &str,
    ) -> Result<HashSet<WorkbasketPermission>> {
        with_timeout(async {
            let rows = sqlx::query_as::<_, AccessItemRow>(
                "SELECT access_id, permissions FROM workbasket_access_items WHERE workbasket_id = ?",
            )
            .bind(workbasket_id)
            .fetch_all(&self.pool)
            .await?;

            let mut granted = HashSet::new();
            for row in rows {
                if !access_ids.contains(&row.access_id.as_str()) {
                    continue;
                }
                let permissions: Vec<WorkbasketPermission> = serde_json::from_str(&row.permissions)
                    .map_err(|e| {
                        Error::Database(sqlx::Error::ColumnDecode {
                            index: "permissions".into(),
                            source: Box::new(e),
                        })
                    })?;
                granted.extend(permissions);
            }
            Ok(granted)
        })
        .await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
