// SPDX-License-Identifier: MIT
//! Workbasket permission guard.
//!
//! One capability check shared by every transition: the caller must hold all
//! permissions in a required set on the task's workbasket. Which transition
//! asked is irrelevant here. Engine-role holders (admin, task-admin) pass
//! without consulting access items.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::security::CallerContext;
use crate::storage::WorkbasketStore;
use crate::workbasket::WorkbasketPermission;

fn missing_permissions(
    granted: &HashSet<WorkbasketPermission>,
    required: &[WorkbasketPermission],
) -> Vec<WorkbasketPermission> {
    required
        .iter()
        .copied()
        .filter(|p| !granted.contains(p))
        .collect()
}

pub struct AccessGuard {
    store: WorkbasketStore,
    config: Arc<EngineConfig>,
}

impl AccessGuard {
    pub fn new(store: WorkbasketStore, config: Arc<EngineConfig>) -> Self {
        Self { store, config }
    }

    /// Verify the caller holds every permission in `required` on the
    /// workbasket. Succeeds silently; the failure carries the full required
    /// set, the caller and the workbasket id.
    pub async fn check(
        &self,
        caller: &CallerContext,
        workbasket_id: &str,
        required: &[WorkbasketPermission],
    ) -> Result<()> {
        if self.config.is_privileged(caller) {
            debug!(
                user = %caller.user_id,
                workbasket = %workbasket_id,
                "workbasket check bypassed by engine role"
            );
            return Ok(());
        }
        let granted = self
            .store
            .permissions_of(&caller.access_ids(), workbasket_id)
            .await?;
        let missing = missing_permissions(&granted, required);
        if missing.is_empty() {
            Ok(())
        } else {
            debug!(
                user = %caller.user_id,
                workbasket = %workbasket_id,
                missing = ?missing,
                "workbasket check failed"
            );
            Err(Error::MismatchedWorkbasketPermission {
                required: required.to_vec(),
                current_user: caller.user_id.clone(),
                workbasket_id: workbasket_id.to_string(),
            })
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
