// SPDX-License-Identifier: MIT
//! Task transition service.
//!
//! Single entry point per transition: resolve the caller, load the task,
//! run the workbasket guard, apply the pure transition, persist with a
//! compare-and-swap on `modified` and record the history event. The check
//! order is fixed across every operation: permission, then state, then
//! ownership. Precondition failures mutate nothing.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::security::{CallerContext, EngineRole, IdentityProvider};
use crate::storage::{Storage, TaskHistoryEvent, TaskStore};
use crate::task::{machine, now_utc, Task};
use crate::workbasket::guard::AccessGuard;
use crate::workbasket::WorkbasketPermission;

/// Permissions every lifecycle transition requires on the task's workbasket.
const TRANSITION_PERMISSIONS: &[WorkbasketPermission] = &[WorkbasketPermission::Read];

pub struct TaskService {
    storage: Storage,
    identity: Arc<dyn IdentityProvider>,
    config: Arc<EngineConfig>,
    guard: AccessGuard,
}

impl TaskService {
    pub fn new(
        storage: Storage,
        identity: Arc<dyn IdentityProvider>,
        config: EngineConfig,
    ) -> Self {
        let config = Arc::new(config);
        let guard = AccessGuard::new(storage.workbaskets(), config.clone());
        Self {
            storage,
            identity,
            config,
            guard,
        }
    }

    // ─── Operations ──────────────────────────────────────────────────────────

    /// Load a task after a READ permission check.
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let caller = self.identity.current_caller();
        let tasks = self.storage.tasks();
        let task = self.load(&tasks, task_id).await?;
        self.guard
            .check(&caller, &task.workbasket.id, TRANSITION_PERMISSIONS)
            .await?;
        Ok(task)
    }

    /// Claim the task for the current caller.
    pub async fn claim(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.claimed", |task, caller| {
            machine::claim(task, &caller.user_id, now_utc())
        })
        .await
    }

    /// Claim regardless of the current owner.
    pub async fn force_claim(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.force_claimed", |task, caller| {
            machine::force_claim(task, &caller.user_id, now_utc())
        })
        .await
    }

    /// Give a claimed task back to its pool.
    pub async fn cancel_claim(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.claim_cancelled", |task, caller| {
            machine::cancel_claim(task, &caller.user_id, now_utc())
        })
        .await
    }

    pub async fn force_cancel_claim(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.force_claim_cancelled", |task, caller| {
            machine::force_cancel_claim(task, &caller.user_id, now_utc())
        })
        .await
    }

    /// Hand a claimed task over for review.
    pub async fn request_review(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.review_requested", |task, caller| {
            machine::request_review(task, &caller.user_id, now_utc())
        })
        .await
    }

    pub async fn force_request_review(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.force_review_requested", |task, caller| {
            machine::force_request_review(task, &caller.user_id, now_utc())
        })
        .await
    }

    /// Decline a submission under review back to its pool.
    pub async fn request_changes(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.changes_requested", |task, caller| {
            machine::request_changes(task, &caller.user_id, now_utc())
        })
        .await
    }

    /// Force any non-end-state task back to READY, clearing the owner.
    pub async fn force_request_changes(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.force_changes_requested", |task, caller| {
            machine::force_request_changes(task, &caller.user_id, now_utc())
        })
        .await
    }

    /// Complete a claimed task. Idempotent on an already-completed task.
    pub async fn complete(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.completed", |task, caller| {
            machine::complete(task, &caller.user_id, now_utc())
        })
        .await
    }

    /// Complete from any non-end state, claiming implicitly if needed.
    pub async fn force_complete(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.force_completed", |task, caller| {
            machine::force_complete(task, &caller.user_id, now_utc())
        })
        .await
    }

    /// Cancel a task from any non-end state.
    pub async fn cancel(&self, task_id: &str) -> Result<Task> {
        self.apply(task_id, "task.cancelled", |task, _caller| {
            machine::cancel(task, now_utc())
        })
        .await
    }

    /// Terminate a task. Requires the admin or task-admin engine role; the
    /// role gate runs before anything is loaded.
    pub async fn terminate(&self, task_id: &str) -> Result<Task> {
        let caller = self.identity.current_caller();
        if !self.config.is_privileged(&caller) {
            return Err(Error::NotAuthorized {
                roles: vec![EngineRole::Admin, EngineRole::TaskAdmin],
                current_user: caller.user_id,
            });
        }
        let tasks = self.storage.tasks();
        let task = self.load(&tasks, task_id).await?;
        self.guard
            .check(&caller, &task.workbasket.id, TRANSITION_PERMISSIONS)
            .await?;
        let next = machine::terminate(&task, now_utc())?;
        self.persist(&tasks, &task, next, "task.terminated", &caller)
            .await
    }

    // ─── Plumbing ────────────────────────────────────────────────────────────

    async fn load(&self, tasks: &TaskStore, task_id: &str) -> Result<Task> {
        tasks.get(task_id).await?.ok_or_else(|| Error::TaskNotFound {
            task_id: task_id.to_string(),
        })
    }

    async fn apply<F>(&self, task_id: &str, event_type: &'static str, transition: F) -> Result<Task>
    where
        F: FnOnce(&Task, &CallerContext) -> Result<Task>,
    {
        let caller = self.identity.current_caller();
        let tasks = self.storage.tasks();
        let task = self.load(&tasks, task_id).await?;
        self.guard
            .check(&caller, &task.workbasket.id, TRANSITION_PERMISSIONS)
            .await?;
        let next = transition(&task, &caller)?;
        self.persist(&tasks, &task, next, event_type, &caller).await
    }

    async fn persist(
        &self,
        tasks: &TaskStore,
        old: &Task,
        next: Task,
        event_type: &'static str,
        caller: &CallerContext,
    ) -> Result<Task> {
        // Skip the write only when no field a transition can mutate has
        // changed. `modified` alone is not enough: it cannot move backwards,
        // so a stalled clock leaves it in place while owner or claimed still
        // change (a force_claim steal on an already-claimed task).
        let unchanged = next.state == old.state
            && next.owner == old.owner
            && next.claimed == old.claimed
            && next.completed == old.completed
            && next.modified == old.modified;
        if unchanged {
            debug!(task = %old.id, event = event_type, "transition is a no-op");
            return Ok(next);
        }
        let event = if self.config.history.enabled {
            Some(TaskHistoryEvent::transition(
                event_type,
                old,
                &next,
                &caller.user_id,
            ))
        } else {
            None
        };
        let applied = tasks
            .save_transition(&next, old.modified, event.as_ref())
            .await?;
        if !applied {
            // Tell a vanished row apart from a concurrent writer.
            return match tasks.get(&old.id).await? {
                Some(_) => {
                    debug!(task = %old.id, event = event_type, "optimistic lock lost");
                    Err(Error::Conflict {
                        task_id: old.id.clone(),
                    })
                }
                None => Err(Error::TaskNotFound {
                    task_id: old.id.clone(),
                }),
            };
        }
        info!(
            task = %next.id,
            event = event_type,
            actor = %caller.user_id,
            old_state = %old.state,
            new_state = %next.state,
            "task transition applied"
        );
        Ok(next)
    }
}
