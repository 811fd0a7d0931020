// SPDX-License-Identifier: MIT
//! Pure transition functions for the task lifecycle.
//!
//! Each function validates its preconditions against a snapshot of the task
//! and returns the resulting task, leaving the input untouched. No I/O and no
//! permission checks happen here; the workbasket guard runs before the
//! machine is consulted, ownership is checked after the state precondition.
//!
//! Every family comes in two tiers: a strict, identity-checked variant and a
//! force variant that accepts any non-end state and skips the ownership rule.
//! Force variants on an end-state task are rejected.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::task::state::TaskState;
use crate::task::Task;

// ─── Preconditions ───────────────────────────────────────────────────────────

fn require_state(task: &Task, required: &[TaskState]) -> Result<()> {
    if required.contains(&task.state) {
        Ok(())
    } else {
        Err(Error::InvalidTaskState {
            task_id: task.id.clone(),
            task_state: task.state,
            required: required.to_vec(),
        })
    }
}

fn require_non_end_state(task: &Task) -> Result<()> {
    if task.state.is_end_state() {
        Err(Error::InvalidTaskState {
            task_id: task.id.clone(),
            task_state: task.state,
            required: TaskState::non_end_states(),
        })
    } else {
        Ok(())
    }
}

/// Fails only when the task is owned by somebody else. A task without an
/// owner passes; claimed states always carry an owner.
fn require_owner(task: &Task, caller: &str) -> Result<()> {
    match task.owner.as_deref() {
        Some(owner) if owner != caller => Err(Error::InvalidOwner {
            task_id: task.id.clone(),
            current_user: caller.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Advance the version marker. `modified` never moves backwards, even if the
/// wall clock does.
fn touch(task: &mut Task, now: DateTime<Utc>) {
    task.modified = now.max(task.modified);
}

// ─── Claim ───────────────────────────────────────────────────────────────────

/// Claim a task for the caller.
///
/// Requires `READY` or `READY_FOR_REVIEW`; a task owned by another user is
/// rejected with `InvalidOwner`. `READY` becomes `CLAIMED`,
/// `READY_FOR_REVIEW` becomes `IN_REVIEW`.
pub fn claim(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    claim_inner(task, caller, now, false)
}

/// Claim regardless of current owner, from any non-end state.
pub fn force_claim(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    claim_inner(task, caller, now, true)
}

fn claim_inner(task: &Task, caller: &str, now: DateTime<Utc>, force: bool) -> Result<Task> {
    if force {
        require_non_end_state(task)?;
    } else {
        require_state(task, &[TaskState::Ready, TaskState::ReadyForReview])?;
        require_owner(task, caller)?;
    }
    let mut next = task.clone();
    next.state = match task.state {
        TaskState::ReadyForReview | TaskState::InReview => TaskState::InReview,
        _ => TaskState::Claimed,
    };
    next.owner = Some(caller.to_string());
    next.claimed = Some(now);
    touch(&mut next, now);
    Ok(next)
}

// ─── Cancel claim ────────────────────────────────────────────────────────────

/// Give a claimed task back to its pool. Rejected when the task is owned by
/// another user; a task that is not claimed cancels trivially.
pub fn cancel_claim(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    cancel_claim_inner(task, caller, now, false)
}

pub fn force_cancel_claim(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    cancel_claim_inner(task, caller, now, true)
}

fn cancel_claim_inner(task: &Task, caller: &str, now: DateTime<Utc>, force: bool) -> Result<Task> {
    require_non_end_state(task)?;
    if !force {
        require_owner(task, caller)?;
    }
    let mut next = task.clone();
    next.state = match task.state {
        TaskState::ReadyForReview | TaskState::InReview => TaskState::ReadyForReview,
        _ => TaskState::Ready,
    };
    next.owner = None;
    next.claimed = None;
    touch(&mut next, now);
    Ok(next)
}

// ─── Request review ──────────────────────────────────────────────────────────

/// Hand a worked-on task over for review. Requires `CLAIMED` and ownership;
/// the task returns to the pool as `READY_FOR_REVIEW`.
pub fn request_review(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    request_review_inner(task, caller, now, false)
}

pub fn force_request_review(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    request_review_inner(task, caller, now, true)
}

fn request_review_inner(
    task: &Task,
    caller: &str,
    now: DateTime<Utc>,
    force: bool,
) -> Result<Task> {
    if force {
        require_non_end_state(task)?;
    } else {
        require_state(task, &[TaskState::Claimed])?;
        require_owner(task, caller)?;
    }
    let mut next = task.clone();
    next.state = TaskState::ReadyForReview;
    next.owner = None;
    next.claimed = None;
    touch(&mut next, now);
    Ok(next)
}

// ─── Request changes ─────────────────────────────────────────────────────────

/// Decline a submission under review back to its pool.
///
/// Requires `IN_REVIEW` and ownership. The task becomes `READY` with no
/// owner, ready to be claimed again by the original assignee's pool.
pub fn request_changes(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    request_changes_inner(task, caller, now, false)
}

/// Administrative override: force any non-end-state task back to `READY`,
/// clearing the owner unconditionally.
pub fn force_request_changes(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    request_changes_inner(task, caller, now, true)
}

fn request_changes_inner(
    task: &Task,
    caller: &str,
    now: DateTime<Utc>,
    force: bool,
) -> Result<Task> {
    if force {
        require_non_end_state(task)?;
    } else {
        require_state(task, &[TaskState::InReview])?;
        require_owner(task, caller)?;
    }
    let mut next = task.clone();
    next.state = TaskState::Ready;
    next.owner = None;
    next.claimed = None;
    touch(&mut next, now);
    Ok(next)
}

// ─── Complete ────────────────────────────────────────────────────────────────

/// Complete a claimed task. Completing an already-completed task is
/// idempotent and returns it unchanged.
pub fn complete(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    complete_inner(task, caller, now, false)
}

/// Complete from any non-end state; a task that is not claimed is claimed
/// implicitly for the caller first.
pub fn force_complete(task: &Task, caller: &str, now: DateTime<Utc>) -> Result<Task> {
    complete_inner(task, caller, now, true)
}

fn complete_inner(task: &Task, caller: &str, now: DateTime<Utc>, force: bool) -> Result<Task> {
    if task.state == TaskState::Completed {
        return Ok(task.clone());
    }
    let mut next = task.clone();
    if force {
        require_non_end_state(task)?;
        if !task.state.is_claimed() {
            next.owner = Some(caller.to_string());
            next.claimed = Some(now);
        }
    } else {
        require_state(task, &[TaskState::Claimed, TaskState::InReview])?;
        require_owner(task, caller)?;
    }
    next.state = TaskState::Completed;
    next.completed = Some(now);
    touch(&mut next, now);
    Ok(next)
}

// ─── Cancel / terminate ──────────────────────────────────────────────────────

/// Cancel a task from any non-end state. No ownership rule.
pub fn cancel(task: &Task, now: DateTime<Utc>) -> Result<Task> {
    require_non_end_state(task)?;
    let mut next = task.clone();
    next.state = TaskState::Cancelled;
    touch(&mut next, now);
    Ok(next)
}

/// Terminate a task from any non-end state. The role gate (admin or
/// task-admin) is enforced by the service before this runs.
pub fn terminate(task: &Task, now: DateTime<Utc>) -> Result<Task> {
    require_non_end_state(task)?;
    let mut next = task.clone();
    next.state = TaskState::Terminated;
    touch(&mut next, now);
    Ok(next)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
