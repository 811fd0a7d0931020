// SPDX-License-Identifier: MIT
//! Task entity and lifecycle transitions.
//!
//! A [`Task`] is mutated only through the transition functions in
//! [`machine`]; the surrounding service persists the result. Descriptive
//! attributes (classification, object reference) are opaque to the
//! transition rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workbasket::WorkbasketSummary;

pub mod machine;
pub mod state;

pub use state::TaskState;

/// Generate a new ULID string.
pub fn new_task_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Current time truncated to microsecond precision.
///
/// Timestamps are persisted as INTEGER microseconds; truncating at the source
/// keeps in-memory and stored values identical, which the compare-and-swap on
/// `modified` depends on.
pub fn now_utc() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// Reference to the business object a task is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub company: String,
    #[serde(rename = "type")]
    pub ref_type: String,
    pub value: String,
}

/// Classification attached to a task. Opaque to the transition rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub id: String,
    pub key: String,
    pub name: String,
}

/// A task entity.
///
/// `modified` doubles as the optimistic-concurrency version marker: it is
/// advanced on every successful transition and compared at persist time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub classification: ClassificationSummary,
    pub workbasket: WorkbasketSummary,
    pub primary_object_reference: ObjectReference,
    pub state: TaskState,
    pub owner: Option<String>,
    pub created: DateTime<Utc>,
    pub claimed: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,
}

impl Task {
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }
}

/// Builder for assembling task entities to insert.
///
/// Task creation workflows live outside this engine; the builder exists so
/// embedders and tests can construct a well-formed entity in one expression.
#[derive(Debug, Default)]
pub struct TaskBuilder {
    name: Option<String>,
    classification: Option<ClassificationSummary>,
    workbasket: Option<WorkbasketSummary>,
    primary_object_reference: Option<ObjectReference>,
    state: Option<TaskState>,
    owner: Option<String>,
}

impl TaskBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn classification(mut self, classification: ClassificationSummary) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn workbasket(mut self, workbasket: WorkbasketSummary) -> Self {
        self.workbasket = Some(workbasket);
        self
    }

    pub fn primary_object_reference(mut self, reference: ObjectReference) -> Self {
        self.primary_object_reference = Some(reference);
        self
    }

    pub fn state(mut self, state: TaskState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn build(self) -> Task {
        let now = now_utc();
        let state = self.state.unwrap_or(TaskState::Ready);
        Task {
            id: new_task_id(),
            name: self.name.unwrap_or_default(),
            classification: self.classification.unwrap_or_default(),
            workbasket: self.workbasket.unwrap_or_default(),
            primary_object_reference: self.primary_object_reference.unwrap_or_default(),
            claimed: if state.is_claimed() { Some(now) } else { None },
            state,
            owner: self.owner,
            created: now,
            completed: None,
            modified: now,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let task = Task::builder().name("invoice check").build();
        assert_eq!(task.state, TaskState::Ready);
        assert!(task.owner.is_none());
        assert!(task.claimed.is_none());
        assert!(task.completed.is_none());
        assert_eq!(task.created, task.modified);
        assert!(!task.id.is_empty());
    }

    #[test]
    fn builder_claimed_state_sets_claim_timestamp() {
        let task = Task::builder()
            .state(TaskState::InReview)
            .owner("user-1-2")
            .build();
        assert_eq!(task.state, TaskState::InReview);
        assert_eq!(task.owner.as_deref(), Some("user-1-2"));
        assert!(task.claimed.is_some());
    }

    #[test]
    fn ids_are_unique() {
        let a = new_task_id();
        let b = new_task_id();
        assert_ne!(a, b);
    }

    #[test]
    fn now_utc_is_microsecond_aligned() {
        let now = now_utc();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }
}
