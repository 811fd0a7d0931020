// SPDX-License-Identifier: MIT
//! Task lifecycle states.
//!
//! The state set is closed and partitioned into end states (terminal, no
//! outgoing transitions) and non-end states. States are stored as snake_case
//! TEXT in SQLite and rendered the same way on the wire.

use serde::{Deserialize, Serialize};

/// The finite set of states a task can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Ready,
    Claimed,
    ReadyForReview,
    InReview,
    Completed,
    Cancelled,
    Terminated,
}

/// Every state, in declaration order.
pub const ALL_STATES: [TaskState; 7] = [
    TaskState::Ready,
    TaskState::Claimed,
    TaskState::ReadyForReview,
    TaskState::InReview,
    TaskState::Completed,
    TaskState::Cancelled,
    TaskState::Terminated,
];

/// Terminal states. No transition leads out of these.
pub const END_STATES: [TaskState; 3] = [
    TaskState::Completed,
    TaskState::Cancelled,
    TaskState::Terminated,
];

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Ready => "ready",
            TaskState::Claimed => "claimed",
            TaskState::ReadyForReview => "ready_for_review",
            TaskState::InReview => "in_review",
            TaskState::Completed => "completed",
            TaskState::Cancelled => "cancelled",
            TaskState::Terminated => "terminated",
        }
    }

    pub fn is_end_state(&self) -> bool {
        END_STATES.contains(self)
    }

    /// All states a force transition may start from.
    pub fn non_end_states() -> Vec<TaskState> {
        ALL_STATES
            .iter()
            .copied()
            .filter(|s| !s.is_end_state())
            .collect()
    }

    /// True while the task is held by an owner (claim in effect).
    pub fn is_claimed(&self) -> bool {
        matches!(self, TaskState::Claimed | TaskState::InReview)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(TaskState::Ready),
            "claimed" => Ok(TaskState::Claimed),
            "ready_for_review" => Ok(TaskState::ReadyForReview),
            "in_review" => Ok(TaskState::InReview),
            "completed" => Ok(TaskState::Completed),
            "cancelled" => Ok(TaskState::Cancelled),
            "terminated" => Ok(TaskState::Terminated),
            other => Err(format!("unknown task state: {}", other)),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_state_partition() {
        assert!(TaskState::Completed.is_end_state());
        assert!(TaskState::Cancelled.is_end_state());
        assert!(TaskState::Terminated.is_end_state());
        assert!(!TaskState::Ready.is_end_state());
        assert!(!TaskState::Claimed.is_end_state());
        assert!(!TaskState::ReadyForReview.is_end_state());
        assert!(!TaskState::InReview.is_end_state());
        assert_eq!(
            TaskState::non_end_states().len() + END_STATES.len(),
            ALL_STATES.len()
        );
    }

    #[test]
    fn string_round_trip() {
        for state in ALL_STATES {
            let parsed: TaskState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("archived".parse::<TaskState>().is_err());
    }

    #[test]
    fn serde_matches_as_str() {
        for state in ALL_STATES {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json.as_str().unwrap(), state.as_str());
        }
    }

    #[test]
    fn claimed_states() {
        assert!(TaskState::Claimed.is_claimed());
        assert!(TaskState::InReview.is_claimed());
        assert!(!TaskState::Ready.is_claimed());
        assert!(!TaskState::ReadyForReview.is_claimed());
        assert!(!TaskState::Completed.is_claimed());
    }
}
