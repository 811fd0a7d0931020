// SPDX-License-Identifier: MIT
//! Crate-wide error taxonomy.
//!
//! Every precondition failure carries the ids and the required-vs-actual
//! values a caller needs to render an actionable message. Variants map to
//! stable string codes via [`Error::code`] so embedding layers can translate
//! them without matching on message text.

use thiserror::Error;

use crate::security::EngineRole;
use crate::task::state::TaskState;
use crate::workbasket::WorkbasketPermission;

/// Result type alias for taskgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for all taskgate operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Task is not in a state that permits the requested transition.
    #[error("task {task_id} is in state {task_state}, required one of {required:?}")]
    InvalidTaskState {
        task_id: String,
        task_state: TaskState,
        required: Vec<TaskState>,
    },

    /// Caller is not the task's current owner for an ownership-gated transition.
    #[error("user {current_user} is not the owner of task {task_id}")]
    InvalidOwner { task_id: String, current_user: String },

    /// Caller lacks a required permission on the task's workbasket.
    #[error(
        "user {current_user} is missing permissions {required:?} on workbasket {workbasket_id}"
    )]
    MismatchedWorkbasketPermission {
        required: Vec<WorkbasketPermission>,
        current_user: String,
        workbasket_id: String,
    },

    /// Caller holds none of the engine roles required for the operation.
    #[error("user {current_user} is not member of any role in {roles:?}")]
    NotAuthorized {
        roles: Vec<EngineRole>,
        current_user: String,
    },

    /// No task with the given id.
    #[error("task {task_id} was not found")]
    TaskNotFound { task_id: String },

    /// Concurrent modification detected at persist time. Retryable: re-read
    /// the task and re-apply the transition against its current version.
    #[error("task {task_id} was modified concurrently")]
    Conflict { task_id: String },

    /// Configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A statement exceeded the query timeout.
    #[error("database query timed out after {0}s")]
    QueryTimeout(u64),

    /// Database error wrapper.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error wrapper.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// IO error wrapper.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable string code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidTaskState { .. } => "INVALID_TASK_STATE",
            Error::InvalidOwner { .. } => "INVALID_OWNER",
            Error::MismatchedWorkbasketPermission { .. } => "MISMATCHED_WORKBASKET_PERMISSION",
            Error::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Error::TaskNotFound { .. } => "TASK_NOT_FOUND",
            Error::Conflict { .. } => "CONFLICT",
            Error::Config(_) => "CONFIG_ERROR",
            Error::QueryTimeout(_) => "QUERY_TIMEOUT",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Migrate(_) => "MIGRATION_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// True for failures worth retrying after re-reading the task.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = Error::TaskNotFound {
            task_id: "T-1".into(),
        };
        assert_eq!(err.code(), "TASK_NOT_FOUND");
        assert!(!err.is_retryable());

        let err = Error::Conflict {
            task_id: "T-1".into(),
        };
        assert_eq!(err.code(), "CONFLICT");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_state_message_names_required_states() {
        let err = Error::InvalidTaskState {
            task_id: "T-9".into(),
            task_state: TaskState::Completed,
            required: vec![TaskState::InReview],
        };
        let msg = err.to_string();
        assert!(msg.contains("T-9"));
        assert!(msg.contains("completed"));
        assert!(msg.contains("InReview"));
    }
}
