// SPDX-License-Identifier: MIT
//! taskgate — an embeddable task workflow engine.
//!
//! A task moves through a fixed lifecycle (ready, claimed, review, then one
//! of the end states completed, cancelled, or terminated). Every transition
//! is guarded by the caller's permissions on the task's workbasket and
//! persisted with a compare-and-swap on the task's `modified` timestamp, so
//! concurrent writers lose cleanly instead of overwriting each other.
//! SQLite is the only store. [`TaskService`] is the operation surface;
//! [`task::machine`] holds the pure transition rules.

pub mod config;
pub mod error;
pub mod security;
pub mod service;
pub mod storage;
pub mod task;
pub mod workbasket;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use security::{CallerContext, EngineRole, FixedIdentity, IdentityProvider};
pub use service::TaskService;
pub use storage::{Storage, TaskHistoryEvent};
pub use task::{Task, TaskBuilder, TaskState};
pub use workbasket::{WorkbasketAccessItem, WorkbasketPermission, WorkbasketSummary};
