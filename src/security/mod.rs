// SPDX-License-Identifier: MIT
//! Caller identity.
//!
//! The engine never authenticates anybody. An [`IdentityProvider`] hands it
//! the already-authenticated caller (user id plus group ids); everything the
//! guard and service check is derived from that context plus configuration.

use serde::{Deserialize, Serialize};

/// Engine-level roles, granted to access ids via configuration. Role holders
/// bypass workbasket permission checks; `terminate` requires one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineRole {
    Admin,
    TaskAdmin,
}

impl EngineRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineRole::Admin => "ADMIN",
            EngineRole::TaskAdmin => "TASK_ADMIN",
        }
    }
}

impl std::fmt::Display for EngineRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub user_id: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl CallerContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            groups: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Every identity an access item may match for this caller: the user id
    /// first, then each group id.
    pub fn access_ids(&self) -> Vec<&str> {
        std::iter::once(self.user_id.as_str())
            .chain(self.groups.iter().map(String::as_str))
            .collect()
    }
}

/// Supplies the caller for the current operation, resolved from the ambient
/// authenticated session by the embedding application.
pub trait IdentityProvider: Send + Sync {
    fn current_caller(&self) -> CallerContext;
}

/// Provider returning one preset caller. Covers tests and single-principal
/// embedders; multi-user embedders implement [`IdentityProvider`] against
/// their session layer.
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    caller: CallerContext,
}

impl FixedIdentity {
    pub fn new(caller: CallerContext) -> Self {
        Self { caller }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            caller: CallerContext::new(user_id),
        }
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_caller(&self) -> CallerContext {
        self.caller.clone()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
