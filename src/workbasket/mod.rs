// SPDX-License-Identifier: MIT
//! Workbaskets and their access-control model.
//!
//! A workbasket scopes a set of tasks and the access items governing who may
//! act on them. Access items grant permission sets to access ids (user or
//! group identities); the guard in [`guard`] aggregates them per caller.

use serde::{Deserialize, Serialize};

pub mod guard;

/// Permissions grantable on a workbasket. Every lifecycle transition
/// requires `READ` on the task's workbasket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkbasketPermission {
    Read,
    Open,
    Append,
    Transfer,
    Distribute,
}

impl WorkbasketPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkbasketPermission::Read => "READ",
            WorkbasketPermission::Open => "OPEN",
            WorkbasketPermission::Append => "APPEND",
            WorkbasketPermission::Transfer => "TRANSFER",
            WorkbasketPermission::Distribute => "DISTRIBUTE",
        }
    }
}

impl std::fmt::Display for WorkbasketPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a workbasket as carried by a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkbasketSummary {
    pub id: String,
    pub key: String,
    pub domain: String,
    pub name: String,
}

impl WorkbasketSummary {
    pub fn new(
        key: impl Into<String>,
        domain: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            key: key.into(),
            domain: domain.into(),
            name: name.into(),
        }
    }
}

/// A grant of permissions to one access id on one workbasket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbasketAccessItem {
    pub id: String,
    pub workbasket_id: String,
    pub access_id: String,
    pub permissions: Vec<WorkbasketPermission>,
}

impl WorkbasketAccessItem {
    pub fn new(
        workbasket_id: impl Into<String>,
        access_id: impl Into<String>,
        permissions: Vec<WorkbasketPermission>,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            workbasket_id: workbasket_id.into(),
            access_id: access_id.into(),
            permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_serde_uses_upper_case() {
        let json = serde_json::to_string(&WorkbasketPermission::Read).unwrap();
        assert_eq!(json, "\"READ\"");
        let parsed: WorkbasketPermission = serde_json::from_str("\"APPEND\"").unwrap();
        assert_eq!(parsed, WorkbasketPermission::Append);
    }

    #[test]
    fn access_item_carries_grant() {
        let basket = WorkbasketSummary::new("GPK_KSC", "DOMAIN_A", "Kitchen Sink");
        let item = WorkbasketAccessItem::new(
            &basket.id,
            "user-1-1",
            vec![WorkbasketPermission::Read, WorkbasketPermission::Append],
        );
        assert_eq!(item.workbasket_id, basket.id);
        assert_eq!(item.permissions.len(), 2);
    }
}
