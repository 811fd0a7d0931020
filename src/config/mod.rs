// SPDX-License-Identifier: MIT
//! Engine configuration (`taskgate.toml`).
//!
//! Everything is optional: an absent file, an empty file, or a file with a
//! subset of sections all yield working settings. Role membership is the one
//! section most deployments fill in.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{Error, Result};
use crate::security::{CallerContext, EngineRole};

// ─── RolesConfig ─────────────────────────────────────────────────────────────

/// Engine-role membership (`[roles]` in taskgate.toml).
///
/// Each list names the access ids (user or group ids) holding the role. Role
/// holders bypass workbasket permission checks; `terminate` requires one.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RolesConfig {
    pub admin: Vec<String>,
    pub task_admin: Vec<String>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            admin: Vec::new(),
            task_admin: Vec::new(),
        }
    }
}

// ─── HistoryConfig ───────────────────────────────────────────────────────────

/// Task history configuration (`[history]` in taskgate.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record one history event per applied transition. Default: true.
    pub enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ─── StorageConfig ───────────────────────────────────────────────────────────

/// Storage tuning (`[storage]` in taskgate.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Log SQLite statements that exceed this threshold (milliseconds).
    /// Default: 100. Set to 0 to disable slow statement logging.
    pub slow_query_threshold_ms: u64,
    /// SQLite busy timeout (milliseconds). Default: 5000.
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 100,
            busy_timeout_ms: 5000,
        }
    }
}

// ─── EngineConfig ────────────────────────────────────────────────────────────

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub roles: RolesConfig,
    pub history: HistoryConfig,
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load from a TOML file. A missing file yields defaults; a present but
    /// malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Load, falling back to defaults on any failure. For embedders that
    /// prefer degraded startup over refusing to start.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), err = %e, "failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// True when any of the caller's access ids appears in the role's
    /// member list. Matching is exact.
    pub fn holds_role(&self, role: EngineRole, caller: &CallerContext) -> bool {
        let members = match role {
            EngineRole::Admin => &self.roles.admin,
            EngineRole::TaskAdmin => &self.roles.task_admin,
        };
        caller
            .access_ids()
            .iter()
            .any(|id| members.iter().any(|m| m == id))
    }

    /// True when the caller holds any engine role.
    pub fn is_privileged(&self, caller: &CallerContext) -> bool {
        self.holds_role(EngineRole::Admin, caller) || self.holds_role(EngineRole::TaskAdmin, caller)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = EngineConfig::default();
        assert!(config.roles.admin.is_empty());
        assert!(config.history.enabled);
        assert_eq!(config.storage.slow_query_threshold_ms, 100);
        assert_eq!(config.storage.busy_timeout_ms, 5000);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [roles]
            admin = ["admin-1"]
            "#,
        )
        .unwrap();
        assert_eq!(config.roles.admin, vec!["admin-1"]);
        assert!(config.roles.task_admin.is_empty());
        assert!(config.history.enabled);
        assert_eq!(config.storage.busy_timeout_ms, 5000);
    }

    #[test]
    fn role_membership_via_group() {
        let config: EngineConfig = toml::from_str(
            r#"
            [roles]
            admin = ["group-admins"]
            task_admin = ["taskadmin-1"]
            "#,
        )
        .unwrap();
        let caller = CallerContext::new("user-1-1").with_groups(["group-admins"]);
        assert!(config.holds_role(EngineRole::Admin, &caller));
        assert!(!config.holds_role(EngineRole::TaskAdmin, &caller));
        assert!(config.is_privileged(&caller));

        let plain = CallerContext::new("user-1-2");
        assert!(!config.is_privileged(&plain));
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("taskgate.toml")).unwrap();
        assert!(config.history.enabled);
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskgate.toml");
        std::fs::write(&path, "roles = \"not a table\"").unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
        let fallback = EngineConfig::load_or_default(&path);
        assert!(fallback.history.enabled);
    }
}
