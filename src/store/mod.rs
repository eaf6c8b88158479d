//! Application configuration state.
//!
//! The labeling UI persists everything in a single JSON document
//! (`data.json`): channels, schedule groups, and the global rules. This crate
//! only reads that document - editing and saving it is the UI's concern. The
//! dispatch engine sees configuration through the `ConfigDirectory` trait so
//! tests can hand it an in-memory state directly.

pub mod diagnostics;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Channel, GlobalRules, ScheduleGroup};
use crate::error::{Result, TaggrError};

pub use diagnostics::{Diagnostic, DiagnosticLevel, DiagnosticsReport, check_state};

/// Read-only configuration view consumed by the dispatch engine.
///
/// Lookups return owned clones: configuration is read at call time with no
/// snapshot isolation, and a dispatch must not hold borrows into shared state
/// across await points.
pub trait ConfigDirectory: Send + Sync {
    fn channel(&self, id: &str) -> Option<Channel>;
    fn schedule_group(&self, id: &str) -> Option<ScheduleGroup>;
    fn global_rules(&self) -> GlobalRules;
}

/// The `data.json` document, with unknown sections ignored and missing
/// sections coerced to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub channels: Vec<Channel>,
    pub schedule_groups: Vec<ScheduleGroup>,
    pub global_rules: GlobalRules,
}

impl AppState {
    /// Load state from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| TaggrError::State(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| TaggrError::State(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Load state, falling back to defaults when the file is missing or
    /// malformed (matching the tolerant loader the UI uses).
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Using default state: {}", e);
                Self::default()
            }
        }
    }
}

impl ConfigDirectory for AppState {
    fn channel(&self, id: &str) -> Option<Channel> {
        self.channels.iter().find(|c| c.id == id).cloned()
    }

    fn schedule_group(&self, id: &str) -> Option<ScheduleGroup> {
        self.schedule_groups.iter().find(|g| g.id == id).cloned()
    }

    fn global_rules(&self) -> GlobalRules {
        self.global_rules.clone()
    }
}
