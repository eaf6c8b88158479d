//! Schedule groups - ordered fallback chains of provider steps.

use serde::{Deserialize, Serialize};

/// Where an injected message lands relative to the payload's own messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectPlacement {
    #[default]
    Front,
    Back,
}

/// One provider+model+retry policy entry within a schedule group.
///
/// `retries` counts *additional* attempts after the first; `interval` is the
/// delay in seconds between attempts of the same step. `model` may be empty,
/// in which case the payload's own model is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub channel_id: String,
    pub model: String,
    pub retries: u32,
    pub interval: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
    pub enabled: bool,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            model: String::new(),
            retries: 0,
            interval: 0.0,
            concurrency: None,
            timeout_sec: None,
            enabled: true,
        }
    }
}

impl Step {
    /// Total attempt budget: always at least one.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1).max(1)
    }
}

/// An ordered fallback chain plus shared injection and timing configuration.
///
/// Step order is the fallback priority and is significant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleGroup {
    pub id: String,
    pub name: String,
    pub system_inject: InjectPlacement,
    pub user_inject: InjectPlacement,
    pub system_inject_text: String,
    pub user_inject_text: String,
    /// Legacy single-injection field from older state files; read only when
    /// `system_inject_text` is empty, never written back.
    #[serde(skip_serializing)]
    pub inject_text: String,
    /// Image-level parallelism hint for the labeling worker pool.
    pub concurrency: usize,
    /// Fallback request timeout when a step has none of its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
    pub steps: Vec<Step>,
}

impl Default for ScheduleGroup {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            system_inject: InjectPlacement::Front,
            user_inject: InjectPlacement::Front,
            system_inject_text: String::new(),
            user_inject_text: String::new(),
            inject_text: String::new(),
            concurrency: 1,
            timeout_sec: None,
            steps: Vec::new(),
        }
    }
}

impl ScheduleGroup {
    /// Effective system injection text, falling back to the legacy
    /// `injectText` field.
    pub fn system_text(&self) -> &str {
        if self.system_inject_text.is_empty() {
            &self.inject_text
        } else {
            &self.system_inject_text
        }
    }

    /// Steps that participate in dispatch, in chain order.
    pub fn enabled_steps(&self) -> Vec<&Step> {
        self.steps.iter().filter(|s| s.enabled).collect()
    }

    /// Effective request timeout for a step: step override, then the group
    /// fallback, then 60 seconds. Zero values are treated as unset.
    pub fn effective_timeout_sec(&self, step: &Step) -> u64 {
        match step.timeout_sec {
            Some(t) if t > 0 => t,
            _ => match self.timeout_sec {
                Some(t) if t > 0 => t,
                _ => 60,
            },
        }
    }
}
