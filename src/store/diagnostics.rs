//! Configuration consistency checks.
//!
//! Dangling step references, blank endpoints, empty key pools, and inverted
//! acceptance windows are all diagnosable configuration errors rather than
//! crashes; this module turns a loaded state into a report the CLI can print.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Value, json};

use super::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// One finding, with a stable machine-readable code and a location pointer.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsSummary {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub summary: DiagnosticsSummary,
    pub items: Vec<Diagnostic>,
}

impl DiagnosticsReport {
    pub fn has_errors(&self) -> bool {
        self.summary.error > 0
    }
}

/// Check a loaded state for consistency problems.
pub fn check_state(state: &AppState) -> DiagnosticsReport {
    let mut items = Vec::new();
    let channel_ids: HashSet<&str> = state.channels.iter().map(|c| c.id.as_str()).collect();

    for channel in &state.channels {
        let name = display_name(&channel.name, "unnamed channel");
        if !channel.has_api_url() {
            items.push(Diagnostic {
                level: DiagnosticLevel::Warning,
                code: "CHANNEL_API_URL_MISSING",
                message: format!("Channel \"{}\" has no apiUrl.", name),
                location: Some(json!({ "channelId": channel.id })),
            });
        }
        let usable = channel
            .api_keys
            .iter()
            .filter(|k| !k.trim().is_empty())
            .count();
        if usable == 0 {
            items.push(Diagnostic {
                level: DiagnosticLevel::Warning,
                code: "CHANNEL_API_KEYS_MISSING",
                message: format!("Channel \"{}\" has no usable apiKeys.", name),
                location: Some(json!({ "channelId": channel.id })),
            });
        }
    }

    for group in &state.schedule_groups {
        let name = display_name(&group.name, "unnamed schedule group");
        for (step_index, step) in group.steps.iter().enumerate() {
            if step.channel_id.is_empty() || !channel_ids.contains(step.channel_id.as_str()) {
                items.push(Diagnostic {
                    level: DiagnosticLevel::Error,
                    code: "STEP_CHANNEL_NOT_FOUND",
                    message: format!(
                        "Schedule group \"{}\" step {} references a channel that does not exist.",
                        name,
                        step_index + 1
                    ),
                    location: Some(json!({ "scheduleGroupId": group.id, "stepIndex": step_index })),
                });
            }
            if step.model.trim().is_empty() {
                items.push(Diagnostic {
                    level: DiagnosticLevel::Warning,
                    code: "STEP_MODEL_MISSING",
                    message: format!(
                        "Schedule group \"{}\" step {} has no model.",
                        name,
                        step_index + 1
                    ),
                    location: Some(json!({ "scheduleGroupId": group.id, "stepIndex": step_index })),
                });
            }
        }
    }

    if let (Some(min), Some(max)) = (state.global_rules.min_chars, state.global_rules.max_chars) {
        if min > max {
            items.push(Diagnostic {
                level: DiagnosticLevel::Error,
                code: "GLOBAL_RULES_RANGE_INVALID",
                message: format!("globalRules.minChars ({}) is greater than maxChars ({}).", min, max),
                location: Some(json!({ "field": "globalRules" })),
            });
        }
    }

    if items.is_empty() {
        items.push(Diagnostic {
            level: DiagnosticLevel::Info,
            code: "CONFIG_CHECK_PASSED",
            message: "No configuration consistency problems found.".to_string(),
            location: None,
        });
    }

    let summary = DiagnosticsSummary {
        error: items.iter().filter(|i| i.level == DiagnosticLevel::Error).count(),
        warning: items.iter().filter(|i| i.level == DiagnosticLevel::Warning).count(),
        info: items.iter().filter(|i| i.level == DiagnosticLevel::Info).count(),
        total: items.len(),
    };

    DiagnosticsReport { summary, items }
}

fn display_name<'a>(name: &'a str, fallback: &'a str) -> &'a str {
    if name.trim().is_empty() { fallback } else { name }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Channel, GlobalRules, ScheduleGroup, Step};

    fn channel(id: &str, api_url: &str, keys: &[&str]) -> Channel {
        Channel {
            id: id.into(),
            name: id.into(),
            api_url: api_url.into(),
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_clean_state_passes() {
        let state = AppState {
            channels: vec![channel("ch-1", "https://api.example.com", &["k"])],
            schedule_groups: vec![ScheduleGroup {
                id: "sg-1".into(),
                steps: vec![Step {
                    channel_id: "ch-1".into(),
                    model: "gpt-4o".into(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            global_rules: GlobalRules::default(),
        };

        let report = check_state(&state);
        assert!(!report.has_errors());
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.items[0].code, "CONFIG_CHECK_PASSED");
    }

    #[test]
    fn test_blank_channel_fields_warn() {
        let state = AppState {
            channels: vec![channel("ch-1", "  ", &["", "  "])],
            ..Default::default()
        };

        let report = check_state(&state);
        let codes: Vec<_> = report.items.iter().map(|i| i.code).collect();
        assert!(codes.contains(&"CHANNEL_API_URL_MISSING"));
        assert!(codes.contains(&"CHANNEL_API_KEYS_MISSING"));
        assert_eq!(report.summary.warning, 2);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_dangling_step_reference_is_error() {
        let state = AppState {
            schedule_groups: vec![ScheduleGroup {
                id: "sg-1".into(),
                steps: vec![Step { channel_id: "ghost".into(), model: "m".into(), ..Default::default() }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let report = check_state(&state);
        assert!(report.has_errors());
        let item = report
            .items
            .iter()
            .find(|i| i.code == "STEP_CHANNEL_NOT_FOUND")
            .unwrap();
        assert_eq!(item.location.as_ref().unwrap()["stepIndex"], 0);
    }

    #[test]
    fn test_inverted_window_is_error() {
        let state = AppState {
            global_rules: GlobalRules {
                min_chars: Some(300),
                max_chars: Some(100),
                auto_retry: true,
            },
            ..Default::default()
        };

        let report = check_state(&state);
        assert!(report.items.iter().any(|i| i.code == "GLOBAL_RULES_RANGE_INVALID"));
    }

    #[test]
    fn test_unbounded_window_is_fine() {
        let state = AppState {
            global_rules: GlobalRules { min_chars: Some(300), max_chars: None, auto_retry: true },
            ..Default::default()
        };

        let report = check_state(&state);
        assert!(!report.has_errors());
    }
}
