//! Dispatch wire types: requests, attempt traces, and results.
//!
//! AttemptRecord is ephemeral - it is returned to the caller for audit and
//! never persisted as primary data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One dispatch invocation: a schedule group id, the chat payload, and
/// optional per-call overrides of the global rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub schedule_group_id: String,
    /// Chat-completion payload; must be a JSON object with a `messages` array.
    pub payload: Value,
    #[serde(default)]
    pub min_chars: Option<u32>,
    #[serde(default)]
    pub max_chars: Option<u32>,
    #[serde(default)]
    pub auto_retry: Option<bool>,
}

impl DispatchRequest {
    pub fn new(schedule_group_id: impl Into<String>, payload: Value) -> Self {
        Self {
            schedule_group_id: schedule_group_id.into(),
            payload,
            min_chars: None,
            max_chars: None,
            auto_retry: None,
        }
    }
}

/// The step a result or error came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRef {
    pub channel_id: String,
    pub model: String,
}

/// Record of one concrete attempt (one network call, or one configuration
/// failure that prevented a call).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub step_index: usize,
    pub channel_id: String,
    pub model: String,
    pub attempt: u32,
    /// HTTP status; 0 for network-level failures.
    pub status: u16,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Provider error body, when one was returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    pub duration_ms: u64,
}

/// One accumulated per-attempt or per-step error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepError {
    pub step: StepRef,
    /// A message string or the raw provider error body.
    pub error: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl StepError {
    pub fn message(step: StepRef, message: impl Into<String>) -> Self {
        Self {
            step,
            error: Value::String(message.into()),
            length: None,
        }
    }

    pub fn detail(step: StepRef, detail: Value) -> Self {
        Self {
            step,
            error: detail,
            length: None,
        }
    }
}

/// A satisfied dispatch: the first attempt anywhere in the chain that passed
/// both the HTTP gate and the acceptance rule.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSuccess {
    pub ok: bool,
    pub step: StepRef,
    pub attempt: u32,
    pub response: Value,
    pub attempts: Vec<AttemptRecord>,
}

/// Terminal failure: every step exhausted (or the chain aborted), with the
/// complete attempt trace and every recorded error.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub ok: bool,
    pub error: String,
    pub errors: Vec<StepError>,
    pub attempts: Vec<AttemptRecord>,
}

impl DispatchFailure {
    pub fn all_steps_failed(errors: Vec<StepError>, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            ok: false,
            error: "All steps failed".to_string(),
            errors,
            attempts,
        }
    }
}

/// Outcome of one dispatch invocation that passed the request preconditions.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DispatchResult {
    Success(DispatchSuccess),
    Failed(DispatchFailure),
}

impl DispatchResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, DispatchResult::Success(_))
    }

    /// The extracted response text on success.
    pub fn content(&self) -> Option<String> {
        match self {
            DispatchResult::Success(s) => Some(crate::llm::extract_content(&s.response)),
            DispatchResult::Failed(_) => None,
        }
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            DispatchResult::Success(s) => &s.attempts,
            DispatchResult::Failed(f) => &f.attempts,
        }
    }
}
