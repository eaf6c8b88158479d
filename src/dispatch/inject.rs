//! Message injection - builds the final wire payload for one attempt.

use serde_json::{Value, json};

use crate::domain::{InjectPlacement, ScheduleGroup};

/// Prepend/append the group's configured system and user messages into a
/// payload's message list.
///
/// Pure function: the input payload is never mutated, and the same inputs
/// always produce the same output (it runs once per attempt). The system
/// message is inserted first, then the user message, each at the front
/// (default) or back per the group's placement. Empty inject texts add
/// nothing.
pub fn apply_inject(group: &ScheduleGroup, payload: &Value) -> Value {
    let mut messages: Vec<Value> = payload["messages"].as_array().cloned().unwrap_or_default();

    let system_text = group.system_text();
    if !system_text.is_empty() {
        let msg = json!({ "role": "system", "content": system_text });
        match group.system_inject {
            InjectPlacement::Back => messages.push(msg),
            InjectPlacement::Front => messages.insert(0, msg),
        }
    }

    if !group.user_inject_text.is_empty() {
        let msg = json!({ "role": "user", "content": group.user_inject_text });
        match group.user_inject {
            InjectPlacement::Back => messages.push(msg),
            InjectPlacement::Front => messages.insert(0, msg),
        }
    }

    let mut merged = if payload.is_object() { payload.clone() } else { json!({}) };
    merged["messages"] = Value::Array(messages);
    merged
}
