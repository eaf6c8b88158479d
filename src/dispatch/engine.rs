//! The dispatch engine: an ordered fallback chain with bounded per-step retry.
//!
//! One invocation processes one chain sequentially - each attempt's outcome
//! gates whether the next attempt or step runs at all. Parallelism lives in
//! the caller (the labeler worker pool); the only state shared between
//! concurrent dispatches is the key rotator's per-channel cursor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    AttemptRecord, DispatchFailure, DispatchRequest, DispatchResult, DispatchSuccess, Step,
    StepError, StepRef,
};
use crate::error::{Result, TaggrError};
use crate::llm::{CallError, ChatTransport, extract_content, normalize_base_url};
use crate::store::ConfigDirectory;

use super::accept::{accept, content_length};
use super::inject::apply_inject;
use super::rotation::KeyRotator;
use super::transition::{AttemptOutcome, ChainAction, next_action};

/// Drives chat-completion payloads through schedule-group chains.
///
/// The engine owns its key-rotation cursors, so independent instances (one
/// per test, say) never share state. It is cheap to share behind an `Arc`
/// across a worker pool.
pub struct DispatchEngine<T: ChatTransport> {
    transport: Arc<T>,
    rotator: KeyRotator,
}

impl<T: ChatTransport> DispatchEngine<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            rotator: KeyRotator::new(),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Run one dispatch: validate the request, then walk the enabled steps in
    /// chain order until an attempt is accepted or the chain is exhausted.
    ///
    /// Request-level problems (unknown group, non-object payload, zero
    /// enabled steps) fail fast as errors; everything downstream is
    /// accumulated and returned inside the `DispatchResult`, never thrown.
    pub async fn dispatch<D>(
        &self,
        directory: &D,
        request: &DispatchRequest,
        cancel: &CancellationToken,
    ) -> Result<DispatchResult>
    where
        D: ConfigDirectory + ?Sized,
    {
        let group = directory
            .schedule_group(&request.schedule_group_id)
            .ok_or_else(|| TaggrError::GroupNotFound(request.schedule_group_id.clone()))?;
        if !request.payload.is_object() {
            return Err(TaggrError::BadRequest("Missing payload".to_string()));
        }
        let steps: Vec<Step> = group.enabled_steps().into_iter().cloned().collect();
        if steps.is_empty() {
            return Err(TaggrError::BadRequest("No enabled steps".to_string()));
        }

        let rules = directory.global_rules();
        let min_len = request.min_chars.or(rules.min_chars);
        let max_len = request.max_chars.or(rules.max_chars);
        let auto_retry = request.auto_retry.unwrap_or(rules.auto_retry);

        info!(
            group = %group.name,
            steps = steps.len(),
            auto_retry,
            ?min_len,
            ?max_len,
            "dispatch started"
        );

        let dispatch_started = Instant::now();
        let mut errors: Vec<StepError> = Vec::new();
        let mut attempts_log: Vec<AttemptRecord> = Vec::new();

        'chain: for (step_index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                errors.push(StepError::message(step_ref(step), "dispatch cancelled"));
                break 'chain;
            }

            let channel = match directory.channel(&step.channel_id) {
                Some(channel) => channel,
                None => {
                    warn!(step_index, channel_id = %step.channel_id, "channel missing");
                    errors.push(StepError::message(step_ref(step), "Channel missing"));
                    match next_action(AttemptOutcome::ConfigFailure, auto_retry, false) {
                        ChainAction::AbortChain => break 'chain,
                        _ => continue 'chain,
                    }
                }
            };

            let base_url = normalize_base_url(&channel.api_url);
            if base_url.is_empty() {
                warn!(step_index, channel_id = %channel.id, "channel apiUrl missing");
                errors.push(StepError::message(step_ref(step), "Channel apiUrl missing"));
                match next_action(AttemptOutcome::ConfigFailure, auto_retry, false) {
                    ChainAction::AbortChain => break 'chain,
                    _ => continue 'chain,
                }
            }

            let attempts = step.attempts();
            let timeout_ms = group.effective_timeout_sec(step) * 1000;

            debug!(
                step_index,
                channel = %channel.name,
                model = %step.model,
                max_attempts = attempts,
                timeout_ms,
                "step started"
            );

            for attempt in 1..=attempts {
                if cancel.is_cancelled() {
                    errors.push(StepError::message(step_ref(step), "dispatch cancelled"));
                    break 'chain;
                }

                // Per-attempt model resolution: the step's model, else the
                // payload's own.
                let model = if step.model.is_empty() {
                    request.payload["model"].as_str().unwrap_or("").to_string()
                } else {
                    step.model.clone()
                };

                let mut payload = request.payload.clone();
                if let Some(obj) = payload.as_object_mut() {
                    if model.is_empty() {
                        obj.remove("model");
                    } else {
                        obj.insert("model".to_string(), Value::String(model.clone()));
                    }
                }
                let merged = apply_inject(&group, &payload);
                let api_key = self.rotator.next_key(&channel);
                let attempted = StepRef {
                    channel_id: channel.id.clone(),
                    model: model.clone(),
                };

                debug!(step_index, attempt, max_attempts = attempts, model = %model, "calling provider");
                let attempt_started = Instant::now();
                let call = tokio::select! {
                    _ = cancel.cancelled() => Err(CallError::Cancelled),
                    reply = self.transport.post_chat(&base_url, &api_key, &merged, timeout_ms) => reply,
                };
                let duration_ms = attempt_started.elapsed().as_millis() as u64;

                let outcome = match call {
                    Ok(reply) if reply.is_success() => {
                        let content = extract_content(&reply.json);
                        let length = content_length(&content);
                        if accept(&content, min_len, max_len) {
                            attempts_log.push(AttemptRecord {
                                step_index,
                                channel_id: channel.id.clone(),
                                model: model.clone(),
                                attempt,
                                status: reply.status,
                                ok: true,
                                length: Some(length),
                                error: None,
                                detail: None,
                                duration_ms,
                            });
                            info!(
                                step_index,
                                attempt,
                                length,
                                total_ms = dispatch_started.elapsed().as_millis() as u64,
                                "dispatch accepted"
                            );
                            return Ok(DispatchResult::Success(DispatchSuccess {
                                ok: true,
                                step: attempted,
                                attempt,
                                response: reply.json,
                                attempts: attempts_log,
                            }));
                        }

                        debug!(step_index, attempt, length, ?min_len, ?max_len, "length rule failed");
                        attempts_log.push(AttemptRecord {
                            step_index,
                            channel_id: channel.id.clone(),
                            model: model.clone(),
                            attempt,
                            status: reply.status,
                            ok: false,
                            length: Some(length),
                            error: Some("length_rule_failed".to_string()),
                            detail: None,
                            duration_ms,
                        });
                        errors.push(StepError {
                            step: attempted,
                            error: Value::String("Length rule failed".to_string()),
                            length: Some(length),
                        });
                        AttemptOutcome::RejectedRetryable
                    }
                    Ok(reply) => {
                        warn!(step_index, attempt, status = reply.status, "provider returned error status");
                        attempts_log.push(AttemptRecord {
                            step_index,
                            channel_id: channel.id.clone(),
                            model: model.clone(),
                            attempt,
                            status: reply.status,
                            ok: false,
                            length: None,
                            error: Some("http_error".to_string()),
                            detail: Some(reply.json.clone()),
                            duration_ms,
                        });
                        errors.push(StepError::detail(attempted, reply.json));
                        AttemptOutcome::RejectedRetryable
                    }
                    Err(CallError::Cancelled) => {
                        warn!(step_index, attempt, "dispatch cancelled mid-call");
                        attempts_log.push(AttemptRecord {
                            step_index,
                            channel_id: channel.id.clone(),
                            model: model.clone(),
                            attempt,
                            status: 0,
                            ok: false,
                            length: None,
                            error: Some("dispatch cancelled".to_string()),
                            detail: None,
                            duration_ms,
                        });
                        errors.push(StepError::message(attempted, "dispatch cancelled"));
                        break 'chain;
                    }
                    Err(e) => {
                        warn!(step_index, attempt, error = %e, "attempt failed");
                        attempts_log.push(AttemptRecord {
                            step_index,
                            channel_id: channel.id.clone(),
                            model: model.clone(),
                            attempt,
                            status: 0,
                            ok: false,
                            length: None,
                            error: Some(e.to_string()),
                            detail: None,
                            duration_ms,
                        });
                        errors.push(StepError::message(attempted, e.to_string()));
                        AttemptOutcome::RejectedRetryable
                    }
                };

                match next_action(outcome, auto_retry, attempt < attempts) {
                    ChainAction::AbortChain => break 'chain,
                    ChainAction::AdvanceStep => continue 'chain,
                    ChainAction::RetrySameStep => {
                        // Interval only applies between attempts of the same step.
                        if step.interval > 0.0 {
                            debug!(step_index, interval = step.interval, "waiting before retry");
                            tokio::select! {
                                _ = cancel.cancelled() => {}
                                _ = tokio::time::sleep(Duration::from_secs_f64(step.interval)) => {}
                            }
                        }
                    }
                    // Accepted short-circuits above; the table never yields
                    // ReturnSuccess for a failed attempt.
                    ChainAction::ReturnSuccess => continue 'chain,
                }
            }
        }

        warn!(
            errors = errors.len(),
            attempts = attempts_log.len(),
            total_ms = dispatch_started.elapsed().as_millis() as u64,
            "all steps failed"
        );
        Ok(DispatchResult::Failed(DispatchFailure::all_steps_failed(
            errors,
            attempts_log,
        )))
    }
}

fn step_ref(step: &Step) -> StepRef {
    StepRef {
        channel_id: step.channel_id.clone(),
        model: step.model.clone(),
    }
}
