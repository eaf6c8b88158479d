//! End-to-end dispatch chain scenarios against a scripted transport.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use taggr::dispatch::DispatchEngine;
use taggr::domain::{
    Channel, DispatchRequest, DispatchResult, GlobalRules, ScheduleGroup, Step,
};
use taggr::labeler::{BatchOptions, run_batch};
use taggr::llm::{CallError, CallReply, MockChatTransport};
use taggr::store::AppState;

fn channel(id: &str, keys: &[&str]) -> Channel {
    Channel {
        id: id.to_string(),
        name: format!("{} channel", id),
        api_url: format!("https://{}.example.com/v1", id),
        api_keys: keys.iter().map(|k| k.to_string()).collect(),
    }
}

fn step(channel_id: &str, model: &str, retries: u32) -> Step {
    Step {
        channel_id: channel_id.to_string(),
        model: model.to_string(),
        retries,
        interval: 0.0,
        ..Default::default()
    }
}

fn state(channels: Vec<Channel>, steps: Vec<Step>, rules: GlobalRules) -> AppState {
    AppState {
        channels,
        schedule_groups: vec![ScheduleGroup {
            id: "sg-1".to_string(),
            name: "chain".to_string(),
            steps,
            ..Default::default()
        }],
        global_rules: rules,
    }
}

fn open_rules() -> GlobalRules {
    GlobalRules { min_chars: None, max_chars: None, auto_retry: true }
}

fn payload() -> Value {
    json!({ "messages": [{ "role": "user", "content": "caption this image" }] })
}

fn engine() -> (DispatchEngine<MockChatTransport>, Arc<MockChatTransport>) {
    let mock = Arc::new(MockChatTransport::new());
    (DispatchEngine::new(mock.clone()), mock)
}

async fn dispatch(
    engine: &DispatchEngine<MockChatTransport>,
    state: &AppState,
) -> DispatchResult {
    engine
        .dispatch(state, &DispatchRequest::new("sg-1", payload()), &CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn single_step_single_attempt_success() {
    let (engine, mock) = engine();
    mock.push_content("a tabby cat on a sunny windowsill");

    let state = state(vec![channel("x", &["k"])], vec![step("x", "gpt-4o", 3)], open_rules());
    let result = dispatch(&engine, &state).await;

    assert_eq!(result.content().as_deref(), Some("a tabby cat on a sunny windowsill"));
    assert_eq!(result.attempts().len(), 1);
    let DispatchResult::Success(success) = result else { panic!("expected success") };
    assert_eq!(success.attempt, 1);
    assert_eq!(success.attempts.len(), 1);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn failing_step_exhausts_budget_then_falls_through() {
    let (engine, mock) = engine();
    // Step 0 has retries=2, so exactly 3 attempts before falling through.
    mock.push_network_errors(3);
    mock.push_content("caption from the fallback step");

    let state = state(
        vec![channel("x", &["k"]), channel("y", &["k"])],
        vec![step("x", "m-a", 2), step("y", "m-b", 0)],
        open_rules(),
    );
    let result = dispatch(&engine, &state).await;

    let DispatchResult::Success(success) = result else { panic!("expected success") };
    assert_eq!(success.step.channel_id, "y");
    assert_eq!(success.attempts.len(), 4);
    assert_eq!(success.attempts.iter().filter(|a| a.step_index == 0).count(), 3);
    assert_eq!(mock.call_count(), 4);
}

#[tokio::test]
async fn auto_retry_off_aborts_the_chain_on_first_failure() {
    let (engine, mock) = engine();
    mock.push(Err(CallError::Network("connection refused".to_string())));

    let rules = GlobalRules { min_chars: None, max_chars: None, auto_retry: false };
    let state = state(
        vec![channel("x", &["k"]), channel("y", &["k"])],
        vec![step("x", "m-a", 4), step("y", "m-b", 4)],
        rules,
    );
    let result = dispatch(&engine, &state).await;

    let DispatchResult::Failed(failure) = result else { panic!("expected failure") };
    // No same-step retries, no fall-through: one attempt total.
    assert_eq!(failure.attempts.len(), 1);
    assert_eq!(failure.error, "All steps failed");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn timeouts_on_primary_fall_through_to_secondary() {
    let (engine, mock) = engine();
    mock.push(Err(CallError::Timeout(60_000)));
    mock.push(Err(CallError::Timeout(60_000)));
    mock.push_content("caption from channel y");

    let state = state(
        vec![channel("x", &["k"]), channel("y", &["k"])],
        vec![step("x", "m-a", 1), step("y", "m-b", 0)],
        open_rules(),
    );
    let result = dispatch(&engine, &state).await;

    let DispatchResult::Success(success) = result else { panic!("expected success") };
    assert_eq!(success.step.channel_id, "y");
    assert_eq!(success.attempts.len(), 3);
    assert!(success.attempts[..2].iter().all(|a| a.status == 0 && !a.ok));
}

#[tokio::test]
async fn missing_channel_fails_without_network_calls() {
    let (engine, mock) = engine();

    let state = state(vec![], vec![step("ghost", "m-a", 5)], open_rules());
    let result = dispatch(&engine, &state).await;

    let DispatchResult::Failed(failure) = result else { panic!("expected failure") };
    assert!(failure.attempts.is_empty());
    assert_eq!(failure.errors.len(), 1);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn keys_rotate_across_attempts_and_chains() {
    let (engine, mock) = engine();
    mock.push_network_errors(2);
    mock.push_content("finally a caption");

    let state = state(
        vec![channel("x", &["a", "b", "c"])],
        vec![step("x", "m-a", 2)],
        open_rules(),
    );
    let result = dispatch(&engine, &state).await;
    assert!(result.is_ok());

    let keys: Vec<String> = mock.calls().iter().map(|c| c.api_key.clone()).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);

    // The cursor persists for the next dispatch on the same engine.
    mock.push_content("second dispatch caption");
    let _ = dispatch(&engine, &state).await;
    assert_eq!(mock.calls()[3].api_key, "a");
}

#[tokio::test]
async fn default_rules_reject_short_content() {
    let (engine, mock) = engine();
    mock.push_content("tiny");

    // Default window is exactly [200, 200] characters.
    let state = state(vec![channel("x", &["k"])], vec![step("x", "m-a", 0)], GlobalRules::default());
    let result = dispatch(&engine, &state).await;

    let DispatchResult::Failed(failure) = result else { panic!("expected failure") };
    assert_eq!(failure.attempts[0].error.as_deref(), Some("length_rule_failed"));
    assert_eq!(failure.attempts[0].length, Some(4));

    mock.push_content(&"x".repeat(200));
    let result = dispatch(&engine, &state).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn injection_reaches_the_provider_payload() {
    let (engine, mock) = engine();
    mock.push_content("caption");

    let mut state = state(vec![channel("x", &["k"])], vec![step("x", "m-a", 0)], open_rules());
    state.schedule_groups[0].system_inject_text = "you are a terse captioner".to_string();
    state.schedule_groups[0].user_inject_text = "tags only".to_string();

    let _ = dispatch(&engine, &state).await;

    let body = mock.calls()[0].body.clone();
    let messages = body["messages"].as_array().unwrap().clone();
    // Front placements: user inject lands ahead of the system inject.
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "tags only");
    assert_eq!(messages[1]["role"], "system");
    assert_eq!(messages[2]["content"], "caption this image");
}

#[tokio::test]
async fn label_batch_end_to_end() {
    let (engine, mock) = engine();
    mock.push_content("a red bicycle against a brick wall");
    mock.push(Ok(CallReply { status: 503, json: json!({ "error": "busy" }) }));
    mock.push_content("a bowl of ramen with soft-boiled egg");

    let state = state(
        vec![channel("x", &["k"])],
        vec![step("x", "gpt-4o", 0)],
        open_rules(),
    );

    let dir = tempfile::TempDir::new().unwrap();
    for name in ["bike.jpg", "cat.png", "ramen.webp"] {
        std::fs::write(dir.path().join(name), b"img").unwrap();
    }

    let options = BatchOptions {
        schedule_group_id: "sg-1".to_string(),
        prompt: "describe".to_string(),
        workers: Some(1),
        ..Default::default()
    };
    let report = run_batch(&engine, &state, dir.path(), &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.labeled, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("bike.txt")).unwrap(),
        "a red bicycle against a brick wall"
    );
    assert!(!dir.path().join("cat.txt").exists());
    assert!(dir.path().join("ramen.txt").exists());
}
