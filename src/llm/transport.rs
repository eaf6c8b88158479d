//! Chat-completion transport: one HTTP POST per attempt.
//!
//! The transport is deliberately dumb: it normalizes the base URL, posts the
//! JSON body, and hands back whatever came over the wire. Malformed provider
//! bodies are wrapped as `{"raw": text}` rather than failing - deciding what a
//! response is worth is the dispatch engine's job.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors surfaced by one transport call. All of these are attempt-level:
/// the dispatch engine records them and decides whether to retry.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("dispatch cancelled")]
    Cancelled,
}

/// Raw result of one chat-completion call: HTTP status plus parsed body.
#[derive(Debug, Clone)]
pub struct CallReply {
    pub status: u16,
    pub json: Value,
}

impl CallReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One chat-completion request over the wire.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POST `body` to `{base_url}/v1/chat/completions`.
    ///
    /// `api_key` is sent as a bearer token when non-empty. A `timeout_ms` of
    /// zero disables the local generosity timeout.
    async fn post_chat(
        &self,
        base_url: &str,
        api_key: &str,
        body: &Value,
        timeout_ms: u64,
    ) -> Result<CallReply, CallError>;
}

/// Trim trailing slashes and a trailing `/v1` segment so a channel configured
/// with or without `/v1` behaves identically.
pub fn normalize_base_url(api_url: &str) -> String {
    let trimmed = api_url.trim().trim_end_matches('/');
    if trimmed.len() >= 3 && trimmed[trimmed.len() - 3..].eq_ignore_ascii_case("/v1") {
        trimmed[..trimmed.len() - 3].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extract `choices[0].message.content` from a provider response, or `""`.
pub fn extract_content(response: &Value) -> String {
    response["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string()
}

/// Parse a response body as JSON, wrapping non-JSON text as `{"raw": text}`.
pub(crate) fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post_chat(
        &self,
        base_url: &str,
        api_key: &str,
        body: &Value,
        timeout_ms: u64,
    ) -> Result<CallReply, CallError> {
        let url = format!("{}/v1/chat/completions", normalize_base_url(base_url));

        let mut request = self.client.post(&url).json(body);
        if !api_key.is_empty() {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {}", api_key));
        }
        if timeout_ms > 0 {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CallError::Timeout(timeout_ms)
            } else {
                CallError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CallError::Timeout(timeout_ms)
            } else {
                CallError::Network(e.to_string())
            }
        })?;

        Ok(CallReply { status, json: parse_body(&text) })
    }
}

/// One call as seen by the mock transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub base_url: String,
    pub api_key: String,
    pub body: Value,
    pub timeout_ms: u64,
}

/// Scripted transport for tests: replies are consumed in order; once the
/// script runs out, every call fails with a network error.
#[derive(Debug, Default)]
pub struct MockChatTransport {
    script: Mutex<VecDeque<Result<CallReply, CallError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockChatTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next unscripted call.
    pub fn push(&self, reply: Result<CallReply, CallError>) {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .push_back(reply);
    }

    /// Queue a 2xx reply whose extracted content is `content`.
    pub fn push_content(&self, content: &str) {
        self.push(Ok(CallReply {
            status: 200,
            json: json!({
                "choices": [{ "message": { "role": "assistant", "content": content } }]
            }),
        }));
    }

    /// Queue `n` identical network failures.
    pub fn push_network_errors(&self, n: usize) {
        for _ in 0..n {
            self.push(Err(CallError::Network("connection refused".to_string())));
        }
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock poisoned").len()
    }
}

#[async_trait]
impl ChatTransport for MockChatTransport {
    async fn post_chat(
        &self,
        base_url: &str,
        api_key: &str,
        body: &Value,
        timeout_ms: u64,
    ) -> Result<CallReply, CallError> {
        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .push(RecordedCall {
                base_url: base_url.to_string(),
                api_key: api_key.to_string(),
                body: body.clone(),
                timeout_ms,
            });
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(CallError::Network("mock script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_trailing_slashes() {
        assert_eq!(normalize_base_url("https://api.example.com///"), "https://api.example.com");
    }

    #[test]
    fn test_normalize_strips_v1_suffix() {
        assert_eq!(normalize_base_url("https://api.example.com/v1"), "https://api.example.com");
        assert_eq!(normalize_base_url("https://api.example.com/v1/"), "https://api.example.com");
        assert_eq!(normalize_base_url("https://api.example.com/V1"), "https://api.example.com");
    }

    #[test]
    fn test_normalize_keeps_inner_v1() {
        assert_eq!(
            normalize_base_url("https://api.example.com/v1/proxy"),
            "https://api.example.com/v1/proxy"
        );
    }

    #[test]
    fn test_normalize_blank() {
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("   "), "");
    }

    #[test]
    fn test_extract_content_present() {
        let json = json!({
            "choices": [{ "message": { "role": "assistant", "content": "a caption" } }]
        });
        assert_eq!(extract_content(&json), "a caption");
    }

    #[test]
    fn test_extract_content_missing_or_non_string() {
        assert_eq!(extract_content(&json!({})), "");
        assert_eq!(extract_content(&json!({"choices": []})), "");
        let structured = json!({
            "choices": [{ "message": { "content": [{"type": "text", "text": "x"}] } }]
        });
        assert_eq!(extract_content(&structured), "");
    }

    #[test]
    fn test_parse_body_json() {
        let parsed = parse_body(r#"{"ok": true}"#);
        assert_eq!(parsed["ok"], true);
    }

    #[test]
    fn test_parse_body_raw_fallback() {
        let parsed = parse_body("<html>Bad Gateway</html>");
        assert_eq!(parsed["raw"], "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_call_reply_success_window() {
        assert!(CallReply { status: 200, json: json!({}) }.is_success());
        assert!(CallReply { status: 299, json: json!({}) }.is_success());
        assert!(!CallReply { status: 300, json: json!({}) }.is_success());
        assert!(!CallReply { status: 0, json: json!({}) }.is_success());
    }

    #[tokio::test]
    async fn test_mock_transport_scripted_replies() {
        let mock = MockChatTransport::new();
        mock.push_content("hello");
        mock.push_network_errors(1);

        let first = mock
            .post_chat("https://x", "key", &json!({}), 1000)
            .await
            .unwrap();
        assert_eq!(extract_content(&first.json), "hello");

        let second = mock.post_chat("https://x", "key", &json!({}), 1000).await;
        assert!(matches!(second, Err(CallError::Network(_))));

        // Script exhausted: network error.
        let third = mock.post_chat("https://x", "key", &json!({}), 1000).await;
        assert!(matches!(third, Err(CallError::Network(_))));

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[0].api_key, "key");
    }
}
