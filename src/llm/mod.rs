//! Provider caller layer - OpenAI-compatible chat-completion transport.
//!
//! This module provides:
//! - `ChatTransport` trait for API abstraction (mockable in tests)
//! - `HttpTransport` reqwest-backed implementation
//! - Base-URL normalization and response content extraction
//! - Model listing with `/v1/models` -> `/models` fallback

pub mod models;
pub mod transport;

pub use models::ModelsReply;
pub use transport::{
    CallError, CallReply, ChatTransport, HttpTransport, MockChatTransport, RecordedCall,
    extract_content, normalize_base_url,
};
