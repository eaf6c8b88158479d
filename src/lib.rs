//! Taggr - batch image labeling through ordered LLM fallback chains
//!
//! Taggr drives chat-completion requests through a schedule group's ordered
//! chain of provider steps, with per-step retry, API-key rotation, timeout
//! enforcement, and a content-length acceptance rule. A fixed worker pool
//! fans a directory of images out over the engine, one dispatch per image.

pub mod dispatch;
pub mod domain;
pub mod error;
pub mod id;
pub mod labeler;
pub mod llm;
pub mod store;

pub use error::{Result, TaggrError};
