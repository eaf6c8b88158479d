//! Dispatch engine - the core of taggr.
//!
//! Takes one chat-completion payload and a schedule group and drives it
//! through an ordered chain of provider steps: per-step retry with delay,
//! API-key rotation, timeout enforcement, and a content-length acceptance
//! gate. The first attempt anywhere in the chain that passes both the HTTP
//! gate and the acceptance rule wins; otherwise the full attempt trace and
//! every recorded error come back in an aggregated failure.

pub mod accept;
pub mod engine;
pub mod inject;
pub mod rotation;
pub mod transition;

pub use accept::{accept, content_length};
pub use engine::DispatchEngine;
pub use inject::apply_inject;
pub use rotation::KeyRotator;
pub use transition::{AttemptOutcome, ChainAction, next_action};
