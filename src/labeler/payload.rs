//! Vision chat payload construction.

use std::path::Path;

use base64::Engine;
use serde_json::{Value, json};

use crate::error::Result;

use super::images::content_type_for;

/// Build a chat-completion payload carrying one image as a base64 data URL.
///
/// The prompt rides in the same user message as a text part, ahead of the
/// image part. Schedule-group injection happens later, per attempt, inside
/// the engine.
pub async fn image_payload(image_path: &Path, prompt: &str) -> Result<Value> {
    let bytes = tokio::fs::read(image_path).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    let data_url = format!("data:{};base64,{}", content_type_for(image_path), encoded);

    let mut parts = Vec::new();
    if !prompt.is_empty() {
        parts.push(json!({ "type": "text", "text": prompt }));
    }
    parts.push(json!({ "type": "image_url", "image_url": { "url": data_url } }));

    Ok(json!({
        "messages": [
            { "role": "user", "content": parts }
        ]
    }))
}
