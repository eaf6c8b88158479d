//! Channel records - one configured LLM provider endpoint plus its key pool.

use serde::{Deserialize, Serialize};

/// A configured provider endpoint.
///
/// `api_url` is the base endpoint and may or may not carry a trailing `/v1`;
/// the caller normalizes it before use. `api_keys` is an ordered pool the key
/// rotator cycles through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub api_url: String,
    pub api_keys: Vec<String>,
}

impl Channel {
    /// Non-empty keys in pool order.
    pub fn usable_keys(&self) -> Vec<&str> {
        self.api_keys
            .iter()
            .map(|k| k.as_str())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Whether the channel has a non-blank endpoint configured.
    pub fn has_api_url(&self) -> bool {
        !self.api_url.trim().is_empty()
    }
}
