//! Global acceptance and retry rules.

use serde::{Deserialize, Serialize};

/// Global defaults for the acceptance window and retry behavior.
///
/// `min_chars`/`max_chars` of `None` mean unbounded. `auto_retry` gates
/// whether dispatch continues past a failed attempt or step at all; when
/// false, the very first failure aborts the whole chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalRules {
    pub min_chars: Option<u32>,
    pub max_chars: Option<u32>,
    pub auto_retry: bool,
}

impl Default for GlobalRules {
    fn default() -> Self {
        Self {
            min_chars: Some(200),
            max_chars: Some(200),
            auto_retry: true,
        }
    }
}
