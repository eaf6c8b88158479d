//! Model listing for a channel endpoint.
//!
//! Providers disagree on whether the listing lives at `/v1/models` or
//! `/models`; both are tried in that order. A 404/405 moves on to the next
//! candidate, any other error status is returned as-is.

use serde_json::{Value, json};

use super::transport::{CallError, HttpTransport, normalize_base_url, parse_body};

/// Result of a model listing: HTTP status plus the provider body.
#[derive(Debug, Clone)]
pub struct ModelsReply {
    pub status: u16,
    pub json: Value,
}

impl ModelsReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Model ids under `data[].id`, for terminal display.
    pub fn model_ids(&self) -> Vec<String> {
        self.json["data"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl HttpTransport {
    /// Fetch the model listing for a base URL, trying the `/v1/models` and
    /// `/models` endpoints in order.
    pub async fn fetch_models(&self, api_url: &str, api_key: &str) -> Result<ModelsReply, CallError> {
        let base = normalize_base_url(api_url);
        let endpoints = [format!("{}/v1/models", base), format!("{}/models", base)];

        let mut last = ModelsReply {
            status: 500,
            json: json!({ "error": "Model fetch failed" }),
        };

        for endpoint in &endpoints {
            let mut request = self.client().get(endpoint);
            if !api_key.is_empty() {
                request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {}", api_key));
            }

            let response = request
                .send()
                .await
                .map_err(|e| CallError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .map_err(|e| CallError::Network(e.to_string()))?;
            let reply = ModelsReply { status, json: parse_body(&text) };

            if reply.is_success() {
                return Ok(reply);
            }
            // Only fall through to the next endpoint shape on 404/405.
            if status != 404 && status != 405 {
                return Ok(reply);
            }
            last = reply;
        }

        Ok(last)
    }
}
