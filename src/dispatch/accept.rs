//! Content-length acceptance rule.
//!
//! Decides whether a successful HTTP response counts as a usable result.
//! Responses outside the 2xx window never reach this rule - they are
//! unconditional attempt failures regardless of content.

/// Length of the extracted response text in characters, not bytes.
pub fn content_length(text: &str) -> usize {
    text.chars().count()
}

/// Evaluate `text` against a `[min_len, max_len]` character window.
///
/// A `None` bound is unbounded on that side; both bounds are inclusive.
pub fn accept(text: &str, min_len: Option<u32>, max_len: Option<u32>) -> bool {
    let len = content_length(text);
    if let Some(min) = min_len {
        if len < min as usize {
            return false;
        }
    }
    if let Some(max) = max_len {
        if len > max as usize {
            return false;
        }
    }
    true
}
