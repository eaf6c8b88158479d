//! Per-channel round-robin API key selection.
//!
//! Each channel keeps a cursor over its non-empty keys so repeated calls
//! spread load across the pool before repeating. Cursors live for the process
//! lifetime only - rotation is a load-spreading heuristic, not a correctness
//! requirement, so nothing is persisted.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::Channel;

/// Cursor map from channel id to next key index, owned by the engine instance
/// rather than process-global state so engines stay independently testable.
#[derive(Debug, Default)]
pub struct KeyRotator {
    cursors: Mutex<HashMap<String, usize>>,
}

impl KeyRotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next key for a channel and advance its cursor.
    ///
    /// Returns `""` when the channel has no usable keys; the caller sends the
    /// request unauthenticated in that case.
    pub fn next_key(&self, channel: &Channel) -> String {
        let keys = channel.usable_keys();
        if keys.is_empty() {
            return String::new();
        }
        // A poisoned cursor map only loses rotation fairness, never a key.
        let mut cursors = self.cursors.lock().unwrap_or_else(|e| e.into_inner());
        let current = cursors.get(channel.id.as_str()).copied().unwrap_or(0) % keys.len();
        cursors.insert(channel.id.clone(), (current + 1) % keys.len());
        keys[current].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_with_keys(id: &str, keys: &[&str]) -> Channel {
        Channel {
            id: id.to_string(),
            name: id.to_string(),
            api_url: "https://api.example.com".to_string(),
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_cycles_through_all_keys_before_repeating() {
        let rotator = KeyRotator::new();
        let channel = channel_with_keys("ch-1", &["a", "b", "c"]);

        let picked: Vec<String> = (0..4).map(|_| rotator.next_key(&channel)).collect();
        assert_eq!(picked, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_empty_pool_yields_empty_key() {
        let rotator = KeyRotator::new();
        let channel = channel_with_keys("ch-1", &[]);
        assert_eq!(rotator.next_key(&channel), "");
    }

    #[test]
    fn test_blank_keys_are_skipped() {
        let rotator = KeyRotator::new();
        let channel = channel_with_keys("ch-1", &["", "a", "", "b"]);
        assert_eq!(rotator.next_key(&channel), "a");
        assert_eq!(rotator.next_key(&channel), "b");
        assert_eq!(rotator.next_key(&channel), "a");
    }

    #[test]
    fn test_cursors_are_independent_per_channel() {
        let rotator = KeyRotator::new();
        let first = channel_with_keys("ch-1", &["a", "b"]);
        let second = channel_with_keys("ch-2", &["x", "y"]);

        assert_eq!(rotator.next_key(&first), "a");
        assert_eq!(rotator.next_key(&second), "x");
        assert_eq!(rotator.next_key(&first), "b");
        assert_eq!(rotator.next_key(&second), "y");
    }

    #[test]
    fn test_concurrent_advancement_returns_valid_keys() {
        use std::sync::Arc;

        let rotator = Arc::new(KeyRotator::new());
        let channel = Arc::new(channel_with_keys("ch-1", &["a", "b", "c"]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rotator = rotator.clone();
                let channel = channel.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| rotator.next_key(&channel))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for key in handle.join().unwrap() {
                assert!(["a", "b", "c"].contains(&key.as_str()));
            }
        }
    }
}
