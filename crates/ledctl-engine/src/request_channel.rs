//! The Request Channel: the sole coupling between the control plane and the
//! engine.
//!
//! Abstracted behind a small `Get`/`Set`/`SetWithTTL` interface so tests
//! can substitute a fake and so
//! the default backing store is free to add persistence. `RequestChannel`
//! is that interface; `InMemoryRequestChannel` is the default
//! implementation, an in-process map with TTL expiry and an on-write
//! snapshot to disk so `display_on_demand_config` survives a restart.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

/// Read/write access to the process-wide on-demand key/value store.
///
/// All operations are synchronous and expected to be cheap; the run loop
/// calls `get`/`set` once per iteration and inside inner render loops, so
/// implementations should not block on I/O for long.
pub trait RequestChannel: Send + Sync {
    /// Fetch a raw JSON value for `key`, if present and not expired.
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store a raw JSON value for `key` with no expiry.
    fn set(&self, key: &str, value: serde_json::Value);

    /// Store a raw JSON value for `key` that expires after `ttl`.
    fn set_with_ttl(&self, key: &str, value: serde_json::Value, ttl: Duration);
}

/// Convenience helpers built on top of the raw `RequestChannel` trait.
pub trait RequestChannelExt: RequestChannel {
    /// Fetch and deserialize a typed value for `key`.
    fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| match serde_json::from_value(v) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(key, %err, "failed to deserialize request channel value; ignoring");
                None
            }
        })
    }

    /// Serialize and store a typed value for `key` with no expiry.
    fn set_typed<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => self.set(key, v),
            Err(err) => warn!(key, %err, "failed to serialize request channel value"),
        }
    }

    /// Serialize and store a typed value for `key` with a TTL.
    fn set_typed_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(v) => self.set_with_ttl(key, v, ttl),
            Err(err) => warn!(key, %err, "failed to serialize request channel value"),
        }
    }
}

impl<T: RequestChannel + ?Sized> RequestChannelExt for T {}

struct Entry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

/// Default `RequestChannel` backing: an in-process map guarded by a mutex,
/// with an optional snapshot file so `display_on_demand_config` survives a
/// process restart without the control plane resubmitting the request.
pub struct InMemoryRequestChannel {
    store: Mutex<HashMap<String, Entry>>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryRequestChannel {
    /// Create a channel with no persistence.
    #[must_use]
    pub fn new() -> Self {
        Self { store: Mutex::new(HashMap::new()), snapshot_path: None }
    }

    /// Create a channel that persists every write to `path` as a JSON map.
    ///
    /// Failures to read or write the snapshot are logged and otherwise
    /// ignored: request-channel I/O failures never abort the engine.
    #[must_use]
    pub fn with_snapshot(path: PathBuf) -> Self {
        let store = Self::load_snapshot(&path).unwrap_or_default();
        Self { store: Mutex::new(store), snapshot_path: Some(path) }
    }

    fn load_snapshot(path: &PathBuf) -> Option<HashMap<String, Entry>> {
        let raw = std::fs::read_to_string(path).ok()?;
        let parsed: HashMap<String, serde_json::Value> = serde_json::from_str(&raw).ok()?;
        Some(parsed.into_iter().map(|(k, value)| (k, Entry { value, expires_at: None })).collect())
    }

    fn persist(&self, store: &HashMap<String, Entry>) {
        let Some(path) = &self.snapshot_path else { return };
        let flattened: HashMap<&str, &serde_json::Value> =
            store.iter().map(|(k, e)| (k.as_str(), &e.value)).collect();
        match serde_json::to_string(&flattened) {
            Ok(json) => {
                if let Err(err) = std::fs::write(path, json) {
                    warn!(%err, ?path, "failed to persist request channel snapshot");
                }
            }
            Err(err) => warn!(%err, "failed to serialize request channel snapshot"),
        }
    }
}

impl Default for InMemoryRequestChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestChannel for InMemoryRequestChannel {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut store = self.store.lock();
        match store.get(key) {
            Some(entry) if entry.expires_at.is_none_or(|exp| Instant::now() < exp) => {
                Some(entry.value.clone())
            }
            Some(_) => {
                store.remove(key);
                debug!(key, "request channel entry expired");
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: serde_json::Value) {
        let mut store = self.store.lock();
        store.insert(key.to_string(), Entry { value, expires_at: None });
        self.persist(&store);
    }

    fn set_with_ttl(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        let mut store = self.store.lock();
        store.insert(key.to_string(), Entry { value, expires_at: Some(Instant::now() + ttl) });
        self.persist(&store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let channel = InMemoryRequestChannel::new();
        channel.set("k", serde_json::json!({"a": 1}));
        assert_eq!(channel.get("k"), Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn ttl_entries_expire() {
        let channel = InMemoryRequestChannel::new();
        channel.set_with_ttl("k", serde_json::json!(1), Duration::from_millis(20));
        assert!(channel.get("k").is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert!(channel.get("k").is_none());
    }

    #[test]
    fn missing_key_is_none() {
        let channel = InMemoryRequestChannel::new();
        assert!(channel.get("missing").is_none());
    }
}
