// translation cache - injected into the agent, never global
// keys are a hash of (request, schema) so a schema change invalidates them

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::schema::Schema;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// In-process cache whose entries expire `ttl` after they were stored.
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Read as of `now`; stale entries are dropped on read.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let stored = entries.get(key).map(|(_, stored)| *stored)?;

        if now.saturating_duration_since(stored) > self.ttl {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|(value, _)| value.clone())
    }

    /// Store as of `now`, sweeping out every entry that has gone stale.
    pub fn set_at(&self, key: &str, value: String, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, (_, stored)| now.saturating_duration_since(*stored) <= self.ttl);
        entries.insert(key.to_string(), (value, now));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    fn set(&self, key: &str, value: String) {
        self.set_at(key, value, Instant::now());
    }
}

/// A cache that never stores anything.
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _: &str) -> Option<String> {
        None
    }

    fn set(&self, _: &str, _: String) {}
}

#[derive(Serialize)]
struct KeyPayload<'a> {
    request: &'a str,
    schema: &'a Schema,
}

/// Deterministic cache key: hex sha-256 of the canonical json of the inputs.
pub fn cache_key(request: &str, schema: &Schema) -> String {
    // Schema is made of structs and btree maps, so this encoding is stable
    let encoded = serde_json::to_vec(&KeyPayload { request, schema }).unwrap_or_default();
    format!("{:x}", Sha256::digest(&encoded))
}
