//! TTL cache of per-incident agent results.
//!
//! One mutex over the map; readers and writers both take it briefly, and
//! expired entries are evicted lazily on `get`. In-process only, dropped on
//! restart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::model::AgentData;

struct CacheEntry {
    data: AgentData,
    expires_at: Instant,
}

/// Map from incident id to `(AgentData, expires_at)`.
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached data while it is fresh; an expired entry is
    /// removed and reported as a miss.
    pub fn get(&self, incident_id: &str) -> Option<AgentData> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(incident_id) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.data.clone()),
            Some(_) => {
                entries.remove(incident_id);
                None
            }
            None => None,
        }
    }

    /// Stores with the default TTL.
    pub fn put(&self, incident_id: impl Into<String>, data: AgentData) {
        self.put_with_ttl(incident_id, data, self.ttl);
    }

    pub fn put_with_ttl(&self, incident_id: impl Into<String>, data: AgentData, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                incident_id.into(),
                CacheEntry {
                    data,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }

    pub fn invalidate(&self, incident_id: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(incident_id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
