//! In-process plan cache and the clocks it runs on.

use crate::domain::plan::Plan;
use crate::domain::ports::{Clock, PlanCache};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

pub const DEFAULT_TTL_SECONDS: u64 = 3600;
pub const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.created_at + self.ttl
    }
}

/// Fingerprint-keyed cache with a per-entry TTL and a cap on entry count.
///
/// Reading an expired entry is a miss but leaves it in place; expired
/// entries are purged when an insert finds the cache full, and if that is
/// not enough the oldest entry goes. Concurrent writes to one fingerprint
/// resolve last-write-wins.
pub struct InMemoryPlanCache<K: Clock = SystemClock> {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: K,
    ttl: Duration,
    max_entries: usize,
}

impl InMemoryPlanCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryPlanCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> InMemoryPlanCache<K> {
    pub fn with_clock(clock: K) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl: Duration::seconds(DEFAULT_TTL_SECONDS as i64),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl = Duration::seconds(seconds as i64);
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Clock> PlanCache for InMemoryPlanCache<K> {
    fn get(&self, fingerprint: &str) -> Option<Plan> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(fingerprint) {
            Some(entry) if !entry.is_expired(now) => Some(entry.plan.clone()),
            Some(_) => {
                debug!("Cache entry {} expired", fingerprint);
                None
            }
            None => None,
        }
    }

    fn put(&self, fingerprint: &str, plan: Plan) {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(fingerprint) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| !entry.is_expired(now));
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .values()
                    .min_by_key(|entry| entry.created_at)
                    .map(|entry| entry.fingerprint.clone());
                if let Some(oldest) = oldest {
                    debug!("Cache full, evicting {}", oldest);
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                fingerprint: fingerprint.to_string(),
                plan,
                created_at: now,
                ttl: self.ttl,
            },
        );
    }

    fn invalidate(&self, fingerprint: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(fingerprint)
            .is_some()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
