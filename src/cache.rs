//! A time-to-live cache for values that are expensive to fetch repeatedly.
//!
//! The cache owns no ambient state: the clock and eviction policy are passed
//! in when it is created, and callers share it explicitly (e.g., behind an
//! `Arc<Mutex<_>>` in [AppState](crate::AppState)).

use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

/// A source of the current time.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// A [Clock] that reads the system's monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Controls how long entries live and how many are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long an entry stays valid after it was set.
    pub ttl: Duration,
    /// The maximum number of entries. When full, the oldest entry is evicted.
    /// `None` means unbounded.
    pub max_entries: Option<usize>,
}

impl CachePolicy {
    /// A policy with the given time-to-live and no size bound.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            max_entries: None,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_entries: Some(1024),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A map whose entries expire after [CachePolicy::ttl].
#[derive(Debug)]
pub struct TtlCache<K, V, C = SystemClock> {
    entries: HashMap<K, Entry<V>>,
    policy: CachePolicy,
    clock: C,
    generation: u64,
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    /// Create an empty cache.
    pub fn new(policy: CachePolicy, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
            clock,
            generation: 0,
        }
    }

    /// Get a copy of the value for `key` if it has not expired.
    ///
    /// Expired entries are removed.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let ttl = self.policy.ttl;

        match self.entries.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < ttl => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace the value for `key`, evicting the oldest entry if the cache is full.
    pub fn set(&mut self, key: K, value: V) {
        let now = self.clock.now();

        if let Some(max_entries) = self.policy.max_entries {
            if max_entries == 0 {
                return;
            }

            if !self.entries.contains_key(&key) && self.entries.len() >= max_entries {
                self.remove_expired(now);
            }

            while !self.entries.contains_key(&key) && self.entries.len() >= max_entries {
                self.evict_oldest();
            }
        }

        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Insert the value for `key` only if nothing was invalidated since `generation` was read.
    ///
    /// Use this to fill the cache with a value fetched while the cache was unlocked.
    /// Returns whether the value was stored.
    pub fn set_if_current(&mut self, key: K, value: V, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }

        self.set(key, value);
        true
    }

    /// A counter that changes every time an entry is invalidated or the cache is cleared.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Remove the entry for `key`. Returns whether an entry was removed.
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.generation = self.generation.wrapping_add(1);
        self.entries.remove(key).is_some()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.entries.clear();
    }

    /// The number of stored entries, including any that expired but were not accessed yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_expired(&mut self, now: Instant) {
        let ttl = self.policy.ttl;
        self.entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < ttl);
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
