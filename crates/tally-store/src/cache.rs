//! Volatile aggregate cache
//!
//! The cache in front of the shard scan is advisory only. Nothing here may
//! fail the counter: the trait is infallible from the caller's view, and
//! implementations degrade to a miss (logging the fault) when their
//! backend is unavailable.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Volatile cache for computed counter aggregates
///
/// `put_if_absent` is the read path's write mode: it never clobbers a
/// fresher value raced in by a concurrent increment's best-effort bump.
/// `increment` only adjusts an existing live entry; it must not create one.
pub trait CounterCache: Send + Sync {
    /// Look up a live (unexpired) entry
    fn get(&self, name: &str) -> Option<u64>;

    /// Store a value with the given time-to-live
    fn put(&self, name: &str, value: u64, ttl: Duration);

    /// Store a value only if no live entry exists; returns whether it took
    fn put_if_absent(&self, name: &str, value: u64, ttl: Duration) -> bool;

    /// Bump an existing live entry; no-op when the entry is absent
    fn increment(&self, name: &str, delta: u64);
}

struct Slot {
    value: u64,
    expires_at: Instant,
}

impl Slot {
    fn live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory TTL cache with lazy expiry
///
/// Expired slots are dropped when next touched; there is no sweeper
/// thread. Entry count is bounded by the number of distinct counters, so
/// no eviction policy is needed.
#[derive(Default)]
pub struct TtlCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl TtlCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterCache for TtlCache {
    fn get(&self, name: &str) -> Option<u64> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        match slots.get(name) {
            Some(slot) if slot.live(now) => Some(slot.value),
            Some(_) => {
                slots.remove(name);
                None
            }
            None => None,
        }
    }

    fn put(&self, name: &str, value: u64, ttl: Duration) {
        let mut slots = self.slots.lock();
        slots.insert(
            name.to_string(),
            Slot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn put_if_absent(&self, name: &str, value: u64, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        if slots.get(name).is_some_and(|slot| slot.live(now)) {
            return false;
        }
        slots.insert(
            name.to_string(),
            Slot {
                value,
                expires_at: now + ttl,
            },
        );
        true
    }

    fn increment(&self, name: &str, delta: u64) {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        match slots.get_mut(name) {
            Some(slot) if slot.live(now) => slot.value = slot.value.saturating_add(delta),
            Some(_) => {
                slots.remove(name);
            }
            None => {}
        }
    }
}
