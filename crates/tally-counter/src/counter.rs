//! Sharded counter
//!
//! The counter's value is split across `shard_count` independent shard
//! records; each increment routes to one shard picked at random, so no
//! single record becomes a write hotspot. Reads aggregate all shards and
//! park the sum in a volatile cache for a bounded-staleness window. The
//! shard count itself lives in a lazily-created metadata record and only
//! ever grows.

use crate::increment::increment_record;
use crate::keyring::ShardKeyring;
use crate::selector::{RandomSelector, ShardSelector};
use std::sync::Arc;
use std::time::Duration;
use tally_common::{CounterConfig, CounterName, Error, Result};
use tally_store::{CounterCache, KvStore};
use tracing::{debug, info};

/// A counter which can be incremented rapidly
///
/// Mutual exclusion is delegated entirely to the store's per-key
/// transaction isolation; the counter itself takes no locks. Increments on
/// different shards never block each other, and a stale (smaller) shard
/// count read concurrently with growth is always a valid routing target.
pub struct ShardedCounter {
    keyring: ShardKeyring,
    store: Arc<dyn KvStore>,
    cache: Arc<dyn CounterCache>,
    selector: Box<dyn ShardSelector>,
    default_shard_count: u64,
    cache_ttl: Duration,
}

impl ShardedCounter {
    /// Create a counter routing increments uniformly at random
    #[must_use]
    pub fn new(
        name: CounterName,
        store: Arc<dyn KvStore>,
        cache: Arc<dyn CounterCache>,
        config: &CounterConfig,
    ) -> Self {
        Self::with_selector(name, store, cache, config, Box::new(RandomSelector))
    }

    /// Create a counter from an unvalidated name
    ///
    /// Rejects a malformed name before any store interaction.
    pub fn open(
        name: &str,
        store: Arc<dyn KvStore>,
        cache: Arc<dyn CounterCache>,
        config: &CounterConfig,
    ) -> Result<Self> {
        Ok(Self::new(CounterName::new(name)?, store, cache, config))
    }

    /// Create a counter with an explicit shard-selection strategy
    #[must_use]
    pub fn with_selector(
        name: CounterName,
        store: Arc<dyn KvStore>,
        cache: Arc<dyn CounterCache>,
        config: &CounterConfig,
        selector: Box<dyn ShardSelector>,
    ) -> Self {
        Self {
            keyring: ShardKeyring::new(name),
            store,
            cache,
            selector,
            default_shard_count: config.default_shard_count.max(1),
            cache_ttl: config.cache_ttl(),
        }
    }

    /// The name of this counter
    #[must_use]
    pub fn name(&self) -> &CounterName {
        self.keyring.name()
    }

    /// Increment the counter by one
    ///
    /// Routes to one shard record chosen by the selector and bumps the
    /// cached aggregate best-effort (a missing cache entry stays missing).
    pub fn increment(&self) -> Result<()> {
        let shard_count = self.shard_count()?;
        let index = self.selector.pick(shard_count);
        let shard_key = self.keyring.shard_key(index);
        increment_record(self.store.as_ref(), &shard_key, 1, 1)?;
        self.cache.increment(self.keyring.shard_namespace(), 1);
        debug!(counter = %self.keyring.name(), shard = index, "incremented");
        Ok(())
    }

    /// Retrieve the counter value
    ///
    /// A live cache entry short-circuits storage entirely. Otherwise every
    /// shard record is scanned and summed, and the sum is cached with the
    /// configured TTL using the if-absent write mode so a fresher value
    /// raced in by a concurrent increment is never overwritten. The result
    /// may lag a strictly linearizable read by up to the TTL window.
    pub fn get_count(&self) -> Result<u64> {
        let namespace = self.keyring.shard_namespace();
        if let Some(value) = self.cache.get(namespace) {
            return Ok(value);
        }

        let sum = self
            .store
            .scan(namespace)?
            .iter()
            .map(|record| record.value)
            .sum();
        self.cache.put_if_absent(namespace, sum, self.cache_ttl);
        Ok(sum)
    }

    /// Increase the number of shards, returning the new shard count
    ///
    /// Never decreases. With existing metadata at N the result is
    /// `N + count`; with no metadata yet the counter grows from its
    /// implicit default, yielding `default_shard_count + count`. New
    /// indices become eligible for routing as soon as this returns;
    /// existing shards stay part of the aggregate forever.
    pub fn add_shards(&self, count: u64) -> Result<u64> {
        if count == 0 {
            return Err(Error::invalid_argument("shard increase must be positive"));
        }
        let initial = self
            .default_shard_count
            .checked_add(count)
            .ok_or_else(|| Error::invalid_argument("shard increase overflows shard count"))?;
        let new_count = increment_record(
            self.store.as_ref(),
            &self.keyring.metadata_key(),
            count,
            initial,
        )?;
        info!(counter = %self.keyring.name(), shard_count = new_count, "grew shard count");
        Ok(new_count)
    }

    /// Current number of shards eligible to receive increments
    ///
    /// A plain read, not a transaction: staleness is acceptable because
    /// the shard count only grows, so any index below a stale count stays
    /// valid forever. Absent metadata means the configured default.
    pub fn shard_count(&self) -> Result<u64> {
        let record = self.store.get(&self.keyring.metadata_key())?;
        Ok(record.map_or(self.default_shard_count, |r| r.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::FixedSelector;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use tally_common::{Key, Record};
    use tally_store::{MemoryStore, TtlCache};

    fn counter_with(
        name: &str,
        store: &Arc<MemoryStore>,
        cache: &Arc<TtlCache>,
        selector: Option<Box<dyn ShardSelector>>,
    ) -> ShardedCounter {
        let name = CounterName::new(name).unwrap();
        let store: Arc<dyn KvStore> = Arc::clone(store) as _;
        let cache: Arc<dyn CounterCache> = Arc::clone(cache) as _;
        let config = CounterConfig::default();
        match selector {
            Some(selector) => ShardedCounter::with_selector(name, store, cache, &config, selector),
            None => ShardedCounter::new(name, store, cache, &config),
        }
    }

    fn fresh(name: &str) -> ShardedCounter {
        counter_with(name, &Arc::new(MemoryStore::new()), &Arc::new(TtlCache::new()), None)
    }

    #[test]
    fn test_conservation() {
        let counter = fresh("hits");
        for _ in 0..37 {
            counter.increment().unwrap();
        }
        assert_eq!(counter.get_count().unwrap(), 37);
    }

    #[test]
    fn test_first_increment_creates_one_shard_record() {
        let store = Arc::new(MemoryStore::new());
        let counter = counter_with("hits", &store, &Arc::new(TtlCache::new()), None);

        counter.increment().unwrap();

        let records = store.scan("counter_shard_hits").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, 1);
        assert_eq!(counter.get_count().unwrap(), 1);
    }

    #[test]
    fn test_add_shards_grows_existing_metadata() {
        let store = Arc::new(MemoryStore::new());
        let counter = counter_with("hits", &store, &Arc::new(TtlCache::new()), None);

        assert_eq!(counter.shard_count().unwrap(), 5);
        assert_eq!(counter.add_shards(3).unwrap(), 8);
        // Metadata now exists; growth adds to it, not to the default
        assert_eq!(counter.add_shards(2).unwrap(), 10);
        assert_eq!(counter.shard_count().unwrap(), 10);
    }

    #[test]
    fn test_add_shards_grows_from_implicit_default() {
        // Metadata absent, default 5: add_shards(3) yields 8, never 3
        let counter = fresh("hits");
        assert_eq!(counter.add_shards(3).unwrap(), 8);
    }

    #[test]
    fn test_open_rejects_malformed_name_before_store_access() {
        let store = Arc::new(MemoryStore::new());
        let result = ShardedCounter::open(
            "no spaces allowed",
            Arc::clone(&store) as Arc<dyn KvStore>,
            Arc::new(TtlCache::new()),
            &CounterConfig::default(),
        );
        assert!(matches!(result, Err(Error::InvalidCounterName(_))));
        assert!(store.scan("counter").unwrap().is_empty());
    }

    #[test]
    fn test_add_shards_rejects_overflowing_growth() {
        let store = Arc::new(MemoryStore::new());
        let counter = counter_with("hits", &store, &Arc::new(TtlCache::new()), None);

        assert!(matches!(
            counter.add_shards(u64::MAX),
            Err(Error::InvalidArgument(_))
        ));
        assert!(store.scan("counter").unwrap().is_empty());
        assert_eq!(counter.shard_count().unwrap(), 5);
    }

    #[test]
    fn test_add_shards_rejects_zero_before_store_access() {
        let store = Arc::new(MemoryStore::new());
        let counter = counter_with("hits", &store, &Arc::new(TtlCache::new()), None);

        assert!(matches!(
            counter.add_shards(0),
            Err(Error::InvalidArgument(_))
        ));
        // No metadata record was created
        assert!(store.scan("counter").unwrap().is_empty());
    }

    #[test]
    fn test_no_lost_updates_on_forced_shard() {
        let store = Arc::new(MemoryStore::new());
        let counter = Arc::new(counter_with(
            "hits",
            &store,
            &Arc::new(TtlCache::new()),
            Some(Box::new(FixedSelector(2))),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    counter.increment().unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let shard = ShardKeyring::new(CounterName::new("hits").unwrap()).shard_key(2);
        assert_eq!(store.get(&shard).unwrap().unwrap().value, 200);
        assert_eq!(counter.get_count().unwrap(), 200);
    }

    #[test]
    fn test_cached_read_short_circuits_storage() {
        let store = Arc::new(MemoryStore::new());
        let counter = counter_with("hits", &store, &Arc::new(TtlCache::new()), None);

        counter.increment().unwrap();
        assert_eq!(counter.get_count().unwrap(), 1);

        // Mutate a shard record out-of-band; the cached aggregate wins
        let shard = ShardKeyring::new(CounterName::new("hits").unwrap()).shard_key(0);
        increment_record(store.as_ref(), &shard, 100, 100).unwrap();
        assert_eq!(counter.get_count().unwrap(), 1);
    }

    #[test]
    fn test_increment_bumps_cached_aggregate() {
        let store = Arc::new(MemoryStore::new());
        let counter = counter_with("hits", &store, &Arc::new(TtlCache::new()), None);

        counter.increment().unwrap();
        assert_eq!(counter.get_count().unwrap(), 1); // populates cache
        counter.increment().unwrap(); // best-effort bump

        // Out-of-band mutation proves the next read never scanned
        let shard = ShardKeyring::new(CounterName::new("hits").unwrap()).shard_key(3);
        increment_record(store.as_ref(), &shard, 100, 100).unwrap();
        assert_eq!(counter.get_count().unwrap(), 2);
    }

    #[test]
    fn test_increment_does_not_create_cache_entry() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(TtlCache::new());
        let counter = counter_with("hits", &store, &cache, None);

        counter.increment().unwrap();
        assert_eq!(cache.get("counter_shard_hits"), None);
    }

    #[test]
    fn test_shard_isolation_between_counters() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(TtlCache::new());
        let hits = counter_with("hits", &store, &cache, None);
        let views = counter_with("views", &store, &cache, None);

        for _ in 0..4 {
            hits.increment().unwrap();
        }
        views.increment().unwrap();

        assert_eq!(hits.get_count().unwrap(), 4);
        assert_eq!(views.get_count().unwrap(), 1);
    }

    #[test]
    fn test_commit_failure_propagates_without_state_change() {
        let store = Arc::new(MemoryStore::new());
        let counter = counter_with("hits", &store, &Arc::new(TtlCache::new()), None);

        store.fail_next_commits(1);
        let err = counter.increment().unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(counter.get_count().unwrap(), 0);
    }

    /// Store wrapper that parks one scan after it computed its records,
    /// so a read can be held between summing and caching
    struct GatedStore {
        inner: Arc<MemoryStore>,
        armed: AtomicBool,
        reached: mpsc::Sender<()>,
        release: StdMutex<mpsc::Receiver<()>>,
    }

    impl KvStore for GatedStore {
        fn begin(&self) -> Result<Box<dyn tally_store::StoreTxn + '_>> {
            self.inner.begin()
        }

        fn get(&self, key: &Key) -> Result<Option<Record>> {
            self.inner.get(key)
        }

        fn scan(&self, namespace: &str) -> Result<Vec<Record>> {
            let records = self.inner.scan(namespace)?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.reached.send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            Ok(records)
        }
    }

    #[test]
    fn test_racing_reads_keep_first_cached_aggregate() {
        let inner = Arc::new(MemoryStore::new());
        let cache = Arc::new(TtlCache::new());
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gated = Arc::new(GatedStore {
            inner: Arc::clone(&inner),
            armed: AtomicBool::new(true),
            reached: reached_tx,
            release: StdMutex::new(release_rx),
        });

        let slow = ShardedCounter::new(
            CounterName::new("hits").unwrap(),
            gated as Arc<dyn KvStore>,
            Arc::clone(&cache) as Arc<dyn CounterCache>,
            &CounterConfig::default(),
        );
        let fast = counter_with("hits", &inner, &cache, None);

        let shard = ShardKeyring::new(CounterName::new("hits").unwrap()).shard_key(0);
        increment_record(inner.as_ref(), &shard, 1, 1).unwrap();

        // The slow read sums 1 and parks before it can cache
        let slow_read = std::thread::spawn(move || slow.get_count().unwrap());
        reached_rx.recv().unwrap();

        // Another increment lands, then the fast read caches its sum of 2
        increment_record(inner.as_ref(), &shard, 1, 1).unwrap();
        assert_eq!(fast.get_count().unwrap(), 2);

        // The released slow read returns its stale sum but must not
        // clobber the cached value
        release_tx.send(()).unwrap();
        assert_eq!(slow_read.join().unwrap(), 1);
        assert_eq!(fast.get_count().unwrap(), 2);
    }

    #[test]
    fn test_increments_before_and_after_growth_all_aggregate() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(TtlCache::new());

        // Route early increments to a low index, grow, then route to an
        // index only valid under the new count
        let low = counter_with("hits", &store, &cache, Some(Box::new(FixedSelector(1))));
        for _ in 0..10 {
            low.increment().unwrap();
        }
        assert_eq!(low.add_shards(5).unwrap(), 10);

        let high = counter_with("hits", &store, &cache, Some(Box::new(FixedSelector(9))));
        for _ in 0..10 {
            high.increment().unwrap();
        }

        assert_eq!(high.get_count().unwrap(), 20);
    }
}
