//! Fixed-shard counter
//!
//! The minimal baseline the sharded counter generalizes: a fixed,
//! non-growable shard set, no metadata record and no cache. Every read
//! performs the full shard scan. Useful when the write rate is known up
//! front and read traffic is light.

use crate::increment::increment_record;
use crate::keyring::ShardKeyring;
use crate::selector::{RandomSelector, ShardSelector};
use std::sync::Arc;
use tally_common::{CounterName, Result};
use tally_store::KvStore;

/// Default number of shards for a fixed-shard counter
pub const DEFAULT_SIMPLE_SHARDS: u64 = 20;

/// A sharded counter with a fixed shard set
pub struct SimpleCounter {
    keyring: ShardKeyring,
    store: Arc<dyn KvStore>,
    selector: Box<dyn ShardSelector>,
    shard_count: u64,
}

impl SimpleCounter {
    /// Create a counter with [`DEFAULT_SIMPLE_SHARDS`] shards
    #[must_use]
    pub fn new(name: CounterName, store: Arc<dyn KvStore>) -> Self {
        Self::with_shards(name, store, DEFAULT_SIMPLE_SHARDS)
    }

    /// Create a counter with an explicit fixed shard count
    #[must_use]
    pub fn with_shards(name: CounterName, store: Arc<dyn KvStore>, shard_count: u64) -> Self {
        Self {
            keyring: ShardKeyring::new(name),
            store,
            selector: Box::new(RandomSelector),
            shard_count: shard_count.max(1),
        }
    }

    /// Increment the counter by one
    pub fn increment(&self) -> Result<()> {
        let index = self.selector.pick(self.shard_count);
        let shard_key = self.keyring.shard_key(index);
        increment_record(self.store.as_ref(), &shard_key, 1, 1)?;
        Ok(())
    }

    /// Retrieve the counter value by summing all shard records
    pub fn get_count(&self) -> Result<u64> {
        let sum = self
            .store
            .scan(self.keyring.shard_namespace())?
            .iter()
            .map(|record| record.value)
            .sum();
        Ok(sum)
    }
}
