//! Configuration types for Tally

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a sharded counter
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Number of shards assumed for a counter with no metadata record
    pub default_shard_count: u64,
    /// How long a cached aggregate stays valid (seconds)
    pub cache_ttl_secs: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            default_shard_count: 5,
            cache_ttl_secs: 60,
        }
    }
}

impl CounterConfig {
    /// Cache TTL as a [`Duration`]
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
