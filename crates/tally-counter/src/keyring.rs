//! Key derivation for counter records
//!
//! Metadata records for every counter share one fixed namespace, keyed by
//! counter name. Shard records get a namespace scoped per counter name, so
//! shards of different counters never collide even at equal indices.

use tally_common::{CounterName, Key};

/// Namespace holding every counter's metadata record
pub const METADATA_NAMESPACE: &str = "counter";

/// Prefix of the per-counter shard namespaces
pub const SHARD_NAMESPACE_PREFIX: &str = "counter_shard";

/// Derives the stable record keys for one logical counter
///
/// Pure: the same name always yields the same keys.
#[derive(Clone, Debug)]
pub struct ShardKeyring {
    name: CounterName,
    shard_namespace: String,
}

impl ShardKeyring {
    /// Build the keyring for a counter name
    #[must_use]
    pub fn new(name: CounterName) -> Self {
        let shard_namespace = format!("{SHARD_NAMESPACE_PREFIX}_{name}");
        Self {
            name,
            shard_namespace,
        }
    }

    /// The counter this keyring serves
    #[must_use]
    pub fn name(&self) -> &CounterName {
        &self.name
    }

    /// Key of the counter's metadata record
    #[must_use]
    pub fn metadata_key(&self) -> Key {
        Key::new(METADATA_NAMESPACE, self.name.as_str())
    }

    /// Key of one shard record
    #[must_use]
    pub fn shard_key(&self, shard_index: u64) -> Key {
        Key::new(&self.shard_namespace, shard_index.to_string())
    }

    /// Namespace holding this counter's shard records
    ///
    /// Also used as the cache key for the counter's aggregate.
    #[must_use]
    pub fn shard_namespace(&self) -> &str {
        &self.shard_namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyring(name: &str) -> ShardKeyring {
        ShardKeyring::new(CounterName::new(name).unwrap())
    }

    #[test]
    fn test_metadata_keys_share_one_namespace() {
        assert_eq!(keyring("hits").metadata_key(), Key::new("counter", "hits"));
        assert_eq!(
            keyring("views").metadata_key(),
            Key::new("counter", "views")
        );
    }

    #[test]
    fn test_shard_keys_scoped_per_counter() {
        let a = keyring("hits").shard_key(3);
        let b = keyring("views").shard_key(3);
        assert_eq!(a, Key::new("counter_shard_hits", "3"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(keyring("hits").shard_key(0), keyring("hits").shard_key(0));
    }
}
