//! Tally Counter - sharded counters over a transactional key-value store
//!
//! A counter whose write rate exceeds what one record can absorb is split
//! across many shard records; each increment routes to one shard chosen at
//! random, and reads aggregate all shards (with a TTL cache in front).
//! The store and cache are injected collaborators, see `tally-store`.

pub mod counter;
pub mod increment;
pub mod keyring;
pub mod selector;
pub mod simple;

pub use counter::ShardedCounter;
pub use increment::increment_record;
pub use keyring::ShardKeyring;
pub use selector::{FixedSelector, RandomSelector, ShardSelector};
pub use simple::SimpleCounter;
