//! Shard selection strategy
//!
//! Increments spread across shards by picking an index at random; the
//! strategy is injectable so tests can force a specific index.

use rand::Rng;

/// Picks the shard index an increment routes to
///
/// Implementations must be safe for concurrent callers without producing
/// correlated sequences.
pub trait ShardSelector: Send + Sync {
    /// Pick an index in `[0, shard_count)`; `shard_count` is at least 1
    fn pick(&self, shard_count: u64) -> u64;
}

/// Uniform random selection via the per-thread generator
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSelector;

impl ShardSelector for RandomSelector {
    fn pick(&self, shard_count: u64) -> u64 {
        rand::thread_rng().gen_range(0..shard_count.max(1))
    }
}

/// Always picks the same index, clamped to the shard range
///
/// Test hook for deterministic routing.
#[derive(Clone, Copy, Debug)]
pub struct FixedSelector(pub u64);

impl ShardSelector for FixedSelector {
    fn pick(&self, shard_count: u64) -> u64 {
        self.0.min(shard_count.saturating_sub(1))
    }
}
