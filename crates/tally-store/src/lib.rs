//! Tally Store - Storage and cache collaborators
//!
//! This crate defines the two interfaces the counter needs from its
//! environment, a transactional key-value store and a volatile cache,
//! together with the shipped adapters: a durable redb-backed store, an
//! in-memory store, and an in-memory TTL cache.

pub mod cache;
pub mod kv;
pub mod memory;
pub mod store;

pub use cache::{CounterCache, TtlCache};
pub use kv::{KvStore, StoreTxn};
pub use memory::MemoryStore;
pub use store::RedbStore;
