//! In-memory record store
//!
//! A HashMap behind a mutex, for tests and embedded use. A write
//! transaction holds the map lock until commit or drop, which serializes
//! all transactions. Coarser than a real backend's per-key isolation but
//! it satisfies the same contract: commits never lose a concurrent update.

use crate::kv::{KvStore, StoreTxn};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tally_common::{Error, Key, Record, Result};

/// Record store kept entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, u64>>,
    fail_commits: AtomicU32,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` commits fail with a transaction error
    ///
    /// Failed commits apply none of their staged writes. Test hook for
    /// exercising the failure path of callers.
    pub fn fail_next_commits(&self, n: u32) {
        self.fail_commits.store(n, Ordering::SeqCst);
    }
}

impl KvStore for MemoryStore {
    fn begin(&self) -> Result<Box<dyn StoreTxn + '_>> {
        Ok(Box::new(MemoryTxn {
            guard: self.records.lock(),
            staged: Vec::new(),
            fail_commits: &self.fail_commits,
        }))
    }

    fn get(&self, key: &Key) -> Result<Option<Record>> {
        let records = self.records.lock();
        Ok(records
            .get(&key.encoded())
            .map(|&value| Record::new(key.clone(), value)))
    }

    fn scan(&self, namespace: &str) -> Result<Vec<Record>> {
        let prefix = Key::namespace_prefix(namespace);
        let records = self.records.lock();
        let mut out: Vec<Record> = records
            .iter()
            .filter(|(encoded, _)| encoded.starts_with(&prefix))
            .filter_map(|(encoded, &value)| Key::decode(encoded).map(|k| Record::new(k, value)))
            .collect();
        out.sort_by(|a, b| a.key.encoded().cmp(&b.key.encoded()));
        Ok(out)
    }
}

/// Transaction holding the store lock; staged writes apply on commit
struct MemoryTxn<'a> {
    guard: MutexGuard<'a, HashMap<String, u64>>,
    staged: Vec<(String, u64)>,
    fail_commits: &'a AtomicU32,
}

impl StoreTxn for MemoryTxn<'_> {
    fn get(&self, key: &Key) -> Result<Option<Record>> {
        Ok(self
            .guard
            .get(&key.encoded())
            .map(|&value| Record::new(key.clone(), value)))
    }

    fn put(&mut self, record: Record) -> Result<()> {
        self.staged.push((record.key.encoded(), record.value));
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        let remaining = self.fail_commits.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_commits.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::transaction_failed("injected commit failure"));
        }
        for (encoded, value) in self.staged.drain(..) {
            self.guard.insert(encoded, value);
        }
        Ok(())
    }
}
