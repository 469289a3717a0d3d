//! Transactional key-value store contract
//!
//! The counter only ever needs four things from its store: a transaction
//! scoped to one key's read-modify-write, a plain read, and a scan over
//! one namespace. Any backend providing per-key transaction isolation can
//! implement this; two concurrent transactions touching the same key must
//! serialize so that neither commit is silently lost.

use tally_common::{Key, Record, Result};

/// An open read-modify-write transaction
///
/// Dropping a transaction without calling [`StoreTxn::commit`] aborts it;
/// the store observes no state change.
pub trait StoreTxn {
    /// Read a record within the transaction
    fn get(&self, key: &Key) -> Result<Option<Record>>;

    /// Stage a record write within the transaction
    fn put(&mut self, record: Record) -> Result<()>;

    /// Commit the transaction
    ///
    /// On failure (contention, timeout, backend fault) no staged write is
    /// applied and the caller may retry the whole operation.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Transactional key-value store
pub trait KvStore: Send + Sync {
    /// Begin a write transaction
    fn begin(&self) -> Result<Box<dyn StoreTxn + '_>>;

    /// Plain (non-transactional) read of a record
    ///
    /// Absence is not an error: the caller decides what a missing record
    /// means (usually "use the default value").
    fn get(&self, key: &Key) -> Result<Option<Record>>;

    /// Return every record in the given namespace
    fn scan(&self, namespace: &str) -> Result<Vec<Record>>;
}
