//! Transactional increment-or-initialize
//!
//! The single building block under both shard records and the metadata
//! record: read the record inside a transaction, add `delta` if it exists,
//! write `initial_value` if it does not, commit.

use tally_common::{Key, Record, Result};
use tally_store::KvStore;

/// Atomically increment the record at `key`, creating it if absent
///
/// When the record exists the new value is `existing + delta`. When it
/// does not, the new value is `initial_value` exactly; `delta` is not
/// applied on top of a synthetic zero. The two parameters are distinct on
/// purpose: shard increments pass `(1, 1)`, while shard-count growth
/// passes `(count, default + count)` so a counter with no metadata record
/// grows from its implicit default rather than from zero.
///
/// The read-modify-write is atomic with respect to other transactions on
/// the same key. A commit failure leaves no state change and is not
/// retried here; retry policy belongs to the caller.
///
/// Addition saturates at `u64::MAX`; record values never wrap or shrink.
pub fn increment_record(
    store: &dyn KvStore,
    key: &Key,
    delta: u64,
    initial_value: u64,
) -> Result<u64> {
    let mut txn = store.begin()?;
    let new_value = match txn.get(key)? {
        Some(record) => record.value.saturating_add(delta),
        None => initial_value,
    };
    txn.put(Record::new(key.clone(), new_value))?;
    txn.commit()?;
    Ok(new_value)
}
