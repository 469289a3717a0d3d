//! Durable record store backed by redb
//!
//! All records live in one table keyed by the flat `namespace:id`
//! encoding, with bincode-encoded values. redb takes an exclusive writer
//! lock per write transaction, which is exactly the per-key serialization
//! the increment protocol needs: two read-modify-write transactions on the
//! same key can never interleave, so no increment is lost.

use crate::kv::{KvStore, StoreTxn};
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use std::fmt;
use std::path::Path;
use tally_common::{Error, Key, Record, Result};
use tracing::debug;

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

fn txn_err(e: impl fmt::Display) -> Error {
    Error::transaction_failed(e.to_string())
}

fn store_err(e: impl fmt::Display) -> Error {
    Error::storage(e.to_string())
}

fn encode_value(value: u64) -> Result<Vec<u8>> {
    bincode::serialize(&value).map_err(|e| Error::serialization(e.to_string()))
}

fn decode_value(bytes: &[u8]) -> Result<u64> {
    bincode::deserialize(bytes).map_err(|e| Error::serialization(e.to_string()))
}

/// Record store persisted in a single redb file
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        Self::init(db)
    }

    /// Open a store backed by process memory, dropped on close
    ///
    /// Same transaction semantics as the on-disk store; used by tests and
    /// embedded callers that do not need durability.
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(store_err)?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self> {
        // Create the table eagerly so later read txns don't fail
        let write_txn = db.begin_write().map_err(txn_err)?;
        {
            let _t = write_txn.open_table(RECORDS).map_err(store_err)?;
        }
        write_txn.commit().map_err(txn_err)?;
        debug!("record store opened");
        Ok(Self { db })
    }
}

impl KvStore for RedbStore {
    fn begin(&self) -> Result<Box<dyn StoreTxn + '_>> {
        let txn = self.db.begin_write().map_err(txn_err)?;
        Ok(Box::new(RedbTxn { txn }))
    }

    fn get(&self, key: &Key) -> Result<Option<Record>> {
        let read_txn = self.db.begin_read().map_err(txn_err)?;
        let table = read_txn.open_table(RECORDS).map_err(store_err)?;
        match table.get(key.encoded().as_str()).map_err(store_err)? {
            Some(guard) => {
                let value = decode_value(guard.value())?;
                Ok(Some(Record::new(key.clone(), value)))
            }
            None => Ok(None),
        }
    }

    fn scan(&self, namespace: &str) -> Result<Vec<Record>> {
        let prefix = Key::namespace_prefix(namespace);
        let read_txn = self.db.begin_read().map_err(txn_err)?;
        let table = read_txn.open_table(RECORDS).map_err(store_err)?;
        let mut records = Vec::new();
        for entry in table.range(prefix.as_str()..).map_err(store_err)? {
            let (key_guard, value_guard) = entry.map_err(store_err)?;
            let encoded = key_guard.value();
            if !encoded.starts_with(&prefix) {
                break;
            }
            let key = Key::decode(encoded)
                .ok_or_else(|| Error::serialization(format!("malformed key: {encoded}")))?;
            records.push(Record::new(key, decode_value(value_guard.value())?));
        }
        Ok(records)
    }
}

/// Write transaction over the records table
///
/// Dropping without commit aborts; redb discards all staged writes.
struct RedbTxn {
    txn: WriteTransaction,
}

impl StoreTxn for RedbTxn {
    fn get(&self, key: &Key) -> Result<Option<Record>> {
        let table = self.txn.open_table(RECORDS).map_err(store_err)?;
        match table.get(key.encoded().as_str()).map_err(store_err)? {
            Some(guard) => {
                let value = decode_value(guard.value())?;
                Ok(Some(Record::new(key.clone(), value)))
            }
            None => Ok(None),
        }
    }

    fn put(&mut self, record: Record) -> Result<()> {
        let bytes = encode_value(record.value)?;
        let mut table = self.txn.open_table(RECORDS).map_err(store_err)?;
        table
            .insert(record.key.encoded().as_str(), bytes.as_slice())
            .map_err(store_err)?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.txn.commit().map_err(txn_err)
    }
}
