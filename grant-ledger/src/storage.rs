//! Storage layer
//!
//! The ledger sees the store as a flat key → bytes map. Every entity is a JSON
//! record under its own identifier; three well-known keys hold the index lists.
//!
//! # Backends
//!
//! - [`MemoryStore`] - in-process map, for tests and embedding
//! - [`RocksStore`] - RocksDB default column family, batched writes

use crate::{
    error::{Error, Result},
    Config,
};
use parking_lot::RwLock;
use rocksdb::{Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A single mutation inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or overwrite
    Put {
        /// Record key
        key: String,
        /// Record bytes
        value: Vec<u8>,
    },
    /// Remove
    Delete {
        /// Record key
        key: String,
    },
}

impl WriteOp {
    /// Key touched by this mutation
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// Key-value store consumed by the ledger
///
/// `write` must apply the whole batch or none of it.
pub trait Store: Send + Sync {
    /// Read a record
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Apply a batch atomically
    fn write(&self, batch: Vec<WriteOp>) -> Result<()>;

    /// Insert or overwrite one record
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.write(vec![WriteOp::Put {
            key: key.to_string(),
            value: value.to_vec(),
        }])
    }

    /// Remove one record
    fn delete(&self, key: &str) -> Result<()> {
        self.write(vec![WriteOp::Delete {
            key: key.to_string(),
        }])
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn write(&self, batch: Vec<WriteOp>) -> Result<()> {
        (**self).write(batch)
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn write(&self, batch: Vec<WriteOp>) -> Result<()> {
        let mut records = self.records.write();
        for op in batch {
            match op {
                WriteOp::Put { key, value } => {
                    records.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// RocksDB-backed store
pub struct RocksStore {
    db: Arc<DB>,
}

impl fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Records are small and read back often
        db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let db = DB::open(&db_opts, path)?;

        tracing::info!(path = ?path, "Opened RocksDB store");

        Ok(Self { db: Arc::new(db) })
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

impl Store for RocksStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key.as_bytes())?)
    }

    fn write(&self, batch: Vec<WriteOp>) -> Result<()> {
        let mut write_batch = WriteBatch::default();
        let len = batch.len();

        for op in batch {
            match op {
                WriteOp::Put { key, value } => write_batch.put(key.as_bytes(), &value),
                WriteOp::Delete { key } => write_batch.delete(key.as_bytes()),
            }
        }

        // Atomic commit
        self.db.write(write_batch)?;

        tracing::debug!(ops = len, "Batch committed");

        Ok(())
    }
}

/// Store that rejects every write; reads pass through
///
/// Lets tests observe that a failed commit leaves nothing behind.
#[derive(Debug, Default)]
pub struct ReadOnlyStore<S> {
    inner: S,
}

impl<S: Store> ReadOnlyStore<S> {
    /// Wrap a store
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Store> Store for ReadOnlyStore<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn write(&self, _batch: Vec<WriteOp>) -> Result<()> {
        Err(Error::Storage("store is read-only".to_string()))
    }
}
