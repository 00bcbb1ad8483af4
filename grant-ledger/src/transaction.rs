//! Read-your-writes transaction over a [`Store`]
//!
//! Mutations are buffered in an overlay and reach the store as one atomic
//! batch on [`Transaction::commit`]. Dropping a transaction discards them.

use crate::{
    error::Result,
    storage::{Store, WriteOp},
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pending view over a store
pub struct Transaction<'a> {
    store: &'a dyn Store,
    /// Buffered writes; `None` marks a delete
    overlay: BTreeMap<String, Option<Vec<u8>>>,
    /// Insertion order of first touch, so the batch replays deterministically
    order: Vec<String>,
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("pending", &self.order)
            .finish()
    }
}

impl<'a> Transaction<'a> {
    /// Begin a transaction
    pub fn begin(store: &'a dyn Store) -> Self {
        Self {
            store,
            overlay: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    /// Read raw bytes, seeing this transaction's own writes
    pub fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.overlay.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.store.get(key),
        }
    }

    /// Whether a record exists under `key`
    pub fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// Buffer a raw write
    pub fn put_raw(&mut self, key: &str, value: Vec<u8>) {
        self.touch(key);
        self.overlay.insert(key.to_string(), Some(value));
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: &str) {
        self.touch(key);
        self.overlay.insert(key.to_string(), None);
    }

    /// Read and decode a JSON record
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode and buffer a JSON record
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put_raw(key, bytes);
        Ok(())
    }

    /// Number of buffered mutations
    pub fn pending_writes(&self) -> usize {
        self.overlay.len()
    }

    /// Flush every buffered mutation as one atomic batch
    pub fn commit(self) -> Result<()> {
        if self.overlay.is_empty() {
            return Ok(());
        }

        let Transaction {
            store,
            mut overlay,
            order,
        } = self;

        let batch: Vec<WriteOp> = order
            .into_iter()
            .filter_map(|key| {
                overlay.remove(&key).map(|pending| match pending {
                    Some(value) => WriteOp::Put { key, value },
                    None => WriteOp::Delete { key },
                })
            })
            .collect();

        store.write(batch)
    }

    fn touch(&mut self, key: &str) {
        if !self.overlay.contains_key(key) {
            self.order.push(key.to_string());
        }
    }
}
