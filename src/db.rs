//! Backend contract for node storage, and the in-memory reference backend.

use crate::DatabaseError;
use core::fmt;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A single operation in an atomic batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    /// Store `value` under `key`.
    Put {
        /// The key to write.
        key: Vec<u8>,
        /// The value to store.
        value: Vec<u8>,
    },
    /// Remove `key`.
    Del {
        /// The key to remove.
        key: Vec<u8>,
    },
}

/// An ordered byte key/value backend the trie persists nodes into.
///
/// Absence on `get` is not an error. A batch must apply atomically: either
/// every operation takes effect or none do. Implementations are shared
/// across threads behind `Arc`, so all methods take `&self`.
pub trait Database: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DatabaseError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn del(&self, key: &[u8]) -> Result<(), DatabaseError>;

    /// Applies a sequence of operations atomically.
    fn batch(&self, ops: &[BatchOp]) -> Result<(), DatabaseError>;
}

/// In-memory [`Database`] backed by an ordered map. The reference backend
/// for tests and ephemeral tries.
#[derive(Default)]
pub struct MemoryDb {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryDb {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MemoryDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDb").field("entries", &self.len()).finish()
    }
}

impl Database for MemoryDb {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        let data = self.data.read().map_err(|e| DatabaseError::new(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DatabaseError> {
        let mut data = self.data.write().map_err(|e| DatabaseError::new(e.to_string()))?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn del(&self, key: &[u8]) -> Result<(), DatabaseError> {
        let mut data = self.data.write().map_err(|e| DatabaseError::new(e.to_string()))?;
        data.remove(key);
        Ok(())
    }

    fn batch(&self, ops: &[BatchOp]) -> Result<(), DatabaseError> {
        let mut data = self.data.write().map_err(|e| DatabaseError::new(e.to_string()))?;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key.clone(), value.clone());
                }
                BatchOp::Del { key } => {
                    data.remove(key);
                }
            }
        }
        Ok(())
    }
}
