//! Hash-addressed node persistence over one or more backends.

use crate::db::{BatchOp, Database};
use crate::nodes::{Node, NodeRef};
use crate::{DatabaseError, TrieError};
use core::fmt;
use std::sync::Arc;

/// Reads and writes trie nodes against an ordered set of byte backends.
///
/// Reads consult the read backends in order and return the first hit;
/// writes and batches are broadcast to every write backend. A plain trie
/// has a single backend playing both roles; a checkpointing overlay layers
/// a scratch backend in front of both lists during its staged-write phase.
#[derive(Clone)]
pub struct NodeStore {
    readers: Vec<Arc<dyn Database>>,
    writers: Vec<Arc<dyn Database>>,
}

impl fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("readers", &self.readers.len())
            .field("writers", &self.writers.len())
            .finish()
    }
}

impl NodeStore {
    /// Creates a store reading from and writing to `db`.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { readers: vec![Arc::clone(&db)], writers: vec![db] }
    }

    /// Layers a backend in front of the existing read backends.
    pub fn add_read_backend(&mut self, db: Arc<dyn Database>) {
        self.readers.insert(0, db);
    }

    /// Layers a backend in front of the existing write backends.
    pub fn add_write_backend(&mut self, db: Arc<dyn Database>) {
        self.writers.insert(0, db);
    }

    /// First-hit read across the read backends. Absence is not an error.
    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        for db in &self.readers {
            if let Some(value) = db.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Writes `value` under `key` to every write backend.
    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), DatabaseError> {
        for db in &self.writers {
            db.put(key, value)?;
        }
        Ok(())
    }

    /// Removes `key` from every write backend.
    pub fn del_raw(&self, key: &[u8]) -> Result<(), DatabaseError> {
        for db in &self.writers {
            db.del(key)?;
        }
        Ok(())
    }

    /// Applies one mutation's operation list to every write backend.
    pub fn commit(&self, ops: &[BatchOp]) -> Result<(), DatabaseError> {
        for db in &self.writers {
            db.batch(ops)?;
        }
        Ok(())
    }

    /// Resolves a reference to a node. Inline references decode in place
    /// without touching the backends; hashes are fetched and decoded.
    ///
    /// `Ok(None)` means the hash was not found anywhere.
    pub fn lookup(&self, node_ref: &NodeRef) -> Result<Option<Node>, TrieError> {
        match node_ref {
            NodeRef::Inline(raw) => Ok(Some(Node::decode(raw)?)),
            NodeRef::Hash(hash) => match self.get_raw(hash.as_slice())? {
                Some(bytes) => Ok(Some(Node::decode(&bytes)?)),
                None => Ok(None),
            },
        }
    }

    /// Like [`lookup`](Self::lookup), but a missing node is fatal.
    pub(crate) fn must_lookup(&self, node_ref: &NodeRef) -> Result<Node, TrieError> {
        match node_ref {
            NodeRef::Inline(raw) => Node::decode(raw),
            NodeRef::Hash(hash) => match self.get_raw(hash.as_slice())? {
                Some(bytes) => Node::decode(&bytes),
                None => Err(TrieError::MissingNode(*hash)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::nodes::LeafNode;
    use alloy_primitives::Bytes;
    use nybbles::Nibbles;

    #[test]
    fn reads_are_first_hit_writes_broadcast() {
        let front = Arc::new(MemoryDb::new());
        let back = Arc::new(MemoryDb::new());
        back.put(b"k", b"from-back").unwrap();

        let mut store = NodeStore::new(back);
        store.add_read_backend(Arc::clone(&front) as Arc<dyn Database>);
        store.add_write_backend(Arc::clone(&front) as Arc<dyn Database>);

        assert_eq!(store.get_raw(b"k").unwrap(), Some(b"from-back".to_vec()));

        front.put(b"k", b"from-front").unwrap();
        assert_eq!(store.get_raw(b"k").unwrap(), Some(b"from-front".to_vec()));

        store.put_raw(b"w", b"both").unwrap();
        assert_eq!(front.get(b"w").unwrap(), Some(b"both".to_vec()));
        assert_eq!(store.get_raw(b"w").unwrap(), Some(b"both".to_vec()));
    }

    #[test]
    fn lookup_resolves_inline_without_backend() {
        let store = NodeStore::new(Arc::new(MemoryDb::new()));
        let leaf = Node::Leaf(LeafNode::new(
            Nibbles::from_nibbles([0x1, 0x2]),
            Bytes::from_static(b"v"),
        ));
        let inline = NodeRef::from_rlp(&leaf.rlp());

        assert_eq!(store.lookup(&inline).unwrap(), Some(leaf));
    }

    #[test]
    fn lookup_missing_hash() {
        let store = NodeStore::new(Arc::new(MemoryDb::new()));
        let leaf = Node::Leaf(LeafNode::new(
            Nibbles::from_nibbles([0x1]),
            Bytes::from_static(&[0xaa; 40]),
        ));
        let hashed = NodeRef::from_rlp(&leaf.rlp());
        assert!(hashed.as_hash().is_some());

        assert_eq!(store.lookup(&hashed).unwrap(), None);
        assert!(matches!(store.must_lookup(&hashed), Err(TrieError::MissingNode(_))));

        store.put_raw(leaf.hash().as_slice(), &leaf.rlp()).unwrap();
        assert_eq!(store.must_lookup(&hashed).unwrap(), leaf);
    }
}
