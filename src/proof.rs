//! Merkle inclusion proofs.
//!
//! A proof for a key is the list of node serializations along the key's
//! path, root first. Verification rebuilds a throwaway store from those
//! nodes keyed by hash and replays the lookup against the claimed root;
//! any tampering breaks the hash chain and surfaces as a missing node.

use crate::db::{Database, MemoryDb};
use crate::nodes::{Node, NodeRef};
use crate::walk::find_path;
use crate::{Trie, TrieError, EMPTY_ROOT_HASH};
use alloy_primitives::{keccak256, B256};
use nybbles::Nibbles;
use std::sync::Arc;

impl Trie {
    /// Collects the serialized nodes along `key`'s path from the current
    /// root.
    ///
    /// For an absent key this yields the path to the deepest node reached,
    /// which doubles as a proof of exclusion.
    pub fn prove(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, TrieError> {
        let root = self.root();
        if root == EMPTY_ROOT_HASH {
            return Ok(Vec::new());
        }
        let path = find_path(self.store(), NodeRef::Hash(root), &Nibbles::unpack(key))?;
        Ok(path.stack.iter().map(Node::rlp).collect())
    }
}

/// Checks `proof` against `root` and returns the value it proves for `key`,
/// `None` when it proves absence.
///
/// Fails with [`TrieError::MissingNode`] when the proof is incomplete or
/// was tampered with.
pub fn verify_proof(
    root: B256,
    key: &[u8],
    proof: &[Vec<u8>],
) -> Result<Option<Vec<u8>>, TrieError> {
    if root == EMPTY_ROOT_HASH && proof.is_empty() {
        return Ok(None);
    }
    let db = Arc::new(MemoryDb::new());
    for node in proof {
        db.put(keccak256(node).as_slice(), node)?;
    }
    Trie::with_root(db, root).get(key)
}
