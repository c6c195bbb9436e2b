//! The trie facade: serialized mutations over a node store, root
//! management, and the insert/delete rebalancing that keeps the tree
//! canonical.

use crate::db::{BatchOp, Database};
use crate::nodes::{BranchNode, ExtensionNode, LeafNode, Node, NodeRef};
use crate::store::NodeStore;
use crate::stream::{read_trie, ReadStream};
use crate::walk::{find_path, join, PathToKey};
use crate::{TrieError, EMPTY_ROOT_HASH};
use alloy_primitives::{hex, keccak256, Bytes, B256};
use core::fmt;
use nybbles::Nibbles;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::trace;

/// A persistent, authenticated key/value map over a node store.
///
/// Every mutation commits its operation list as one atomic batch and then
/// publishes a new root hash committing to the full contents. Writers
/// (`put`, `del`, and each step of `batch`) serialize through an internal
/// lock; readers run concurrently and observe the root of the most recently
/// completed write. Stored nodes are never mutated in place, so older roots
/// stay readable as long as their nodes are not pruned externally.
pub struct Trie {
    store: NodeStore,
    root: RwLock<B256>,
    write_lock: Mutex<()>,
    checkpoint: AtomicBool,
}

impl fmt::Debug for Trie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trie")
            .field("root", &self.root())
            .field("store", &self.store)
            .finish()
    }
}

impl Trie {
    /// Creates an empty trie over `db`.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self::with_root(db, EMPTY_ROOT_HASH)
    }

    /// Opens a trie over `db` at a previously committed root.
    pub fn with_root(db: Arc<dyn Database>, root: B256) -> Self {
        Self {
            store: NodeStore::new(db),
            root: RwLock::new(root),
            write_lock: Mutex::new(()),
            checkpoint: AtomicBool::new(false),
        }
    }

    /// The current root hash; [`EMPTY_ROOT_HASH`] for an empty map.
    pub fn root(&self) -> B256 {
        *self.root.read().unwrap()
    }

    /// Moves the trie to a different committed root.
    pub fn set_root(&self, root: B256) {
        *self.root.write().unwrap() = root;
    }

    /// The node store behind this trie.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Mutable access to the node store, for layering additional backends.
    pub fn store_mut(&mut self) -> &mut NodeStore {
        &mut self.store
    }

    /// Whether staged-write mode is active. Plain tries leave it off; a
    /// checkpointing overlay sets it while writes go to its scratch backend.
    pub fn is_checkpoint(&self) -> bool {
        self.checkpoint.load(Ordering::Relaxed)
    }

    /// Toggles staged-write mode. While set, node removals produced by
    /// deletions are recorded in the operation list instead of dropped.
    pub fn set_checkpoint(&self, active: bool) {
        self.checkpoint.store(active, Ordering::Relaxed);
    }

    /// Returns the value stored under `key`, or `None` if absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        let root = self.root();
        if root == EMPTY_ROOT_HASH {
            return Ok(None);
        }
        let path = find_path(&self.store, NodeRef::Hash(root), &Nibbles::unpack(key))?;
        Ok(path.node.and_then(|node| node.value().map(|value| value.to_vec())))
    }

    /// Inserts or overwrites `key`. An empty `value` removes the key.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), TrieError> {
        let _guard = self.write_lock.lock().unwrap();
        if value.is_empty() {
            self.del_inner(key)
        } else {
            self.put_inner(key, value)
        }
    }

    /// Removes `key`. Removing an absent key succeeds silently.
    pub fn del(&self, key: &[u8]) -> Result<(), TrieError> {
        let _guard = self.write_lock.lock().unwrap();
        self.del_inner(key)
    }

    /// Applies a sequence of operations, each as its own write under the
    /// write lock.
    pub fn batch(&self, ops: &[BatchOp]) -> Result<(), TrieError> {
        for op in ops {
            let _guard = self.write_lock.lock().unwrap();
            match op {
                BatchOp::Put { key, value } if value.is_empty() => self.del_inner(key)?,
                BatchOp::Put { key, value } => self.put_inner(key, value)?,
                BatchOp::Del { key } => self.del_inner(key)?,
            }
        }
        Ok(())
    }

    /// True when the store holds a node under `root`.
    pub fn check_root(&self, root: B256) -> Result<bool, TrieError> {
        Ok(self.store.get_raw(root.as_slice())?.is_some())
    }

    /// Reads a raw backend value, bypassing the trie.
    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        Ok(self.store.get_raw(key)?)
    }

    /// Writes a raw backend value, bypassing the trie.
    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), TrieError> {
        Ok(self.store.put_raw(key, value)?)
    }

    /// Removes a raw backend value, bypassing the trie.
    pub fn del_raw(&self, key: &[u8]) -> Result<(), TrieError> {
        Ok(self.store.del_raw(key)?)
    }

    /// A new facade over the same backends, starting at the current root.
    ///
    /// The write lock is per-facade, not per-backend: two copies mutating
    /// through shared backends do not serialize against each other.
    pub fn copy(&self) -> Self {
        Self {
            store: self.store.clone(),
            root: RwLock::new(self.root()),
            write_lock: Mutex::new(()),
            checkpoint: AtomicBool::new(self.is_checkpoint()),
        }
    }

    /// Iterates every `(key, value)` pair reachable from the current root,
    /// in traversal order.
    pub fn read_stream(&self) -> Result<ReadStream, TrieError> {
        read_trie(&self.store, self.root())
    }

    fn put_inner(&self, key: &[u8], value: &[u8]) -> Result<(), TrieError> {
        let nibbles = Nibbles::unpack(key);
        let root = self.root();
        trace!(key = %hex::encode(key), root = %root, "put");
        if root == EMPTY_ROOT_HASH {
            let leaf = Node::Leaf(LeafNode::new(nibbles, Bytes::from(value.to_vec())));
            let mut ops = Vec::new();
            let new_root = self.format_node(&leaf, true, false, &mut ops);
            self.commit(new_root, ops)
        } else {
            let path = find_path(&self.store, NodeRef::Hash(root), &nibbles)?;
            self.update_node(&nibbles, Bytes::from(value.to_vec()), path)
        }
    }

    fn del_inner(&self, key: &[u8]) -> Result<(), TrieError> {
        let root = self.root();
        if root == EMPTY_ROOT_HASH {
            return Ok(());
        }
        let nibbles = Nibbles::unpack(key);
        trace!(key = %hex::encode(key), root = %root, "del");
        let path = find_path(&self.store, NodeRef::Hash(root), &nibbles)?;
        if path.node.is_none() {
            // Absent keys delete to success.
            return Ok(());
        }
        self.delete_node(&nibbles, path.stack)
    }

    /// Rewrites the tail of the path stack for an insert, then saves.
    fn update_node(
        &self,
        key: &Nibbles,
        value: Bytes,
        path: PathToKey,
    ) -> Result<(), TrieError> {
        let PathToKey { node: found, remainder, mut stack } = path;
        let mut ops = Vec::new();
        let mut key_track: Vec<u8> = key.to_vec();
        let mut last = stack.pop().expect("path stack holds at least the root");

        if found.is_some() {
            // The full key already terminates at this node: overwrite.
            match &mut last {
                Node::Leaf(leaf) => leaf.value = value,
                Node::Branch(branch) => branch.value = Some(value),
                Node::Extension(_) => unreachable!("the path finder never matches an extension"),
            }
            stack.push(last);
        } else {
            match last {
                Node::Branch(branch) => {
                    // Empty slot under this branch: hang a new leaf off it.
                    // The save pass installs the leaf into the slot named by
                    // the first remainder nibble.
                    stack.push(Node::Branch(branch));
                    stack.push(Node::Leaf(LeafNode::new(remainder.slice(1..), value)));
                }
                last => self.split_node(last, &remainder, value, &mut stack, &mut ops),
            }
        }
        self.save_stack(&mut key_track, stack, ops)
    }

    /// Splits a diverging leaf or extension around a new branch, pushing the
    /// replacement nodes for the save pass.
    fn split_node(
        &self,
        last: Node,
        remainder: &Nibbles,
        value: Bytes,
        stack: &mut Vec<Node>,
        ops: &mut Vec<BatchOp>,
    ) {
        let last_key = match &last {
            Node::Leaf(leaf) => leaf.key.clone(),
            Node::Extension(ext) => ext.key.clone(),
            Node::Branch(_) => unreachable!("branches never diverge on their own key"),
        };
        let common = last_key.common_prefix_length(remainder);

        if common > 0 {
            // The shared run survives as an extension above the new branch;
            // its child is wired up by the save pass.
            stack.push(Node::Extension(ExtensionNode::new(
                remainder.slice(..common),
                NodeRef::Hash(B256::ZERO),
            )));
        }

        let mut branch = BranchNode::default();

        if common < last_key.len() {
            // The split node keeps a suffix below the branch. One nibble is
            // consumed as its slot index.
            let slot = last_key[common] as usize;
            let suffix = last_key.slice(common + 1..);
            match last {
                Node::Leaf(mut leaf) => {
                    leaf.key = suffix;
                    let leaf = Node::Leaf(leaf);
                    branch.slots[slot] = Some(self.format_node(&leaf, false, false, ops));
                }
                Node::Extension(ext) => {
                    if suffix.is_empty() {
                        // Nothing left to compress: the branch absorbs the
                        // extension's child directly.
                        branch.slots[slot] = Some(ext.child);
                    } else {
                        let ext = Node::Extension(ExtensionNode::new(suffix, ext.child));
                        branch.slots[slot] = Some(self.format_node(&ext, false, false, ops));
                    }
                }
                Node::Branch(_) => unreachable!(),
            }
        } else {
            // The split node's whole key matched. Only a leaf can get here;
            // its value moves onto the branch.
            match last {
                Node::Leaf(leaf) => branch.value = Some(leaf.value),
                _ => unreachable!("extensions with a fully matched key are descended, not split"),
            }
        }

        if remainder.len() > common {
            // The new entry keeps a suffix too; the nibble after the shared
            // run names its slot and is accounted for by the save pass.
            stack.push(Node::Branch(branch));
            stack.push(Node::Leaf(LeafNode::new(remainder.slice(common + 1..), value)));
        } else {
            branch.value = Some(value);
            stack.push(Node::Branch(branch));
        }
    }

    /// Rewrites the tail of the path stack for a delete, then saves.
    fn delete_node(&self, key: &Nibbles, mut stack: Vec<Node>) -> Result<(), TrieError> {
        let mut ops = Vec::new();
        let mut key_track: Vec<u8> = key.to_vec();

        let last = stack.pop().expect("path stack holds at least the root");
        let mut parent = stack.pop();

        // Detach the matched entry, leaving `last` as the branch to inspect
        // for collapse.
        let mut last = match last {
            Node::Branch(mut branch) => {
                branch.value = None;
                branch
            }
            Node::Leaf(leaf) => match parent {
                None => {
                    // The leaf was the whole tree.
                    self.set_root(EMPTY_ROOT_HASH);
                    return Ok(());
                }
                Some(Node::Branch(mut branch)) => {
                    key_track.truncate(key_track.len() - leaf.key.len());
                    let leaf = Node::Leaf(leaf);
                    self.format_node(&leaf, false, true, &mut ops);
                    let slot = key_track.pop().expect("branch edges consume one nibble");
                    branch.slots[slot as usize] = None;
                    parent = stack.pop();
                    branch
                }
                Some(_) => unreachable!("a matched leaf hangs off a branch"),
            },
            Node::Extension(_) => unreachable!("the path finder never matches an extension"),
        };

        if last.occupancy() >= 2 {
            if let Some(parent) = parent {
                stack.push(parent);
            }
            stack.push(Node::Branch(last));
            return self.save_stack(&mut key_track, stack, ops);
        }

        // A single occupant remains; the branch dissolves into it, merging
        // keys with the parent.
        let survivor = last.lone_child().map(|(slot, child)| (slot, child.clone()));
        match survivor {
            Some((slot, child_ref)) => {
                let child = self.store.must_lookup(&child_ref)?;
                match parent {
                    Some(Node::Extension(parent_ext)) => match child {
                        Node::Branch(_) => {
                            // The freed edge folds into the extension above.
                            key_track.push(slot);
                            stack.push(Node::Extension(ExtensionNode::new(
                                join(&parent_ext.key, &single(slot)),
                                child_ref,
                            )));
                            stack.push(child);
                        }
                        Node::Leaf(child_leaf) => {
                            // Extension, edge and leaf fuse into one leaf.
                            let tail = join(&single(slot), &child_leaf.key);
                            key_track.extend_from_slice(&tail);
                            stack.push(Node::Leaf(LeafNode::new(
                                join(&parent_ext.key, &tail),
                                child_leaf.value,
                            )));
                        }
                        Node::Extension(child_ext) => {
                            let tail = join(&single(slot), &child_ext.key);
                            key_track.extend_from_slice(&tail);
                            stack.push(Node::Extension(ExtensionNode::new(
                                join(&parent_ext.key, &tail),
                                child_ext.child,
                            )));
                        }
                    },
                    parent => {
                        debug_assert!(matches!(parent, None | Some(Node::Branch(_))));
                        if let Some(parent) = parent {
                            stack.push(parent);
                        }
                        match child {
                            Node::Branch(_) => {
                                // The surviving edge shrinks to a one-nibble
                                // extension over the child.
                                key_track.push(slot);
                                stack.push(Node::Extension(ExtensionNode::new(
                                    single(slot),
                                    child_ref,
                                )));
                                stack.push(child);
                            }
                            Node::Leaf(child_leaf) => {
                                let tail = join(&single(slot), &child_leaf.key);
                                key_track.extend_from_slice(&tail);
                                stack.push(Node::Leaf(LeafNode::new(tail, child_leaf.value)));
                            }
                            Node::Extension(child_ext) => {
                                let tail = join(&single(slot), &child_ext.key);
                                key_track.extend_from_slice(&tail);
                                stack.push(Node::Extension(ExtensionNode::new(
                                    tail,
                                    child_ext.child,
                                )));
                            }
                        }
                    }
                }
            }
            None => {
                // Only the terminal value remains: the branch contracts to a
                // leaf with an empty key, merged with the parent.
                let value = last.value.take().expect("occupancy counted the value");
                match parent {
                    Some(Node::Extension(parent_ext)) => {
                        stack.push(Node::Leaf(LeafNode::new(parent_ext.key, value)));
                    }
                    parent => {
                        debug_assert!(matches!(parent, None | Some(Node::Branch(_))));
                        if let Some(parent) = parent {
                            stack.push(parent);
                        }
                        stack.push(Node::Leaf(LeafNode::new(Nibbles::default(), value)));
                    }
                }
            }
        }
        self.save_stack(&mut key_track, stack, ops)
    }

    /// Walks the stack bottom-up, re-encoding every node with its rewritten
    /// child reference, then commits the operation list and publishes the
    /// new root.
    ///
    /// `key` tracks the nibbles consumed down to the node being saved, so a
    /// branch knows which slot its freshly formatted child belongs in.
    fn save_stack(
        &self,
        key: &mut Vec<u8>,
        mut stack: Vec<Node>,
        mut ops: Vec<BatchOp>,
    ) -> Result<(), TrieError> {
        let mut last_ref = None;
        while let Some(mut node) = stack.pop() {
            let top_level = stack.is_empty();
            match &mut node {
                Node::Leaf(leaf) => {
                    key.truncate(key.len() - leaf.key.len());
                }
                Node::Extension(ext) => {
                    key.truncate(key.len() - ext.key.len());
                    if let Some(child) = last_ref.take() {
                        ext.child = child;
                    }
                }
                Node::Branch(branch) => {
                    if let Some(child) = last_ref.take() {
                        let slot = key.pop().expect("branch edges consume one nibble");
                        branch.slots[slot as usize] = Some(child);
                    }
                }
            }
            last_ref = Some(self.format_node(&node, top_level, false, &mut ops));
        }
        let new_root = last_ref.expect("save formats at least one node");
        self.commit(new_root, ops)
    }

    /// Produces the reference a parent should hold for `node`, recording the
    /// matching store operation.
    ///
    /// Nodes encoding to 32 bytes or more are stored under their hash, as is
    /// the node at the top of the stack regardless of size; anything shorter
    /// is returned inline and never touches the store. With `remove` set and
    /// staged-write mode active, the node's slot is deleted instead.
    fn format_node(
        &self,
        node: &Node,
        top_level: bool,
        remove: bool,
        ops: &mut Vec<BatchOp>,
    ) -> NodeRef {
        let encoded = node.rlp();
        if encoded.len() >= 32 || top_level {
            let hash = keccak256(&encoded);
            if remove && self.is_checkpoint() {
                ops.push(BatchOp::Del { key: hash.to_vec() });
            } else {
                ops.push(BatchOp::Put { key: hash.to_vec(), value: encoded });
            }
            NodeRef::Hash(hash)
        } else {
            NodeRef::Inline(SmallVec::from_vec(encoded))
        }
    }

    /// Commits one mutation's operation list, then publishes the root.
    fn commit(&self, new_root: NodeRef, ops: Vec<BatchOp>) -> Result<(), TrieError> {
        let NodeRef::Hash(root) = new_root else {
            unreachable!("top-level nodes are always hashed");
        };
        trace!(root = %root, ops = ops.len(), "commit");
        self.store.commit(&ops)?;
        self.set_root(root);
        Ok(())
    }
}

fn single(nibble: u8) -> Nibbles {
    Nibbles::from_nibbles_unchecked([nibble])
}
