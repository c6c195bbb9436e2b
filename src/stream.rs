//! Enumeration of every entry reachable from a root.

use crate::nodes::{Node, NodeRef};
use crate::store::NodeStore;
use crate::walk::{join, walk, WalkStep};
use crate::{TrieError, EMPTY_ROOT_HASH};
use alloy_primitives::B256;

/// Iterator over every `(key, value)` pair reachable from a root.
///
/// Pairs come out in traversal order, not key order. The walk happens up
/// front, so the iterator holds no store references and never fails.
#[derive(Debug)]
pub struct ReadStream {
    entries: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl Iterator for ReadStream {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// Collects the value-bearing nodes under `root`: every leaf, and every
/// branch carrying a terminal value. The emitted key is the packed path
/// from the root to that node.
pub(crate) fn read_trie(store: &NodeStore, root: B256) -> Result<ReadStream, TrieError> {
    let mut entries = Vec::new();
    if root != EMPTY_ROOT_HASH {
        walk::<(), _>(store, NodeRef::Hash(root), |node, path| {
            match node {
                Node::Leaf(leaf) => {
                    let full = join(path, &leaf.key);
                    entries.push((full.pack().to_vec(), leaf.value.to_vec()));
                }
                Node::Branch(branch) => {
                    if let Some(value) = &branch.value {
                        entries.push((path.pack().to_vec(), value.to_vec()));
                    }
                }
                Node::Extension(_) => {}
            }
            Ok(WalkStep::Next)
        })?;
    }
    Ok(ReadStream { entries: entries.into_iter() })
}
