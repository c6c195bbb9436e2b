//! Generic depth-first traversal driven by a per-node command protocol, and
//! the path finder built on top of it.

use crate::nodes::{Node, NodeRef};
use crate::store::NodeStore;
use crate::TrieError;
use nybbles::Nibbles;

/// What the walk should do after visiting a node.
///
/// Returning a command is the only way a visitor influences the traversal,
/// which keeps visitors pure with respect to walk state.
#[derive(Debug)]
pub(crate) enum WalkStep<R> {
    /// Descend into every child.
    Next,
    /// Descend into a single branch slot.
    Only(u8),
    /// Abort the walk and yield a result.
    Return(R),
    /// Skip this subtree but keep visiting pending siblings.
    Stop,
}

/// Depth-first walk from `root`, invoking `visitor` at every node together
/// with the nibble path accumulated from the root.
///
/// Sibling order is unspecified and visitors must not rely on it. A
/// `Return` wins over any descent still pending; later visits simply never
/// happen.
pub(crate) fn walk<R, F>(
    store: &NodeStore,
    root: NodeRef,
    mut visitor: F,
) -> Result<Option<R>, TrieError>
where
    F: FnMut(&Node, &Nibbles) -> Result<WalkStep<R>, TrieError>,
{
    let mut pending = vec![(root, Nibbles::default())];
    while let Some((node_ref, path)) = pending.pop() {
        let node = store.must_lookup(&node_ref)?;
        match visitor(&node, &path)? {
            WalkStep::Return(result) => return Ok(Some(result)),
            WalkStep::Stop => {}
            WalkStep::Next => match &node {
                Node::Leaf(_) => {}
                Node::Extension(ext) => {
                    pending.push((ext.child.clone(), join(&path, &ext.key)));
                }
                Node::Branch(branch) => {
                    for (slot, child) in branch.slots.iter().enumerate() {
                        if let Some(child) = child {
                            pending.push((child.clone(), join_nibble(&path, slot as u8)));
                        }
                    }
                }
            },
            WalkStep::Only(slot) => {
                if let Node::Branch(branch) = &node {
                    if let Some(child) = &branch.slots[slot as usize] {
                        pending.push((child.clone(), join_nibble(&path, slot)));
                    }
                }
            }
        }
    }
    Ok(None)
}

/// Outcome of walking a key's nibble path to the deepest reachable node.
#[derive(Debug)]
pub(crate) struct PathToKey {
    /// The node terminating the key, when the full key matched.
    pub(crate) node: Option<Node>,
    /// Nibbles of the key left unconsumed at the node the walk ended on.
    /// Empty on a match.
    pub(crate) remainder: Nibbles,
    /// Every node descended through, root first, including the terminal
    /// match or the mismatch anchor.
    pub(crate) stack: Vec<Node>,
}

/// Walks `key`'s nibble path from `root` as far as the trie allows.
pub(crate) fn find_path(
    store: &NodeStore,
    root: NodeRef,
    key: &Nibbles,
) -> Result<PathToKey, TrieError> {
    let mut stack = Vec::new();
    let outcome = walk(store, root, |node, path| {
        let remainder = key.slice(path.len()..);
        stack.push(node.clone());
        Ok(match node {
            Node::Branch(branch) => {
                if remainder.is_empty() {
                    WalkStep::Return((Some(node.clone()), remainder))
                } else {
                    let slot = remainder[0];
                    if branch.slots[slot as usize].is_some() {
                        WalkStep::Only(slot)
                    } else {
                        WalkStep::Return((None, remainder))
                    }
                }
            }
            Node::Leaf(leaf) => {
                if leaf.key == remainder {
                    WalkStep::Return((Some(node.clone()), Nibbles::default()))
                } else {
                    WalkStep::Return((None, remainder))
                }
            }
            Node::Extension(ext) => {
                if ext.key.common_prefix_length(&remainder) == ext.key.len() {
                    WalkStep::Next
                } else {
                    WalkStep::Return((None, remainder))
                }
            }
        })
    })?;
    let (node, remainder) = outcome.unwrap_or((None, key.clone()));
    Ok(PathToKey { node, remainder, stack })
}

/// Concatenates two nibble runs.
pub(crate) fn join(path: &Nibbles, tail: &Nibbles) -> Nibbles {
    let mut out = Vec::with_capacity(path.len() + tail.len());
    out.extend_from_slice(path);
    out.extend_from_slice(tail);
    Nibbles::from_vec_unchecked(out)
}

fn join_nibble(path: &Nibbles, nibble: u8) -> Nibbles {
    let mut out = Vec::with_capacity(path.len() + 1);
    out.extend_from_slice(path);
    out.push(nibble);
    Nibbles::from_vec_unchecked(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::nodes::NodeRef;
    use crate::{Trie, EMPTY_ROOT_HASH};
    use std::sync::Arc;

    fn populated() -> Trie {
        let trie = Trie::new(Arc::new(MemoryDb::new()));
        trie.put(b"do", b"verb").unwrap();
        trie.put(b"dog", b"puppy").unwrap();
        trie.put(b"horse", b"stallion").unwrap();
        trie
    }

    #[test]
    fn next_visits_every_node() {
        let trie = populated();
        let mut leaves = 0usize;
        let mut values = 0usize;
        walk::<(), _>(trie.store(), NodeRef::Hash(trie.root()), |node, _| {
            if matches!(node, Node::Leaf(_)) {
                leaves += 1;
            }
            if node.value().is_some() {
                values += 1;
            }
            Ok(WalkStep::Next)
        })
        .unwrap();
        assert_eq!(leaves, 2);
        assert_eq!(values, 3);
    }

    #[test]
    fn stop_prunes_subtrees() {
        let trie = populated();
        let mut visited = 0usize;
        walk::<(), _>(trie.store(), NodeRef::Hash(trie.root()), |_, _| {
            visited += 1;
            // Never descend: only the root is seen.
            Ok(WalkStep::Stop)
        })
        .unwrap();
        assert_eq!(visited, 1);
    }

    #[test]
    fn return_aborts_with_payload() {
        let trie = populated();
        let found = walk(trie.store(), NodeRef::Hash(trie.root()), |node, _| {
            Ok(match node.value() {
                Some(value) => WalkStep::Return(value.to_vec()),
                None => WalkStep::Next,
            })
        })
        .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn find_path_reports_match_and_stack() {
        let trie = populated();
        let path = find_path(
            trie.store(),
            NodeRef::Hash(trie.root()),
            &Nibbles::unpack(b"dog"),
        )
        .unwrap();
        assert!(path.node.is_some());
        assert!(path.remainder.is_empty());
        // Extensions and branches down to the leaf carrying "puppy".
        assert!(path.stack.len() >= 3);
        assert!(matches!(path.stack.last(), Some(Node::Leaf(_)) | Some(Node::Branch(_))));
    }

    #[test]
    fn find_path_mismatch_keeps_remainder() {
        let trie = populated();
        let path = find_path(
            trie.store(),
            NodeRef::Hash(trie.root()),
            &Nibbles::unpack(b"cat"),
        )
        .unwrap();
        assert!(path.node.is_none());
        assert!(!path.remainder.is_empty());
        assert!(!path.stack.is_empty());
    }

    #[test]
    fn walk_missing_root_is_fatal() {
        let trie = Trie::new(Arc::new(MemoryDb::new()));
        let err = walk::<(), _>(trie.store(), NodeRef::Hash(EMPTY_ROOT_HASH), |_, _| {
            Ok(WalkStep::Next)
        });
        assert!(matches!(err, Err(TrieError::MissingNode(_))));
    }
}
