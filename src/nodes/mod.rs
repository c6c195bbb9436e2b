//! Trie node variants and their canonical RLP encoding.
//!
//! A node is encoded as a list: two items for leaves and extensions (the
//! hex-prefix encoded path, then the value or child reference) and seventeen
//! for branches (sixteen child slots plus an optional value). A child
//! reference embedded in a parent is either the 32-byte hash of the child's
//! encoding or, when that encoding is shorter than 32 bytes, the encoding
//! itself spliced in directly.

use crate::TrieError;
use alloy_primitives::{keccak256, B256, Bytes};
use alloy_rlp::{Decodable, Encodable, Header, PayloadView};
use core::ops::Range;
use nybbles::Nibbles;

mod branch;
pub use branch::BranchNode;

mod extension;
pub use extension::ExtensionNode;

mod leaf;
pub use leaf::LeafNode;

mod rlp;
pub use rlp::NodeRef;

/// The range of valid child indexes.
pub const CHILD_INDEX_RANGE: Range<u8> = 0..16;

/// A node in the trie: the closed set of shapes a path can pass through.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Node {
    /// Terminates a path and carries a value.
    Leaf(LeafNode),
    /// Compresses a run of nibbles shared by every key below it.
    Extension(ExtensionNode),
    /// A 16-way fan-out with an optional value for the key ending here.
    Branch(BranchNode),
}

impl Node {
    /// Returns the canonical RLP encoding of this node.
    pub fn rlp(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::Leaf(node) => node.encode(&mut buf),
            Self::Extension(node) => node.encode(&mut buf),
            Self::Branch(node) => node.encode(&mut buf),
        }
        buf
    }

    /// Hashes the canonical encoding.
    pub fn hash(&self) -> B256 {
        keccak256(self.rlp())
    }

    /// The value terminating at this node, if any.
    pub fn value(&self) -> Option<&Bytes> {
        match self {
            Self::Leaf(node) => Some(&node.value),
            Self::Extension(_) => None,
            Self::Branch(node) => node.value.as_ref(),
        }
    }

    /// Enumerates `(edge nibbles, child reference)` pairs in slot order.
    pub fn children(&self) -> Vec<(Nibbles, &NodeRef)> {
        match self {
            Self::Leaf(_) => Vec::new(),
            Self::Extension(node) => vec![(node.key.clone(), &node.child)],
            Self::Branch(node) => node
                .slots
                .iter()
                .enumerate()
                .filter_map(|(slot, child)| {
                    let child = child.as_ref()?;
                    Some((Nibbles::from_nibbles_unchecked([slot as u8]), child))
                })
                .collect(),
        }
    }

    /// Decodes a node from its canonical RLP encoding.
    pub fn decode(mut buf: &[u8]) -> Result<Self, TrieError> {
        match Header::decode_raw(&mut buf)? {
            PayloadView::List(items) => match items.len() {
                2 => {
                    let mut path_item = items[0];
                    let encoded_path = Header::decode_bytes(&mut path_item, false)?;
                    let (key, is_leaf) = decode_path(encoded_path)?;
                    if is_leaf {
                        let mut value_item = items[1];
                        let value = Bytes::decode(&mut value_item)?;
                        Ok(Self::Leaf(LeafNode::new(key, value)))
                    } else {
                        if key.is_empty() {
                            return Err(alloy_rlp::Error::Custom("extension node key empty").into());
                        }
                        let child = NodeRef::decode_child(items[1])?
                            .ok_or(alloy_rlp::Error::Custom("extension node child empty"))?;
                        Ok(Self::Extension(ExtensionNode::new(key, child)))
                    }
                }
                17 => {
                    let mut node = BranchNode::default();
                    for (slot, item) in CHILD_INDEX_RANGE.zip(&items[..16]) {
                        node.slots[slot as usize] = NodeRef::decode_child(item)?;
                    }
                    let mut value_item = items[16];
                    let value = Bytes::decode(&mut value_item)?;
                    if !value.is_empty() {
                        node.value = Some(value);
                    }
                    Ok(Self::Branch(node))
                }
                _ => Err(alloy_rlp::Error::Custom("invalid number of items in node list").into()),
            },
            PayloadView::String(_) => Err(alloy_rlp::Error::Custom("node is not a list").into()),
        }
    }
}

/// Splits a hex-prefix encoded path into its nibbles and the leaf flag.
///
/// The high nibble of the first byte carries `2 * is_leaf + is_odd`; an odd
/// path starts in the low nibble of that byte, an even one is padded.
fn decode_path(encoded: &[u8]) -> Result<(Nibbles, bool), TrieError> {
    let Some(&first) = encoded.first() else {
        return Err(alloy_rlp::Error::Custom("node path empty").into());
    };
    let (is_leaf, first_nibble) = match first & 0xf0 {
        0x00 => (false, None),
        0x10 => (false, Some(first & 0x0f)),
        0x20 => (true, None),
        0x30 => (true, Some(first & 0x0f)),
        _ => return Err(alloy_rlp::Error::Custom("invalid path prefix").into()),
    };
    Ok((unpack_path(first_nibble, &encoded[1..]), is_leaf))
}

/// Unpacks a path body to nibbles. `first` is the odd lead nibble, if any.
fn unpack_path(first: Option<u8>, rest: &[u8]) -> Nibbles {
    let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
    nibbles.extend(first);
    for byte in rest {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    Nibbles::from_vec_unchecked(nibbles)
}
