use super::NodeRef;
use alloy_rlp::{length_of_length, BufMut, Encodable, Header};
use alloy_trie::nodes::encode_path_leaf;
use core::fmt;
use nybbles::Nibbles;

/// An intermediate node that exists solely to compress the trie's paths: a
/// run of nibbles shared by every key below it, followed by exactly one
/// child.
///
/// A canonical trie never contains an extension with an empty key, and an
/// extension's child is always a branch; anything else would have been
/// merged away by the insert and delete rebalancing rules.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtensionNode {
    /// The shared nibble run. Never empty.
    pub key: Nibbles,
    /// The single downstream node.
    pub child: NodeRef,
}

impl fmt::Debug for ExtensionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionNode")
            .field("key", &self.key)
            .field("child", &self.child)
            .finish()
    }
}

impl ExtensionNode {
    /// Creates a new extension node with the given key and child reference.
    pub fn new(key: Nibbles, child: NodeRef) -> Self {
        Self { key, child }
    }

    /// Returns the length of RLP encoded fields of the extension node.
    fn rlp_payload_length(&self) -> usize {
        let mut encoded_key_len = self.key.len() / 2 + 1;
        // For extension nodes the first byte cannot be greater than 0x80.
        if encoded_key_len != 1 {
            encoded_key_len += length_of_length(encoded_key_len);
        }
        encoded_key_len + self.child.rlp_len()
    }
}

impl Encodable for ExtensionNode {
    fn encode(&self, out: &mut dyn BufMut) {
        Header { list: true, payload_length: self.rlp_payload_length() }.encode(out);
        encode_path_leaf(&self.key, false).as_slice().encode(out);
        // The child reference is already RLP encoded.
        self.child.encode_into(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.rlp_payload_length();
        payload_length + length_of_length(payload_length)
    }
}
