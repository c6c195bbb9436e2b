use alloy_primitives::{hex, Bytes};
use alloy_rlp::{length_of_length, BufMut, Encodable, Header};
use alloy_trie::nodes::encode_path_leaf;
use core::fmt;
use nybbles::Nibbles;

/// A node that terminates a path.
///
/// The key holds the nibbles remaining between the parent edge and the full
/// key of the entry; a leaf sitting directly in a branch slot whose key ends
/// there has an empty key.
#[derive(Clone, PartialEq, Eq)]
pub struct LeafNode {
    /// The remaining path nibbles.
    pub key: Nibbles,
    /// The value stored under the full key.
    pub value: Bytes,
}

impl fmt::Debug for LeafNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafNode")
            .field("key", &self.key)
            .field("value", &hex::encode(&self.value))
            .finish()
    }
}

impl LeafNode {
    /// Creates a new leaf node with the given key and value.
    pub fn new(key: Nibbles, value: Bytes) -> Self {
        Self { key, value }
    }

    /// Returns the length of RLP encoded fields of the leaf node.
    fn rlp_payload_length(&self) -> usize {
        let mut encoded_key_len = self.key.len() / 2 + 1;
        if encoded_key_len != 1 {
            encoded_key_len += length_of_length(encoded_key_len);
        }
        encoded_key_len + self.value.length()
    }
}

impl Encodable for LeafNode {
    fn encode(&self, out: &mut dyn BufMut) {
        Header { list: true, payload_length: self.rlp_payload_length() }.encode(out);
        encode_path_leaf(&self.key, true).as_slice().encode(out);
        self.value.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.rlp_payload_length();
        payload_length + length_of_length(payload_length)
    }
}
