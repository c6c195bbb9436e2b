use super::NodeRef;
use alloy_primitives::{hex, Bytes};
use alloy_rlp::{length_of_length, BufMut, Encodable, Header, EMPTY_STRING_CODE};
use core::fmt;

/// A branch node: a 17-element array of 16 slots that correspond to each
/// hexadecimal character of the path, and an additional slot for the value
/// of a key that terminates at this depth.
///
/// After every mutation a branch either has at least two occupied outgoing
/// edges or carries a terminal value; anything sparser is collapsed into its
/// neighbours.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BranchNode {
    /// Child references, indexed by the next nibble of the key.
    pub slots: [Option<NodeRef>; 16],
    /// The value for a key ending at this branch.
    pub value: Option<Bytes>,
}

impl fmt::Debug for BranchNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<_> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, child)| Some((slot, child.as_ref()?)))
            .collect();
        f.debug_struct("BranchNode")
            .field("slots", &slots)
            .field("value", &self.value.as_deref().map(hex::encode))
            .finish()
    }
}

impl BranchNode {
    /// Number of occupied slots, plus one if a terminal value is present.
    pub fn occupancy(&self) -> usize {
        let slots = self.slots.iter().filter(|slot| slot.is_some()).count();
        slots + usize::from(self.value.is_some())
    }

    /// The sole remaining `(slot, child)` pair, when exactly one slot is
    /// occupied.
    pub fn lone_child(&self) -> Option<(u8, &NodeRef)> {
        let mut occupied = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, child)| Some((slot as u8, child.as_ref()?)));
        match (occupied.next(), occupied.next()) {
            (Some(pair), None) => Some(pair),
            _ => None,
        }
    }

    /// Returns the length of RLP encoded fields of the branch node.
    fn rlp_payload_length(&self) -> usize {
        let mut payload_length = 0;
        for slot in &self.slots {
            payload_length += slot.as_ref().map_or(1, NodeRef::rlp_len);
        }
        payload_length + self.value.as_ref().map_or(1, Encodable::length)
    }
}

/// Encodes the branch as a 17-element list; empty slots and an absent value
/// serialize as the empty string.
impl Encodable for BranchNode {
    fn encode(&self, out: &mut dyn BufMut) {
        Header { list: true, payload_length: self.rlp_payload_length() }.encode(out);
        for slot in &self.slots {
            match slot {
                Some(child) => child.encode_into(out),
                None => out.put_u8(EMPTY_STRING_CODE),
            }
        }
        match &self.value {
            Some(value) => value.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.rlp_payload_length();
        payload_length + length_of_length(payload_length)
    }
}
