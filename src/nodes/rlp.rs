use crate::TrieError;
use alloy_primitives::{hex, keccak256, B256};
use alloy_rlp::{BufMut, Header, EMPTY_STRING_CODE};
use core::fmt;
use smallvec::SmallVec;

/// A reference to a child node.
///
/// A child whose encoding reaches 32 bytes is stored in the backend under
/// the keccak hash of that encoding, and the parent embeds the hash. A
/// shorter child is spliced into the parent's encoding directly, skipping
/// both the store write and the extra hash. Which side of the split a child
/// lands on is a pure function of its encoded length; callers never choose.
#[derive(Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// The child lives in the store under the hash of its encoding.
    Hash(B256),
    /// The child's full encoding, embedded in place of a hash.
    Inline(SmallVec<[u8; 32]>),
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash(hash) => write!(f, "Hash({hash})"),
            Self::Inline(raw) => write!(f, "Inline({})", hex::encode(raw)),
        }
    }
}

impl NodeRef {
    /// Builds the reference a parent should embed for a child with the given
    /// encoding: inline below 32 bytes, hashed otherwise.
    pub fn from_rlp(rlp: &[u8]) -> Self {
        if rlp.len() < 32 {
            Self::Inline(SmallVec::from_slice(rlp))
        } else {
            Self::Hash(keccak256(rlp))
        }
    }

    /// Returns the hash for stored children, `None` for inline ones.
    pub fn as_hash(&self) -> Option<B256> {
        match self {
            Self::Hash(hash) => Some(*hash),
            Self::Inline(_) => None,
        }
    }

    /// Length this reference occupies inside a parent's encoding.
    pub(crate) fn rlp_len(&self) -> usize {
        match self {
            Self::Hash(_) => 1 + B256::len_bytes(),
            Self::Inline(raw) => raw.len(),
        }
    }

    /// Writes the reference into a parent's encoding: a hash as a 32-byte
    /// string, an inline child verbatim.
    pub(crate) fn encode_into(&self, out: &mut dyn BufMut) {
        match self {
            Self::Hash(hash) => {
                out.put_u8(EMPTY_STRING_CODE + 32);
                out.put_slice(hash.as_slice());
            }
            Self::Inline(raw) => out.put_slice(raw),
        }
    }

    /// Reads a child reference out of one RLP item of a parent's encoding.
    ///
    /// A list-shaped item is an inline child, a 32-byte string is a hash,
    /// and the empty string is an absent child.
    pub(crate) fn decode_child(item: &[u8]) -> Result<Option<Self>, TrieError> {
        let Some(&first) = item.first() else {
            return Err(alloy_rlp::Error::InputTooShort.into());
        };
        if first >= 0xc0 {
            return Ok(Some(Self::Inline(SmallVec::from_slice(item))));
        }
        let mut buf = item;
        let payload = Header::decode_bytes(&mut buf, false)?;
        match payload.len() {
            0 => Ok(None),
            32 => Ok(Some(Self::Hash(B256::from_slice(payload)))),
            _ => Err(alloy_rlp::Error::Custom("invalid child reference length").into()),
        }
    }
}
