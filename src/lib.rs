#![doc = include_str!("../README.md")]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

pub mod nodes;
pub use nodes::{BranchNode, ExtensionNode, LeafNode, Node, NodeRef};

mod db;
pub use db::{BatchOp, Database, MemoryDb};

mod error;
pub use error::{DatabaseError, TrieError};

mod store;
pub use store::NodeStore;

mod walk;

mod proof;
pub use proof::verify_proof;

mod stream;
pub use stream::ReadStream;

mod trie;
pub use trie::Trie;

pub use nybbles::Nibbles;

/// Root hash of an empty trie: the keccak digest of the RLP empty string.
pub const EMPTY_ROOT_HASH: alloy_primitives::B256 =
    alloy_primitives::b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");
