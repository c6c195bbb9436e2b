use alloy_primitives::B256;
use thiserror::Error;

/// Error type for trie operations.
#[derive(Error, Debug)]
pub enum TrieError {
    /// A node referenced by hash was absent from every read backend.
    ///
    /// Hitting this while traversing from a valid root means the store has
    /// lost part of the trie; the operation cannot proceed.
    #[error("missing trie node {0}")]
    MissingNode(B256),

    /// Node bytes failed to parse.
    #[error("RLP error: {0}")]
    Rlp(#[from] alloy_rlp::Error),

    /// The underlying key/value backend reported a failure.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Failure reported by a [`Database`](crate::Database) backend.
///
/// Carries a message rather than a backend-specific type so the backend
/// trait stays object-safe and backends can be stacked behind one store.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct DatabaseError(String);

impl DatabaseError {
    /// Wraps a backend failure description.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
