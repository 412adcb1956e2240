//! # Block Hash Oracle Adapter
//!
//! Map-backed [`BlockHashOracle`] for tests and embedded use.

use crate::domain::value_objects::Hash;
use crate::ports::outbound::BlockHashOracle;
use async_trait::async_trait;
use std::collections::HashMap;

/// Block hashes held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBlockHashes {
    hashes: HashMap<u64, Hash>,
}

impl InMemoryBlockHashes {
    /// Creates an empty oracle (every lookup misses).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the hash of block `number`.
    pub fn insert(&mut self, number: u64, hash: Hash) {
        self.hashes.insert(number, hash);
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with_hash(mut self, number: u64, hash: Hash) -> Self {
        self.insert(number, hash);
        self
    }
}

#[async_trait]
impl BlockHashOracle for InMemoryBlockHashes {
    async fn block_hash(&self, number: u64) -> Option<Hash> {
        self.hashes.get(&number).copied()
    }
}
