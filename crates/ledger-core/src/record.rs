//! Persisted block shape and the storage trait implemented outside this crate.

use crate::transaction::Transaction;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The stored form of a block. Hashes and Merkle trees are derived data and are
/// rebuilt on load rather than persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Lowercase hex of the predecessor hash; `null` for genesis.
    pub prev_hash: Option<String>,
    pub transactions: Vec<Transaction>,
    pub timestamp: u64,
    pub nonce: u64,
}

/// Trait the storage backends implement to persist the chain block by block.
/// This lives in `ledger-core` to avoid a circular dependency.
pub trait BlockStore: Send + Sync {
    fn put_block(&self, index: u64, record: &BlockRecord) -> Result<()>;
    fn get_block(&self, index: u64) -> Result<Option<BlockRecord>>;
    /// Number of stored blocks.
    fn height(&self) -> Result<u64>;
    /// All stored blocks in index order.
    fn load_all(&self) -> Result<Vec<BlockRecord>> {
        let mut records = Vec::new();
        for index in 0..self.height()? {
            match self.get_block(index)? {
                Some(record) => records.push(record),
                None => anyhow::bail!("block {index} missing from store"),
            }
        }
        Ok(records)
    }
    fn flush(&self) -> Result<()>;
}
