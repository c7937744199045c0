//! Tamper-evident ledger core: a Merkle commitment over transactions, blocks
//! sealed by proof of work, and a chain whose linkage and block-hash tree can be
//! re-derived and checked from stored data alone.

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod digest;
pub mod error;
pub mod ledger;
pub mod merkle;
pub mod record;
pub mod transaction;

pub use block::{derive_hash, Block};
pub use chain::{Chain, ValidationReport};
pub use config::{ChainConfig, MiningConfig};
pub use digest::Hash;
pub use error::{IntegrityError, LedgerError, Result};
pub use ledger::{Account, BalanceSummary, Ledger};
pub use merkle::{MerkleNode, MerkleTree};
pub use record::{BlockRecord, BlockStore};
pub use transaction::Transaction;
