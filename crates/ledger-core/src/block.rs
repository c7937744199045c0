use crate::constants::MAX_DIFFICULTY;
use crate::digest::{self, from_hex, meets_difficulty, Hash};
use crate::error::{LedgerError, Result};
use crate::merkle::MerkleTree;
use crate::record::BlockRecord;
use crate::transaction::Transaction;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Block identity: SHA-256 over the UTF-8 text `{prev}{nonce}{root}`, where
/// `prev` and `root` are lowercase hex or the `None` sentinel and `nonce` is
/// decimal.
pub fn derive_hash(prev_hash: Option<&Hash>, nonce: u64, merkle_root: Option<&Hash>) -> Hash {
    HashTemplate::new(prev_hash, merkle_root).at(nonce)
}

/// The fixed parts of a block hash, so the nonce search only hashes the
/// changing digits and the root suffix.
#[derive(Clone)]
struct HashTemplate {
    prefix: Sha256,
    suffix: String,
}

impl HashTemplate {
    fn new(prev_hash: Option<&Hash>, merkle_root: Option<&Hash>) -> Self {
        Self {
            prefix: Sha256::new_with_prefix(digest::repr(prev_hash)),
            suffix: digest::repr(merkle_root),
        }
    }

    fn at(&self, nonce: u64) -> Hash {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.to_string());
        hasher.update(&self.suffix);
        hasher.finalize().into()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn check_difficulty(difficulty: u32) -> Result<()> {
    if difficulty > MAX_DIFFICULTY {
        return Err(LedgerError::DifficultyOutOfRange { difficulty });
    }
    Ok(())
}

/// A batch of transactions committed by a Merkle root and linked to its
/// predecessor by that block's hash.
///
/// `hash` is derived data. It is written only at construction, by the mining
/// methods and by [`Block::refresh_hash`]; [`Block::compute_hash`] re-derives
/// it from the raw transactions without touching the stored value.
#[derive(Clone, Debug)]
pub struct Block {
    pub(crate) prev_hash: Option<Hash>,
    pub(crate) timestamp: u64,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) nonce: u64,
    pub(crate) tree: MerkleTree,
    pub(crate) hash: Hash,
}

impl Block {
    pub fn new(transactions: Vec<Transaction>, prev: Option<&Block>) -> Self {
        Self::assemble(prev.map(|b| b.hash), now_secs(), transactions, 0)
    }

    pub fn genesis() -> Self {
        Self::new(Vec::new(), None)
    }

    fn assemble(
        prev_hash: Option<Hash>,
        timestamp: u64,
        transactions: Vec<Transaction>,
        nonce: u64,
    ) -> Self {
        let tree = MerkleTree::from_records(transactions.iter().map(Transaction::canonical_bytes));
        let hash = derive_hash(prev_hash.as_ref(), nonce, tree.root_hash().as_ref());
        Self {
            prev_hash,
            timestamp,
            transactions,
            nonce,
            tree,
            hash,
        }
    }

    /// Rebuilds a block from its stored form. The tree and hash are recomputed
    /// from the stored transactions and nonce; nothing derived is trusted.
    pub fn from_record(record: BlockRecord) -> Result<Self> {
        let prev_hash = record.prev_hash.as_deref().map(from_hex).transpose()?;
        Ok(Self::assemble(
            prev_hash,
            record.timestamp,
            record.transactions,
            record.nonce,
        ))
    }

    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            prev_hash: self.prev_hash.as_ref().map(digest::to_hex),
            transactions: self.transactions.clone(),
            timestamp: self.timestamp,
            nonce: self.nonce,
        }
    }

    pub fn prev_hash(&self) -> Option<&Hash> {
        self.prev_hash.as_ref()
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn hash_hex(&self) -> String {
        digest::to_hex(&self.hash)
    }

    pub fn merkle_tree(&self) -> &MerkleTree {
        &self.tree
    }

    /// Root committed when the block was built.
    pub fn merkle_root(&self) -> Option<Hash> {
        self.tree.root_hash()
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_none()
    }

    /// Re-derives the hash from the current transactions, predecessor and nonce.
    pub fn compute_hash(&self) -> Hash {
        let root =
            MerkleTree::from_records(self.transactions.iter().map(Transaction::canonical_bytes))
                .root_hash();
        derive_hash(self.prev_hash.as_ref(), self.nonce, root.as_ref())
    }

    pub fn refresh_hash(&mut self) {
        self.tree =
            MerkleTree::from_records(self.transactions.iter().map(Transaction::canonical_bytes));
        self.hash = derive_hash(self.prev_hash.as_ref(), self.nonce, self.merkle_root().as_ref());
    }

    pub fn satisfies(&self, difficulty: u32) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    fn template(&self) -> HashTemplate {
        HashTemplate::new(self.prev_hash.as_ref(), self.merkle_root().as_ref())
    }

    fn settle(&mut self, nonce: u64, hash: Hash, attempts: u64) {
        self.nonce = nonce;
        self.hash = hash;
        debug!(
            nonce,
            attempts,
            hash = %digest::to_hex(&hash),
            "nonce found"
        );
    }

    /// Increments the nonce from its current value until the hash has
    /// `difficulty` leading `'0'` hex characters. Blocks the caller for as long
    /// as the search takes. The nonce wraps at `u64::MAX`; `false` means every
    /// nonce was tried (or the difficulty exceeds the digest width) and the
    /// block is left as it was.
    pub fn mine(&mut self, difficulty: u32) -> bool {
        if difficulty > MAX_DIFFICULTY {
            return false;
        }
        let template = self.template();
        let start = self.nonce;
        let mut nonce = start;
        let mut attempts = 0u64;
        loop {
            let hash = template.at(nonce);
            attempts = attempts.wrapping_add(1);
            if meets_difficulty(&hash, difficulty) {
                self.settle(nonce, hash, attempts);
                return true;
            }
            nonce = nonce.wrapping_add(1);
            if nonce == start {
                return false;
            }
        }
    }

    /// Like [`Block::mine`] but tries at most `max_attempts` nonces. Returns the
    /// number of attempts used. On exhaustion the block keeps its starting nonce
    /// and hash.
    pub fn mine_bounded(&mut self, difficulty: u32, max_attempts: u64) -> Result<u64> {
        check_difficulty(difficulty)?;
        let template = self.template();
        let start = self.nonce;
        for offset in 0..max_attempts {
            let nonce = start.wrapping_add(offset);
            let hash = template.at(nonce);
            if meets_difficulty(&hash, difficulty) {
                self.settle(nonce, hash, offset + 1);
                return Ok(offset + 1);
            }
        }
        Err(LedgerError::MiningNonterminating {
            attempts: max_attempts,
        })
    }

    /// Searches the nonce window `[nonce, nonce + max_attempts)` on the rayon
    /// pool. The lowest satisfying nonce wins, so the outcome is the same as the
    /// sequential search; workers past the winner stop early.
    pub fn mine_parallel(&mut self, difficulty: u32, max_attempts: Option<u64>) -> Result<u64> {
        check_difficulty(difficulty)?;
        let template = self.template();
        let start = self.nonce;
        let window = max_attempts.unwrap_or(u64::MAX);
        let found = (0..window)
            .into_par_iter()
            .map(|offset| {
                let nonce = start.wrapping_add(offset);
                (offset, nonce, template.at(nonce))
            })
            .find_first(|(_, _, hash)| meets_difficulty(hash, difficulty));

        match found {
            Some((offset, nonce, hash)) => {
                self.settle(nonce, hash, offset + 1);
                Ok(offset + 1)
            }
            None => Err(LedgerError::MiningNonterminating { attempts: window }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{leading_zero_nibbles, sha256, to_hex};

    fn sample_txs() -> Vec<Transaction> {
        vec![
            Transaction::new("alice", "bob", 150),
            Transaction::new("alice", "charlie", 200),
            Transaction::new("bob", "alice", 50),
        ]
    }

    #[test]
    fn genesis_hash_uses_sentinels() {
        let genesis = Block::genesis();
        assert!(genesis.is_genesis());
        assert!(genesis.merkle_root().is_none());
        assert_eq!(genesis.nonce(), 0);
        assert_eq!(*genesis.hash(), sha256(b"None0None"));
        assert_eq!(
            genesis.hash_hex(),
            "f16ca556720ffc35fd756eb35036aa2c88397092adcc2d75554744a377cc1860"
        );
    }

    #[test]
    fn hash_text_layout() {
        let prev = [0xab; 32];
        let root = [0x01; 32];
        let text = format!("{}{}{}", "ab".repeat(32), 42, "01".repeat(32));
        assert_eq!(
            derive_hash(Some(&prev), 42, Some(&root)),
            sha256(text.as_bytes())
        );
        let text = format!("None7{}", "01".repeat(32));
        assert_eq!(derive_hash(None, 7, Some(&root)), sha256(text.as_bytes()));
    }

    #[test]
    fn links_to_predecessor_by_hash() {
        let genesis = Block::genesis();
        let block = Block::new(sample_txs(), Some(&genesis));
        assert_eq!(block.prev_hash(), Some(genesis.hash()));
        assert!(block.timestamp() > 0);
        assert_eq!(block.transactions().len(), 3);
        assert_eq!(block.merkle_tree().len(), 3);
    }

    #[test]
    fn mine_meets_difficulty_and_reproduces_hash() {
        let genesis = Block::genesis();
        let mut block = Block::new(sample_txs(), Some(&genesis));
        assert!(block.mine(2));
        assert!(block.satisfies(2));
        assert!(to_hex(block.hash()).starts_with("00"));
        assert!(leading_zero_nibbles(block.hash()) >= 2);
        assert_eq!(block.compute_hash(), *block.hash());
        assert_eq!(
            derive_hash(block.prev_hash(), block.nonce(), block.merkle_root().as_ref()),
            *block.hash()
        );
    }

    #[test]
    fn difficulty_zero_accepts_current_nonce() {
        let mut block = Block::new(sample_txs(), None);
        let before = *block.hash();
        assert!(block.mine(0));
        assert_eq!(block.nonce(), 0);
        assert_eq!(*block.hash(), before);
        assert_eq!(block.mine_bounded(0, 1).unwrap(), 1);
    }

    #[test]
    fn mining_resumes_from_current_nonce() {
        let mut block = Block::new(sample_txs(), None);
        assert!(block.mine(1));
        let first = block.nonce();
        block.nonce = first + 1;
        block.refresh_hash();
        assert!(block.mine(1));
        assert!(block.nonce() > first);
    }

    #[test]
    fn bounded_mining_reports_exhaustion_and_leaves_block_untouched() {
        let mut block = Block::new(sample_txs(), None);
        let before = (block.nonce(), *block.hash());
        let err = block.mine_bounded(64, 500).unwrap_err();
        assert!(matches!(err, LedgerError::MiningNonterminating { attempts: 500 }));
        assert_eq!((block.nonce(), *block.hash()), before);
    }

    #[test]
    fn out_of_range_difficulty_is_rejected() {
        let mut block = Block::genesis();
        assert!(!block.mine(65));
        assert!(matches!(
            block.mine_bounded(65, 10),
            Err(LedgerError::DifficultyOutOfRange { difficulty: 65 })
        ));
        assert!(matches!(
            block.mine_parallel(65, None),
            Err(LedgerError::DifficultyOutOfRange { .. })
        ));
    }

    #[test]
    fn parallel_mining_finds_the_sequential_nonce() {
        let genesis = Block::genesis();
        let template = Block::new(sample_txs(), Some(&genesis));

        let mut sequential = template.clone();
        let attempts = sequential.mine_bounded(2, 1_000_000).unwrap();
        let mut parallel = template.clone();
        let par_attempts = parallel.mine_parallel(2, Some(1_000_000)).unwrap();

        assert_eq!(sequential.nonce(), parallel.nonce());
        assert_eq!(sequential.hash(), parallel.hash());
        assert_eq!(attempts, par_attempts);
    }

    #[test]
    fn parallel_mining_respects_window() {
        let mut block = Block::new(sample_txs(), None);
        let err = block.mine_parallel(64, Some(256)).unwrap_err();
        assert!(matches!(err, LedgerError::MiningNonterminating { attempts: 256 }));
        assert_eq!(block.nonce(), 0);
    }

    #[test]
    fn nonce_wraps_instead_of_overflowing() {
        let mut block = Block::new(sample_txs(), None);
        block.nonce = u64::MAX - 2;
        block.refresh_hash();
        assert!(block.mine_bounded(1, 10_000).is_ok());
        assert!(block.satisfies(1));
        assert_eq!(block.compute_hash(), *block.hash());
    }

    #[test]
    fn tampered_transaction_changes_recomputed_hash() {
        let mut block = Block::new(sample_txs(), None);
        assert!(block.mine(1));
        let stored = *block.hash();
        block.transactions[1].amount = 999;
        assert_eq!(*block.hash(), stored);
        assert_ne!(block.compute_hash(), stored);
    }

    #[test]
    fn record_round_trip_recomputes_hash() {
        let genesis = Block::genesis();
        let mut block = Block::new(sample_txs(), Some(&genesis));
        assert!(block.mine(1));
        let record = block.to_record();
        assert_eq!(record.prev_hash, Some(genesis.hash_hex()));
        let json = serde_json::to_string(&record).unwrap();
        let reloaded = Block::from_record(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(reloaded.hash(), block.hash());
        assert_eq!(reloaded.merkle_root(), block.merkle_root());
        assert_eq!(reloaded.timestamp(), block.timestamp());
    }

    #[test]
    fn record_with_bad_prev_hash_is_rejected() {
        let record = BlockRecord {
            prev_hash: Some("not-hex".into()),
            transactions: vec![],
            timestamp: 0,
            nonce: 0,
        };
        assert!(matches!(
            Block::from_record(record),
            Err(LedgerError::InvalidDigest(_))
        ));
    }
}
