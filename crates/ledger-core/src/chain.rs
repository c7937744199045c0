use crate::block::Block;
use crate::config::ChainConfig;
use crate::digest::{self, Hash};
use crate::error::{IntegrityError, LedgerError, Result};
use crate::merkle::MerkleTree;
use crate::record::BlockRecord;
use crate::transaction::Transaction;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of [`Chain::validate`]: every violation found, in check order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Number of blocks examined.
    pub height: usize,
    pub violations: Vec<IntegrityError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first(&self) -> Option<&IntegrityError> {
        self.violations.first()
    }

    /// Violations reported against block `index`.
    pub fn at(&self, index: usize) -> impl Iterator<Item = &IntegrityError> {
        self.violations
            .iter()
            .filter(move |v| v.index() == Some(index))
    }

    pub fn into_result(self) -> std::result::Result<(), IntegrityError> {
        match self.violations.into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }
}

/// Append-only sequence of mined blocks plus a Merkle tree over their hashes.
///
/// Blocks are only ever added by [`Chain::submit`] once the pending buffer
/// reaches the configured batch size. A clone is a consistent snapshot and can be
/// validated while the original keeps growing.
#[derive(Clone, Debug)]
pub struct Chain {
    config: ChainConfig,
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    block_tree: MerkleTree,
}

impl Chain {
    /// Creates a chain holding a freshly mined, empty genesis block.
    pub fn new(config: ChainConfig) -> Result<Self> {
        config.validate()?;
        let mut chain = Self::empty(config);
        let mut genesis = Block::genesis();
        chain.mine(&mut genesis)?;
        chain.append(genesis);
        Ok(chain)
    }

    fn empty(config: ChainConfig) -> Self {
        Self {
            config,
            blocks: Vec::new(),
            pending: Vec::new(),
            block_tree: MerkleTree::new(),
        }
    }

    /// Rebuilds a chain from stored records. Every block's tree and hash are
    /// recomputed from the stored transactions and nonce; nothing is re-mined and
    /// nothing is checked here, so callers should [`Chain::validate`] the result.
    pub fn from_records<I>(config: ChainConfig, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = BlockRecord>,
    {
        config.validate()?;
        let mut chain = Self::empty(config);
        for record in records {
            chain.append(Block::from_record(record)?);
        }
        if chain.blocks.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        info!(height = chain.len(), "chain rebuilt from records");
        Ok(chain)
    }

    pub fn to_records(&self) -> Vec<BlockRecord> {
        self.blocks.iter().map(Block::to_record).collect()
    }

    fn mine(&self, block: &mut Block) -> Result<()> {
        let difficulty = self.config.difficulty;
        let mining = &self.config.mining;
        if mining.parallel {
            block.mine_parallel(difficulty, mining.max_attempts)?;
        } else if let Some(max_attempts) = mining.max_attempts {
            block.mine_bounded(difficulty, max_attempts)?;
        } else if !block.mine(difficulty) {
            return Err(LedgerError::MiningNonterminating {
                attempts: u64::MAX,
            });
        }
        Ok(())
    }

    fn append(&mut self, block: Block) -> usize {
        self.block_tree.append(block.hash());
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Queues `tx`. When the queue reaches the batch size, its contents are
    /// mined into a new block on top of the tip and the index of that block is
    /// returned. If mining fails the queue is kept and the next submission
    /// retries the seal.
    pub fn submit(&mut self, tx: Transaction) -> Result<Option<usize>> {
        self.pending.push(tx);
        debug!(pending = self.pending.len(), "transaction queued");
        if self.pending.len() < self.config.batch_size {
            return Ok(None);
        }

        let batch = std::mem::take(&mut self.pending);
        let mut block = Block::new(batch, self.blocks.last());
        if let Err(err) = self.mine(&mut block) {
            self.pending = block.transactions;
            return Err(err);
        }
        let txs = block.transactions().len();
        let index = self.append(block);
        info!(
            index,
            txs,
            nonce = self.blocks[index].nonce(),
            hash = %self.blocks[index].hash_hex(),
            "block sealed"
        );
        Ok(Some(index))
    }

    /// Recomputes every derived value from stored data and reports each
    /// mismatch. Nothing is mined or mutated.
    ///
    /// Checks run in this order: the chain root, then per block its hash, its
    /// proof of work and its link to the predecessor. The scan never stops early.
    pub fn validate(&self) -> ValidationReport {
        let mut violations = Vec::new();

        let stored = self.chain_root();
        let computed = self.recompute_chain_root();
        if stored != computed {
            violations.push(IntegrityError::ChainRootMismatch {
                stored: digest::repr(stored.as_ref()),
                computed: digest::repr(computed.as_ref()),
            });
        }

        for (index, block) in self.blocks.iter().enumerate() {
            let computed = block.compute_hash();
            if computed != *block.hash() {
                violations.push(IntegrityError::BlockHashMismatch {
                    index,
                    stored: block.hash_hex(),
                    computed: digest::to_hex(&computed),
                });
            }

            if !block.satisfies(self.config.difficulty) {
                violations.push(IntegrityError::InsufficientWork {
                    index,
                    difficulty: self.config.difficulty,
                    hash: block.hash_hex(),
                });
            }

            let expected = index.checked_sub(1).map(|prev| *self.blocks[prev].hash());
            if block.prev_hash() != expected.as_ref() {
                violations.push(IntegrityError::ChainLinkageMismatch {
                    index,
                    expected: digest::repr(expected.as_ref()),
                    found: digest::repr(block.prev_hash()),
                });
            }
        }

        ValidationReport {
            height: self.blocks.len(),
            violations,
        }
    }

    /// First violation found by [`Chain::validate`], if any.
    pub fn verify(&self) -> std::result::Result<(), IntegrityError> {
        self.validate().into_result()
    }

    /// Root of the tree maintained as blocks were appended.
    pub fn chain_root(&self) -> Option<Hash> {
        self.block_tree.root_hash()
    }

    /// Root rebuilt from the stored block hashes as they are now.
    pub fn recompute_chain_root(&self) -> Option<Hash> {
        MerkleTree::from_records(self.blocks.iter().map(Block::hash)).root_hash()
    }

    pub fn block(&self, index: usize) -> Result<&Block> {
        self.blocks
            .get(index)
            .ok_or(LedgerError::BlockIndexOutOfRange {
                index,
                len: self.blocks.len(),
            })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn tip(&self) -> &Block {
        // The genesis block is appended on construction and blocks are never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Drops the most recently queued transaction. Used to back out a
    /// submission whose seal failed so it is not sealed later.
    pub(crate) fn withdraw_last_pending(&mut self) -> Option<Transaction> {
        self.pending.pop()
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }
}
