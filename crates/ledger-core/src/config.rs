use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Leading `'0'` hex characters a block hash must have.
    pub difficulty: u32,
    /// Pending transactions that trigger a new block.
    pub batch_size: usize,
    pub mining: MiningConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            batch_size: DEFAULT_BATCH_SIZE,
            mining: MiningConfig::default(),
        }
    }
}

impl ChainConfig {
    pub fn new(difficulty: u32, batch_size: usize) -> Self {
        Self {
            difficulty,
            batch_size,
            mining: MiningConfig::default(),
        }
    }

    pub fn with_mining(mut self, mining: MiningConfig) -> Self {
        self.mining = mining;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::DifficultyOutOfRange {
                difficulty: self.difficulty,
            });
        }
        if self.batch_size == 0 {
            return Err(LedgerError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.mining.max_attempts == Some(0) {
            return Err(LedgerError::InvalidConfig(
                "mining.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// How blocks search for a nonce. The search is unbounded unless
/// `max_attempts` is set, in which case exhausting it fails the seal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub max_attempts: Option<u64>,
    /// Split the nonce search across the rayon thread pool.
    pub parallel: bool,
}
