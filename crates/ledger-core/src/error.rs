use serde::Serialize;
use thiserror::Error;

/// A broken invariant found by chain validation. Digests are carried as hex text
/// (or `None` for an absent predecessor) so reports can be logged and serialized as-is.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityError {
    #[error("chain root mismatch: stored {stored}, recomputed {computed}")]
    ChainRootMismatch { stored: String, computed: String },

    #[error("block {index}: stored hash {stored} does not match recomputed {computed}")]
    BlockHashMismatch {
        index: usize,
        stored: String,
        computed: String,
    },

    #[error("block {index}: prev_hash {found} does not match predecessor hash {expected}")]
    ChainLinkageMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("block {index}: hash {hash} has fewer than {difficulty} leading zeros")]
    InsufficientWork {
        index: usize,
        difficulty: u32,
        hash: String,
    },
}

impl IntegrityError {
    /// Block position the violation was found at; `None` for chain-wide checks.
    pub fn index(&self) -> Option<usize> {
        match self {
            IntegrityError::ChainRootMismatch { .. } => None,
            IntegrityError::BlockHashMismatch { index, .. }
            | IntegrityError::ChainLinkageMismatch { index, .. }
            | IntegrityError::InsufficientWork { index, .. } => Some(*index),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IntegrityError::ChainRootMismatch { .. } => "chain_root_mismatch",
            IntegrityError::BlockHashMismatch { .. } => "block_hash_mismatch",
            IntegrityError::ChainLinkageMismatch { .. } => "chain_linkage_mismatch",
            IntegrityError::InsufficientWork { .. } => "insufficient_work",
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// The bounded nonce search ran out before any nonce met the difficulty.
    #[error("no nonce met the difficulty within {attempts} attempts")]
    MiningNonterminating { attempts: u64 },

    #[error("difficulty {difficulty} is out of range (max {})", crate::constants::MAX_DIFFICULTY)]
    DifficultyOutOfRange { difficulty: u32 },

    #[error("block index {index} out of range (chain length {len})")]
    BlockIndexOutOfRange { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("cannot rebuild a chain from zero blocks")]
    EmptyChain,

    #[error("unknown account {0}")]
    UnknownAccount(String),

    #[error("account {account} holds {balance}, cannot transfer {amount}")]
    InsufficientFunds {
        account: String,
        balance: u64,
        amount: u64,
    },

    #[error("account {account} holds {balance}, cannot receive {amount}")]
    BalanceOverflow {
        account: String,
        balance: u64,
        amount: u64,
    },

    #[error("account {0} cannot transfer to itself")]
    SelfTransfer(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
