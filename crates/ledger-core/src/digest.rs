//! SHA-256 helpers shared by the tree, blocks and the chain.

use crate::constants::{ABSENT_DIGEST_REPR, HASH_SIZE};
use crate::error::{LedgerError, Result};
use sha2::{Digest, Sha256};

pub type Hash = [u8; HASH_SIZE];

pub fn sha256(bytes: &[u8]) -> Hash {
    Sha256::digest(bytes).into()
}

/// Digest of two child digests concatenated as raw bytes.
pub fn sha256_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

pub fn from_hex(s: &str) -> Result<Hash> {
    let bytes = hex::decode(s).map_err(|e| LedgerError::InvalidDigest(format!("{s}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::InvalidDigest(format!("{s}: expected {HASH_SIZE} bytes")))
}

/// Hex text of a digest, or the `None` sentinel when there is no digest.
pub fn repr(hash: Option<&Hash>) -> String {
    match hash {
        Some(h) => to_hex(h),
        None => ABSENT_DIGEST_REPR.to_string(),
    }
}

/// Number of leading `'0'` characters in the hex rendering of `hash`.
pub fn leading_zero_nibbles(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 2;
        } else {
            if *b < 0x10 {
                total += 1;
            }
            break;
        }
    }
    total
}

pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    leading_zero_nibbles(hash) >= difficulty
}
