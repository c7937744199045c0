//! Persistence backends for the ledger: a sled key-value store written block by
//! block, and a JSON snapshot holding the whole chain as one array.

pub mod json_snapshot;
pub mod sled_store;

pub use json_snapshot::JsonSnapshot;
pub use sled_store::SledStore;

use anyhow::Result;
use ledger_core::{BlockStore, Chain};

/// Writes every block of `chain` the store does not hold yet. Returns how many
/// blocks were written.
pub fn sync_chain<S: BlockStore + ?Sized>(store: &S, chain: &Chain) -> Result<usize> {
    let stored = store.height()? as usize;
    let mut written = 0;
    for (index, block) in chain.blocks().iter().enumerate().skip(stored) {
        store.put_block(index as u64, &block.to_record())?;
        written += 1;
    }
    if written > 0 {
        store.flush()?;
    }
    Ok(written)
}
