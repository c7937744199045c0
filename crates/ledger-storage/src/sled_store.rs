use anyhow::{Context, Result};
use ledger_core::{BlockRecord, BlockStore};
use sled::{Db, Tree};
use std::path::Path;
use tracing::info;

const TREE_BLOCKS: &str = "blocks";
const KEY_HEIGHT: &[u8] = b"height";

fn decode_height(bytes: &[u8]) -> u64 {
    <[u8; 8]>::try_from(bytes)
        .map(u64::from_be_bytes)
        .unwrap_or(0)
}

/// Block records as bincode values keyed by big-endian index, so sled's key
/// order is chain order. The block count is kept under a separate meta key.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    blocks: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db =
            sled::open(path).with_context(|| format!("opening sled at {}", path.display()))?;
        let blocks = db.open_tree(TREE_BLOCKS)?;
        info!(path = %path.display(), "sled store opened");
        Ok(Self { db, blocks })
    }

    /// Removes every stored block.
    pub fn clear(&self) -> Result<()> {
        self.blocks.clear()?;
        self.db.remove(KEY_HEIGHT)?;
        self.db.flush()?;
        Ok(())
    }
}

impl BlockStore for SledStore {
    fn put_block(&self, index: u64, record: &BlockRecord) -> Result<()> {
        let bytes = bincode::serialize(record)?;
        self.blocks.insert(index.to_be_bytes(), bytes)?;

        // Concurrent writers may land out of order; the height only ever grows.
        self.db.update_and_fetch(KEY_HEIGHT, |old| {
            let current = old.map(decode_height).unwrap_or(0);
            Some(current.max(index + 1).to_be_bytes().to_vec())
        })?;
        Ok(())
    }

    fn get_block(&self, index: u64) -> Result<Option<BlockRecord>> {
        match self.blocks.get(index.to_be_bytes())? {
            Some(bytes) => {
                let record = bincode::deserialize(&bytes)
                    .with_context(|| format!("decoding stored block {index}"))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn height(&self) -> Result<u64> {
        match self.db.get(KEY_HEIGHT)? {
            Some(v) => {
                anyhow::ensure!(v.len() == 8, "stored height is not 8 bytes");
                Ok(decode_height(&v))
            }
            None => Ok(0),
        }
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
