use ledger_core::{BlockRecord, BlockStore, Transaction};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Mutex;

pub fn random_transactions(seed: u64, count: usize) -> Vec<Transaction> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            Transaction::new(
                format!("addr_from_{i}"),
                format!("addr_to_{}", rng.gen_range(0..100)),
                rng.gen_range(1..1_000),
            )
        })
        .collect()
}

/// In-memory `BlockStore` used to exercise the trait's default methods.
#[derive(Default)]
pub struct MemoryStore {
    blocks: Mutex<Vec<Option<BlockRecord>>>,
}

impl BlockStore for MemoryStore {
    fn put_block(&self, index: u64, record: &BlockRecord) -> anyhow::Result<()> {
        let mut blocks = self.blocks.lock().unwrap();
        let index = index as usize;
        if blocks.len() <= index {
            blocks.resize(index + 1, None);
        }
        blocks[index] = Some(record.clone());
        Ok(())
    }

    fn get_block(&self, index: u64) -> anyhow::Result<Option<BlockRecord>> {
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(index as usize)
            .cloned()
            .flatten())
    }

    fn height(&self) -> anyhow::Result<u64> {
        Ok(self.blocks.lock().unwrap().len() as u64)
    }

    fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
