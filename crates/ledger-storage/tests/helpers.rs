use std::fs;

use ledger_core::{Chain, ChainConfig, Transaction};
use ledger_storage::sled_store::SledStore;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (
        temp_dir,
        SledStore::open(&db_path).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

/// A difficulty-1 chain with `batches` sealed blocks of three transactions.
pub fn sample_chain(seed: u64, batches: usize) -> Chain {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut chain = Chain::new(ChainConfig::new(1, 3)).expect("genesis mines");
    for i in 0..batches * 3 {
        let tx = Transaction::new(
            format!("addr_from_{i}"),
            format!("addr_to_{i}"),
            rng.gen_range(1..10_000),
        );
        chain.submit(tx).expect("block mines");
    }
    chain
}
