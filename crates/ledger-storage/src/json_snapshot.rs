use anyhow::{Context, Result};
use ledger_core::{BlockRecord, Chain, ChainConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The whole chain as a pretty-printed JSON array of block records.
#[derive(Clone, Debug)]
pub struct JsonSnapshot {
    path: PathBuf,
}

impl JsonSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save(&self, chain: &Chain) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&chain.to_records())?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing snapshot {}", self.path.display()))?;
        info!(path = %self.path.display(), height = chain.len(), "snapshot saved");
        Ok(())
    }

    pub fn read_records(&self) -> Result<Vec<BlockRecord>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("reading snapshot {}", self.path.display()))?;
        let records = serde_json::from_str(&json)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;
        Ok(records)
    }

    /// Rebuilds the chain from the snapshot. Hashes are recomputed from the
    /// stored data, so the result should be validated before it is trusted.
    pub fn load(&self, config: ChainConfig) -> Result<Chain> {
        let chain = Chain::from_records(config, self.read_records()?)?;
        info!(path = %self.path.display(), height = chain.len(), "snapshot loaded");
        Ok(chain)
    }
}
