use anyhow::{Context, Result};
use clap::Parser;
use ledger_core::ChainConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Default)]
#[command(name = "ledger-node", about = "HTTP node for the proof-of-work ledger")]
pub struct Args {
    /// Optional TOML file; flags given on the command line override it
    #[arg(long, env = "LEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, env = "LEDGER_LISTEN")]
    pub listen: Option<String>,

    /// Data directory for sled
    #[arg(long, env = "LEDGER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Leading zero hex digits required of every block hash
    #[arg(long, env = "LEDGER_DIFFICULTY")]
    pub difficulty: Option<u32>,

    /// Pending transactions that trigger a new block
    #[arg(long, env = "LEDGER_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Give up sealing a block after this many nonces
    #[arg(long, env = "LEDGER_MAX_ATTEMPTS")]
    pub max_attempts: Option<u64>,

    /// Search nonces on all cores
    #[arg(long, env = "LEDGER_PARALLEL")]
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub listen: String,
    pub data_dir: PathBuf,
    pub chain: ChainConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".into(),
            data_dir: PathBuf::from("./data"),
            chain: ChainConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// File values (or defaults) overlaid with whatever flags were given.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(listen) = &args.listen {
            config.listen = listen.clone();
        }
        if let Some(data_dir) = &args.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(difficulty) = args.difficulty {
            config.chain.difficulty = difficulty;
        }
        if let Some(batch_size) = args.batch_size {
            config.chain.batch_size = batch_size;
        }
        if args.max_attempts.is_some() {
            config.chain.mining.max_attempts = args.max_attempts;
        }
        if args.parallel {
            config.chain.mining.parallel = true;
        }
        config.chain.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file_or_flags() {
        let config = NodeConfig::resolve(&Args::default()).unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        fs::write(
            &path,
            r#"
listen = "0.0.0.0:9000"

[chain]
difficulty = 2
batch_size = 5

[chain.mining]
max_attempts = 100000
"#,
        )
        .unwrap();

        let args = Args {
            config: Some(path),
            batch_size: Some(7),
            ..Args::default()
        };
        let config = NodeConfig::resolve(&args).unwrap();
        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.chain.difficulty, 2);
        assert_eq!(config.chain.batch_size, 7);
        assert_eq!(config.chain.mining.max_attempts, Some(100000));
        assert!(!config.chain.mining.parallel);
    }

    #[test]
    fn invalid_chain_settings_are_rejected() {
        let args = Args {
            batch_size: Some(0),
            ..Args::default()
        };
        assert!(NodeConfig::resolve(&args).is_err());
    }
}
