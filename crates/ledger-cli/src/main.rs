use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::{ChainConfig, Ledger};
use ledger_storage::JsonSnapshot;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open an account and print its id
    Open {
        #[arg(long)]
        name: String,
        /// Opening balance
        #[arg(long, default_value_t = 50)]
        balance: u64,
    },
    /// Submit a transaction
    Submit {
        /// Sender account id
        #[arg(long)]
        from: String,
        /// Recipient account id
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Show chain height, tip hash and pending count
    Head,
    /// Validate the node's chain and print the report
    Validate,
    /// Print a stored block
    Block { index: usize },
    /// Print balances replayed up to a block
    Balances { index: usize },
    /// Run the three-account scenario locally and write a JSON snapshot
    Demo {
        #[arg(long, default_value = "blockchain_data.json")]
        out: PathBuf,
        #[arg(long, default_value_t = 4)]
        difficulty: u32,
        #[arg(long, default_value_t = 3)]
        batch_size: usize,
    },
    /// Load a JSON snapshot and validate it offline
    Check {
        path: PathBuf,
        #[arg(long, default_value_t = 4)]
        difficulty: u32,
    },
}

#[derive(Serialize)]
struct Tx {
    from: String,
    to: String,
    amount: u64,
}

#[derive(Serialize)]
struct NewAccount {
    name: String,
    balance: u64,
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    println!("{body}");
    Ok(())
}

fn run_demo(out: &Path, config: ChainConfig) -> Result<()> {
    let mut ledger = Ledger::new(config)?;
    let alice = ledger.open_account("Alice", 6000);
    let bob = ledger.open_account("Bob", 4000);
    let charlie = ledger.open_account("Charlie", 2000);

    let transfers = [
        (&alice, &bob, 150),
        (&alice, &charlie, 200),
        (&bob, &alice, 50),
        (&bob, &charlie, 400),
        (&charlie, &alice, 300),
    ];
    for (from, to, amount) in transfers {
        let sender = ledger.account(from)?.name.clone();
        let recipient = ledger.account(to)?.name.clone();
        println!("Transaction from {sender} to {recipient}: {amount}");
        if let Some(index) = ledger.transfer(from, to, amount)? {
            println!("Block {index} sealed: {}", ledger.chain().block(index)?.hash_hex());
        }
    }

    let block = ledger.chain().block(1)?;
    if block.satisfies(ledger.chain().difficulty()) {
        println!("Valid proof of work\n");
    } else {
        println!("Invalid proof of work\n");
    }

    for (name, summary) in ledger.balance_report(1)? {
        println!(
            "Client: {name}, Current balance: {}, min balance: {}, max balance: {}",
            summary.current, summary.min, summary.max
        );
    }

    let report = ledger.chain().validate();
    println!("\nchain valid: {}", report.is_valid());

    JsonSnapshot::new(out).save(ledger.chain())?;
    info!(path = %out.display(), "snapshot written");
    Ok(())
}

fn run_check(path: &Path, difficulty: u32) -> Result<bool> {
    let config = ChainConfig {
        difficulty,
        ..ChainConfig::default()
    };
    let chain = JsonSnapshot::new(path)
        .load(config)
        .with_context(|| format!("loading {}", path.display()))?;
    let report = chain.validate();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_valid())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node;
    let client = reqwest::Client::new();
    match cli.cmd {
        Command::Open { name, balance } => {
            let res = client
                .post(format!("{node}/accounts"))
                .json(&NewAccount { name, balance })
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Submit { from, to, amount } => {
            let tx = Tx { from, to, amount };
            let res = client.post(format!("{node}/tx")).json(&tx).send().await?;
            print_response(res).await?;
        }
        Command::Head => {
            let res = client.get(format!("{node}/chain/head")).send().await?;
            print_response(res).await?;
        }
        Command::Validate => {
            let res = client.get(format!("{node}/chain/validate")).send().await?;
            print_response(res).await?;
        }
        Command::Block { index } => {
            let res = client.get(format!("{node}/blocks/{index}")).send().await?;
            print_response(res).await?;
        }
        Command::Balances { index } => {
            let res = client.get(format!("{node}/balances/{index}")).send().await?;
            print_response(res).await?;
        }
        Command::Demo {
            out,
            difficulty,
            batch_size,
        } => {
            run_demo(&out, ChainConfig::new(difficulty, batch_size))?;
        }
        Command::Check { path, difficulty } => {
            if !run_check(&path, difficulty)? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_writes_a_snapshot_that_checks_clean() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("demo.json");
        run_demo(&out, ChainConfig::new(1, 3)).unwrap();
        assert!(out.exists());
        assert!(run_check(&out, 1).unwrap());
    }

    #[test]
    fn check_fails_on_an_edited_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("demo.json");
        run_demo(&out, ChainConfig::new(1, 1)).unwrap();

        let snapshot = JsonSnapshot::new(&out);
        let mut records = snapshot.read_records().unwrap();
        records[1].transactions[0].amount = 1;
        std::fs::write(&out, serde_json::to_string(&records).unwrap()).unwrap();

        assert!(!run_check(&out, 1).unwrap());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::parse_from(["ledger-cli", "block", "3"]);
        assert!(matches!(cli.cmd, Command::Block { index: 3 }));
        assert_eq!(cli.node, "http://127.0.0.1:8080");

        let cli = Cli::parse_from([
            "ledger-cli",
            "--node",
            "http://node:9000",
            "submit",
            "--from",
            "a",
            "--to",
            "b",
            "--amount",
            "5",
        ]);
        assert_eq!(cli.node, "http://node:9000");
        assert!(matches!(cli.cmd, Command::Submit { amount: 5, .. }));
    }
}
