//! Account bookkeeping layered on top of a [`Chain`]: opening accounts,
//! checking and applying transfers, and replaying blocks into balance summaries.
//! None of this participates in hashing or validation.

use crate::chain::Chain;
use crate::config::ChainConfig;
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub balance: u64,
    pub start_balance: u64,
}

/// Running balance of one account while replaying blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub current: i128,
    pub min: i128,
    pub max: i128,
}

impl BalanceSummary {
    fn opening(balance: u64) -> Self {
        let b = i128::from(balance);
        Self {
            current: b,
            min: b,
            max: b,
        }
    }
}

pub struct Ledger {
    chain: Chain,
    accounts: HashMap<String, Account>,
}

impl Ledger {
    pub fn new(config: ChainConfig) -> Result<Self> {
        Ok(Self::with_chain(Chain::new(config)?))
    }

    pub fn with_chain(chain: Chain) -> Self {
        Self {
            chain,
            accounts: HashMap::new(),
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Registers an account and returns its generated id.
    pub fn open_account(&mut self, name: impl Into<String>, balance: u64) -> String {
        let id = Uuid::new_v4().to_string();
        self.insert_account(id.clone(), name, balance);
        id
    }

    /// Registers an account under a known id, e.g. when restoring a ledger.
    pub fn insert_account(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        balance: u64,
    ) {
        let id = id.into();
        let account = Account {
            id: id.clone(),
            name: name.into(),
            balance,
            start_balance: balance,
        };
        debug!(id = %account.id, name = %account.name, balance, "account opened");
        self.accounts.insert(id, account);
    }

    pub fn account(&self, id: &str) -> Result<&Account> {
        self.accounts
            .get(id)
            .ok_or_else(|| LedgerError::UnknownAccount(id.to_string()))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Moves `amount` from `from` to `to` and submits the transfer to the chain.
    /// Returns the index of a block sealed by this submission, if any.
    ///
    /// Either both balances move and the transfer stays queued or sealed, or
    /// nothing changes. A failed seal withdraws the transfer from the queue.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<Option<usize>> {
        let sender = self.account(from)?;
        let recipient = self.account(to)?;
        if from == to {
            return Err(LedgerError::SelfTransfer(from.to_string()));
        }
        if amount > sender.balance {
            return Err(LedgerError::InsufficientFunds {
                account: from.to_string(),
                balance: sender.balance,
                amount,
            });
        }
        let credited = recipient
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                account: to.to_string(),
                balance: recipient.balance,
                amount,
            })?;

        let sealed = match self.chain.submit(Transaction::new(from, to, amount)) {
            Ok(sealed) => sealed,
            Err(err) => {
                self.chain.withdraw_last_pending();
                debug!(from, to, amount, error = %err, "transfer withdrawn");
                return Err(err);
            }
        };
        if let Some(sender) = self.accounts.get_mut(from) {
            sender.balance -= amount;
        }
        if let Some(recipient) = self.accounts.get_mut(to) {
            recipient.balance = credited;
        }
        Ok(sealed)
    }

    /// Replays blocks `0..=index` from every account's opening balance and
    /// returns per-name summaries. `min` moves on debits and `max` on credits.
    /// Transfers still pending are not included.
    pub fn balance_report(&self, index: usize) -> Result<BTreeMap<String, BalanceSummary>> {
        self.chain.block(index)?;

        let mut report = BTreeMap::new();
        for block in &self.chain.blocks()[..=index] {
            for tx in block.transactions() {
                let amount = i128::from(tx.amount);
                let sender = self.account(&tx.from)?;
                let recipient = self.account(&tx.to)?;

                report
                    .entry(recipient.name.clone())
                    .or_insert_with(|| BalanceSummary::opening(recipient.start_balance));
                let entry = report
                    .entry(sender.name.clone())
                    .or_insert_with(|| BalanceSummary::opening(sender.start_balance));
                entry.current -= amount;
                entry.min = entry.min.min(entry.current);

                if let Some(entry) = report.get_mut(&recipient.name) {
                    entry.current += amount;
                    entry.max = entry.max.max(entry.current);
                }
            }
        }
        Ok(report)
    }
}
