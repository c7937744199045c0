use serde::{Deserialize, Serialize};

/// A value transfer between two account identities. Balances and identities
/// are checked by the bookkeeping layer before a transaction reaches the chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    /// Merkle leaf bytes: compact JSON with fields in declaration order.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Strings and integers always serialize; there is no error path here.
        serde_json::to_vec(self).expect("transaction serializes to JSON")
    }
}
