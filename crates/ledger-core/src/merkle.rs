//! Binary hash tree committing an ordered list of records to one root digest.
//!
//! The tree is rebuilt from its leaves after every append, so `n` appends cost
//! `O(n^2)` hashing overall. When a level has an odd number of nodes it is padded
//! with a fresh leaf re-hashed from the raw bytes of the *last appended record*,
//! at every level, not with a copy of that level's last node. Every root in the
//! ledger depends on this padding rule.

use crate::digest::{sha256, sha256_pair, Hash};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MerkleNode {
    Leaf {
        hash: Hash,
    },
    Internal {
        hash: Hash,
        left: Box<MerkleNode>,
        right: Box<MerkleNode>,
    },
}

impl MerkleNode {
    pub fn leaf(record: &[u8]) -> Self {
        MerkleNode::Leaf {
            hash: sha256(record),
        }
    }

    pub fn internal(left: MerkleNode, right: MerkleNode) -> Self {
        let hash = sha256_pair(left.hash(), right.hash());
        MerkleNode::Internal {
            hash,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn hash(&self) -> &Hash {
        match self {
            MerkleNode::Leaf { hash } | MerkleNode::Internal { hash, .. } => hash,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MerkleNode::Leaf { .. })
    }

    pub fn children(&self) -> Option<(&MerkleNode, &MerkleNode)> {
        match self {
            MerkleNode::Leaf { .. } => None,
            MerkleNode::Internal { left, right, .. } => Some((left, right)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MerkleTree {
    leaves: Vec<MerkleNode>,
    // Raw bytes of the most recent record; source of the odd-level padding leaf.
    last_record: Vec<u8>,
    root: Option<MerkleNode>,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree over `records` with a single reduction. The root equals the
    /// root obtained by appending the same records one at a time.
    pub fn from_records<I, R>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]>,
    {
        let mut tree = Self::new();
        for record in records {
            tree.push_leaf(record.as_ref());
        }
        tree.reduce();
        tree
    }

    pub fn append(&mut self, record: impl AsRef<[u8]>) {
        self.push_leaf(record.as_ref());
        self.reduce();
    }

    fn push_leaf(&mut self, record: &[u8]) {
        self.leaves.push(MerkleNode::leaf(record));
        self.last_record.clear();
        self.last_record.extend_from_slice(record);
    }

    /// Recomputes the root from the current leaves. Idempotent.
    pub fn reduce(&mut self) {
        if self.leaves.is_empty() {
            self.root = None;
            return;
        }

        let mut level = self.leaves.clone();
        while level.len() > 1 {
            if level.len() % 2 == 1 {
                level.push(MerkleNode::leaf(&self.last_record));
            }
            let mut next = Vec::with_capacity(level.len() / 2);
            let mut nodes = level.into_iter();
            while let (Some(left), Some(right)) = (nodes.next(), nodes.next()) {
                next.push(MerkleNode::internal(left, right));
            }
            level = next;
        }
        self.root = level.pop();
    }

    pub fn root(&self) -> Option<&MerkleNode> {
        self.root.as_ref()
    }

    pub fn root_hash(&self) -> Option<Hash> {
        self.root.as_ref().map(|node| *node.hash())
    }

    pub fn leaves(&self) -> &[MerkleNode] {
        &self.leaves
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}
