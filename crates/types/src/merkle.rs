//! Merkle commitment over a batch of event hashes.
//!
//! The processor commits each batch with the root of a balanced binary
//! Merkle tree over the events' SHA3-256 hashes, in arrival order. Auditors
//! re-derive the root offline from an inclusion proof and one leaf.
//!
//! # Construction
//!
//! - parents are `SHA-256(left_bytes || right_bytes)` over the raw 32-byte
//!   children
//! - a level with an odd node count duplicates its last node; this applies
//!   at every level independently, not only at the leaves
//! - an empty batch has the deterministic root `SHA-256("")` and no proofs
//! - a single leaf is its own root

use crate::{FactoId, Hash};
use serde::{Deserialize, Serialize};

/// Which side of the current node a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiblingPosition {
    /// Sibling is the left child; fold as `SHA-256(sibling || current)`.
    Left,
    /// Sibling is the right child; fold as `SHA-256(current || sibling)`.
    Right,
}

/// One step of an inclusion proof: a sibling hash and its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// The sibling node's hash.
    pub hash: Hash,
    /// The sibling's side relative to the node being proven.
    pub position: SiblingPosition,
}

/// A balanced binary Merkle tree with all levels retained for proof export.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// levels[0] are the leaves as fed in; the last level, when present,
    /// holds exactly the root.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a tree over an ordered list of leaf hashes.
    pub fn build(leaves: &[Hash]) -> Self {
        if leaves.is_empty() {
            return Self { levels: Vec::new() };
        }

        let mut levels = vec![leaves.to_vec()];
        while levels.last().map(Vec::len).unwrap_or(0) > 1 {
            let current = levels.last().cloned().unwrap_or_default();
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                let left = pair[0];
                // Odd level: the last node pairs with a duplicate of itself.
                let right = pair.get(1).copied().unwrap_or(left);
                next.push(Hash::sha256_pair(&left, &right));
            }
            levels.push(next);
        }

        Self { levels }
    }

    /// The committed root. For an empty batch this is `SHA-256("")`.
    pub fn root(&self) -> Hash {
        match self.levels.last().and_then(|level| level.first()) {
            Some(root) => *root,
            None => Hash::sha256(&[]),
        }
    }

    /// Number of leaves fed into the build.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    /// Inclusion proof for the leaf at `index`, or `None` if out of range.
    ///
    /// A single-leaf tree yields an empty proof: the leaf is the root.
    pub fn proof(&self, index: usize) -> Option<Vec<ProofStep>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut steps = Vec::new();
        let mut idx = index;
        // Walk every level below the root.
        for level in &self.levels[..self.levels.len().saturating_sub(1)] {
            let (sibling_idx, position) = if idx % 2 == 0 {
                (idx + 1, SiblingPosition::Right)
            } else {
                (idx - 1, SiblingPosition::Left)
            };
            // Past the end means this node was duplicated to fill the pair.
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            steps.push(ProofStep {
                hash: sibling,
                position,
            });
            idx /= 2;
        }

        Some(steps)
    }
}

/// Fold an inclusion proof against a leaf and compare to the expected root.
pub fn verify_proof(leaf: &Hash, steps: &[ProofStep], root: &Hash) -> bool {
    let mut current = *leaf;
    for step in steps {
        current = match step.position {
            SiblingPosition::Left => Hash::sha256_pair(&step.hash, &current),
            SiblingPosition::Right => Hash::sha256_pair(&current, &step.hash),
        };
    }
    current == *root
}

/// The per-batch commitment record persisted alongside the events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerkleRootRecord {
    /// UTC day of the batch commit, `YYYY-MM-DD`. Partition key.
    pub date: String,

    /// Commit instant, nanoseconds since epoch.
    pub bucket_time: i64,

    /// Hex SHA-256 root.
    pub root_hash: Hash,

    /// Number of events committed.
    pub event_count: i32,

    /// First event in batch arrival order.
    pub first_facto_id: FactoId,

    /// Last event in batch arrival order.
    pub last_facto_id: FactoId,

    /// Ordered leaves exactly as fed into the build.
    pub event_hashes: Vec<String>,
}
