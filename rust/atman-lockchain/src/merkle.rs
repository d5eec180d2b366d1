// rust/atman-lockchain/src/merkle.rs
// Merkle batch anchor over consecutive receipt windows, with
// inclusion proofs. Anchors are auxiliary: linear chain verification
// never requires them.

use crate::receipt::Receipt;
use crate::LockchainResult;
use blake3::Hasher;

/// Merkle tree over the canonical hashes of a receipt batch.
/// Built bottom-up; an odd node at any level is paired with itself.
#[derive(Debug)]
pub struct BatchAnchor {
    leaves: Vec<[u8; 32]>,
    root: [u8; 32],
}

impl BatchAnchor {
    /// Anchor a batch of receipts in chain order
    pub fn from_receipts(receipts: &[Receipt]) -> LockchainResult<Self> {
        let mut leaves = Vec::with_capacity(receipts.len());
        for receipt in receipts {
            let mut hasher = Hasher::new();
            hasher.update(receipt.canonical_json()?.as_bytes());
            leaves.push(*hasher.finalize().as_bytes());
        }
        let root = compute_root(&leaves);
        Ok(Self { leaves, root })
    }

    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    pub fn root_hex(&self) -> String {
        hex::encode(self.root)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Inclusion proof for the receipt at `leaf_index`: the sibling
    /// hashes along the path to the root
    pub fn prove(&self, leaf_index: usize) -> Option<AnchorProof> {
        if leaf_index >= self.leaves.len() {
            return None;
        }

        let mut proof_hashes = Vec::new();
        let mut current_index = leaf_index;
        let mut current_level = self.leaves.clone();

        while current_level.len() > 1 {
            let sibling_index = if current_index % 2 == 0 {
                current_index + 1
            } else {
                current_index - 1
            };
            let sibling = if sibling_index < current_level.len() {
                current_level[sibling_index]
            } else {
                current_level[current_index]
            };
            proof_hashes.push(sibling);

            current_level = parent_level(&current_level);
            current_index /= 2;
        }

        Some(AnchorProof {
            leaf_index,
            leaf_hash: self.leaves[leaf_index],
            proof_hashes,
            root: self.root,
        })
    }
}

/// Inclusion proof: reconstructs the root from one leaf and its
/// sibling path
#[derive(Debug, Clone)]
pub struct AnchorProof {
    pub leaf_index: usize,
    pub leaf_hash: [u8; 32],
    pub proof_hashes: Vec<[u8; 32]>,
    pub root: [u8; 32],
}

impl AnchorProof {
    pub fn verify(&self) -> bool {
        let mut current_hash = self.leaf_hash;
        let mut current_index = self.leaf_index;

        for sibling in &self.proof_hashes {
            let mut hasher = Hasher::new();
            if current_index % 2 == 0 {
                hasher.update(&current_hash);
                hasher.update(sibling);
            } else {
                hasher.update(sibling);
                hasher.update(&current_hash);
            }
            current_hash = *hasher.finalize().as_bytes();
            current_index /= 2;
        }

        current_hash == self.root
    }
}

fn compute_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut current_level = leaves.to_vec();
    while current_level.len() > 1 {
        current_level = parent_level(&current_level);
    }
    current_level[0]
}

fn parent_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    for pair in level.chunks(2) {
        let mut hasher = Hasher::new();
        hasher.update(&pair[0]);
        hasher.update(if pair.len() > 1 { &pair[1] } else { &pair[0] });
        next.push(*hasher.finalize().as_bytes());
    }
    next
}
