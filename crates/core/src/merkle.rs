//! Merkle tree over hashable block records.

use crate::hash::{keccak256_concat, Hash};
use crate::transaction::{BlockTransaction, TransactionError};
use thiserror::Error;

/// A value that can be stored as a merkle leaf.
pub trait Hashable {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The leaf hash of this value.
    fn hash(&self) -> std::result::Result<Hash, Self::Error>;

    /// Whether two values name the same leaf.
    fn equals(&self, other: &Self) -> bool;
}

impl Hashable for BlockTransaction {
    type Error = TransactionError;

    fn hash(&self) -> std::result::Result<Hash, Self::Error> {
        BlockTransaction::hash(self)
    }

    fn equals(&self, other: &Self) -> bool {
        self == other
    }
}

/// Errors from building or checking a tree.
#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("cannot build a merkle tree without values")]
    Empty,

    #[error("value not found in tree")]
    NotFound,

    #[error("merkle root mismatch: expected {expected}, computed {computed}")]
    RootMismatch { expected: Hash, computed: Hash },

    #[error("leaf hash failed: {0}")]
    Leaf(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, MerkleError>;

/// A merkle proof for a single leaf.
#[derive(Debug, Clone)]
pub struct MerkleProof {
    pub leaf: Hash,
    /// Sibling hashes from leaf to root.
    pub siblings: Vec<Hash>,
    /// Whether the running hash sits on the left of each sibling.
    pub directions: Vec<bool>,
}

/// A merkle tree that keeps the values it was built from.
#[derive(Debug, Clone)]
pub struct MerkleTree<T> {
    values: Vec<T>,
    /// Leaves first, root last.
    levels: Vec<Vec<Hash>>,
}

impl<T: Hashable> MerkleTree<T> {
    /// Build a tree. Odd levels pair their last node with itself.
    pub fn new(values: Vec<T>) -> Result<Self> {
        let leaves = leaf_hashes(&values)?;
        Ok(Self {
            levels: build_levels(leaves),
            values,
        })
    }

    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(Hash::ZERO)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a proof for the leaf equal to `value`.
    pub fn proof(&self, value: &T) -> Result<MerkleProof> {
        let index = self
            .values
            .iter()
            .position(|v| v.equals(value))
            .ok_or(MerkleError::NotFound)?;

        let mut siblings = Vec::new();
        let mut directions = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let is_left = idx % 2 == 0;
            let sibling_idx = if is_left { idx + 1 } else { idx - 1 };
            siblings.push(*level.get(sibling_idx).unwrap_or(&level[idx]));
            directions.push(is_left);
            idx /= 2;
        }

        Ok(MerkleProof {
            leaf: self.levels[0][index],
            siblings,
            directions,
        })
    }

    /// Check the tree against a root published elsewhere, such as a block header.
    pub fn verify(&self, expected: &Hash) -> Result<()> {
        let computed = self.root();
        if computed != *expected {
            return Err(MerkleError::RootMismatch {
                expected: *expected,
                computed,
            });
        }
        Ok(())
    }
}

fn leaf_hashes<T: Hashable>(values: &[T]) -> Result<Vec<Hash>> {
    if values.is_empty() {
        return Err(MerkleError::Empty);
    }
    values
        .iter()
        .map(|v| v.hash().map_err(|e| MerkleError::Leaf(Box::new(e))))
        .collect()
}

fn build_levels(leaves: Vec<Hash>) -> Vec<Vec<Hash>> {
    let mut levels = vec![leaves];
    while let Some(current) = levels.last().filter(|level| level.len() > 1) {
        let next = current
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                keccak256_concat(&[pair[0].as_ref(), right.as_ref()])
            })
            .collect();
        levels.push(next);
    }
    levels
}

/// Verify a merkle proof against a given root.
pub fn verify_proof(root: &Hash, proof: &MerkleProof) -> bool {
    let mut current = proof.leaf;

    for (sibling, is_left) in proof.siblings.iter().zip(proof.directions.iter()) {
        current = if *is_left {
            keccak256_concat(&[current.as_ref(), sibling.as_ref()])
        } else {
            keccak256_concat(&[sibling.as_ref(), current.as_ref()])
        };
    }

    current == *root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account_id::AccountId;
    use crate::hash::keccak256;
    use crate::signature::PrivateKey;
    use crate::transaction::Transaction;

    fn block_txs(n: u64) -> Vec<BlockTransaction> {
        let key = PrivateKey::generate();
        let to = AccountId::new("0xdd6B972ffcc631a62CAE1BB9d80b7ff429c8ebA4").unwrap();
        (0..n)
            .map(|nonce| {
                let signed = Transaction::new(1, nonce, key.address(), to.clone(), 10, 1, vec![])
                    .unwrap()
                    .sign(&key)
                    .unwrap();
                BlockTransaction::new(signed, 15, 1)
            })
            .collect()
    }

    #[test]
    fn test_empty_tree_rejected() {
        let result = MerkleTree::<BlockTransaction>::new(Vec::new());
        assert!(matches!(result, Err(MerkleError::Empty)));
    }

    #[test]
    fn test_single_leaf_root() {
        let txs = block_txs(1);
        let leaf = txs[0].hash().unwrap();
        let tree = MerkleTree::new(txs).unwrap();
        assert_eq!(tree.root(), leaf);
    }

    #[test]
    fn test_two_leaf_root() {
        let txs = block_txs(2);
        let expected = keccak256_concat(&[
            txs[0].hash().unwrap().as_ref(),
            txs[1].hash().unwrap().as_ref(),
        ]);
        let tree = MerkleTree::new(txs).unwrap();
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_order_matters() {
        let txs = block_txs(4);
        let mut reversed = txs.clone();
        reversed.reverse();
        assert_ne!(
            MerkleTree::new(txs).unwrap().root(),
            MerkleTree::new(reversed).unwrap().root()
        );
    }

    #[test]
    fn test_proofs_with_odd_leaves() {
        let txs = block_txs(5);
        let tree = MerkleTree::new(txs.clone()).unwrap();
        assert!(tree.verify(&tree.root()).is_ok());

        for tx in &txs {
            let proof = tree.proof(tx).unwrap();
            assert!(verify_proof(&tree.root(), &proof));
            assert!(!verify_proof(&keccak256(b"wrong"), &proof));
        }
    }

    #[test]
    fn test_proof_for_missing_value() {
        let txs = block_txs(3);
        let tree = MerkleTree::new(txs[..2].to_vec()).unwrap();
        assert!(matches!(tree.proof(&txs[2]), Err(MerkleError::NotFound)));
    }

    #[test]
    fn test_proof_found_by_equality_not_metadata() {
        let txs = block_txs(3);
        let tree = MerkleTree::new(txs.clone()).unwrap();

        let mut restamped = txs[1].clone();
        restamped.timestamp += 60;
        restamped.gas_unit += 1;
        assert_eq!(tree.proof(&restamped).unwrap().leaf, txs[1].hash().unwrap());
    }

    #[test]
    fn test_verify_against_other_root() {
        let txs = block_txs(3);
        let tree = MerkleTree::new(txs.clone()).unwrap();
        let other = MerkleTree::new(txs[..2].to_vec()).unwrap();

        assert!(matches!(
            tree.verify(&other.root()),
            Err(MerkleError::RootMismatch { .. })
        ));
    }

    #[test]
    fn test_leaf_hash_through_trait() {
        let txs = block_txs(1);
        let leaf = <BlockTransaction as Hashable>::hash(&txs[0]).unwrap();
        assert_eq!(leaf, txs[0].hash().unwrap());
        assert!(Hashable::equals(&txs[0], &txs[0].clone()));
    }
}
