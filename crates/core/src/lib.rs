//! Signed transaction protocol for blkcor.
//!
//! This crate provides the pieces a transfer needs before it can touch the
//! ledger:
//! - Account identifiers (hex addresses, EIP-55 checksums)
//! - Keccak-256 hashing
//! - Recoverable secp256k1 signatures over domain-separated stamps
//! - Transactions, signed transactions and block transactions
//! - Merkle trees over block transactions

pub mod account_id;
pub mod hash;
pub mod merkle;
pub mod signature;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use account_id::{is_account_id, AccountId, AccountIdError};
pub use hash::{keccak256, keccak256_concat, Hash, H256};
pub use merkle::{verify_proof, Hashable, MerkleError, MerkleProof, MerkleTree};
pub use signature::{PrivateKey, SignatureError, SignatureValues, RECOVERY_ID_OFFSET};
pub use transaction::{BlockTransaction, SignedTransaction, Transaction, TransactionError};
