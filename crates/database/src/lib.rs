//! Account ledger for blkcor.
//!
//! This crate owns the only shared mutable state in the system:
//! - Genesis loading (chain parameters and starting balances)
//! - The account ledger (query, remove, snapshot)
//!
//! Applying transfers to balances is left to the block producer, which is
//! expected to hold the ledger's write lock for the whole debit/credit.
//!
//! # Example
//!
//! ```rust,no_run
//! use blkcor_core::AccountId;
//! use blkcor_database::{Database, Genesis};
//!
//! let genesis = Genesis::load("zblock/genesis.json").unwrap();
//! let db = Database::new(genesis, |ev| println!("{}", ev)).unwrap();
//!
//! let id = AccountId::new("0xF01813E4B85e178A83e29B8E7bF26BD830a25f32").unwrap();
//! let account = db.query(&id).unwrap();
//! println!("balance: {}", account.balance);
//! ```

pub mod database;
pub mod genesis;

// Re-export commonly used types
pub use database::{Account, Database, DatabaseError, EventHandler, Result};
pub use genesis::{Genesis, GenesisError};
