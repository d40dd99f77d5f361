//! In-memory account ledger seeded from genesis.

use crate::genesis::Genesis;
use blkcor_core::AccountId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Ledger errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("account not found: {0}")]
    NotFound(AccountId),

    #[error("invalid genesis account: {0:?}")]
    InvalidGenesisAccount(String),

    #[error("duplicate genesis account: {0:?}")]
    DuplicateGenesisAccount(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Receives a line for every change made to the ledger.
pub type EventHandler = Box<dyn Fn(&str) + Send + Sync>;

/// An account and its balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub balance: u64,
}

impl Account {
    pub fn new(account_id: AccountId, balance: u64) -> Self {
        Self {
            account_id,
            balance,
        }
    }
}

/// The account ledger.
///
/// A single reader/writer lock guards the account map. Reads hand back
/// copies, so no lock outlives the call that took it.
pub struct Database {
    genesis: Genesis,
    accounts: RwLock<HashMap<AccountId, Account>>,
    ev: EventHandler,
}

impl Database {
    /// Build the ledger from the genesis balances.
    ///
    /// Fails without building anything if any balance is keyed by a
    /// malformed account id, or if two keys name the same account in
    /// different letter cases.
    pub fn new<F>(genesis: Genesis, ev: F) -> Result<Self>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut accounts = HashMap::with_capacity(genesis.balances.len());
        for (account_str, balance) in &genesis.balances {
            let account_id = AccountId::new(account_str.as_str())
                .map_err(|_| DatabaseError::InvalidGenesisAccount(account_str.clone()))?;
            let account = Account::new(account_id.clone(), *balance);
            if accounts.insert(account_id, account).is_some() {
                return Err(DatabaseError::DuplicateGenesisAccount(account_str.clone()));
            }
        }

        for account in accounts.values() {
            ev(&format!(
                "database: new: account[{}] balance[{}]",
                account.account_id, account.balance
            ));
        }
        debug!(
            chain_id = genesis.chain_id,
            accounts = accounts.len(),
            "ledger built from genesis"
        );

        Ok(Self {
            genesis,
            accounts: RwLock::new(accounts),
            ev: Box::new(ev),
        })
    }

    /// The genesis the ledger was built from.
    pub fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    /// Look up an account.
    pub fn query(&self, account_id: &AccountId) -> Result<Account> {
        self.accounts
            .read()
            .get(account_id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(account_id.clone()))
    }

    /// Remove an account. Removing an absent account does nothing.
    pub fn remove(&self, account_id: &AccountId) {
        let removed = self.accounts.write().remove(account_id);

        if removed.is_some() {
            (self.ev)(&format!("database: remove: account[{}]", account_id));
            debug!(account = %account_id, "account removed");
        }
    }

    /// Snapshot of every account, detached from the ledger.
    pub fn copy(&self) -> HashMap<AccountId, Account> {
        self.accounts.read().clone()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("chain_id", &self.genesis.chain_id)
            .field("accounts", &self.len())
            .finish()
    }
}
