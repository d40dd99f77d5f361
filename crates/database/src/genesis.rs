//! Genesis configuration loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default location of the genesis file.
pub const DEFAULT_PATH: &str = "zblock/genesis.json";

/// Errors that can occur while loading a genesis file.
#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("failed to read genesis file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse genesis: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Chain parameters and the starting balances of every account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub date: DateTime<Utc>,
    pub chain_id: u16,
    pub trans_per_block: u16,
    pub difficulty: u16,
    pub mining_reward: u64,
    pub gas_price: u64,
    /// Hex account id to starting balance. Keys are validated by the ledger.
    pub balances: BTreeMap<String, u64>,
}

impl Genesis {
    /// Read and parse a genesis file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GenesisError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a genesis document.
    pub fn from_json(content: &str) -> Result<Self, GenesisError> {
        Ok(serde_json::from_str(content)?)
    }
}
