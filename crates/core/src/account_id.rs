//! Hex-encoded account identifiers.

use crate::hash::keccak256;
use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash as StdHash, Hasher};
use thiserror::Error;

/// Number of bytes in an account address.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced when building an [`AccountId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountIdError {
    #[error("malformed account id: {0:?}")]
    Malformed(String),
}

/// Returns true when `s` is a hex-encoded 20-byte address, with or without
/// a `0x`/`0X` prefix.
pub fn is_account_id(s: &str) -> bool {
    let s = strip_prefix(s);
    s.len() == 2 * ADDRESS_LENGTH && s.len() % 2 == 0 && s.bytes().all(|c| c.is_ascii_hexdigit())
}

fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// An account identifier.
///
/// The raw string is kept as given. Deserialized values are not validated;
/// use [`AccountId::is_valid`] before trusting one that came off the wire.
/// Two ids are equal when they name the same address, regardless of prefix
/// or letter case.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Build a validated account id.
    pub fn new(s: impl Into<String>) -> Result<Self, AccountIdError> {
        let s = s.into();
        if !is_account_id(&s) {
            return Err(AccountIdError::Malformed(s));
        }
        Ok(Self(s))
    }

    /// Wrap a string without validating it.
    pub fn new_unchecked(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Derive the account id of a secp256k1 public key: the last 20 bytes of
    /// the Keccak-256 hash of the uncompressed point (without its 0x04 tag).
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let digest = keccak256(&point.as_bytes()[1..]);
        let mut addr = [0u8; ADDRESS_LENGTH];
        addr.copy_from_slice(&digest.0[32 - ADDRESS_LENGTH..]);
        Self::from_bytes(addr)
    }

    /// Build an id from raw address bytes, rendered in checksum form.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(checksum(&hex::encode(bytes)))
    }

    /// Whether the underlying string is a well-formed account id.
    pub fn is_valid(&self) -> bool {
        is_account_id(&self.0)
    }

    /// The string as it was given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase hex without the prefix.
    pub fn normalized(&self) -> String {
        strip_prefix(&self.0).to_ascii_lowercase()
    }

    /// EIP-55 mixed-case checksum rendering with a `0x` prefix.
    pub fn to_checksum(&self) -> String {
        checksum(&self.normalized())
    }
}

fn checksum(lower: &str) -> String {
    let digest = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(lower.len() + 2);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = digest.0[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

impl PartialEq for AccountId {
    fn eq(&self, other: &Self) -> bool {
        strip_prefix(&self.0).eq_ignore_ascii_case(strip_prefix(&other.0))
    }
}

impl Eq for AccountId {}

impl StdHash for AccountId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl std::str::FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for AccountId {
    type Error = AccountIdError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
