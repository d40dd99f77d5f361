//! Recoverable secp256k1 signatures over domain-separated message stamps.
//!
//! Every value is serialized to canonical JSON, prefixed with
//! `"\x19Blkcor Signed Message:\n<len>"` and hashed with Keccak-256 before it
//! is signed. The prefix keeps a blkcor signature from being accepted by any
//! scheme that signs raw bytes. Signatures travel as `(v, r, s)` where `v`
//! carries the recovery id plus [`RECOVERY_ID_OFFSET`].

use crate::account_id::AccountId;
use crate::hash::{keccak256_concat, Hash};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Added to the raw recovery id (0 or 1) when it is stored in `v`.
pub const RECOVERY_ID_OFFSET: u64 = 27;

/// Protocol name mixed into every stamp.
pub const STAMP_PROTOCOL: &str = "Blkcor";

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Errors that can occur while signing or checking signatures.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("signing failed: {0}")]
    SigningFailed(String),
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u64),
    #[error("invalid signature values")]
    InvalidSignature,
    #[error("public key recovery failed: {0}")]
    Recovery(String),
    #[error("invalid private key")]
    InvalidPrivateKey,
}

pub type Result<T> = std::result::Result<T, SignatureError>;

/// The `(v, r, s)` triple of a recoverable signature.
///
/// `r` and `s` are 256-bit big-endian integers kept at a fixed 32-byte width.
/// Nothing is checked on construction; see [`verify_signature`].
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureValues {
    pub v: u64,
    #[serde(with = "hex32_serde")]
    pub r: [u8; 32],
    #[serde(with = "hex32_serde")]
    pub s: [u8; 32],
}

mod hex32_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        // Shorter values are left-padded so small integers still decode.
        if s.len() > 64 {
            return Err(serde::de::Error::custom("value exceeds 32 bytes"));
        }
        let padded = format!("{:0>64}", s);
        let mut arr = [0u8; 32];
        hex::decode_to_slice(padded, &mut arr).map_err(serde::de::Error::custom)?;
        Ok(arr)
    }
}

impl SignatureValues {
    /// Split a 65-byte `r || s || recovery_id` signature, adding the offset to `v`.
    pub fn from_signature_bytes(sig: &[u8; SIGNATURE_LENGTH]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig[..32]);
        s.copy_from_slice(&sig[32..64]);
        Self {
            v: u64::from(sig[64]) + RECOVERY_ID_OFFSET,
            r,
            s,
        }
    }

    /// The raw recovery id, `v - RECOVERY_ID_OFFSET`, which must be 0 or 1.
    pub fn recovery_id(&self) -> Result<RecoveryId> {
        self.v
            .checked_sub(RECOVERY_ID_OFFSET)
            .filter(|id| *id <= 1)
            .and_then(|id| RecoveryId::from_byte(id as u8))
            .ok_or(SignatureError::InvalidRecoveryId(self.v))
    }

    /// `r || s || (v - offset)`, the layout the curve library recovers from.
    ///
    /// The last byte wraps when `v` is not a valid offset value; callers that
    /// care check [`SignatureValues::recovery_id`] first.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut sig = self.rs_bytes();
        sig[64] = self.v.wrapping_sub(RECOVERY_ID_OFFSET) as u8;
        sig
    }

    /// `r || s || v` with the offset kept, the public display layout.
    pub fn to_bytes_with_offset(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut sig = self.rs_bytes();
        sig[64] = self.v as u8;
        sig
    }

    fn rs_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut sig = [0u8; SIGNATURE_LENGTH];
        sig[..32].copy_from_slice(&self.r);
        sig[32..64].copy_from_slice(&self.s);
        sig
    }

    fn to_signature(&self) -> Option<Signature> {
        Signature::from_slice(&self.rs_bytes()[..64]).ok()
    }
}

impl fmt::Debug for SignatureValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureValues(v={}, {}...)", self.v, &hex::encode(self.r)[..16])
    }
}

impl fmt::Display for SignatureValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&signature_string(self))
    }
}

/// A secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a key from 32 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|_| SignatureError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Parse a hex-encoded key, optionally `0x`-prefixed, ignoring surrounding whitespace.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| SignatureError::InvalidPrivateKey)?;
        Self::from_bytes(&bytes)
    }

    /// Hex encoding of the key, without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The account this key signs for.
    pub fn address(&self) -> AccountId {
        AccountId::from_public_key(self.signing_key.verifying_key())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address())
            .finish()
    }
}

/// Hash `value` together with the blkcor prefix into the digest that gets signed.
pub fn stamp<T: Serialize + ?Sized>(value: &T) -> Result<Hash> {
    let data = serde_json::to_vec(value)?;
    let prefix = format!("\x19{} Signed Message:\n{}", STAMP_PROTOCOL, data.len());
    Ok(keccak256_concat(&[prefix.as_bytes(), &data]))
}

/// Sign `value` and return its `(v, r, s)` triple.
///
/// The signer's public key is recovered from the fresh signature and used to
/// verify it before anything is returned.
pub fn sign<T: Serialize + ?Sized>(value: &T, key: &PrivateKey) -> Result<SignatureValues> {
    let digest = stamp(value)?;

    let (signature, recovery_id) = key
        .signing_key
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;

    let public_key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &signature, recovery_id)
        .map_err(|_| SignatureError::SigningFailed("public key extraction failed".into()))?;
    public_key
        .verify_prehash(digest.as_bytes(), &signature)
        .map_err(|_| SignatureError::SigningFailed("invalid signature produced".into()))?;

    let mut sig = [0u8; SIGNATURE_LENGTH];
    sig[..64].copy_from_slice(&signature.to_bytes());
    sig[64] = recovery_id.to_byte();

    Ok(SignatureValues::from_signature_bytes(&sig))
}

/// Check that `(v, r, s)` is a structurally valid signature: a recovery id
/// of 0 or 1, `r` and `s` in `[1, n)`, and `s` in the lower half of the order.
pub fn verify_signature(values: &SignatureValues) -> Result<()> {
    values.recovery_id()?;

    let signature = values
        .to_signature()
        .ok_or(SignatureError::InvalidSignature)?;
    if signature.normalize_s().is_some() {
        return Err(SignatureError::InvalidSignature);
    }

    Ok(())
}

/// Recover the account that produced `values` over `value`.
pub fn recover_address<T: Serialize + ?Sized>(
    value: &T,
    values: &SignatureValues,
) -> Result<AccountId> {
    let digest = stamp(value)?;

    let recovery_id = values
        .recovery_id()
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;
    let signature = values
        .to_signature()
        .ok_or_else(|| SignatureError::Recovery("malformed r or s".into()))?;

    let public_key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &signature, recovery_id)
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;

    Ok(AccountId::from_public_key(&public_key))
}

/// `0x`-prefixed hex of `r || s || v`, with `v` kept at 27/28.
pub fn signature_string(values: &SignatureValues) -> String {
    format!("0x{}", hex::encode(values.to_bytes_with_offset()))
}
