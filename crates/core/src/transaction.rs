//! Transactions, their signed form, and the block-inclusion wrapper.

use crate::account_id::AccountId;
use crate::hash::{keccak256, Hash};
use crate::signature::{self, PrivateKey, SignatureError, SignatureValues};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("invalid {field} account id: {id}")]
    InvalidAccount { field: &'static str, id: AccountId },

    #[error("invalid chain id: expected {expected}, got {got}")]
    ChainMismatch { expected: u16, got: u16 },

    #[error("cannot transfer to yourself")]
    SelfTransfer,

    #[error("invalid signature: {0}")]
    InvalidSignature(#[source] SignatureError),

    #[error("signature address {recovered} does not match sender {expected}")]
    SignerMismatch {
        expected: AccountId,
        recovered: AccountId,
    },

    #[error("signing failed: {0}")]
    Signing(#[source] SignatureError),

    #[error("signer recovery failed: {0}")]
    Recovery(#[source] SignatureError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TransactionError>;

/// A transfer of value between two accounts.
///
/// The field order is the canonical serialization order used for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Chain the transaction is meant for.
    pub chain_id: u16,
    /// Sender's sequence number.
    pub nonce: u64,
    /// Sender's account.
    pub from_id: AccountId,
    /// Recipient's account.
    pub to_id: AccountId,
    /// Amount to transfer.
    pub value: u64,
    /// Tip paid to the block producer.
    pub tip: u64,
    /// Opaque payload.
    #[serde(with = "data_serde")]
    pub data: Vec<u8>,
}

mod data_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}

impl Transaction {
    /// Create a new transaction, rejecting malformed account ids.
    pub fn new(
        chain_id: u16,
        nonce: u64,
        from_id: AccountId,
        to_id: AccountId,
        value: u64,
        tip: u64,
        data: Vec<u8>,
    ) -> Result<Self> {
        check_accounts(&from_id, &to_id)?;
        Ok(Self {
            chain_id,
            nonce,
            from_id,
            to_id,
            value,
            tip,
            data,
        })
    }

    /// Sign the transaction with the given private key.
    pub fn sign(self, key: &PrivateKey) -> Result<SignedTransaction> {
        let signature = signature::sign(&self, key).map_err(TransactionError::Signing)?;
        Ok(SignedTransaction {
            tx: self,
            signature,
        })
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.from_id, self.nonce)
    }
}

fn check_accounts(from_id: &AccountId, to_id: &AccountId) -> Result<()> {
    if !from_id.is_valid() {
        return Err(TransactionError::InvalidAccount {
            field: "from",
            id: from_id.clone(),
        });
    }
    if !to_id.is_valid() {
        return Err(TransactionError::InvalidAccount {
            field: "to",
            id: to_id.clone(),
        });
    }
    Ok(())
}

/// A transaction together with the `(v, r, s)` signature of its sender.
///
/// The signature is only checked by [`SignedTransaction::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub signature: SignatureValues,
}

impl SignedTransaction {
    /// Check the transaction against `chain_id` and its own signature.
    ///
    /// Checks run in order and stop at the first failure: chain id, account
    /// ids, self transfer, signature shape, then the recovered signer.
    pub fn validate(&self, chain_id: u16) -> Result<()> {
        if self.tx.chain_id != chain_id {
            return Err(TransactionError::ChainMismatch {
                expected: chain_id,
                got: self.tx.chain_id,
            });
        }

        check_accounts(&self.tx.from_id, &self.tx.to_id)?;

        if self.tx.from_id == self.tx.to_id {
            return Err(TransactionError::SelfTransfer);
        }

        signature::verify_signature(&self.signature).map_err(TransactionError::InvalidSignature)?;

        let recovered = signature::recover_address(&self.tx, &self.signature)
            .map_err(TransactionError::Recovery)?;
        if recovered != self.tx.from_id {
            return Err(TransactionError::SignerMismatch {
                expected: self.tx.from_id.clone(),
                recovered,
            });
        }

        Ok(())
    }

    /// The hex display form of the signature.
    pub fn signature_string(&self) -> String {
        signature::signature_string(&self.signature)
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    pub fn from_id(&self) -> &AccountId {
        &self.tx.from_id
    }

    pub fn to_id(&self) -> &AccountId {
        &self.tx.to_id
    }
}

impl fmt::Display for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tx.fmt(f)
    }
}

/// A signed transaction as recorded in a block.
///
/// Equality only looks at the nonce and the signature bytes, so the same
/// signed transfer compares equal whatever its timestamp or gas fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTransaction {
    pub signed: SignedTransaction,
    /// Unix seconds when the record was created.
    pub timestamp: u64,
    pub gas_price: u64,
    pub gas_unit: u64,
}

impl BlockTransaction {
    /// Wrap a signed transaction, stamped with the current time.
    pub fn new(signed: SignedTransaction, gas_price: u64, gas_unit: u64) -> Self {
        let timestamp = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        Self::with_timestamp(signed, timestamp, gas_price, gas_unit)
    }

    pub fn with_timestamp(
        signed: SignedTransaction,
        timestamp: u64,
        gas_price: u64,
        gas_unit: u64,
    ) -> Self {
        Self {
            signed,
            timestamp,
            gas_price,
            gas_unit,
        }
    }

    /// Keccak-256 of the canonical encoding of the signed transaction.
    pub fn hash(&self) -> Result<Hash> {
        let encoded = serde_json::to_vec(&self.signed)?;
        Ok(keccak256(&encoded))
    }

    /// Gas fee owed for this record.
    pub fn fee(&self) -> u64 {
        self.gas_price.saturating_mul(self.gas_unit)
    }

    pub fn nonce(&self) -> u64 {
        self.signed.nonce()
    }

    pub fn tx(&self) -> &Transaction {
        &self.signed.tx
    }
}

impl PartialEq for BlockTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.nonce() == other.nonce()
            && self.signed.signature.to_bytes() == other.signed.signature.to_bytes()
    }
}

impl Eq for BlockTransaction {}

#[cfg(test)]
mod tests {
    use super::*;

    const FROM: &str = "0xF01813E4B85e178A83e29B8E7bF26BD830a25f32";
    const TO: &str = "0xdd6B972ffcc631a62CAE1BB9d80b7ff429c8ebA4";

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    fn signed_by(key: &PrivateKey, nonce: u64) -> SignedTransaction {
        Transaction::new(1, nonce, key.address(), id(TO), 10_000, 0, Vec::new())
            .unwrap()
            .sign(key)
            .unwrap()
    }

    #[test]
    fn test_new_transaction() {
        let tx = Transaction::new(1, 1, id(FROM), id(TO), 10_000, 0, Vec::new()).unwrap();
        assert_eq!(tx.value, 10_000);
        assert_eq!(tx.to_string(), format!("{}:1", FROM));
    }

    #[test]
    fn test_new_rejects_malformed_ids() {
        let bad = AccountId::new_unchecked("rb");
        let err = Transaction::new(1, 1, bad.clone(), id(TO), 1, 0, vec![]).unwrap_err();
        assert!(matches!(err, TransactionError::InvalidAccount { field: "from", .. }));

        let err = Transaction::new(1, 1, id(FROM), bad, 1, 0, vec![]).unwrap_err();
        assert!(matches!(err, TransactionError::InvalidAccount { field: "to", .. }));
    }

    #[test]
    fn test_sign_and_validate() {
        let key = PrivateKey::generate();
        let signed = signed_by(&key, 1);
        assert!(signed.validate(1).is_ok());
    }

    #[test]
    fn test_chain_mismatch() {
        let key = PrivateKey::generate();
        let signed = signed_by(&key, 1);
        assert!(matches!(
            signed.validate(2),
            Err(TransactionError::ChainMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_self_transfer_rejected() {
        let key = PrivateKey::generate();
        let signed = Transaction::new(1, 1, key.address(), key.address(), 5, 0, vec![])
            .unwrap()
            .sign(&key)
            .unwrap();
        assert!(matches!(signed.validate(1), Err(TransactionError::SelfTransfer)));
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let key = PrivateKey::generate();
        let other = PrivateKey::generate();
        let signed = Transaction::new(1, 1, key.address(), id(TO), 5, 0, vec![])
            .unwrap()
            .sign(&other)
            .unwrap();
        assert!(matches!(
            signed.validate(1),
            Err(TransactionError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_recovery_id_rejected() {
        let key = PrivateKey::generate();
        let mut signed = signed_by(&key, 1);
        signed.signature.v = 1;
        assert!(matches!(
            signed.validate(1),
            Err(TransactionError::InvalidSignature(SignatureError::InvalidRecoveryId(1)))
        ));
    }

    #[test]
    fn test_malformed_id_from_wire_rejected() {
        let key = PrivateKey::generate();
        let mut signed = signed_by(&key, 1);
        signed.tx.to_id = AccountId::new_unchecked("0x1234");
        assert!(matches!(
            signed.validate(1),
            Err(TransactionError::InvalidAccount { field: "to", .. })
        ));
    }

    #[test]
    fn test_sender_case_does_not_matter() {
        let key = PrivateKey::generate();
        let lower = AccountId::new(key.address().normalized()).unwrap();
        let signed = Transaction::new(1, 3, lower, id(TO), 5, 0, vec![])
            .unwrap()
            .sign(&key)
            .unwrap();
        assert!(signed.validate(1).is_ok());
    }

    #[test]
    fn test_signed_json_roundtrip_still_validates() {
        let key = PrivateKey::generate();
        let mut signed = signed_by(&key, 7);
        signed.tx.data = vec![0xde, 0xad];
        let signed = signed.tx.sign(&key).unwrap();

        let json = serde_json::to_string(&signed).unwrap();
        let decoded: SignedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, signed);
        assert!(decoded.validate(1).is_ok());
    }

    #[test]
    fn test_signature_string_keeps_offset() {
        let key = PrivateKey::generate();
        let signed = signed_by(&key, 1);
        let s = signed.signature_string();
        let last = u64::from_str_radix(&s[s.len() - 2..], 16).unwrap();
        assert_eq!(last, signed.signature.v);
    }

    #[test]
    fn test_block_transaction_equality_ignores_metadata() {
        let key = PrivateKey::generate();
        let signed = signed_by(&key, 1);

        let a = BlockTransaction::with_timestamp(signed.clone(), 100, 15, 1);
        let b = BlockTransaction::with_timestamp(signed, 200, 30, 2);
        assert_eq!(a, b);
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn test_block_transaction_inequality() {
        let key = PrivateKey::generate();
        let base = BlockTransaction::new(signed_by(&key, 1), 15, 1);

        let other_nonce = BlockTransaction::new(signed_by(&key, 2), 15, 1);
        assert_ne!(base, other_nonce);

        let mut other_sig = base.clone();
        other_sig.signed.signature.s[31] ^= 1;
        assert_ne!(base, other_sig);

        let mut other_v = base.clone();
        other_v.signed.signature.v = if base.signed.signature.v == 27 { 28 } else { 27 };
        assert_ne!(base, other_v);
    }

    #[test]
    fn test_block_transaction_hash_changes_with_content() {
        let key = PrivateKey::generate();
        let a = BlockTransaction::new(signed_by(&key, 1), 15, 1);
        let b = BlockTransaction::new(signed_by(&key, 2), 15, 1);
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
        assert_eq!(a.hash().unwrap(), a.hash().unwrap());
    }

    #[test]
    fn test_block_transaction_fee() {
        let key = PrivateKey::generate();
        let btx = BlockTransaction::new(signed_by(&key, 1), 15, 3);
        assert_eq!(btx.fee(), 45);
        assert!(btx.timestamp > 0);
        assert_eq!(btx.tx().value, 10_000);
    }
}
