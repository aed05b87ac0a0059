//! Transactions as staged by the ordering service.

use crate::Hash;
use parking_lot::RwLock;

/// A single signature over a transaction payload.
///
/// Both fields are hex strings handed in by the signing layer; the cache
/// treats them as opaque. Two signatures are the same signing if they carry
/// the same public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    signed_data: String,
    public_key: String,
}

impl Signature {
    /// Create a signature from hex-encoded signed data and public key.
    pub fn new(signed_data: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            signed_data: signed_data.into(),
            public_key: public_key.into(),
        }
    }

    /// Hex-encoded signed data.
    pub fn signed_data(&self) -> &str {
        &self.signed_data
    }

    /// Hex-encoded public key of the signer.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }
}

/// A transaction as the ordering service sees it.
///
/// The payload itself is opaque; only the payload hash (the transaction's
/// unique id), its creation timestamp, the number of signatures it requires,
/// and the signatures collected so far are visible here.
///
/// Transactions are shared behind `Arc` between batches, the cache, and the
/// proposal pipeline. The signature list is the one piece of state the cache
/// mutates in place while aggregating partial signings, so it sits behind its
/// own lock.
#[derive(Debug)]
pub struct Transaction {
    payload_hash: Hash,
    created_time: u64,
    quorum: u32,
    signatures: RwLock<Vec<Signature>>,
}

impl Transaction {
    /// Create an unsigned transaction.
    ///
    /// `created_time` is a millisecond timestamp assigned upstream when the
    /// payload was built, not wall clock at intake.
    pub fn new(payload_hash: Hash, created_time: u64, quorum: u32) -> Self {
        Self::with_signatures(payload_hash, created_time, quorum, Vec::new())
    }

    /// Create a transaction carrying already-collected signatures.
    pub fn with_signatures(
        payload_hash: Hash,
        created_time: u64,
        quorum: u32,
        signatures: Vec<Signature>,
    ) -> Self {
        Self {
            payload_hash,
            created_time,
            quorum,
            signatures: RwLock::new(signatures),
        }
    }

    /// Unique id of this transaction.
    pub fn hash(&self) -> Hash {
        self.payload_hash
    }

    /// Millisecond timestamp assigned when the payload was created.
    pub fn created_time(&self) -> u64 {
        self.created_time
    }

    /// Number of signatures required for this transaction to be complete.
    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    /// Add a signature if no signature with this public key is present yet.
    ///
    /// Returns whether the signature was new. Signature order is preserved
    /// as signings arrive.
    pub fn add_signature(&self, signed_hex: &str, pubkey_hex: &str) -> bool {
        let mut signatures = self.signatures.write();
        if signatures.iter().any(|s| s.public_key() == pubkey_hex) {
            return false;
        }
        signatures.push(Signature::new(signed_hex, pubkey_hex));
        true
    }

    /// Snapshot of the collected signatures, in arrival order.
    pub fn signatures(&self) -> Vec<Signature> {
        self.signatures.read().clone()
    }

    /// Number of signatures collected so far.
    pub fn signature_count(&self) -> usize {
        self.signatures.read().len()
    }

    /// Whether enough signatures have been collected.
    pub fn has_quorum(&self) -> bool {
        self.signature_count() >= self.quorum as usize
    }
}
