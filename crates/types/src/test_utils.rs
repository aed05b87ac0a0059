//! Deterministic fixtures shared by tests across the workspace.

use crate::{Hash, Signature, Transaction, TransactionBatch};
use std::sync::Arc;

/// Hex public key for a numbered test signer.
pub fn test_pubkey(signer: u8) -> String {
    hex::encode([signer; 32])
}

/// Hex signed data for a numbered test signer.
pub fn test_signed_data(signer: u8) -> String {
    hex::encode([signer; 64])
}

/// Signature fixture for a numbered test signer.
pub fn test_signature(signer: u8) -> Signature {
    Signature::new(test_signed_data(signer), test_pubkey(signer))
}

/// Unsigned transaction with a payload hash derived from `seed`.
pub fn test_transaction(seed: u8, created_time: u64, quorum: u32) -> Arc<Transaction> {
    Arc::new(Transaction::new(
        Hash::from_bytes(&[b'T', seed]),
        created_time,
        quorum,
    ))
}

/// Sign `tx` with the numbered test signer; true if the signature was new.
pub fn sign(tx: &Transaction, signer: u8) -> bool {
    tx.add_signature(&test_signed_data(signer), &test_pubkey(signer))
}

/// Batch over the given transactions.
///
/// # Panics
///
/// Panics on an empty list; fixtures always pass at least one transaction.
pub fn test_batch(transactions: Vec<Arc<Transaction>>) -> Arc<TransactionBatch> {
    Arc::new(TransactionBatch::new(transactions).expect("test batch must be non-empty"))
}

/// Single-transaction batch that already has all required signatures.
pub fn complete_batch(seed: u8, created_time: u64) -> Arc<TransactionBatch> {
    let tx = test_transaction(seed, created_time, 1);
    sign(&tx, seed);
    test_batch(vec![tx])
}

/// Single-transaction batch requiring two signers, carrying only `signer`.
///
/// Build the same logical batch under a different signer to exercise
/// signature aggregation: both calls share `seed`, so the reduced hashes
/// match while the signature sets differ.
pub fn partial_batch(seed: u8, created_time: u64, signer: u8) -> Arc<TransactionBatch> {
    let tx = test_transaction(seed, created_time, 2);
    sign(&tx, signer);
    test_batch(vec![tx])
}
