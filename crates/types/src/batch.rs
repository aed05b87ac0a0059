//! Transaction batches and their signature-ignoring identity.

use crate::{Hash, Transaction};
use std::sync::Arc;

/// Domain tag mixed into the reduced hash so batch identities cannot collide
/// with plain transaction hashes.
const REDUCED_HASH_TAG: &[u8] = b"BATCH_REDUCED";

/// An atomic ordered group of transactions that must be ordered together.
///
/// Batches are shared behind `Arc`; the transaction list is fixed at
/// construction and never mutated. Signature aggregation happens inside the
/// individual transactions.
///
/// Two batches with equal [`reduced_hash`](Self::reduced_hash) are the same
/// logical batch in different signature states: the reduced hash covers the
/// transactions' payload hashes in order and nothing else.
#[derive(Debug)]
pub struct TransactionBatch {
    transactions: Vec<Arc<Transaction>>,
    reduced_hash: Hash,
}

impl TransactionBatch {
    /// Build a batch over a non-empty ordered list of transactions.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::EmptyBatch`] for an empty list. An empty batch is
    /// a programmer error upstream, so debug builds assert first.
    pub fn new(transactions: Vec<Arc<Transaction>>) -> Result<Self, BatchError> {
        debug_assert!(!transactions.is_empty(), "batch must not be empty");
        if transactions.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let tx_hashes: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(tx_hashes.len() + 1);
        parts.push(REDUCED_HASH_TAG);
        parts.extend(tx_hashes.iter().map(|hash| hash.as_bytes() as &[u8]));
        let reduced_hash = Hash::from_parts(&parts);

        Ok(Self {
            transactions,
            reduced_hash,
        })
    }

    /// Identity of this batch ignoring signatures.
    pub fn reduced_hash(&self) -> Hash {
        self.reduced_hash
    }

    /// The ordered transactions of this batch.
    pub fn transactions(&self) -> &[Arc<Transaction>] {
        &self.transactions
    }

    /// Number of transactions in this batch.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Always false: empty batches cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Whether every transaction has collected its required signatures.
    pub fn has_all_signatures(&self) -> bool {
        self.transactions.iter().all(|tx| tx.has_quorum())
    }

    /// Smallest `created_time` across the batch's transactions.
    pub fn oldest_timestamp(&self) -> u64 {
        self.transactions
            .iter()
            .map(|tx| tx.created_time())
            .min()
            .unwrap_or(0)
    }

    /// Whether any transaction of this batch has its hash in `hashes`.
    pub fn contains_any_tx(&self, hashes: &std::collections::HashSet<Hash>) -> bool {
        self.transactions.iter().any(|tx| hashes.contains(&tx.hash()))
    }
}

/// Errors from constructing a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// A batch must contain at least one transaction.
    #[error("batch must contain at least one transaction")]
    EmptyBatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(seed: u8, created_time: u64, quorum: u32) -> Arc<Transaction> {
        Arc::new(Transaction::new(
            Hash::from_bytes(&[seed]),
            created_time,
            quorum,
        ))
    }

    #[test]
    fn test_empty_batch_rejected() {
        // debug_assert fires before the error path in debug builds.
        let result = std::panic::catch_unwind(|| TransactionBatch::new(vec![]));
        match result {
            Ok(built) => assert_eq!(built.unwrap_err(), BatchError::EmptyBatch),
            Err(_) => {} // debug build: assertion
        }
    }

    #[test]
    fn test_reduced_hash_ignores_signatures() {
        let a = tx(1, 10, 1);
        let b = tx(1, 10, 1);
        b.add_signature("aa01", "0b01");

        let batch_a = TransactionBatch::new(vec![a]).unwrap();
        let batch_b = TransactionBatch::new(vec![b]).unwrap();
        assert_eq!(batch_a.reduced_hash(), batch_b.reduced_hash());
    }

    #[test]
    fn test_reduced_hash_depends_on_order() {
        let forward = TransactionBatch::new(vec![tx(1, 10, 1), tx(2, 10, 1)]).unwrap();
        let reversed = TransactionBatch::new(vec![tx(2, 10, 1), tx(1, 10, 1)]).unwrap();
        assert_ne!(forward.reduced_hash(), reversed.reduced_hash());
    }

    #[test]
    fn test_has_all_signatures_requires_every_member() {
        let first = tx(1, 10, 1);
        let second = tx(2, 10, 1);
        let batch = TransactionBatch::new(vec![first.clone(), second.clone()]).unwrap();

        assert!(!batch.has_all_signatures());
        first.add_signature("aa01", "0b01");
        assert!(!batch.has_all_signatures());
        second.add_signature("aa02", "0b02");
        assert!(batch.has_all_signatures());
    }

    #[test]
    fn test_oldest_timestamp_is_minimum() {
        let batch =
            TransactionBatch::new(vec![tx(1, 42, 1), tx(2, 17, 1), tx(3, 99, 1)]).unwrap();
        assert_eq!(batch.oldest_timestamp(), 17);
    }
}
