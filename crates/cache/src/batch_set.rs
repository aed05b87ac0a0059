//! Deduplicated batch set with a maintained transaction-count total.

use crate::CacheError;
use ordpool_types::{Hash, TransactionBatch};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Identity of a batch inside a [`BatchSet`].
///
/// Derived from content rather than the allocation, so two independently
/// constructed but logically identical batches deduplicate: the reduced hash
/// identifies the transactions, the completeness flag separates a fully
/// signed batch from a partial one with the same payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    reduced_hash: Hash,
    complete: bool,
}

impl BatchKey {
    /// Identity of `batch` at its current signature state.
    pub fn of(batch: &TransactionBatch) -> Self {
        Self {
            reduced_hash: batch.reduced_hash(),
            complete: batch.has_all_signatures(),
        }
    }

    /// The signature-ignoring identity component.
    pub fn reduced_hash(&self) -> Hash {
        self.reduced_hash
    }
}

/// Deduplicated set of batches plus a cached total of their transactions.
///
/// The total is maintained on every mutation, never recomputed on the hot
/// path; debug builds recount after each operation, mirroring the audits the
/// rest of the cache runs.
#[derive(Debug, Default)]
pub struct BatchSet {
    batches: HashMap<BatchKey, Arc<TransactionBatch>>,
    txs_count: u64,
}

impl BatchSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set with a capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            batches: HashMap::with_capacity(capacity),
            txs_count: 0,
        }
    }

    /// Add `batch` if absent. Returns whether it was inserted.
    pub fn insert(&mut self, batch: Arc<TransactionBatch>) -> bool {
        let inserted = match self.batches.entry(BatchKey::of(&batch)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                self.txs_count += batch.len() as u64;
                slot.insert(batch);
                true
            }
        };

        debug_assert_eq!(self.recount(), self.txs_count);
        inserted
    }

    /// Remove `batch` if present. Returns whether it was removed.
    pub fn remove(&mut self, batch: &TransactionBatch) -> bool {
        let removed = self.batches.remove(&BatchKey::of(batch));
        if let Some(gone) = &removed {
            self.txs_count -= gone.len() as u64;
        }

        debug_assert_eq!(self.recount(), self.txs_count);
        removed.is_some()
    }

    /// Whether a batch with this identity is in the set.
    pub fn contains(&self, batch: &TransactionBatch) -> bool {
        self.batches.contains_key(&BatchKey::of(batch))
    }

    /// Whether a fully-signed batch with this reduced hash is in the set.
    pub fn contains_complete(&self, reduced_hash: &Hash) -> bool {
        self.batches.contains_key(&BatchKey {
            reduced_hash: *reduced_hash,
            complete: true,
        })
    }

    /// Move every batch of `from` that is absent here into this set.
    ///
    /// Counts are updated on both sides. On return `from` holds only the
    /// duplicates, batches whose identity was already present here.
    pub fn merge(&mut self, from: &mut BatchSet) {
        let drained = std::mem::take(&mut from.batches);
        for (key, batch) in drained {
            match self.batches.entry(key) {
                Entry::Occupied(_) => {
                    from.batches.insert(key, batch);
                }
                Entry::Vacant(slot) => {
                    let txs = batch.len() as u64;
                    slot.insert(batch);
                    self.txs_count += txs;
                    from.txs_count -= txs;
                }
            }
        }

        debug_assert_eq!(self.recount(), self.txs_count);
        debug_assert_eq!(from.recount(), from.txs_count);
    }

    /// Remove every batch for which `predicate` holds.
    ///
    /// Returns how many batches were removed; the transaction total is
    /// decremented accordingly.
    pub fn retain_not(&mut self, mut predicate: impl FnMut(&TransactionBatch) -> bool) -> usize {
        let before = self.batches.len();
        let txs_count = &mut self.txs_count;
        self.batches.retain(|_, batch| {
            if predicate(batch) {
                *txs_count -= batch.len() as u64;
                false
            } else {
                true
            }
        });

        debug_assert_eq!(self.recount(), self.txs_count);
        before - self.batches.len()
    }

    /// Total transactions across all member batches.
    pub fn txs_count(&self) -> u64 {
        self.txs_count
    }

    /// Number of member batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Iterate over the member batches in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TransactionBatch>> {
        self.batches.values()
    }

    /// Recount-and-compare audit of the maintained transaction total.
    pub fn audit(&self) -> Result<(), CacheError> {
        let recounted = self.recount();
        if recounted != self.txs_count {
            return Err(CacheError::InvariantViolation {
                detail: format!(
                    "batch set txs_count is {} but members total {}",
                    self.txs_count, recounted
                ),
            });
        }
        Ok(())
    }

    fn recount(&self) -> u64 {
        self.batches.values().map(|batch| batch.len() as u64).sum()
    }
}
