//! Partially-signed batches indexed by reduced hash and by oldest timestamp.

use crate::CacheError;
use ordpool_types::{Hash, TransactionBatch};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// A partially-signed batch awaiting its remaining signatures.
#[derive(Debug, Clone)]
struct PendingEntry {
    batch: Arc<TransactionBatch>,
    /// Timestamp this entry is filed under in the time index. Assigned once
    /// at insertion and stable across further merges.
    timestamp: u64,
}

/// Outcome of [`PendingStore::upsert`].
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    /// First sighting of this reduced hash; a new entry was created.
    Inserted,

    /// The donor carried no signature the resident batch lacked.
    MergedNoChange,

    /// New signatures landed but the resident batch is still incomplete.
    /// Carries the resident batch, the object that accumulated them.
    MergedUpdated(Arc<TransactionBatch>),

    /// New signatures completed the resident batch; it has been removed from
    /// both indices and is handed back for promotion.
    MergedCompleted(Arc<TransactionBatch>),
}

/// The two-index store for batches still collecting signatures.
///
/// `by_hash` owns the entries; `by_time` orders the same entries by their
/// assigned timestamp. Both indices are private and every mutation goes
/// through this type, so they cannot drift apart. Timestamps are unique
/// across the store (an insertion whose oldest transaction timestamp is
/// taken probes upward until a free slot is found), which keeps `by_time` a
/// total order and makes the oldest entry the first key.
#[derive(Debug, Default)]
pub struct PendingStore {
    by_hash: HashMap<Hash, PendingEntry>,
    by_time: BTreeMap<u64, Hash>,
}

impl PendingStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with a capacity hint for the hash index.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_hash: HashMap::with_capacity(capacity),
            by_time: BTreeMap::new(),
        }
    }

    /// Insert a new batch or merge its signatures into the resident entry
    /// with the same reduced hash.
    ///
    /// # Errors
    ///
    /// [`CacheError::BatchLengthMismatch`] if a donor and resident share a
    /// reduced hash but disagree on transaction count. That cannot happen for
    /// well-formed batches (the reduced hash covers the transaction list) and
    /// debug builds assert first.
    pub fn upsert(&mut self, batch: Arc<TransactionBatch>) -> Result<UpsertOutcome, CacheError> {
        let reduced_hash = batch.reduced_hash();

        let Some(entry) = self.by_hash.get(&reduced_hash) else {
            let timestamp = self.free_timestamp_from(batch.oldest_timestamp());
            self.by_time.insert(timestamp, reduced_hash);
            trace!(%reduced_hash, timestamp, "pending batch inserted");
            self.by_hash
                .insert(reduced_hash, PendingEntry { batch, timestamp });

            debug_assert!(self.audit().is_ok());
            return Ok(UpsertOutcome::Inserted);
        };

        let resident = Arc::clone(&entry.batch);
        let new_signatures = merge_signatures(&resident, &batch)?;
        if new_signatures == 0 {
            return Ok(UpsertOutcome::MergedNoChange);
        }

        if resident.has_all_signatures() {
            if let Some(entry) = self.by_hash.remove(&reduced_hash) {
                self.by_time.remove(&entry.timestamp);
            }
            trace!(%reduced_hash, new_signatures, "pending batch completed");

            debug_assert!(self.audit().is_ok());
            Ok(UpsertOutcome::MergedCompleted(resident))
        } else {
            trace!(%reduced_hash, new_signatures, "pending batch updated");
            Ok(UpsertOutcome::MergedUpdated(resident))
        }
    }

    /// Remove the entry with this reduced hash, if any.
    pub fn remove_by_hash(&mut self, reduced_hash: &Hash) -> bool {
        match self.by_hash.remove(reduced_hash) {
            Some(entry) => {
                self.by_time.remove(&entry.timestamp);
                debug_assert!(self.audit().is_ok());
                true
            }
            None => false,
        }
    }

    /// Remove every entry whose batch contains a transaction with its hash in
    /// `hashes`; returns the removed batches.
    pub fn prune_if_any_tx_in(&mut self, hashes: &HashSet<Hash>) -> Vec<Arc<TransactionBatch>> {
        let doomed: Vec<Hash> = self
            .by_hash
            .iter()
            .filter(|(_, entry)| entry.batch.contains_any_tx(hashes))
            .map(|(reduced_hash, _)| *reduced_hash)
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for reduced_hash in doomed {
            if let Some(entry) = self.by_hash.remove(&reduced_hash) {
                self.by_time.remove(&entry.timestamp);
                removed.push(entry.batch);
            }
        }

        debug_assert!(self.audit().is_ok());
        removed
    }

    /// Remove every entry filed under a timestamp strictly below `cutoff`;
    /// returns the removed batches, oldest first.
    pub fn prune_older_than(&mut self, cutoff: u64) -> Vec<Arc<TransactionBatch>> {
        let keep = self.by_time.split_off(&cutoff);
        let expired = std::mem::replace(&mut self.by_time, keep);

        let mut removed = Vec::with_capacity(expired.len());
        for reduced_hash in expired.into_values() {
            if let Some(entry) = self.by_hash.remove(&reduced_hash) {
                removed.push(entry.batch);
            }
        }

        debug_assert!(self.audit().is_ok());
        removed
    }

    /// Timestamp of the oldest entry, if the store is non-empty.
    pub fn oldest_timestamp(&self) -> Option<u64> {
        self.by_time.keys().next().copied()
    }

    /// Assigned timestamp of the entry with this reduced hash.
    pub fn timestamp_of(&self, reduced_hash: &Hash) -> Option<u64> {
        self.by_hash.get(reduced_hash).map(|entry| entry.timestamp)
    }

    /// Whether an entry with this reduced hash is present.
    pub fn contains_hash(&self, reduced_hash: &Hash) -> bool {
        self.by_hash.contains_key(reduced_hash)
    }

    /// Number of pending batches.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Check that the two indices agree in size and pairwise timestamps.
    pub fn audit(&self) -> Result<(), CacheError> {
        if self.by_hash.len() != self.by_time.len() {
            return Err(CacheError::InvariantViolation {
                detail: format!(
                    "pending indices diverged: {} by hash, {} by time",
                    self.by_hash.len(),
                    self.by_time.len()
                ),
            });
        }

        for (timestamp, reduced_hash) in &self.by_time {
            match self.by_hash.get(reduced_hash) {
                Some(entry) if entry.timestamp == *timestamp => {}
                Some(entry) => {
                    return Err(CacheError::InvariantViolation {
                        detail: format!(
                            "entry {reduced_hash} filed under {timestamp} but records {}",
                            entry.timestamp
                        ),
                    });
                }
                None => {
                    return Err(CacheError::InvariantViolation {
                        detail: format!("time index references unknown entry {reduced_hash}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Smallest timestamp `>= from` not yet used by the time index.
    fn free_timestamp_from(&self, from: u64) -> u64 {
        let mut timestamp = from;
        while self.by_time.contains_key(&timestamp) {
            timestamp += 1;
        }
        timestamp
    }
}

/// Merge signatures from `donor` into `target` pairwise.
///
/// Transactions are positionally aligned: batches sharing a reduced hash
/// carry the same transactions in the same order. Returns how many donor
/// signatures were new to their paired transaction.
fn merge_signatures(
    target: &TransactionBatch,
    donor: &TransactionBatch,
) -> Result<usize, CacheError> {
    debug_assert_eq!(
        target.len(),
        donor.len(),
        "batches sharing a reduced hash must have equal length"
    );
    if target.len() != donor.len() {
        return Err(CacheError::BatchLengthMismatch {
            resident: target.len(),
            donor: donor.len(),
        });
    }

    let mut inserted = 0usize;
    for (target_tx, donor_tx) in target.transactions().iter().zip(donor.transactions()) {
        for signature in donor_tx.signatures() {
            if target_tx.add_signature(signature.signed_data(), signature.public_key()) {
                inserted += 1;
            }
        }
    }
    Ok(inserted)
}
