//! The batch cache: signature aggregation plus the two-phase availability
//! lifecycle.

use crate::batch_set::BatchSet;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::event::{BatchEvent, EventSink};
use crate::pending::{PendingStore, UpsertOutcome};
use ordpool_types::{Hash, TransactionBatch};
use parking_lot::{Mutex, RwLock};
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

thread_local! {
    /// Set while this thread is inside a cache operation. Event sinks run
    /// inside the cache's critical sections, so a sink calling back into the
    /// cache on the delivering thread would deadlock on the non-reentrant
    /// locks; this flag turns that into an immediate panic.
    static IN_CACHE_CALL: Cell<bool> = const { Cell::new(false) };
}

/// RAII guard for the re-entrancy flag.
struct CallGuard;

impl CallGuard {
    fn enter(operation: &'static str) -> Self {
        IN_CACHE_CALL.with(|flag| {
            assert!(
                !flag.get(),
                "re-entrant call into BatchCache::{operation}; event subscribers \
                 must hand work off instead of calling back into the cache"
            );
            flag.set(true);
        });
        Self
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        IN_CACHE_CALL.with(|flag| flag.set(false));
    }
}

/// Fully-signed batches, split by whether a proposal has claimed them.
///
/// Guarded as one unit: `remove` moves batches between the two sets under a
/// single exclusive acquisition.
#[derive(Debug)]
struct Slots {
    available: BatchSet,
    in_flight: BatchSet,
}

/// In-memory staging area for client-submitted transaction batches.
///
/// Incomplete batches sit in a pending store and aggregate signatures by
/// reduced hash until complete; complete batches are *available* until a
/// proposal claims them (*in-flight*), and commit/reject reports prune both
/// sides by transaction hash.
///
/// # Locking
///
/// Two locks: an exclusive lock over the pending store and a readers-writer
/// lock over the available/in-flight pair, so signature merging does not
/// block readers of availability counts. Lock order is always pending before
/// available. A promotion holds both across its event emission, which keeps
/// `Prepared` ordered after any earlier `StateUpdated` for the same batch.
///
/// Events are delivered synchronously inside the critical section that
/// caused the transition. Subscribers must not call back into the cache on
/// the delivering thread; that is detected and panics.
pub struct BatchCache {
    pending: Mutex<PendingStore>,
    slots: RwLock<Slots>,
    sink: Arc<dyn EventSink>,
}

impl BatchCache {
    /// Cache with default configuration, publishing into `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_config(sink, CacheConfig::default())
    }

    /// Cache with explicit configuration.
    pub fn with_config(sink: Arc<dyn EventSink>, config: CacheConfig) -> Self {
        Self {
            pending: Mutex::new(PendingStore::with_capacity(config.pending_capacity)),
            slots: RwLock::new(Slots {
                available: BatchSet::with_capacity(config.slot_capacity),
                in_flight: BatchSet::with_capacity(config.slot_capacity),
            }),
            sink,
        }
    }

    /// Stage a batch.
    ///
    /// A fully-signed batch goes straight to the available set (unless a
    /// proposal already holds it in-flight) and fires [`BatchEvent::Prepared`]
    /// if it was new. An incomplete batch is merged into the pending store by
    /// reduced hash: [`BatchEvent::StateUpdated`] while it keeps collecting,
    /// [`BatchEvent::Prepared`] on the merge that completes it.
    ///
    /// Returns the available-transaction total after the insert.
    ///
    /// # Errors
    ///
    /// [`CacheError::BatchLengthMismatch`] when a donor disagrees with the
    /// resident batch of the same reduced hash on transaction count. Debug
    /// builds assert instead.
    pub fn insert(&self, batch: Arc<TransactionBatch>) -> Result<u64, CacheError> {
        let _guard = CallGuard::enter("insert");

        if batch.has_all_signatures() {
            return Ok(self.insert_complete(batch));
        }

        let mut pending = self.pending.lock();
        {
            // A partial copy arriving after the batch is already staged
            // complete is stale; parking it in pending would duplicate the
            // identity across stores. The pending lock is held across the
            // check and the upsert so a racing complete insert serializes.
            let slots = self.slots.read();
            if slots.available.contains_complete(&batch.reduced_hash())
                || slots.in_flight.contains_complete(&batch.reduced_hash())
            {
                trace!(
                    reduced_hash = %batch.reduced_hash(),
                    "stale partial copy of a prepared batch ignored"
                );
                return Ok(slots.available.txs_count());
            }
        }
        let outcome = pending.upsert(Arc::clone(&batch))?;
        match outcome {
            UpsertOutcome::Inserted => {
                ordpool_metrics::record_batch_pending(batch.len());
                ordpool_metrics::set_pending_batches(pending.len());
                debug!(
                    reduced_hash = %batch.reduced_hash(),
                    txs = batch.len(),
                    pending = pending.len(),
                    "incomplete batch staged"
                );
                self.sink.notify(BatchEvent::StateUpdated(batch));
            }
            UpsertOutcome::MergedNoChange => {
                trace!(reduced_hash = %batch.reduced_hash(), "merge added no signatures");
            }
            UpsertOutcome::MergedUpdated(resident) => {
                ordpool_metrics::record_signature_merge();
                debug!(
                    reduced_hash = %resident.reduced_hash(),
                    "pending batch gained signatures"
                );
                self.sink.notify(BatchEvent::StateUpdated(resident));
            }
            UpsertOutcome::MergedCompleted(resident) => {
                // Promotion: the pending lock is still held while the slot
                // lock is taken and the event fires, so a subscriber cannot
                // observe Prepared racing an earlier StateUpdated. A claimed
                // copy of the same identity may already sit in-flight, so the
                // promotion is gated exactly like the direct-complete path.
                let mut slots = self.slots.write();
                let inserted = !slots.in_flight.contains(&resident)
                    && slots.available.insert(Arc::clone(&resident));
                if inserted {
                    ordpool_metrics::record_batch_prepared(resident.len());
                    debug!(
                        reduced_hash = %resident.reduced_hash(),
                        txs = resident.len(),
                        "pending batch completed and promoted"
                    );
                    self.sink.notify(BatchEvent::Prepared(resident));
                } else {
                    trace!(
                        reduced_hash = %resident.reduced_hash(),
                        "completed batch deduplicated"
                    );
                }
                ordpool_metrics::set_pending_batches(pending.len());
                debug_assert!(Self::audit_locked(&pending, &slots).is_ok());

                let count = slots.available.txs_count();
                ordpool_metrics::set_available_txs(count);
                return Ok(count);
            }
        }
        drop(pending);

        Ok(self.slots.read().available.txs_count())
    }

    /// Direct path for a batch that arrived fully signed.
    fn insert_complete(&self, batch: Arc<TransactionBatch>) -> u64 {
        // Lock order: pending before slots, same as the promotion path.
        let mut pending = self.pending.lock();
        if pending.remove_by_hash(&batch.reduced_hash()) {
            ordpool_metrics::set_pending_batches(pending.len());
        }

        let mut slots = self.slots.write();
        let inserted =
            !slots.in_flight.contains(&batch) && slots.available.insert(Arc::clone(&batch));
        if inserted {
            ordpool_metrics::record_batch_prepared(batch.len());
            debug!(
                reduced_hash = %batch.reduced_hash(),
                txs = batch.len(),
                "complete batch staged"
            );
            self.sink.notify(BatchEvent::Prepared(batch));
        } else {
            trace!(reduced_hash = %batch.reduced_hash(), "complete batch deduplicated");
        }
        debug_assert!(Self::audit_locked(&pending, &slots).is_ok());

        let count = slots.available.txs_count();
        ordpool_metrics::set_available_txs(count);
        count
    }

    /// Resolve a proposal: prune every batch touching one of `hashes` and
    /// fold the in-flight set back into available.
    ///
    /// Called for both commit and reject reports: batches whose transactions
    /// were decided are dropped everywhere, and claimed survivors become
    /// available again. Afterwards the in-flight set is empty.
    pub fn remove(&self, hashes: &HashSet<Hash>) {
        let _guard = CallGuard::enter("remove");

        let pruned_pending = {
            let mut pending = self.pending.lock();
            let pruned = pending.prune_if_any_tx_in(hashes);
            ordpool_metrics::set_pending_batches(pending.len());
            pruned.len()
        };

        let slots = &mut *self.slots.write();
        slots.available.merge(&mut slots.in_flight);
        debug_assert!(
            slots.in_flight.is_empty(),
            "a batch was in available and in-flight at once"
        );

        let pruned_available = slots
            .available
            .retain_not(|batch| batch.contains_any_tx(hashes));
        debug_assert!(Self::audit_slots(slots).is_ok());

        ordpool_metrics::record_batches_pruned(pruned_pending + pruned_available);
        ordpool_metrics::set_available_txs(slots.available.txs_count());
        ordpool_metrics::set_in_flight_txs(0);
        debug!(
            resolved = hashes.len(),
            pruned_pending,
            pruned_available,
            "proposal resolved"
        );
    }

    /// Move batches from available to in-flight for a proposal snapshot.
    ///
    /// Idempotent: claiming an already-claimed or unknown batch is a set
    /// no-op.
    pub fn claim_for_proposal(&self, batches: &[Arc<TransactionBatch>]) {
        let _guard = CallGuard::enter("claim_for_proposal");

        let slots = &mut *self.slots.write();
        let mut claimed = 0usize;
        for batch in batches {
            slots.available.remove(batch);
            if slots.in_flight.insert(Arc::clone(batch)) {
                claimed += 1;
            }
        }
        debug_assert!(Self::audit_slots(slots).is_ok());

        ordpool_metrics::record_batches_claimed(claimed);
        ordpool_metrics::set_available_txs(slots.available.txs_count());
        ordpool_metrics::set_in_flight_txs(slots.in_flight.txs_count());
        debug!(
            claimed,
            in_flight = slots.in_flight.len(),
            "batches claimed for proposal"
        );
    }

    /// Drop pending batches whose assigned timestamp is below `cutoff`.
    ///
    /// Batches that stall short of quorum are expired in timestamp order;
    /// the removed batches are returned so the caller can decide their fate.
    pub fn expire_pending(&self, cutoff: u64) -> Vec<Arc<TransactionBatch>> {
        let _guard = CallGuard::enter("expire_pending");

        let mut pending = self.pending.lock();
        let expired = pending.prune_older_than(cutoff);
        if !expired.is_empty() {
            ordpool_metrics::record_batches_expired(expired.len());
            ordpool_metrics::set_pending_batches(pending.len());
            debug!(expired = expired.len(), cutoff, "stale pending batches expired");
        }
        expired
    }

    /// Whether the available set is empty.
    ///
    /// In-flight batches do not count: their fate belongs to the proposal
    /// holding them.
    pub fn is_empty(&self) -> bool {
        let _guard = CallGuard::enter("is_empty");
        self.slots.read().available.is_empty()
    }

    /// Total transactions across available and in-flight batches.
    pub fn txs_count(&self) -> u64 {
        let _guard = CallGuard::enter("txs_count");
        let slots = self.slots.read();
        slots.available.txs_count() + slots.in_flight.txs_count()
    }

    /// Transactions in available batches only.
    pub fn available_txs_count(&self) -> u64 {
        let _guard = CallGuard::enter("available_txs_count");
        self.slots.read().available.txs_count()
    }

    /// Run `f` against the live available set.
    ///
    /// Takes the exclusive lock because the callback may mutate the set (the
    /// ordering service drains it this way).
    pub fn for_available<R>(&self, f: impl FnOnce(&mut BatchSet) -> R) -> R {
        let _guard = CallGuard::enter("for_available");

        let mut slots = self.slots.write();
        let result = f(&mut slots.available);
        debug_assert!(Self::audit_slots(&slots).is_ok());
        ordpool_metrics::set_available_txs(slots.available.txs_count());
        result
    }

    /// Full invariant audit: maintained counts, index agreement, and
    /// pairwise disjointness of the three stores.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvariantViolation`] naming the first check that failed.
    pub fn audit(&self) -> Result<(), CacheError> {
        let _guard = CallGuard::enter("audit");

        let pending = self.pending.lock();
        let slots = self.slots.read();
        Self::audit_locked(&pending, &slots)
    }

    /// Audit of the slot pair alone: maintained counts plus
    /// available/in-flight disjointness. Runs against a held guard, so
    /// mutating paths can self-check before releasing.
    fn audit_slots(slots: &Slots) -> Result<(), CacheError> {
        slots.available.audit()?;
        slots.in_flight.audit()?;

        for batch in slots.available.iter() {
            if slots.in_flight.contains(batch) {
                return Err(CacheError::InvariantViolation {
                    detail: format!(
                        "batch {} is both available and in-flight",
                        batch.reduced_hash()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Full audit against guards the caller already holds.
    fn audit_locked(pending: &PendingStore, slots: &Slots) -> Result<(), CacheError> {
        pending.audit()?;
        Self::audit_slots(slots)?;

        for batch in slots.available.iter() {
            if pending.contains_hash(&batch.reduced_hash()) {
                return Err(CacheError::InvariantViolation {
                    detail: format!(
                        "batch {} is both available and pending",
                        batch.reduced_hash()
                    ),
                });
            }
        }
        for batch in slots.in_flight.iter() {
            if pending.contains_hash(&batch.reduced_hash()) {
                return Err(CacheError::InvariantViolation {
                    detail: format!(
                        "batch {} is both in-flight and pending",
                        batch.reduced_hash()
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RecordingSink;
    use ordpool_types::test_utils::{
        complete_batch, partial_batch, sign, test_batch, test_transaction,
    };

    fn make_cache() -> (BatchCache, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let cache = BatchCache::new(Arc::clone(&sink) as Arc<dyn EventSink>);
        (cache, sink)
    }

    fn hashes_of(batches: &[&Arc<TransactionBatch>]) -> HashSet<Hash> {
        batches
            .iter()
            .flat_map(|batch| batch.transactions().iter().map(|tx| tx.hash()))
            .collect()
    }

    #[test]
    fn test_direct_complete_insert() {
        let (cache, sink) = make_cache();
        let batch = complete_batch(1, 10);

        let count = cache.insert(Arc::clone(&batch)).unwrap();

        assert_eq!(count, 1);
        assert_eq!(cache.available_txs_count(), 1);
        let events = sink.take();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], BatchEvent::Prepared(b)
            if b.reduced_hash() == batch.reduced_hash()));
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_complete_insert_is_idempotent() {
        let (cache, sink) = make_cache();

        let first = cache.insert(complete_batch(1, 10)).unwrap();
        let second = cache.insert(complete_batch(1, 10)).unwrap();

        assert_eq!(first, second);
        // Prepared fires exactly once; the duplicate is silent.
        let prepared = sink
            .take()
            .iter()
            .filter(|e| matches!(e, BatchEvent::Prepared(_)))
            .count();
        assert_eq!(prepared, 1);
    }

    #[test]
    fn test_two_party_aggregation() {
        let (cache, sink) = make_cache();

        // First signer: batch parks in pending; nothing available.
        let first = partial_batch(1, 10, 1);
        let count = cache.insert(Arc::clone(&first)).unwrap();
        assert_eq!(count, 0);
        assert!(cache.is_empty());

        let events = sink.take();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], BatchEvent::StateUpdated(_)));

        // Second signer completes the batch.
        let count = cache.insert(partial_batch(1, 10, 2)).unwrap();
        assert_eq!(count, 1);

        let events = sink.take();
        assert_eq!(events.len(), 1);
        match &events[0] {
            BatchEvent::Prepared(batch) => {
                assert_eq!(batch.reduced_hash(), first.reduced_hash());
                assert_eq!(batch.transactions()[0].signature_count(), 2);
            }
            other => panic!("expected Prepared, got {other:?}"),
        }
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_merge_without_new_signatures_is_silent() {
        let (cache, sink) = make_cache();

        cache.insert(partial_batch(1, 10, 1)).unwrap();
        sink.take();

        cache.insert(partial_batch(1, 10, 1)).unwrap();
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_incomplete_merge_emits_state_updated() {
        let (cache, sink) = make_cache();

        // Quorum 3: two signers are not enough.
        let tx = test_transaction(4, 10, 3);
        sign(&tx, 1);
        cache.insert(test_batch(vec![tx])).unwrap();
        sink.take();

        let donor_tx = test_transaction(4, 10, 3);
        sign(&donor_tx, 2);
        let count = cache.insert(test_batch(vec![donor_tx])).unwrap();

        assert_eq!(count, 0);
        let events = sink.take();
        assert_eq!(events.len(), 1);
        match &events[0] {
            BatchEvent::StateUpdated(batch) => {
                assert_eq!(batch.transactions()[0].signature_count(), 2)
            }
            other => panic!("expected StateUpdated, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_arrival_supersedes_pending_entry() {
        let (cache, sink) = make_cache();

        let pending = partial_batch(1, 10, 1);
        cache.insert(Arc::clone(&pending)).unwrap();
        sink.take();

        // The same logical batch arrives fully signed from elsewhere.
        let tx = test_transaction(1, 10, 2);
        sign(&tx, 1);
        sign(&tx, 2);
        let complete = test_batch(vec![tx]);
        assert_eq!(complete.reduced_hash(), pending.reduced_hash());

        let count = cache.insert(complete).unwrap();

        assert_eq!(count, 1);
        assert!(matches!(sink.take().as_slice(), [BatchEvent::Prepared(_)]));
        // The pending entry is gone; the audit would catch a duplicate.
        assert!(cache.audit().is_ok());
        assert_eq!(cache.expire_pending(u64::MAX).len(), 0);
    }

    #[test]
    fn test_claim_then_reject() {
        let (cache, _sink) = make_cache();
        let first = complete_batch(1, 10);
        let second = complete_batch(2, 20);
        cache.insert(Arc::clone(&first)).unwrap();
        cache.insert(Arc::clone(&second)).unwrap();

        cache.claim_for_proposal(std::slice::from_ref(&first));
        assert_eq!(cache.available_txs_count(), 1);
        assert_eq!(cache.txs_count(), 2);

        cache.remove(&hashes_of(&[&first]));

        assert_eq!(cache.txs_count(), 1);
        assert_eq!(cache.available_txs_count(), 1);
        // The survivor is back in available untouched.
        let survivor_present = cache.for_available(|available| available.contains(&second));
        assert!(survivor_present);
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_commit_while_claimed_drops_batch_everywhere() {
        let (cache, _sink) = make_cache();
        let batch = complete_batch(1, 10);
        cache.insert(Arc::clone(&batch)).unwrap();

        cache.claim_for_proposal(std::slice::from_ref(&batch));
        cache.remove(&hashes_of(&[&batch]));

        assert!(cache.is_empty());
        assert_eq!(cache.txs_count(), 0);
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_stale_partial_copy_of_prepared_batch_is_ignored() {
        let (cache, sink) = make_cache();
        cache.insert(complete_batch(1, 10)).unwrap();
        sink.take();

        // A late partial signing of the already-prepared batch arrives.
        let count = cache.insert(partial_batch(1, 10, 7)).unwrap();

        assert_eq!(count, 1);
        // Nothing entered pending and no event fired.
        assert!(sink.take().is_empty());
        assert_eq!(cache.expire_pending(u64::MAX).len(), 0);
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_completion_while_claimed_does_not_duplicate() {
        let (cache, sink) = make_cache();

        // A fully-signed copy of the batch is claimed by a proposal.
        let claimed = complete_batch(1, 10);
        cache.insert(Arc::clone(&claimed)).unwrap();
        cache.claim_for_proposal(std::slice::from_ref(&claimed));
        sink.take();

        // Independently signed copies of the same logical batch keep
        // arriving while it is claimed.
        cache.insert(partial_batch(1, 10, 7)).unwrap();
        let count = cache.insert(partial_batch(1, 10, 8)).unwrap();

        // The claimed copy owns the identity: nothing re-enters available
        // and no second Prepared fires.
        assert_eq!(count, 0);
        assert!(cache.is_empty());
        assert_eq!(cache.txs_count(), 1);
        let prepared = sink
            .take()
            .iter()
            .filter(|e| matches!(e, BatchEvent::Prepared(_)))
            .count();
        assert_eq!(prepared, 0);
        assert!(cache.audit().is_ok());

        // Resolving the proposal with no decided hashes returns the claimed
        // copy to available intact.
        cache.remove(&HashSet::new());
        assert_eq!(cache.available_txs_count(), 1);
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_claim_is_idempotent_and_empty_resolve_is_lossless() {
        let (cache, _sink) = make_cache();
        let batch = complete_batch(1, 10);
        cache.insert(Arc::clone(&batch)).unwrap();

        cache.claim_for_proposal(std::slice::from_ref(&batch));
        cache.claim_for_proposal(std::slice::from_ref(&batch));
        assert_eq!(cache.txs_count(), 1);
        assert!(cache.is_empty());

        cache.remove(&HashSet::new());

        assert_eq!(cache.available_txs_count(), 1);
        assert!(!cache.is_empty());
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_pending_pruned_by_transaction_hash() {
        let (cache, sink) = make_cache();
        let pending = partial_batch(1, 10, 1);
        cache.insert(Arc::clone(&pending)).unwrap();
        sink.take();

        cache.remove(&hashes_of(&[&pending]));

        assert!(cache.is_empty());
        assert_eq!(cache.txs_count(), 0);
        // No Prepared was ever emitted for the pruned batch.
        assert!(sink.take().is_empty());
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_remove_prunes_in_flight_batches() {
        let (cache, _sink) = make_cache();
        let doomed = complete_batch(1, 10);
        let survivor = complete_batch(2, 20);
        cache.insert(Arc::clone(&doomed)).unwrap();
        cache.insert(Arc::clone(&survivor)).unwrap();
        cache.claim_for_proposal(&[Arc::clone(&doomed), Arc::clone(&survivor)]);

        cache.remove(&hashes_of(&[&doomed]));

        assert_eq!(cache.available_txs_count(), 1);
        let survivor_present = cache.for_available(|available| available.contains(&survivor));
        assert!(survivor_present);
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_timestamp_collision_at_cache_level() {
        let (cache, _sink) = make_cache();

        // Two distinct incomplete batches with the same oldest timestamp.
        cache.insert(partial_batch(1, 42, 1)).unwrap();
        cache.insert(partial_batch(2, 42, 1)).unwrap();

        // Probing assigned 42 and 43: expiring below 43 removes exactly one.
        let expired = cache.expire_pending(43);
        assert_eq!(expired.len(), 1);

        // The freed slot is reusable.
        cache.insert(partial_batch(3, 42, 1)).unwrap();
        let expired = cache.expire_pending(43);
        assert_eq!(expired.len(), 1);
        assert!(cache.audit().is_ok());
    }

    #[test]
    fn test_for_available_sees_live_set() {
        let (cache, _sink) = make_cache();
        cache.insert(complete_batch(1, 10)).unwrap();
        cache.insert(complete_batch(2, 20)).unwrap();

        let drained: Vec<Arc<TransactionBatch>> = cache.for_available(|available| {
            let all: Vec<_> = available.iter().map(Arc::clone).collect();
            for batch in &all {
                available.remove(batch);
            }
            all
        });

        assert_eq!(drained.len(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.available_txs_count(), 0);
    }

    #[test]
    #[should_panic(expected = "re-entrant call")]
    fn test_subscriber_reentry_panics() {
        struct ReentrantSink {
            cache: parking_lot::Mutex<Option<Arc<BatchCache>>>,
        }

        impl EventSink for ReentrantSink {
            fn notify(&self, _event: BatchEvent) {
                if let Some(cache) = self.cache.lock().as_ref() {
                    let _ = cache.is_empty();
                }
            }
        }

        let sink = Arc::new(ReentrantSink {
            cache: parking_lot::Mutex::new(None),
        });
        let cache = Arc::new(BatchCache::new(Arc::clone(&sink) as Arc<dyn EventSink>));
        *sink.cache.lock() = Some(Arc::clone(&cache));

        cache.insert(complete_batch(1, 10)).unwrap();
    }

    #[test]
    fn test_counts_concurrently_readable() {
        use crate::event::NullSink;
        use std::thread;

        let cache = Arc::new(BatchCache::new(Arc::new(NullSink)));
        for seed in 0..8 {
            cache.insert(complete_batch(seed, 10 + seed as u64)).unwrap();
        }

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let available = cache.available_txs_count();
                        let total = cache.txs_count();
                        assert!(available <= total);
                    }
                })
            })
            .collect();

        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for seed in 8..16 {
                    cache.insert(complete_batch(seed, 10 + seed as u64)).unwrap();
                }
            })
        };

        for handle in readers {
            handle.join().unwrap();
        }
        writer.join().unwrap();

        assert_eq!(cache.available_txs_count(), 16);
        assert!(cache.audit().is_ok());
    }
}
