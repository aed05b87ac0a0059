//! Metrics facade for ordpool.
//!
//! Provides a [`MetricsRecorder`] trait with domain-specific methods and
//! default no-op implementations. A global singleton recorder is accessed via
//! the free functions, which delegate to it.
//!
//! # Usage
//!
//! Callers record metrics via free functions:
//! ```ignore
//! ordpool_metrics::record_batch_prepared(tx_count);
//! ordpool_metrics::set_available_txs(count);
//! ```
//!
//! At startup, install a backend with [`set_global_recorder`]. Until one is
//! installed (tests, simulations), every call is a no-op.

use std::sync::OnceLock;

/// Domain-specific metrics recording trait.
///
/// All methods have default no-op implementations so backends only need
/// to override the metrics they care about.
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync + 'static {
    // ── Intake ───────────────────────────────────────────────────────

    /// Record a batch inserted while still missing signatures.
    fn record_batch_pending(&self, tx_count: usize) {}

    /// Record a merge that added new signatures to a pending batch.
    fn record_signature_merge(&self) {}

    /// Record a batch that became fully signed and available.
    fn record_batch_prepared(&self, tx_count: usize) {}

    // ── Proposal lifecycle ───────────────────────────────────────────

    /// Record batches claimed into a proposal.
    fn record_batches_claimed(&self, count: usize) {}

    /// Record batches pruned by a commit/reject report.
    fn record_batches_pruned(&self, count: usize) {}

    /// Record pending batches dropped by timestamp expiry.
    fn record_batches_expired(&self, count: usize) {}

    // ── Gauges ───────────────────────────────────────────────────────

    /// Set the available transaction count gauge.
    fn set_available_txs(&self, count: u64) {}

    /// Set the in-flight transaction count gauge.
    fn set_in_flight_txs(&self, count: u64) {}

    /// Set the pending batch count gauge.
    fn set_pending_batches(&self, count: usize) {}
}

// ═══════════════════════════════════════════════════════════════════════
// Global singleton
// ═══════════════════════════════════════════════════════════════════════

struct NoopRecorder;
impl MetricsRecorder for NoopRecorder {}

static RECORDER: OnceLock<Box<dyn MetricsRecorder>> = OnceLock::new();

/// Install a global metrics recorder.
///
/// Can only be called once. Subsequent calls are silently ignored.
pub fn set_global_recorder(recorder: Box<dyn MetricsRecorder>) {
    let _ = RECORDER.set(recorder);
}

/// Get the global metrics recorder.
///
/// Returns a no-op recorder if none has been installed.
#[inline]
fn recorder() -> &'static dyn MetricsRecorder {
    RECORDER.get().map(|r| r.as_ref()).unwrap_or(&NoopRecorder)
}

// ═══════════════════════════════════════════════════════════════════════
// Convenience free functions
// ═══════════════════════════════════════════════════════════════════════

/// Record a batch inserted while still missing signatures.
#[inline]
pub fn record_batch_pending(tx_count: usize) {
    recorder().record_batch_pending(tx_count);
}

/// Record a merge that added new signatures to a pending batch.
#[inline]
pub fn record_signature_merge() {
    recorder().record_signature_merge();
}

/// Record a batch that became fully signed and available.
#[inline]
pub fn record_batch_prepared(tx_count: usize) {
    recorder().record_batch_prepared(tx_count);
}

/// Record batches claimed into a proposal.
#[inline]
pub fn record_batches_claimed(count: usize) {
    recorder().record_batches_claimed(count);
}

/// Record batches pruned by a commit/reject report.
#[inline]
pub fn record_batches_pruned(count: usize) {
    recorder().record_batches_pruned(count);
}

/// Record pending batches dropped by timestamp expiry.
#[inline]
pub fn record_batches_expired(count: usize) {
    recorder().record_batches_expired(count);
}

/// Set the available transaction count gauge.
#[inline]
pub fn set_available_txs(count: u64) {
    recorder().set_available_txs(count);
}

/// Set the in-flight transaction count gauge.
#[inline]
pub fn set_in_flight_txs(count: u64) {
    recorder().set_in_flight_txs(count);
}

/// Set the pending batch count gauge.
#[inline]
pub fn set_pending_batches(count: usize) {
    recorder().set_pending_batches(count);
}
