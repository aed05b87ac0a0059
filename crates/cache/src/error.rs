//! Error types for the batch cache.

use ordpool_types::BatchError;
use thiserror::Error;

/// Errors surfaced by the batch cache.
///
/// None of these are recoverable by retry: every variant reports a programmer
/// error. Debug builds assert before the error is returned, so in practice
/// release builds are the only place these values travel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A maintained count or index pair disagrees with a recount.
    ///
    /// Only produced by the audits; seeing it means a mutation path skipped
    /// its bookkeeping.
    #[error("cache invariant violated: {detail}")]
    InvariantViolation {
        /// What the audit found.
        detail: String,
    },

    /// A structurally invalid batch reached the cache.
    #[error(transparent)]
    Malformed(#[from] BatchError),

    /// Two batches share a reduced hash but carry different transaction
    /// counts, so their signatures cannot be aligned positionally.
    #[error("batch length mismatch under equal reduced hash: resident {resident}, donor {donor}")]
    BatchLengthMismatch {
        /// Transaction count of the resident batch.
        resident: usize,
        /// Transaction count of the donor batch.
        donor: usize,
    },
}
