//! Batch cache for the ordpool consensus ordering service.
//!
//! The staging area between batch arrival and proposal: incomplete batches
//! aggregate signatures in a [`PendingStore`] keyed by reduced hash, complete
//! batches wait in an *available* [`BatchSet`] until a proposal claims them
//! *in-flight*, and commit/reject reports prune every store by transaction
//! hash. [`BatchCache`] composes the three stores behind two locks and
//! publishes [`BatchEvent`]s to an injected [`EventSink`].
//!
//! The cache is volatile by design: it is rebuilt from upstream sources on
//! restart, and it takes no position on which batches enter a proposal.

mod batch_set;
mod cache;
mod config;
mod error;
mod event;
mod pending;

pub use batch_set::{BatchKey, BatchSet};
pub use cache::BatchCache;
pub use config::{CacheConfig, DEFAULT_PENDING_CAPACITY, DEFAULT_SLOT_CAPACITY};
pub use error::CacheError;
pub use event::{BatchEvent, EventSink, NullSink, RecordingSink};
pub use pending::{PendingStore, UpsertOutcome};
