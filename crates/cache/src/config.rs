//! Cache configuration.

use serde::Deserialize;

/// Default capacity hint for the pending store's hash index.
pub const DEFAULT_PENDING_CAPACITY: usize = 1024;

/// Default capacity hint for each of the available and in-flight sets.
///
/// Sized for a few proposals' worth of batches; the sets grow past the hint
/// without complaint.
pub const DEFAULT_SLOT_CAPACITY: usize = 256;

/// Batch cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Capacity hint for the pending store's hash index.
    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,

    /// Capacity hint for each of the available and in-flight sets.
    #[serde(default = "default_slot_capacity")]
    pub slot_capacity: usize,
}

fn default_pending_capacity() -> usize {
    DEFAULT_PENDING_CAPACITY
}

fn default_slot_capacity() -> usize {
    DEFAULT_SLOT_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pending_capacity: DEFAULT_PENDING_CAPACITY,
            slot_capacity: DEFAULT_SLOT_CAPACITY,
        }
    }
}
