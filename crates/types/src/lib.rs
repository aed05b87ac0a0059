//! Foundation types for the ordpool ordering service.
//!
//! This crate provides the types shared between intake, the batch cache, and
//! the proposal pipeline:
//!
//! - **Primitives**: [`Hash`] (Blake3 content hash)
//! - **Transactions**: [`Transaction`], [`Signature`]
//! - **Batches**: [`TransactionBatch`] and its signature-ignoring identity
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod batch;
mod hash;
mod transaction;

pub mod test_utils;

pub use batch::{BatchError, TransactionBatch};
pub use hash::{Hash, HexError};
pub use transaction::{Signature, Transaction};
