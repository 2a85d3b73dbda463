//! Client-side size limits
//!
//! The backend enforces these limits server-side; the engine checks them
//! before issuing any request so oversized work fails fast without a round
//! trip.

/// Maximum entries plus constraints in one transaction.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Maximum items in one batch-write request; larger workloads are chunked.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Maximum keys in one batch-get request; larger key sets are chunked.
pub const MAX_BATCH_GET_ITEMS: usize = 100;
