//! Error types for dynarow
//!
//! Two enums cover the system: [`CodecError`] for encode/decode failures
//! (never retried - they indicate a schema mismatch) and [`TableError`] for
//! everything the write protocol and the store can surface.
//!
//! Conditional and version failures are recovered locally by the retry
//! helpers up to their budget; only once the budget is exhausted, or a
//! transaction failure implicates items other than the primary, do they
//! reach the caller.

use crate::value::Item;
use thiserror::Error;

/// Encode/decode failures.
///
/// These always indicate a schema mismatch between the caller's types and
/// the stored items; retrying cannot fix them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Stored tag or text did not match the requested type
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// What the decoder asked for
        expected: &'static str,
        /// What the wire actually carried
        actual: String,
    },

    /// Type tag not present in the caller's decoder table
    #[error("unrecognized row type tag: {tag}")]
    UnrecognizedType {
        /// The tag read from the item
        tag: String,
    },

    /// Attribute kind the requested path cannot handle (bytes, sets)
    #[error("unsupported attribute kind: {kind}")]
    UnsupportedType {
        /// Tag name of the offending value
        kind: &'static str,
    },

    /// Required attribute absent from the item
    #[error("missing attribute: {name}")]
    MissingAttribute {
        /// The attribute name looked up
        name: String,
    },

    /// Payload field collides with a reserved envelope attribute
    #[error("payload attribute collides with reserved name: {name}")]
    ReservedAttribute {
        /// The colliding attribute name
        name: String,
    },
}

/// Result alias for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Per-item outcome inside a canceled transaction.
///
/// The store reports one reason per entry and constraint, in submission
/// order; items whose own check passed carry [`CancellationReason::None`].
#[derive(Debug, Clone, PartialEq)]
pub enum CancellationReason {
    /// This item's check passed; the transaction failed elsewhere
    None,

    /// Version/existence precondition failed
    ConditionalCheckFailed {
        /// Rendered `partition/sort` key of the failing item
        key: String,
        /// Last-known stored item, when the store can supply it
        item: Option<Item>,
    },

    /// An insert found the item already present
    ///
    /// Distinct from a conditional failure so callers can tell "someone
    /// already created this" from "someone already modified this".
    DuplicateItem {
        /// Rendered `partition/sort` key of the duplicate
        key: String,
    },

    /// Another in-flight transaction held this item at apply time
    TransactionConflict {
        /// Rendered `partition/sort` key of the contended item
        key: String,
    },

    /// Any other per-item failure reported by the backend
    Other {
        /// Backend reason code
        code: String,
        /// Backend message
        message: String,
    },
}

impl CancellationReason {
    /// The key this reason refers to, if it refers to one.
    pub fn key(&self) -> Option<&str> {
        match self {
            CancellationReason::ConditionalCheckFailed { key, .. } => Some(key),
            CancellationReason::DuplicateItem { key } => Some(key),
            CancellationReason::TransactionConflict { key } => Some(key),
            CancellationReason::None | CancellationReason::Other { .. } => None,
        }
    }

    /// Whether this reason represents a failed check.
    pub fn is_failure(&self) -> bool {
        !matches!(self, CancellationReason::None)
    }
}

/// Errors surfaced by tables, the write protocol, and the retry helpers.
#[derive(Debug, Error)]
pub enum TableError {
    /// Non-destructive insert found an item under the same key
    #[error("item already exists: {key}")]
    AlreadyExists {
        /// Rendered `partition/sort` key
        key: String,
    },

    /// Conditional write lost a version race
    #[error("conditional check failed for {key}")]
    ConditionalCheckFailed {
        /// Rendered `partition/sort` key
        key: String,
    },

    /// Conditional-retry budget exhausted
    #[error("concurrency budget exhausted for {key} after {attempts} attempts")]
    ConcurrencyExhausted {
        /// Rendered `partition/sort` key
        key: String,
        /// How many write attempts were made
        attempts: u32,
    },

    /// Transaction canceled; one reason per entry and constraint
    #[error("transaction canceled ({} failed checks)", .reasons.iter().filter(|r| r.is_failure()).count())]
    TransactionCanceled {
        /// Per-item reasons in submission order
        reasons: Vec<CancellationReason>,
    },

    /// Entry + constraint count exceeds the backend transaction limit
    #[error("transaction too large: {count} items (limit {limit})")]
    TransactionTooLarge {
        /// Entries plus constraints submitted
        count: usize,
        /// Backend limit
        limit: usize,
    },

    /// Batch-get backoff gave up with keys still unprocessed
    #[error("batch retries exhausted with {remaining} keys unprocessed")]
    RetriesExhausted {
        /// Keys still unprocessed when the budget ran out
        remaining: usize,
    },

    /// Encode/decode failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Opaque passthrough from the backing transport
    #[error("unexpected backend error: {0}")]
    Unexpected(String),
}

/// Result alias for table operations.
pub type TableResult<T> = std::result::Result<T, TableError>;

impl TableError {
    /// Whether a retry with fresh data may succeed.
    ///
    /// Only version races are retryable; decode errors and transport
    /// errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TableError::ConditionalCheckFailed { .. })
    }

    /// Whether this is a conditional (version/existence) failure.
    pub fn is_conditional_failure(&self) -> bool {
        match self {
            TableError::ConditionalCheckFailed { .. } | TableError::AlreadyExists { .. } => true,
            TableError::TransactionCanceled { reasons } => {
                reasons.iter().any(|r| r.is_failure())
            }
            _ => false,
        }
    }

    /// The per-item reasons of a canceled transaction, if that is what
    /// this error is.
    pub fn cancellation_reasons(&self) -> Option<&[CancellationReason]> {
        match self {
            TableError::TransactionCanceled { reasons } => Some(reasons),
            _ => None,
        }
    }
}
