//! Unified error surface
//!
//! The member crates keep their own error types ([`TableError`] for the
//! protocol and store layers, [`CodecError`] for encode/decode); the
//! facade folds both into one [`Error`] so application code can use a
//! single `Result` alias end to end.

use dynarow_core::{CancellationReason, CodecError, TableError};
use thiserror::Error;

/// Any error the data-access layer can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Table, write-protocol, or store error
    #[error(transparent)]
    Table(#[from] TableError),

    /// Encode/decode error outside a table operation
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a retry with fresh data may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Table(err) if err.is_retryable())
    }

    /// Whether this is a conditional (version/existence) failure.
    pub fn is_conditional_failure(&self) -> bool {
        matches!(self, Error::Table(err) if err.is_conditional_failure())
    }

    /// The per-item reasons of a canceled transaction, if that is what
    /// this error is.
    pub fn cancellation_reasons(&self) -> Option<&[CancellationReason]> {
        match self {
            Error::Table(err) => err.cancellation_reasons(),
            Error::Codec(_) => None,
        }
    }
}
