//! Reconciliation Error Types
//!
//! Only failures that stop a run before its report is written are errors.
//! Problems inside the catalog itself end up in a
//! [`CatalogOutcome`](crate::CatalogOutcome) instead.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A reconciliation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a reconciliation failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The catalog file could not be opened at all.
    #[display("unable to open catalog: {}", _0.display())]
    OpenCatalog(#[error(not(source))] PathBuf),
    /// The catalog stream could not be read or decoded part-way through.
    #[display("catalog stream could not be decoded")]
    Catalog,
    /// Writing the report failed.
    #[display("failed to write report")]
    Report,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OpenCatalog(_))
    }
}
