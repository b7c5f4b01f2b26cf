//! Load error types

use storeload_common::StoreloadError;
use thiserror::Error;

/// Result type alias for load operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Errors raised while reading inputs or writing to either store
///
/// These never cross a step boundary: each loader converts them into a failed
/// [`StepOutcome`](crate::step::StepOutcome).
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Relational store error: {0}")]
    Relational(#[from] sqlx::Error),

    #[error("Document store error: {0}")]
    Document(#[from] mongodb::error::Error),

    #[error("Document encoding error: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),

    #[error(transparent)]
    Common(#[from] StoreloadError),

    /// A row references something the destination does not hold
    #[error("{0}")]
    UnresolvedReference(String),

    /// The sink was used after its transaction was closed
    #[error("Transaction is no longer open")]
    TransactionClosed,

    /// The in-memory store was told to fail
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl LoadError {
    /// Create an unresolved product reference error
    pub fn unknown_product(name: &str) -> Self {
        Self::UnresolvedReference(format!("Product '{}' not found in products table", name))
    }
}
