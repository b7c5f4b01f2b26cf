//! Storeload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup and error handling for the storeload workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`StoreloadError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by [`logging::LogConfig`]
//! - **Types**: report kinds, sentiment labels and the store's field names
//!
//! # Example
//!
//! ```no_run
//! use storeload_common::types::Sentiment;
//!
//! assert_eq!(Sentiment::from_score(4.0), Sentiment::Positive);
//! assert_eq!(Sentiment::from_score(3.0).label(), "neutro");
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, StoreloadError};
