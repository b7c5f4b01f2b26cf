//! Storeload
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Batch ETL for a clothing store: loads customers, products, sales and
//! satisfaction ratings from CSV files into MySQL, and report documents into
//! MongoDB.
//!
//! # Modules
//!
//! - **source**: CSV reading and typed rows
//! - **relational**: customer, product/sale and rating loads behind [`relational::RelationalSink`]
//! - **document**: report documents behind [`document::DocumentSink`]
//! - **coordinator**: the fixed run sequence and its [`coordinator::RunReport`]
//!
//! # Example
//!
//! ```no_run
//! use storeload::config::EtlConfig;
//! use storeload::coordinator::{RunContext, RunCoordinator};
//! use storeload::document::MemoryDocumentStore;
//! use storeload::relational::MemoryRelationalStore;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = EtlConfig::default().with_data_dir("./etl");
//!     let documents = MemoryDocumentStore::new();
//!     let relational = MemoryRelationalStore::new();
//!     let connector = relational.connector();
//!
//!     let report = RunCoordinator::new(&config, &documents, &connector)
//!         .run(&RunContext::now())
//!         .await;
//!     println!("{}", report);
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod relational;
pub mod source;
pub mod step;

pub use error::{LoadError, LoadResult};
