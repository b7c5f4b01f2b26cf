//! Document store reports
//!
//! Three report loads, each reading one CSV file and inserting report
//! documents through a [`DocumentSink`]. Like the relational loads they report
//! a [`StepOutcome`] instead of returning errors.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use storeload_common::StoreloadError;
use tracing::{error, info};

use crate::error::{LoadError, LoadResult};
use crate::source::{CsvTable, TopProductRow};
use crate::step::{Step, StepOutcome};

pub mod memory;
pub mod mongo;
pub mod reports;

pub use memory::MemoryDocumentStore;
pub use mongo::MongoSink;

/// Write access to the document store
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Lightweight round-trip proving the server is reachable
    async fn ping(&self) -> LoadResult<()>;

    /// Insert a batch; returns the number of documents inserted
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> LoadResult<usize>;

    /// Insert one document; returns its id
    async fn insert_one(&self, collection: &str, document: Value) -> LoadResult<String>;
}

fn to_document<T: Serialize>(report: &T) -> LoadResult<Value> {
    serde_json::to_value(report).map_err(|e| LoadError::from(StoreloadError::from(e)))
}

fn report_failure(step: Step, path: &Path, error: LoadError) -> StepOutcome {
    error!(step = %step, file = %path.display(), error = %error, "Report failed");
    StepOutcome::failed(step, format!("{}: {}", path.display(), error))
}

/// Insert one top-products document per row of the top-selling products file
pub async fn load_top_products_report(
    sink: &dyn DocumentSink,
    collection: &str,
    path: &Path,
    generated_at: &str,
) -> StepOutcome {
    let step = Step::TopProductsReport;
    let result = async {
        let rows: Vec<TopProductRow> = CsvTable::read(path)?.deserialize()?;
        if rows.is_empty() {
            return Err(LoadError::from(StoreloadError::EmptyInput(format!(
                "{} has no rows",
                path.display()
            ))));
        }
        let documents = reports::top_products_documents(&rows, generated_at)
            .iter()
            .map(to_document)
            .collect::<LoadResult<Vec<_>>>()?;
        sink.insert_many(collection, documents).await
    }
    .await;

    match result {
        Ok(inserted) => {
            info!(step = %step, collection, inserted, "Top products report loaded");
            StepOutcome::succeeded(
                step,
                inserted,
                format!("{} top products loaded into {}", inserted, collection),
            )
        },
        Err(e) => report_failure(step, path, e),
    }
}

/// Insert the whole monthly revenue file as a single document
pub async fn load_monthly_revenue_report(
    sink: &dyn DocumentSink,
    collection: &str,
    path: &Path,
    generated_at: &str,
) -> StepOutcome {
    let step = Step::MonthlyRevenueReport;
    let result = async {
        let table = CsvTable::read(path)?;
        let report = reports::monthly_revenue_document(&table, generated_at);
        let id = sink.insert_one(collection, to_document(&report)?).await?;
        Ok::<_, LoadError>((report.records.len(), id))
    }
    .await;

    match result {
        Ok((months, id)) => {
            info!(step = %step, collection, rows = months, id = %id, "Monthly revenue report loaded");
            StepOutcome::succeeded(
                step,
                1,
                format!("monthly revenue loaded ({} rows, id {})", months, id),
            )
        },
        Err(e) => report_failure(step, path, e),
    }
}

/// Insert the satisfaction summary: aggregates plus every row with its sentiment
pub async fn load_satisfaction_summary(
    sink: &dyn DocumentSink,
    collection: &str,
    path: &Path,
    generated_at: &str,
) -> StepOutcome {
    let step = Step::SatisfactionSummary;
    let result = async {
        let table = CsvTable::read(path)?;
        let report = reports::satisfaction_summary_document(&table, generated_at)?;
        let id = sink.insert_one(collection, to_document(&report)?).await?;
        Ok::<_, LoadError>((report, id))
    }
    .await;

    match result {
        Ok((report, id)) => {
            info!(
                step = %step,
                collection,
                ratings = report.total,
                mean = report.mean_score,
                positive_pct = report.percent_positive,
                id = %id,
                "Satisfaction summary loaded"
            );
            StepOutcome::succeeded(
                step,
                1,
                format!(
                    "{} ratings processed, mean {}/5, {}% positive (id {})",
                    report.total, report.mean_score, report.percent_positive, id
                ),
            )
        },
        Err(e) => report_failure(step, path, e),
    }
}
