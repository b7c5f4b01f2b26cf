//! Relational loads
//!
//! Three loads write into the relational store through a [`RelationalSink`]
//! that wraps one open transaction. Each load reads its CSV file, writes row by
//! row and reports a [`StepOutcome`]; errors never leave the load. Rows written
//! before a failure stay in the transaction and are committed with the rest of
//! the run.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{error, info, warn};

use crate::error::{LoadError, LoadResult};
use crate::source::{CsvTable, CustomerRow, SatisfactionRow, TopProductRow};
use crate::step::{Step, StepOutcome};

pub mod memory;
pub mod mysql;

pub use memory::{MemoryConnector, MemoryRelationalStore};
pub use mysql::{MySqlConnector, MySqlSink};

/// Date formats accepted for the evaluation date of a rating.
const RATING_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Write access to the relational store inside one transaction
#[async_trait]
pub trait RelationalSink: Send {
    /// Insert a customer, or update name and phone when the email exists
    async fn upsert_customer(&mut self, customer: &CustomerRow) -> LoadResult<()>;

    /// Insert a product if no product with this name exists; returns whether
    /// a row was created
    async fn ensure_product(&mut self, name: &str) -> LoadResult<bool>;

    /// Look up a product id by name
    async fn product_id(&mut self, name: &str) -> LoadResult<Option<i64>>;

    async fn insert_sale(&mut self, product_id: i64, quantity: i64, date: NaiveDate)
        -> LoadResult<()>;

    async fn insert_rating(&mut self, product_id: i64, score: f64, date: NaiveDate)
        -> LoadResult<()>;

    async fn commit(&mut self) -> LoadResult<()>;

    async fn rollback(&mut self) -> LoadResult<()>;

    /// Release the connection; an open transaction is rolled back
    async fn close(&mut self);
}

/// Opens a relational connection and begins the run transaction
#[async_trait]
pub trait RelationalConnector: Send + Sync {
    async fn connect(&self) -> LoadResult<Box<dyn RelationalSink>>;
}

fn input_failure(step: Step, path: &Path, error: LoadError) -> StepOutcome {
    error!(step = %step, file = %path.display(), error = %error, "Failed to read input");
    StepOutcome::failed(step, format!("{}: {}", path.display(), error))
}

/// Upsert every customer of the customers file, keyed by email
pub async fn load_customers(sink: &mut dyn RelationalSink, path: &Path) -> StepOutcome {
    let step = Step::Customers;
    let rows: Vec<CustomerRow> = match CsvTable::read(path).and_then(|t| t.deserialize()) {
        Ok(rows) => rows,
        Err(e) => return input_failure(step, path, e),
    };

    let mut written = 0;
    for row in &rows {
        if let Err(e) = sink.upsert_customer(row).await {
            error!(step = %step, email = %row.email, error = %e, "Customer upsert failed");
            return StepOutcome::failed_after(step, written, &e);
        }
        written += 1;
    }

    info!(step = %step, customers = written, "Customers loaded/updated");
    StepOutcome::succeeded(step, written, format!("{} customers loaded/updated", written))
}

/// Create missing products from the top-products file, then record one sale
/// per row dated `run_date`
pub async fn load_products_and_sales(
    sink: &mut dyn RelationalSink,
    path: &Path,
    run_date: NaiveDate,
) -> StepOutcome {
    let step = Step::ProductsAndSales;
    let rows: Vec<TopProductRow> = match CsvTable::read(path).and_then(|t| t.deserialize()) {
        Ok(rows) => rows,
        Err(e) => return input_failure(step, path, e),
    };

    let mut seen = HashSet::new();
    let names: Vec<&str> = rows
        .iter()
        .map(|r| r.product.as_str())
        .filter(|name| seen.insert(*name))
        .collect();

    let mut created = 0;
    let mut ids = HashMap::with_capacity(names.len());
    for name in &names {
        let resolved = resolve_product(sink, name).await;
        match resolved {
            Ok((id, is_new)) => {
                created += usize::from(is_new);
                ids.insert(*name, id);
            },
            Err(e) => {
                error!(step = %step, product = %name, error = %e, "Product insert failed");
                return StepOutcome::failed(step, e.to_string());
            },
        }
    }

    let mut sales = 0;
    for row in &rows {
        let Some(&product_id) = ids.get(row.product.as_str()) else {
            continue;
        };
        if let Err(e) = sink.insert_sale(product_id, row.quantity_sold, run_date).await {
            error!(step = %step, product = %row.product, error = %e, "Sale insert failed");
            return StepOutcome::failed_after(step, sales, &e);
        }
        sales += 1;
    }

    info!(
        step = %step,
        products = names.len(),
        new_products = created,
        sales,
        "Products and sales loaded"
    );
    StepOutcome::succeeded(
        step,
        sales,
        format!(
            "{} products ({} new), {} sales dated {}",
            names.len(),
            created,
            sales,
            run_date
        ),
    )
}

async fn resolve_product(sink: &mut dyn RelationalSink, name: &str) -> LoadResult<(i64, bool)> {
    let created = sink.ensure_product(name).await?;
    let id = sink
        .product_id(name)
        .await?
        .ok_or_else(|| LoadError::unknown_product(name))?;
    Ok((id, created))
}

/// Record one rating per row of the satisfaction file
///
/// Rows naming an unknown product or carrying an unreadable date are skipped.
pub async fn load_satisfaction(sink: &mut dyn RelationalSink, path: &Path) -> StepOutcome {
    let step = Step::SatisfactionRatings;
    let rows: Vec<SatisfactionRow> = match CsvTable::read(path).and_then(|t| t.deserialize()) {
        Ok(rows) => rows,
        Err(e) => return input_failure(step, path, e),
    };

    let mut ids: HashMap<String, Option<i64>> = HashMap::new();
    let mut written = 0;
    let mut skipped = 0;

    for (line, row) in rows.iter().enumerate() {
        let Some(date) = parse_rating_date(&row.date) else {
            warn!(step = %step, line = line + 2, date = %row.date, "Skipping rating with unreadable date");
            skipped += 1;
            continue;
        };

        let product_id = match ids.get(&row.product) {
            Some(cached) => *cached,
            None => match sink.product_id(&row.product).await {
                Ok(found) => {
                    ids.insert(row.product.clone(), found);
                    found
                },
                Err(e) => {
                    error!(step = %step, product = %row.product, error = %e, "Product lookup failed");
                    return StepOutcome::failed_after(step, written, &e).with_skipped(skipped);
                },
            },
        };

        let Some(product_id) = product_id else {
            warn!(step = %step, line = line + 2, product = %row.product, "Skipping rating for unknown product");
            skipped += 1;
            continue;
        };

        if let Err(e) = sink.insert_rating(product_id, row.score, date).await {
            error!(step = %step, product = %row.product, error = %e, "Rating insert failed");
            return StepOutcome::failed_after(step, written, &e).with_skipped(skipped);
        }
        written += 1;
    }

    info!(step = %step, ratings = written, skipped, "Satisfaction ratings loaded");
    StepOutcome::succeeded(
        step,
        written,
        format!("{} ratings loaded, {} skipped", written, skipped),
    )
    .with_skipped(skipped)
}

/// Parse an evaluation date; a trailing time part is ignored
pub fn parse_rating_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split_whitespace().next().unwrap_or_default();
    RATING_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}
