//! In-memory relational store
//!
//! Mirrors the MySQL schema closely enough to exercise the loads without a
//! server: emails and product names are unique, ids are assigned in insertion
//! order and writes only become visible in [`MemoryRelationalStore::snapshot`]
//! after a commit. Used by `--dry-run` and by the tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::{RelationalConnector, RelationalSink};
use crate::error::{LoadError, LoadResult};
use crate::source::CustomerRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleRecord {
    pub product_id: i64,
    pub quantity: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRecord {
    pub product_id: i64,
    pub score: f64,
    pub date: NaiveDate,
}

/// Committed contents of the in-memory store
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationalSnapshot {
    pub customers: Vec<CustomerRecord>,
    pub products: Vec<ProductRecord>,
    pub sales: Vec<SaleRecord>,
    pub ratings: Vec<RatingRecord>,
}

impl RelationalSnapshot {
    fn upsert_customer(&mut self, row: &CustomerRow) {
        match self.customers.iter_mut().find(|c| c.email == row.email) {
            Some(existing) => {
                existing.name = row.name.clone();
                existing.phone = row.phone.clone();
            },
            None => {
                let id = self.customers.len() as i64 + 1;
                self.customers.push(CustomerRecord {
                    id,
                    name: row.name.clone(),
                    email: row.email.clone(),
                    phone: row.phone.clone(),
                });
            },
        }
    }

    fn product_id(&self, name: &str) -> Option<i64> {
        self.products.iter().find(|p| p.name == name).map(|p| p.id)
    }

    fn has_product(&self, id: i64) -> bool {
        self.products.iter().any(|p| p.id == id)
    }
}

/// Connection bookkeeping, for asserting the coordinator's resource handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub connect_attempts: usize,
    pub opened: usize,
    pub closed: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    committed: RelationalSnapshot,
    stats: ConnectionStats,
    refuse_connections: Option<String>,
    commit_failure: Option<String>,
}

/// Shared handle to an in-memory relational store
#[derive(Debug, Clone, Default)]
pub struct MemoryRelationalStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following connection attempt fail with `reason`
    pub fn refuse_connections(&self, reason: impl Into<String>) {
        self.state.lock().refuse_connections = Some(reason.into());
    }

    /// Make every following commit fail with `reason`; the pending writes are
    /// discarded
    pub fn fail_commits(&self, reason: impl Into<String>) {
        self.state.lock().commit_failure = Some(reason.into());
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            store: self.clone(),
        }
    }

    /// Committed rows
    pub fn snapshot(&self) -> RelationalSnapshot {
        self.state.lock().committed.clone()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.state.lock().stats
    }
}

/// [`RelationalConnector`] handing out sinks over a [`MemoryRelationalStore`]
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: MemoryRelationalStore,
}

#[async_trait]
impl RelationalConnector for MemoryConnector {
    async fn connect(&self) -> LoadResult<Box<dyn RelationalSink>> {
        let mut state = self.store.state.lock();
        state.stats.connect_attempts += 1;
        if let Some(reason) = &state.refuse_connections {
            return Err(LoadError::Unavailable(reason.clone()));
        }
        state.stats.opened += 1;
        let pending = state.committed.clone();
        debug!("In-memory relational transaction started");

        Ok(Box::new(MemorySink {
            store: self.store.clone(),
            pending: Some(pending),
            closed: false,
        }))
    }
}

/// Transaction over the in-memory store; writes go to a private copy until commit
#[derive(Debug)]
pub struct MemorySink {
    store: MemoryRelationalStore,
    pending: Option<RelationalSnapshot>,
    closed: bool,
}

impl MemorySink {
    fn pending(&mut self) -> LoadResult<&mut RelationalSnapshot> {
        self.pending.as_mut().ok_or(LoadError::TransactionClosed)
    }
}

#[async_trait]
impl RelationalSink for MemorySink {
    async fn upsert_customer(&mut self, customer: &CustomerRow) -> LoadResult<()> {
        self.pending()?.upsert_customer(customer);
        Ok(())
    }

    async fn ensure_product(&mut self, name: &str) -> LoadResult<bool> {
        let pending = self.pending()?;
        if pending.product_id(name).is_some() {
            return Ok(false);
        }
        let id = pending.products.len() as i64 + 1;
        pending.products.push(ProductRecord {
            id,
            name: name.to_string(),
        });
        Ok(true)
    }

    async fn product_id(&mut self, name: &str) -> LoadResult<Option<i64>> {
        Ok(self.pending()?.product_id(name))
    }

    async fn insert_sale(
        &mut self,
        product_id: i64,
        quantity: i64,
        date: NaiveDate,
    ) -> LoadResult<()> {
        let pending = self.pending()?;
        if !pending.has_product(product_id) {
            return Err(LoadError::UnresolvedReference(format!(
                "Sale references missing product id {}",
                product_id
            )));
        }
        pending.sales.push(SaleRecord {
            product_id,
            quantity,
            date,
        });
        Ok(())
    }

    async fn insert_rating(&mut self, product_id: i64, score: f64, date: NaiveDate) -> LoadResult<()> {
        let pending = self.pending()?;
        if !pending.has_product(product_id) {
            return Err(LoadError::UnresolvedReference(format!(
                "Rating references missing product id {}",
                product_id
            )));
        }
        pending.ratings.push(RatingRecord {
            product_id,
            score,
            date,
        });
        Ok(())
    }

    async fn commit(&mut self) -> LoadResult<()> {
        let pending = self.pending.take().ok_or(LoadError::TransactionClosed)?;
        let mut state = self.store.state.lock();
        if let Some(reason) = &state.commit_failure {
            return Err(LoadError::Unavailable(reason.clone()));
        }
        state.committed = pending;
        state.stats.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> LoadResult<()> {
        self.pending.take().ok_or(LoadError::TransactionClosed)?;
        self.store.state.lock().stats.rollbacks += 1;
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.store.state.lock();
        if self.pending.take().is_some() {
            state.stats.rollbacks += 1;
        }
        state.stats.closed += 1;
    }
}
