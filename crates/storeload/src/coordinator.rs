//! Run coordinator
//!
//! Drives one ETL run against a [`DocumentSink`] and a [`RelationalConnector`]:
//!
//! 1. ping the document store, abort when it is unreachable
//! 2. open the relational transaction, abort when that fails
//! 3. run every [`Step`] in order, recording each outcome
//! 4. commit, or roll back when a step panicked
//!
//! The relational connection is closed on every path once it has been opened.

use chrono::{Local, NaiveDate, NaiveDateTime};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use storeload_common::types::GENERATED_AT_FORMAT;
use tracing::{error, info, warn};

use crate::config::EtlConfig;
use crate::document::{self, DocumentSink};
use crate::relational::{self, RelationalConnector, RelationalSink};
use crate::step::{Step, StepOutcome};

/// Timestamps shared by every step of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Date recorded on every sale
    pub run_date: NaiveDate,
    /// `data_geracao` of every report document
    pub generated_at: String,
}

impl RunContext {
    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(moment: NaiveDateTime) -> Self {
        Self {
            run_date: moment.date(),
            generated_at: moment.format(GENERATED_AT_FORMAT).to_string(),
        }
    }
}

/// What happened to the relational transaction at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionOutcome {
    Committed,
    CommitFailed { reason: String },
    RolledBack { step: Step, reason: String },
}

/// Result of a whole run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RunReport {
    /// The document store did not answer the ping; nothing else was attempted
    DocumentStoreUnreachable { reason: String },
    /// The relational connection could not be opened
    RelationalUnavailable { reason: String },
    /// The step sequence ran, fully or up to a panicking step
    Finished {
        steps: Vec<StepOutcome>,
        transaction: TransactionOutcome,
    },
}

impl RunReport {
    /// Outcomes in run order; empty for an aborted run
    pub fn steps(&self) -> &[StepOutcome] {
        match self {
            RunReport::Finished { steps, .. } => steps,
            _ => &[],
        }
    }

    pub fn step(&self, step: Step) -> Option<&StepOutcome> {
        self.steps().iter().find(|o| o.step == step)
    }

    pub fn is_aborted(&self) -> bool {
        !matches!(self, RunReport::Finished { .. })
    }

    /// Every step ran, succeeded, and the transaction committed
    pub fn all_succeeded(&self) -> bool {
        match self {
            RunReport::Finished { steps, transaction } => {
                *transaction == TransactionOutcome::Committed
                    && steps.len() == Step::ALL.len()
                    && steps.iter().all(StepOutcome::is_success)
            },
            _ => false,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReport::DocumentStoreUnreachable { reason } => {
                write!(f, "Run aborted: document store unreachable ({})", reason)
            },
            RunReport::RelationalUnavailable { reason } => {
                write!(f, "Run aborted: relational store unavailable ({})", reason)
            },
            RunReport::Finished { steps, transaction } => {
                writeln!(f, "Run summary:")?;
                for outcome in steps {
                    let mark = if outcome.is_success() { "OK  " } else { "FAIL" };
                    writeln!(f, "  [{}] {:<24} {}", mark, outcome.step.name(), outcome.message)?;
                }
                match transaction {
                    TransactionOutcome::Committed => write!(f, "Relational transaction committed"),
                    TransactionOutcome::CommitFailed { reason } => {
                        write!(f, "Relational commit failed: {}", reason)
                    },
                    TransactionOutcome::RolledBack { step, reason } => write!(
                        f,
                        "Relational transaction rolled back after {} ({})",
                        step, reason
                    ),
                }
            },
        }
    }
}

/// Runs the load sequence against both stores
pub struct RunCoordinator<'a> {
    config: &'a EtlConfig,
    documents: &'a dyn DocumentSink,
    relational: &'a dyn RelationalConnector,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(
        config: &'a EtlConfig,
        documents: &'a dyn DocumentSink,
        relational: &'a dyn RelationalConnector,
    ) -> Self {
        Self {
            config,
            documents,
            relational,
        }
    }

    pub async fn run(&self, ctx: &RunContext) -> RunReport {
        info!(run_date = %ctx.run_date, generated_at = %ctx.generated_at, "Starting ETL run");

        if let Err(e) = self.documents.ping().await {
            error!(error = %e, "Document store unreachable, aborting run");
            return RunReport::DocumentStoreUnreachable {
                reason: e.to_string(),
            };
        }

        let mut sink = match self.relational.connect().await {
            Ok(sink) => sink,
            Err(e) => {
                error!(error = %e, "Relational connection failed, aborting run");
                return RunReport::RelationalUnavailable {
                    reason: e.to_string(),
                };
            },
        };

        let (steps, transaction) = self.run_steps(&mut *sink, ctx).await;
        sink.close().await;

        let failed = steps.iter().filter(|o| !o.is_success()).count();
        info!(steps = steps.len(), failed, "ETL run finished");
        RunReport::Finished { steps, transaction }
    }

    async fn run_steps(
        &self,
        sink: &mut dyn RelationalSink,
        ctx: &RunContext,
    ) -> (Vec<StepOutcome>, TransactionOutcome) {
        let mut steps = Vec::with_capacity(Step::ALL.len());

        for step in Step::ALL {
            let attempt = AssertUnwindSafe(self.run_step(step, &mut *sink, ctx))
                .catch_unwind()
                .await;

            match attempt {
                Ok(outcome) => steps.push(outcome),
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    error!(step = %step, reason = %reason, "Step panicked, rolling back");
                    steps.push(StepOutcome::failed(step, format!("panicked: {}", reason)));

                    if let Err(e) = sink.rollback().await {
                        warn!(error = %e, "Rollback failed");
                    }
                    return (steps, TransactionOutcome::RolledBack { step, reason });
                },
            }
        }

        let transaction = match sink.commit().await {
            Ok(()) => TransactionOutcome::Committed,
            Err(e) => {
                error!(error = %e, "Commit failed");
                TransactionOutcome::CommitFailed {
                    reason: e.to_string(),
                }
            },
        };

        (steps, transaction)
    }

    async fn run_step(
        &self,
        step: Step,
        sink: &mut dyn RelationalSink,
        ctx: &RunContext,
    ) -> StepOutcome {
        let inputs = &self.config.inputs;
        let collections = &self.config.document;

        match step {
            Step::Customers => relational::load_customers(sink, &inputs.customers).await,
            Step::ProductsAndSales => {
                relational::load_products_and_sales(sink, &inputs.top_products, ctx.run_date).await
            },
            Step::SatisfactionRatings => {
                relational::load_satisfaction(sink, &inputs.satisfaction).await
            },
            Step::TopProductsReport => {
                document::load_top_products_report(
                    self.documents,
                    &collections.reports_collection,
                    &inputs.top_products,
                    &ctx.generated_at,
                )
                .await
            },
            Step::MonthlyRevenueReport => {
                document::load_monthly_revenue_report(
                    self.documents,
                    &collections.reports_collection,
                    &inputs.monthly_revenue,
                    &ctx.generated_at,
                )
                .await
            },
            Step::SatisfactionSummary => {
                document::load_satisfaction_summary(
                    self.documents,
                    &collections.satisfaction_collection,
                    &inputs.satisfaction,
                    &ctx.generated_at,
                )
                .await
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_context_formats_generation_time() {
        let moment = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        let ctx = RunContext::at(moment);
        assert_eq!(ctx.run_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(ctx.generated_at, "2024-05-01 09:30:05");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_aborted_report_has_no_steps() {
        let report = RunReport::DocumentStoreUnreachable {
            reason: "timeout".into(),
        };
        assert!(report.is_aborted());
        assert!(report.steps().is_empty());
        assert!(!report.all_succeeded());
        assert!(report.to_string().contains("timeout"));
    }

    #[test]
    fn test_summary_lists_each_step() {
        let report = RunReport::Finished {
            steps: vec![
                StepOutcome::succeeded(Step::Customers, 2, "2 customers loaded/updated"),
                StepOutcome::failed(Step::ProductsAndSales, "missing file"),
            ],
            transaction: TransactionOutcome::Committed,
        };
        let text = report.to_string();
        assert!(text.contains("[OK  ] customers"));
        assert!(text.contains("[FAIL] products_and_sales"));
        assert!(text.contains("committed"));
        assert!(!report.all_succeeded());
    }
}
