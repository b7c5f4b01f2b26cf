//! Load steps and their outcomes

use serde::Serialize;
use std::fmt;

use crate::error::LoadError;

/// The six load steps, in the order the coordinator runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Customers,
    ProductsAndSales,
    SatisfactionRatings,
    TopProductsReport,
    MonthlyRevenueReport,
    SatisfactionSummary,
}

impl Step {
    /// Fixed run order: relational steps first, then document reports
    pub const ALL: [Step; 6] = [
        Step::Customers,
        Step::ProductsAndSales,
        Step::SatisfactionRatings,
        Step::TopProductsReport,
        Step::MonthlyRevenueReport,
        Step::SatisfactionSummary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Customers => "customers",
            Step::ProductsAndSales => "products_and_sales",
            Step::SatisfactionRatings => "satisfaction_ratings",
            Step::TopProductsReport => "top_products_report",
            Step::MonthlyRevenueReport => "monthly_revenue_report",
            Step::SatisfactionSummary => "satisfaction_summary",
        }
    }

    /// Whether the step writes inside the relational transaction
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            Step::Customers | Step::ProductsAndSales | Step::SatisfactionRatings
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    Failed,
}

/// Result of one load step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    pub status: StepStatus,
    pub message: String,
    /// Rows or documents written
    pub written: usize,
    /// Rows skipped without failing the step
    pub skipped: usize,
}

impl StepOutcome {
    pub fn succeeded(step: Step, written: usize, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Succeeded,
            message: message.into(),
            written,
            skipped: 0,
        }
    }

    pub fn failed(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            message: message.into(),
            written: 0,
            skipped: 0,
        }
    }

    /// Failure carrying the rows already written before the error
    pub fn failed_after(step: Step, written: usize, error: &LoadError) -> Self {
        Self {
            written,
            ..Self::failed(step, error.to_string())
        }
    }

    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}
