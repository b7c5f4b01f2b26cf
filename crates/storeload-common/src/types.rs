//! Domain vocabulary shared across storeload
//!
//! The labels here are the values persisted in the store's report documents,
//! so they keep the store's Portuguese spelling.

use serde::{Deserialize, Serialize};

/// Format of the `data_geracao` timestamp carried by every report document.
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of report document written to the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    #[serde(rename = "produtos_mais_vendidos")]
    TopProducts,
    #[serde(rename = "receita_mensal")]
    MonthlyRevenue,
    #[serde(rename = "satisfacao_clientes")]
    SatisfactionSummary,
}

impl ReportKind {
    /// Label stored in the `tipo_relatorio` field
    pub fn label(self) -> &'static str {
        match self {
            ReportKind::TopProducts => "produtos_mais_vendidos",
            ReportKind::MonthlyRevenue => "receita_mensal",
            ReportKind::SatisfactionSummary => "satisfacao_clientes",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Sentiment derived from a satisfaction score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "positivo")]
    Positive,
    #[serde(rename = "neutro")]
    Neutral,
    #[serde(rename = "negativo")]
    Negative,
}

impl Sentiment {
    /// Scores of 4 and above are positive, exactly 3 is neutral, anything
    /// else (including fractional scores between 3 and 4) is negative.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.0 {
            Sentiment::Positive
        } else if score == 3.0 {
            Sentiment::Neutral
        } else {
            Sentiment::Negative
        }
    }

    /// Label stored in the `sentimento` field
    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "positivo",
            Sentiment::Neutral => "neutro",
            Sentiment::Negative => "negativo",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Round to two decimal places, exact halves to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
