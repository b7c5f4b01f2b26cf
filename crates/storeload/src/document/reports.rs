//! Report document shapes and the satisfaction aggregates
//!
//! Field names are the ones already stored in the report collections.

use serde::Serialize;
use serde_json::{Map, Value};
use storeload_common::types::{round2, ReportKind, Sentiment};
use storeload_common::StoreloadError;

use crate::error::LoadResult;
use crate::source::{CsvTable, TopProductRow, SCORE_COLUMNS};

/// Category written on every top-products document.
pub const DEFAULT_CATEGORY: &str = "Geral";

/// Field added to every satisfaction row.
pub const SENTIMENT_FIELD: &str = "sentimento";

/// One document per row of the top-selling products file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProductDocument {
    #[serde(rename = "tipo_relatorio")]
    pub report_type: ReportKind,
    #[serde(rename = "data_geracao")]
    pub generated_at: String,
    #[serde(rename = "produto")]
    pub product: String,
    #[serde(rename = "quantidade_vendida")]
    pub quantity_sold: i64,
    #[serde(rename = "categoria")]
    pub category: String,
}

/// The whole monthly revenue file as one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenueDocument {
    #[serde(rename = "tipo_relatorio")]
    pub report_type: ReportKind,
    #[serde(rename = "data_geracao")]
    pub generated_at: String,
    #[serde(rename = "dados")]
    pub records: Vec<Map<String, Value>>,
}

/// Satisfaction aggregates plus every rated row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionSummaryDocument {
    #[serde(rename = "tipo_relatorio")]
    pub report_type: ReportKind,
    #[serde(rename = "data_geracao")]
    pub generated_at: String,
    #[serde(rename = "total_avaliacoes")]
    pub total: usize,
    #[serde(rename = "media_avaliacoes")]
    pub mean_score: f64,
    #[serde(rename = "percentual_positivo")]
    pub percent_positive: f64,
    #[serde(rename = "avaliacoes")]
    pub ratings: Vec<Map<String, Value>>,
}

/// Aggregates over a set of satisfaction scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatisfactionStats {
    pub total: usize,
    /// Mean score, rounded to 2 decimals
    pub mean_score: f64,
    /// Share of positive scores in percent, rounded to 2 decimals
    pub percent_positive: f64,
}

impl SatisfactionStats {
    /// `None` for an empty score list, which has no mean
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }

        let total = scores.len();
        let sum: f64 = scores.iter().sum();
        let positive = scores
            .iter()
            .filter(|s| Sentiment::from_score(**s) == Sentiment::Positive)
            .count();

        Some(Self {
            total,
            mean_score: round2(sum / total as f64),
            percent_positive: round2(positive as f64 / total as f64 * 100.0),
        })
    }
}

pub fn top_products_documents(
    rows: &[TopProductRow],
    generated_at: &str,
) -> Vec<TopProductDocument> {
    rows.iter()
        .map(|row| TopProductDocument {
            report_type: ReportKind::TopProducts,
            generated_at: generated_at.to_string(),
            product: row.product.clone(),
            quantity_sold: row.quantity_sold,
            category: DEFAULT_CATEGORY.to_string(),
        })
        .collect()
}

pub fn monthly_revenue_document(table: &CsvTable, generated_at: &str) -> MonthlyRevenueDocument {
    MonthlyRevenueDocument {
        report_type: ReportKind::MonthlyRevenue,
        generated_at: generated_at.to_string(),
        records: table.to_json_rows(),
    }
}

/// Label every row with its sentiment and compute the aggregates
///
/// Fails when the score column is missing, a score does not parse, or the
/// file has no rows.
pub fn satisfaction_summary_document(
    table: &CsvTable,
    generated_at: &str,
) -> LoadResult<SatisfactionSummaryDocument> {
    let column = table.column(SCORE_COLUMNS)?;
    let scores: Vec<f64> = table.parse_column(column)?;
    let stats = SatisfactionStats::from_scores(&scores).ok_or_else(|| {
        StoreloadError::EmptyInput(format!("{} has no ratings", table.name()))
    })?;

    let ratings = table
        .to_json_rows()
        .into_iter()
        .zip(&scores)
        .map(|(mut row, score)| {
            row.insert(
                SENTIMENT_FIELD.to_string(),
                Value::String(Sentiment::from_score(*score).label().to_string()),
            );
            row
        })
        .collect();

    Ok(SatisfactionSummaryDocument {
        report_type: ReportKind::SatisfactionSummary,
        generated_at: generated_at.to_string(),
        total: stats.total,
        mean_score: stats.mean_score,
        percent_positive: stats.percent_positive,
        ratings,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: &str = "2024-05-01 10:00:00";

    fn table(content: &str) -> CsvTable {
        CsvTable::from_reader("test.csv", content.as_bytes()).unwrap()
    }

    #[test]
    fn test_stats_for_known_scores() {
        let stats = SatisfactionStats::from_scores(&[5.0, 5.0, 3.0, 1.0]).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.mean_score, 3.5);
        assert_eq!(stats.percent_positive, 50.0);
    }

    #[test]
    fn test_stats_round_to_two_decimals() {
        let stats = SatisfactionStats::from_scores(&[5.0, 4.0, 2.0]).unwrap();
        assert_eq!(stats.mean_score, 3.67);
        assert_eq!(stats.percent_positive, 66.67);
    }

    #[test]
    fn test_stats_exact_halves_round_to_even() {
        let scores = [5.0, 5.0, 5.0, 5.0, 1.0, 1.0, 1.0, 2.0];
        let stats = SatisfactionStats::from_scores(&scores).unwrap();
        assert_eq!(stats.mean_score, 3.12);
        assert_eq!(stats.percent_positive, 50.0);

        let mut scores = vec![1.0; 31];
        scores.push(5.0);
        let stats = SatisfactionStats::from_scores(&scores).unwrap();
        assert_eq!(stats.mean_score, 1.12);
        assert_eq!(stats.percent_positive, 3.12);
    }

    #[test]
    fn test_stats_empty() {
        assert!(SatisfactionStats::from_scores(&[]).is_none());
    }

    #[test]
    fn test_top_products_documents() {
        let rows = vec![TopProductRow {
            product: "Camiseta".into(),
            quantity_sold: 42,
        }];
        let docs = top_products_documents(&rows, NOW);
        assert_eq!(
            serde_json::to_value(&docs[0]).unwrap(),
            json!({
                "tipo_relatorio": "produtos_mais_vendidos",
                "data_geracao": NOW,
                "produto": "Camiseta",
                "quantidade_vendida": 42,
                "categoria": "Geral"
            })
        );
    }

    #[test]
    fn test_monthly_revenue_forwards_rows() {
        let t = table("mes,receita\n2024-01,1500\n2024-02,1720.5\n");
        let doc = monthly_revenue_document(&t, NOW);
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "tipo_relatorio": "receita_mensal",
                "data_geracao": NOW,
                "dados": [
                    {"mes": "2024-01", "receita": 1500.0},
                    {"mes": "2024-02", "receita": 1720.5}
                ]
            })
        );
    }

    #[test]
    fn test_satisfaction_summary_labels_rows() {
        let t = table("cliente,nota_satisfacao\nAna,5\nBia,5\nCai,3\nDu,1\n");
        let doc = satisfaction_summary_document(&t, NOW).unwrap();

        assert_eq!(doc.total, 4);
        assert_eq!(doc.mean_score, 3.5);
        assert_eq!(doc.percent_positive, 50.0);
        let labels: Vec<&Value> = doc.ratings.iter().map(|r| &r[SENTIMENT_FIELD]).collect();
        assert_eq!(
            labels,
            vec![&json!("positivo"), &json!("positivo"), &json!("neutro"), &json!("negativo")]
        );
        assert_eq!(doc.ratings[0]["cliente"], json!("Ana"));
    }

    #[test]
    fn test_satisfaction_summary_empty_file() {
        let t = table("cliente,score\n");
        assert!(satisfaction_summary_document(&t, NOW).is_err());
    }

    #[test]
    fn test_satisfaction_summary_missing_score_column() {
        let t = table("cliente,comentario\nAna,ok\n");
        assert!(satisfaction_summary_document(&t, NOW).is_err());
    }
}
