//! CSV input reading
//!
//! Every input is read fully into a [`CsvTable`] before any row is written to a
//! store. Files are decoded as UTF-8 and headers are matched by name, so column
//! order in the file does not matter. Only headers are trimmed; values keep
//! their whitespace. Known columns accept both the English header and the
//! store's legacy Portuguese header (`nome`, `telefone`, `produto`,
//! `quantidade_vendida`, `nota_satisfacao`, `data_avaliacao`).

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::io::Read;
use std::path::Path;
use storeload_common::StoreloadError;
use tracing::debug;

use crate::error::{LoadError, LoadResult};

/// Number of rows logged at debug level when a file is read.
const PREVIEW_ROWS: usize = 5;

/// Header aliases for the satisfaction score column.
pub const SCORE_COLUMNS: &[&str] = &["score", "nota_satisfacao", "nota"];

/// A fully-read CSV file
#[derive(Debug, Clone)]
pub struct CsvTable {
    name: String,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl CsvTable {
    /// Read a CSV file with a header row
    pub fn read(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(StoreloadError::from)?;
        let table = Self::from_reader(path.display().to_string(), file)?;

        debug!(
            file = %table.name,
            rows = table.len(),
            columns = ?table.headers(),
            "Read CSV file"
        );
        for (line, record) in table.records.iter().take(PREVIEW_ROWS).enumerate() {
            debug!(file = %table.name, line, row = ?record, "Preview");
        }

        Ok(table)
    }

    /// Read CSV content from any reader; `name` identifies it in errors
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> LoadResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::Headers)
            .from_reader(reader);

        let mut headers = reader.headers()?.clone();
        if let Some(first) = headers.get(0) {
            if first.starts_with('\u{feff}') {
                let cleaned: Vec<String> = headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| if i == 0 { h.trim_start_matches('\u{feff}') } else { h })
                    .map(str::to_string)
                    .collect();
                headers = StringRecord::from(cleaned);
            }
        }

        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.into(),
            headers,
            records,
        })
    }

    /// File name used in errors and logs
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> Vec<&str> {
        self.headers.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the first header matching any of `aliases`
    pub fn column(&self, aliases: &[&str]) -> LoadResult<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == *alias))
            .ok_or_else(|| {
                LoadError::from(StoreloadError::missing_column(
                    &self.name,
                    aliases.first().copied().unwrap_or_default(),
                ))
            })
    }

    /// Deserialize every row into `T`, matching fields by header name
    pub fn deserialize<T: DeserializeOwned>(&self) -> LoadResult<Vec<T>> {
        self.records
            .iter()
            .map(|record| record.deserialize(Some(&self.headers)).map_err(LoadError::from))
            .collect()
    }

    /// Parse the value at `column` of every row
    pub fn parse_column<T>(&self, column: usize) -> LoadResult<Vec<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let header = self.headers.get(column).unwrap_or_default();
        self.records
            .iter()
            .map(|record| {
                let raw = record.get(column).unwrap_or_default();
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| LoadError::from(StoreloadError::invalid_value(header, raw, e)))
            })
            .collect()
    }

    /// Every row as an ordered JSON object, values forwarded verbatim with
    /// one inferred type per column (see [`ColumnKind`])
    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        let kinds: Vec<ColumnKind> = (0..self.headers.len())
            .map(|column| {
                ColumnKind::infer(self.records.iter().map(|r| r.get(column).unwrap_or_default()))
            })
            .collect();

        self.records
            .iter()
            .map(|record| {
                self.headers
                    .iter()
                    .zip(&kinds)
                    .enumerate()
                    .map(|(column, (header, kind))| {
                        let raw = record.get(column).unwrap_or_default();
                        (header.to_string(), kind.to_value(raw))
                    })
                    .collect()
            })
            .collect()
    }
}

/// Scalar type shared by every value of a forwarded column
///
/// Empty cells are ignored when inferring and always become null. A column is
/// boolean when every value is `true`/`false` in any case, integer when every
/// value is an `i64` and no cell is empty, float when every value is a finite
/// number, and text otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut has_empty = false;
        let mut present = Vec::new();
        for value in values {
            let value = value.trim();
            if value.is_empty() {
                has_empty = true;
            } else {
                present.push(value);
            }
        }

        if present.is_empty() {
            return ColumnKind::Text;
        }
        if present.iter().all(|v| parse_bool(v).is_some()) {
            return ColumnKind::Boolean;
        }
        if !has_empty && present.iter().all(|v| v.parse::<i64>().is_ok()) {
            return ColumnKind::Integer;
        }
        if present.iter().all(|v| parse_finite(v).is_some()) {
            return ColumnKind::Float;
        }
        ColumnKind::Text
    }

    /// Convert one raw cell of a column of this kind
    pub fn to_value(self, raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        let converted = match self {
            ColumnKind::Boolean => parse_bool(trimmed).map(Value::Bool),
            ColumnKind::Integer => trimmed.parse::<i64>().ok().map(|i| Value::Number(i.into())),
            ColumnKind::Float => parse_finite(trimmed).map(Value::Number),
            ColumnKind::Text => None,
        };
        converted.unwrap_or_else(|| Value::String(raw.to_string()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_finite(value: &str) -> Option<Number> {
    value.parse::<f64>().ok().and_then(Number::from_f64)
}

// ============================================================================
// Typed rows
// ============================================================================

/// Row of the customers file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomerRow {
    #[serde(alias = "nome")]
    pub name: String,
    pub email: String,
    #[serde(alias = "telefone")]
    pub phone: String,
}

/// Row of the top-selling products file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopProductRow {
    #[serde(alias = "produto")]
    pub product: String,
    #[serde(alias = "quantidade_vendida")]
    pub quantity_sold: i64,
}

/// Row of the satisfaction file as stored relationally
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SatisfactionRow {
    #[serde(alias = "produto")]
    pub product: String,
    #[serde(alias = "nota_satisfacao", alias = "nota")]
    pub score: f64,
    #[serde(alias = "data_avaliacao", alias = "data")]
    pub date: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn table(content: &str) -> CsvTable {
        CsvTable::from_reader("test.csv", content.as_bytes()).unwrap()
    }

    #[test]
    fn test_reads_rows_in_order() {
        let t = table("name,email,phone\nAna,ana@x.com,111\nBia,bia@x.com,222\n");
        assert_eq!(t.len(), 2);
        assert_eq!(t.headers(), vec!["name", "email", "phone"]);

        let rows: Vec<CustomerRow> = t.deserialize().unwrap();
        assert_eq!(rows[0].name, "Ana");
        assert_eq!(rows[1].phone, "222");
    }

    #[test]
    fn test_portuguese_headers_accepted() {
        let t = table("nome,email,telefone\nAna,ana@x.com,111\n");
        let rows: Vec<CustomerRow> = t.deserialize().unwrap();
        assert_eq!(
            rows,
            vec![CustomerRow {
                name: "Ana".into(),
                email: "ana@x.com".into(),
                phone: "111".into(),
            }]
        );

        let t = table("produto,quantidade_vendida\nCamiseta,10\n");
        let rows: Vec<TopProductRow> = t.deserialize().unwrap();
        assert_eq!(rows[0].product, "Camiseta");
        assert_eq!(rows[0].quantity_sold, 10);
    }

    #[test]
    fn test_bad_quantity_is_an_error() {
        let t = table("product,quantity_sold\nCamiseta,ten\n");
        assert!(t.deserialize::<TopProductRow>().is_err());
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let t = table("product,quantity_sold\nCamiseta,1\n");
        let err = t.column(SCORE_COLUMNS).unwrap_err();
        assert!(err.to_string().contains("score"));
    }

    #[test]
    fn test_parse_column() {
        let t = table("produto,nota_satisfacao\nA,5\nB,3.5\n");
        let idx = t.column(SCORE_COLUMNS).unwrap();
        assert_eq!(t.parse_column::<f64>(idx).unwrap(), vec![5.0, 3.5]);

        let t = table("produto,nota_satisfacao\nA,great\n");
        let idx = t.column(SCORE_COLUMNS).unwrap();
        assert!(t.parse_column::<f64>(idx).is_err());
    }

    #[test]
    fn test_bom_stripped_from_first_header() {
        let t = table("\u{feff}name,email,phone\nAna,ana@x.com,111\n");
        assert_eq!(t.headers()[0], "name");
    }

    #[test]
    fn test_json_rows_infer_scalars() {
        let t = table("mes,receita,obs\n2024-01,1500,\n2024-02,1720.5,alta\n");
        let rows = t.to_json_rows();
        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({"mes": "2024-01", "receita": 1500.0, "obs": null})
        );
        assert_eq!(
            Value::Object(rows[1].clone()),
            json!({"mes": "2024-02", "receita": 1720.5, "obs": "alta"})
        );
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["mes", "receita", "obs"]);
    }

    #[test]
    fn test_json_rows_one_type_per_column() {
        let t = table("codigo,unidades,total,ativo\nabc,3,10,true\n1,4,12.5,False\n");
        let rows = t.to_json_rows();
        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({"codigo": "abc", "unidades": 3, "total": 10.0, "ativo": true})
        );
        assert_eq!(
            Value::Object(rows[1].clone()),
            json!({"codigo": "1", "unidades": 4, "total": 12.5, "ativo": false})
        );
    }

    #[test]
    fn test_integer_column_with_gaps_becomes_float() {
        let t = table("mes,pedidos\n2024-01,7\n2024-02,\n");
        let rows = t.to_json_rows();
        assert_eq!(rows[0]["pedidos"], json!(7.0));
        assert_eq!(rows[1]["pedidos"], Value::Null);
    }

    #[test]
    fn test_values_keep_surrounding_whitespace() {
        let t = table(" name , email ,phone\nAna , ana@x.com,111\n");
        assert_eq!(t.headers(), vec!["name", "email", "phone"]);

        let rows: Vec<CustomerRow> = t.deserialize().unwrap();
        assert_eq!(rows[0].name, "Ana ");
        assert_eq!(rows[0].email, " ana@x.com");
        assert_eq!(t.to_json_rows()[0]["name"], json!("Ana "));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvTable::read(dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn test_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clientes.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "name,email,phone").unwrap();
        writeln!(file, "Ana,ana@x.com,111").unwrap();
        drop(file);

        let t = CsvTable::read(&path).unwrap();
        assert_eq!(t.len(), 1);
        assert!(t.name().ends_with("clientes.csv"));
    }
}
