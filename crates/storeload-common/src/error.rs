//! Error types shared by the storeload crates

use thiserror::Error;

/// Result type alias for storeload operations
pub type Result<T> = std::result::Result<T, StoreloadError>;

/// Main error type for storeload
#[derive(Error, Debug)]
pub enum StoreloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Invalid value '{value}' in column '{column}': {reason}")]
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreloadError {
    /// Create a missing column error for a given file
    pub fn missing_column(file: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            file: file.into(),
            column: column.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        column: impl Into<String>,
        value: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidValue {
            column: column.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message() {
        let err = StoreloadError::missing_column("clientes.csv", "email");
        assert_eq!(err.to_string(), "Missing column 'email' in clientes.csv");
    }

    #[test]
    fn test_invalid_value_message() {
        let err = StoreloadError::invalid_value("quantity_sold", "abc", "not an integer");
        assert_eq!(
            err.to_string(),
            "Invalid value 'abc' in column 'quantity_sold': not an integer"
        );
    }
}
