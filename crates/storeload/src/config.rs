//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storeload_common::{Result, StoreloadError};

// ============================================================================
// Relational Store Defaults
// ============================================================================

/// Default MySQL host (the compose service name).
pub const DEFAULT_MYSQL_HOST: &str = "mysql";

/// Default MySQL port.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Default MySQL user.
pub const DEFAULT_MYSQL_USER: &str = "root";

/// Default relational database name.
pub const DEFAULT_MYSQL_DATABASE: &str = "loja_roupas";

/// Default relational connection timeout in seconds.
pub const DEFAULT_MYSQL_CONNECT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Document Store Defaults
// ============================================================================

/// Default MongoDB connection string.
pub const DEFAULT_MONGO_URI: &str = "mongodb://mongo:27017/";

/// Default document database name.
pub const DEFAULT_MONGO_DATABASE: &str = "loja_roupas";

/// Collection holding the top-products and monthly-revenue reports.
pub const DEFAULT_REPORTS_COLLECTION: &str = "relatorios";

/// Collection holding the satisfaction survey summaries.
pub const DEFAULT_SATISFACTION_COLLECTION: &str = "pesquisas_satisfacao";

/// Default server selection timeout in seconds, bounds the connectivity probe.
pub const DEFAULT_MONGO_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Input Defaults
// ============================================================================

/// Default directory holding the input CSV files.
pub const DEFAULT_DATA_DIR: &str = "etl";

pub const CUSTOMERS_FILE: &str = "clientes.csv";
pub const TOP_PRODUCTS_FILE: &str = "csv_produtos_mais_vendidos.csv";
pub const MONTHLY_REVENUE_FILE: &str = "csv_receita_mensal.csv";
pub const SATISFACTION_FILE: &str = "csv_satisfacao_clientes.csv";

/// Full ETL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub relational: RelationalConfig,
    pub document: DocumentConfig,
    pub inputs: InputFiles,
}

/// MySQL connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct RelationalConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: String,
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for RelationalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// MongoDB connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub uri: String,
    pub database: String,
    pub reports_collection: String,
    pub satisfaction_collection: String,
    pub server_selection_timeout_secs: u64,
}

/// Paths of the four input files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFiles {
    pub customers: PathBuf,
    pub top_products: PathBuf,
    pub monthly_revenue: PathBuf,
    pub satisfaction: PathBuf,
}

impl InputFiles {
    /// Standard file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            customers: dir.join(CUSTOMERS_FILE),
            top_products: dir.join(TOP_PRODUCTS_FILE),
            monthly_revenue: dir.join(MONTHLY_REVENUE_FILE),
            satisfaction: dir.join(SATISFACTION_FILE),
        }
    }
}

impl EtlConfig {
    /// Load configuration from `.env`, the process environment and defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Keys: `MYSQL_HOST`, `MYSQL_PORT`, `MYSQL_USER`, `MYSQL_ROOT_PASSWORD`,
    /// `MYSQL_DATABASE`, `MYSQL_CONNECT_TIMEOUT`, `MONGO_URI`, `MONGO_DATABASE`,
    /// `MONGO_TIMEOUT`, `ETL_DATA_DIR`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e| StoreloadError::Config(format!("{key} must be a number: {e}"))),
                None => Ok(default),
            }
        };

        let port = match lookup("MYSQL_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| {
                StoreloadError::Config(format!("MYSQL_PORT must be a port number: {e}"))
            })?,
            None => DEFAULT_MYSQL_PORT,
        };

        let data_dir = lookup("ETL_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        let config = EtlConfig {
            relational: RelationalConfig {
                host: lookup("MYSQL_HOST").unwrap_or_else(|| DEFAULT_MYSQL_HOST.to_string()),
                port,
                user: lookup("MYSQL_USER").unwrap_or_else(|| DEFAULT_MYSQL_USER.to_string()),
                password: lookup("MYSQL_ROOT_PASSWORD"),
                database: lookup("MYSQL_DATABASE")
                    .unwrap_or_else(|| DEFAULT_MYSQL_DATABASE.to_string()),
                connect_timeout_secs: parsed(
                    "MYSQL_CONNECT_TIMEOUT",
                    DEFAULT_MYSQL_CONNECT_TIMEOUT_SECS,
                )?,
            },
            document: DocumentConfig {
                uri: lookup("MONGO_URI").unwrap_or_else(|| DEFAULT_MONGO_URI.to_string()),
                database: lookup("MONGO_DATABASE")
                    .unwrap_or_else(|| DEFAULT_MONGO_DATABASE.to_string()),
                reports_collection: DEFAULT_REPORTS_COLLECTION.to_string(),
                satisfaction_collection: DEFAULT_SATISFACTION_COLLECTION.to_string(),
                server_selection_timeout_secs: parsed("MONGO_TIMEOUT", DEFAULT_MONGO_TIMEOUT_SECS)?,
            },
            inputs: InputFiles::in_dir(data_dir),
        };

        config.validate()?;

        Ok(config)
    }

    /// Point every input at the standard file names inside `dir`
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.inputs = InputFiles::in_dir(dir);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.relational.host.trim().is_empty() {
            return Err(StoreloadError::Config("MySQL host cannot be empty".to_string()));
        }

        if self.relational.database.trim().is_empty() {
            return Err(StoreloadError::Config(
                "MySQL database cannot be empty".to_string(),
            ));
        }

        if self.relational.connect_timeout_secs == 0 {
            return Err(StoreloadError::Config(
                "MySQL connect timeout must be greater than 0".to_string(),
            ));
        }

        if !self.document.uri.starts_with("mongodb://")
            && !self.document.uri.starts_with("mongodb+srv://")
        {
            return Err(StoreloadError::Config(format!(
                "MongoDB URI '{}' must start with mongodb:// or mongodb+srv://",
                self.document.uri
            )));
        }

        if self.document.database.trim().is_empty() {
            return Err(StoreloadError::Config(
                "MongoDB database cannot be empty".to_string(),
            ));
        }

        if self.document.server_selection_timeout_secs == 0 {
            return Err(StoreloadError::Config(
                "MongoDB timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            relational: RelationalConfig {
                host: DEFAULT_MYSQL_HOST.to_string(),
                port: DEFAULT_MYSQL_PORT,
                user: DEFAULT_MYSQL_USER.to_string(),
                password: None,
                database: DEFAULT_MYSQL_DATABASE.to_string(),
                connect_timeout_secs: DEFAULT_MYSQL_CONNECT_TIMEOUT_SECS,
            },
            document: DocumentConfig {
                uri: DEFAULT_MONGO_URI.to_string(),
                database: DEFAULT_MONGO_DATABASE.to_string(),
                reports_collection: DEFAULT_REPORTS_COLLECTION.to_string(),
                satisfaction_collection: DEFAULT_SATISFACTION_COLLECTION.to_string(),
                server_selection_timeout_secs: DEFAULT_MONGO_TIMEOUT_SECS,
            },
            inputs: InputFiles::in_dir(DEFAULT_DATA_DIR),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = EtlConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.relational.host, "mysql");
        assert_eq!(config.relational.port, 3306);
        assert_eq!(config.relational.database, "loja_roupas");
        assert!(config.relational.password.is_none());
        assert_eq!(config.document.uri, "mongodb://mongo:27017/");
        assert_eq!(config.document.server_selection_timeout_secs, 5);
        assert_eq!(config.inputs.customers, PathBuf::from("etl/clientes.csv"));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = EtlConfig::from_lookup(lookup_from(&[
            ("MYSQL_HOST", "localhost"),
            ("MYSQL_PORT", "3307"),
            ("MYSQL_ROOT_PASSWORD", "secret"),
            ("MONGO_URI", "mongodb://localhost:27017/"),
            ("ETL_DATA_DIR", "/data/in"),
        ]))
        .unwrap();

        assert_eq!(config.relational.host, "localhost");
        assert_eq!(config.relational.port, 3307);
        assert_eq!(config.relational.password.as_deref(), Some("secret"));
        assert_eq!(
            config.inputs.satisfaction,
            PathBuf::from("/data/in/csv_satisfacao_clientes.csv")
        );
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let config = EtlConfig::from_lookup(lookup_from(&[("MYSQL_ROOT_PASSWORD", "hunter2")]))
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = EtlConfig::from_lookup(lookup_from(&[("MYSQL_PORT", "not-a-port")]));
        assert!(matches!(result, Err(StoreloadError::Config(_))));
    }

    #[test]
    fn test_invalid_mongo_uri_rejected() {
        let result = EtlConfig::from_lookup(lookup_from(&[("MONGO_URI", "http://mongo")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = EtlConfig::from_lookup(lookup_from(&[("MONGO_TIMEOUT", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_with_data_dir() {
        let config = EtlConfig::default().with_data_dir("/tmp/run");
        assert_eq!(
            config.inputs.top_products,
            PathBuf::from("/tmp/run/csv_produtos_mais_vendidos.csv")
        );
    }
}
