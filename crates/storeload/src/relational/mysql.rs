//! MySQL implementation of the relational sink
//!
//! Expects the store schema to exist already:
//!
//! ```sql
//! CREATE TABLE Clientes (
//!     id INT AUTO_INCREMENT PRIMARY KEY,
//!     nome VARCHAR(100) NOT NULL,
//!     email VARCHAR(100) NOT NULL UNIQUE,
//!     telefone VARCHAR(20)
//! );
//! CREATE TABLE Produtos (
//!     id INT AUTO_INCREMENT PRIMARY KEY,
//!     nome VARCHAR(100) NOT NULL UNIQUE
//! );
//! CREATE TABLE Vendas (
//!     id INT AUTO_INCREMENT PRIMARY KEY,
//!     produto_id INT NOT NULL REFERENCES Produtos(id),
//!     quantidade INT NOT NULL,
//!     data_venda DATE NOT NULL
//! );
//! CREATE TABLE Satisfacao (
//!     id INT AUTO_INCREMENT PRIMARY KEY,
//!     produto_id INT NOT NULL REFERENCES Produtos(id),
//!     nota DECIMAL(3,1) NOT NULL,
//!     data_avaliacao DATE NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::Transaction;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{RelationalConnector, RelationalSink};
use crate::config::RelationalConfig;
use crate::error::{LoadError, LoadResult};
use crate::source::CustomerRow;

/// Opens a single-connection pool and begins the run transaction
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    config: RelationalConfig,
}

impl MySqlConnector {
    pub fn new(config: RelationalConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .database(&self.config.database);

        match &self.config.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[async_trait]
impl RelationalConnector for MySqlConnector {
    async fn connect(&self) -> LoadResult<Box<dyn RelationalSink>> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(self.config.connect_timeout_secs))
            .connect_with(self.connect_options())
            .await?;

        let tx = match pool.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                pool.close().await;
                return Err(e.into());
            },
        };

        info!(
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.database,
            "MySQL connection established"
        );

        Ok(Box::new(MySqlSink { pool, tx: Some(tx) }))
    }
}

/// Relational sink writing through one MySQL transaction
pub struct MySqlSink {
    pool: MySqlPool,
    tx: Option<Transaction<'static, MySql>>,
}

impl MySqlSink {
    fn tx(&mut self) -> LoadResult<&mut Transaction<'static, MySql>> {
        self.tx.as_mut().ok_or(LoadError::TransactionClosed)
    }
}

#[async_trait]
impl RelationalSink for MySqlSink {
    async fn upsert_customer(&mut self, customer: &CustomerRow) -> LoadResult<()> {
        let tx = self.tx()?;
        sqlx::query(
            r#"
            INSERT INTO Clientes (nome, email, telefone)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
                nome = VALUES(nome),
                telefone = VALUES(telefone)
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn ensure_product(&mut self, name: &str) -> LoadResult<bool> {
        if self.product_id(name).await?.is_some() {
            return Ok(false);
        }

        let tx = self.tx()?;
        sqlx::query("INSERT INTO Produtos (nome) VALUES (?)")
            .bind(name)
            .execute(&mut **tx)
            .await?;

        debug!(product = %name, "Product created");
        Ok(true)
    }

    async fn product_id(&mut self, name: &str) -> LoadResult<Option<i64>> {
        let tx = self.tx()?;
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM Produtos WHERE nome = ?")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(id)
    }

    async fn insert_sale(
        &mut self,
        product_id: i64,
        quantity: i64,
        date: NaiveDate,
    ) -> LoadResult<()> {
        let tx = self.tx()?;
        sqlx::query("INSERT INTO Vendas (produto_id, quantidade, data_venda) VALUES (?, ?, ?)")
            .bind(product_id)
            .bind(quantity)
            .bind(date)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn insert_rating(&mut self, product_id: i64, score: f64, date: NaiveDate) -> LoadResult<()> {
        let tx = self.tx()?;
        sqlx::query("INSERT INTO Satisfacao (produto_id, nota, data_avaliacao) VALUES (?, ?, ?)")
            .bind(product_id)
            .bind(score)
            .bind(date)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn commit(&mut self) -> LoadResult<()> {
        let tx = self.tx.take().ok_or(LoadError::TransactionClosed)?;
        tx.commit().await?;
        info!("MySQL transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> LoadResult<()> {
        let tx = self.tx.take().ok_or(LoadError::TransactionClosed)?;
        tx.rollback().await?;
        warn!("MySQL transaction rolled back");
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback on close failed");
            }
        }
        self.pool.close().await;
        debug!("MySQL connection closed");
    }
}

