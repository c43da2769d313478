//! Transaction data store
//!
//! Read-only access to a user's bank transactions. The binaries always run
//! against Postgres; the in-memory store backs tests and embedders that seed
//! their own data.
//!
//! Expected table:
//! `transactions (user_id TEXT, description TEXT, amount DOUBLE PRECISION, txn_date TIMESTAMPTZ)`

use crate::error::AdvisoryError;
use crate::models::Transaction;
use crate::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Trait for transaction lookups
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Most recent transactions first, at most `limit` of them.
    async fn recent_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<Transaction>>;

    async fn count_transactions(&self, user_id: &str) -> Result<u64>;
}

/// In-memory store for tests and embedding; never selected by `build_store`
pub struct InMemoryTransactionStore {
    by_user: Arc<RwLock<HashMap<String, Vec<Transaction>>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            by_user: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed a user's history, oldest first.
    pub fn with_transactions(user_id: &str, transactions: Vec<Transaction>) -> Self {
        let mut map = HashMap::new();
        map.insert(user_id.to_string(), transactions);
        Self {
            by_user: Arc::new(RwLock::new(map)),
        }
    }

    /// Record a new transaction as the user's most recent one.
    pub async fn insert(&self, user_id: &str, transaction: Transaction) {
        let mut by_user = self.by_user.write().await;
        by_user
            .entry(user_id.to_string())
            .or_insert_with(Vec::new)
            .push(transaction);
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn recent_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<Transaction>> {
        let by_user = self.by_user.read().await;
        Ok(by_user
            .get(user_id)
            .map(|txns| txns.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn count_transactions(&self, user_id: &str) -> Result<u64> {
        let by_user = self.by_user.read().await;
        Ok(by_user.get(user_id).map(|txns| txns.len() as u64).unwrap_or(0))
    }
}

/// Postgres-backed store sharing one pool across requests
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a lazily connecting pool; no connection is opened until the
    /// first query.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                AdvisoryError::DatabaseError(format!("Failed to create connection pool: {}", e))
            })?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn recent_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT COALESCE(description, '') AS description, amount::float8 AS amount
            FROM transactions
            WHERE user_id = $1
            ORDER BY txn_date DESC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AdvisoryError::DatabaseError(format!("Failed to load transactions: {}", e))
        })?;

        rows.into_iter()
            .map(|row| {
                Ok(Transaction {
                    description: row.try_get("description").map_err(|e| {
                        AdvisoryError::DatabaseError(format!("Bad description column: {}", e))
                    })?,
                    amount: row.try_get::<Option<f64>, _>("amount")
                        .map_err(|e| {
                            AdvisoryError::DatabaseError(format!("Bad amount column: {}", e))
                        })?
                        .unwrap_or(0.0),
                })
            })
            .collect()
    }

    async fn count_transactions(&self, user_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AdvisoryError::DatabaseError(format!("Failed to count transactions: {}", e))
            })?;
        Ok(count.max(0) as u64)
    }
}

/// Build the Postgres store once at start-up. A missing or unusable
/// connection string is a configuration error.
pub fn build_store(database_url: Option<&str>) -> Result<Arc<dyn TransactionStore>> {
    let url = database_url.ok_or_else(|| {
        AdvisoryError::ConfigError("DATABASE_URL (or POSTGRES_URL) must be set".to_string())
    })?;

    let store = PostgresTransactionStore::connect_lazy(url).map_err(|e| {
        error!("Failed to initialize postgres transaction store: {}", e);
        AdvisoryError::ConfigError(format!("Invalid DATABASE_URL: {}", e))
    })?;

    info!("Transaction store backend: postgres");
    Ok(Arc::new(store))
}
