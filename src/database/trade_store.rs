//! Trade record store
//!
//! Keyed persistence of the last trade per token. The trading loop only talks
//! to the [`TradeRecordStore`] trait, never to the pool directly.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use deadpool_postgres::Pool;
use rust_decimal::Decimal;

use crate::agent::types::AgentError;
use crate::database::models::{FromRow, TradeRecord};

#[async_trait]
pub trait TradeRecordStore: Send + Sync {
    /// Fetch the record for `token_address`, failing with `NotFound` if absent.
    async fn get(&self, token_address: &str) -> Result<TradeRecord, AgentError>;

    /// Create or overwrite the record for `token_address`.
    async fn upsert(
        &self,
        token_address: &str,
        last_price: Decimal,
        holding: bool,
        balance: Decimal,
    ) -> Result<(), AgentError>;
}

/// Postgres-backed store over the `trades` table.
#[derive(Debug, Clone)]
pub struct PostgresTradeStore {
    pool: Pool,
}

impl PostgresTradeStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, AgentError> {
        self.pool
            .get()
            .await
            .map_err(|e| AgentError::Storage(format!("Failed to get DB connection: {}", e)))
    }
}

#[async_trait]
impl TradeRecordStore for PostgresTradeStore {
    async fn get(&self, token_address: &str) -> Result<TradeRecord, AgentError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT token_address, last_price, holding, balance, updated_at FROM trades WHERE token_address = $1",
                &[&token_address],
            )
            .await
            .map_err(|e| AgentError::Storage(format!("Failed to query trade record: {}", e)))?
            .ok_or_else(|| AgentError::NotFound(token_address.to_string()))?;

        TradeRecord::from_row(&row)
            .map_err(|e| AgentError::Storage(format!("Malformed trade record: {}", e)))
    }

    async fn upsert(
        &self,
        token_address: &str,
        last_price: Decimal,
        holding: bool,
        balance: Decimal,
    ) -> Result<(), AgentError> {
        let client = self.client().await?;

        // Rewriting identical values leaves updated_at alone so the upsert stays idempotent.
        let query = r#"
            INSERT INTO trades (token_address, last_price, holding, balance)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token_address) DO UPDATE SET
                last_price = EXCLUDED.last_price,
                holding = EXCLUDED.holding,
                balance = EXCLUDED.balance,
                updated_at = NOW()
            WHERE (trades.last_price, trades.holding, trades.balance)
                IS DISTINCT FROM (EXCLUDED.last_price, EXCLUDED.holding, EXCLUDED.balance)
        "#;

        let rows = client
            .execute(query, &[&token_address, &last_price, &holding, &balance])
            .await
            .map_err(|e| AgentError::Storage(format!("Failed to upsert trade record: {}", e)))?;

        tracing::debug!(token = token_address, rows, "upserted trade record");
        Ok(())
    }
}

/// Process-local store, used when no database is configured.
///
/// State is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryTradeStore {
    records: DashMap<String, TradeRecord>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TradeRecordStore for InMemoryTradeStore {
    async fn get(&self, token_address: &str) -> Result<TradeRecord, AgentError> {
        self.records
            .get(token_address)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AgentError::NotFound(token_address.to_string()))
    }

    async fn upsert(
        &self,
        token_address: &str,
        last_price: Decimal,
        holding: bool,
        balance: Decimal,
    ) -> Result<(), AgentError> {
        // The entry guard holds the shard lock, so writers to one key are serialized.
        let mut entry = self
            .records
            .entry(token_address.to_string())
            .or_insert_with(|| TradeRecord::new(token_address, last_price, holding, balance));

        if !entry.same_state(last_price, holding, balance) {
            entry.last_price = last_price;
            entry.holding = holding;
            entry.balance = balance;
            entry.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn get_missing_record_is_not_found() {
        let store = InMemoryTradeStore::new();
        let err = store.get("mint").await.unwrap_err();
        assert!(matches!(err, AgentError::NotFound(ref t) if t == "mint"));
    }

    #[tokio::test]
    async fn upsert_then_get_returns_written_values() {
        let store = InMemoryTradeStore::new();
        store.upsert("mint", dec("100.125"), true, dec("42.5")).await.unwrap();

        let record = store.get("mint").await.unwrap();
        assert_eq!(record.token_address, "mint");
        assert_eq!(record.last_price, dec("100.125"));
        assert!(record.holding);
        assert_eq!(record.balance, dec("42.5"));
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_record() {
        let store = InMemoryTradeStore::new();
        store.upsert("mint", dec("100"), false, dec("10")).await.unwrap();
        store.upsert("mint", dec("90"), true, dec("0.11")).await.unwrap();

        let record = store.get("mint").await.unwrap();
        assert!(record.same_state(dec("90"), true, dec("0.11")));
    }

    #[tokio::test]
    async fn repeated_identical_upsert_is_a_noop() {
        let store = InMemoryTradeStore::new();
        store.upsert("mint", dec("100"), true, dec("5")).await.unwrap();
        let first = store.get("mint").await.unwrap();

        store.upsert("mint", dec("100"), true, dec("5")).await.unwrap();
        let second = store.get("mint").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn records_are_keyed_per_token() {
        let store = InMemoryTradeStore::new();
        store.upsert("a", dec("1"), true, dec("1")).await.unwrap();
        store.upsert("b", dec("2"), false, dec("2")).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().last_price, dec("1"));
        assert_eq!(store.get("b").await.unwrap().last_price, dec("2"));
    }
}
