//! Database Migrations
//!
//! Schema setup for tokio-postgres. The trader owns a single table.

use anyhow::{Context, Result};
use deadpool_postgres::Pool;

const CREATE_TRADES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS trades (
        token_address TEXT PRIMARY KEY,
        last_price NUMERIC NOT NULL,
        holding BOOLEAN NOT NULL DEFAULT FALSE,
        balance NUMERIC NOT NULL DEFAULT 0,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

/// Run all pending migrations
pub async fn run_migrations(pool: &Pool) -> Result<()> {
    if !needs_migration(pool).await? {
        tracing::debug!("trades table already present");
        return Ok(());
    }

    tracing::info!("Running database migrations...");

    let client = pool.get().await.context("Failed to get connection for migrations")?;
    client
        .batch_execute(CREATE_TRADES_TABLE)
        .await
        .context("Failed to create trades table")?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Check if database needs migrations
pub async fn needs_migration(pool: &Pool) -> Result<bool> {
    let client = pool.get().await.context("Failed to get DB connection")?;

    let result = client
        .query_one(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'trades'",
            &[],
        )
        .await?;

    let count: i64 = result.get(0);
    Ok(count == 0)
}
