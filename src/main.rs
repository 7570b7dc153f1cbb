//! # sol-trader
//!
//! Threshold trading bot for a single Solana token. Every cycle it prices the
//! token against a reference asset through Jupiter, compares the price with the
//! last confirmed trade, and swaps when the move crosses the configured buy or
//! sell threshold.
//!
//! ## Architecture
//! - `config`: environment configuration
//! - `database`: Postgres pool, schema and the trade record store
//! - `services`: Jupiter quote/swap client and Solana ledger client
//! - `agent`: price oracle, decision policy, swap executor and the trading loop
//!
//! ## Environment Setup
//! Put `RPC_URL`, `PUBLIC_KEY`, `PRIVATE_KEY` and `TOKEN_MINT` (plus the
//! optional tuning variables) in the environment or a `.env` file, then:
//! ```bash
//! cargo run
//! ```

mod agent;
mod config;
mod database;
mod services;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::agent::data_fetcher::PriceOracle;
use crate::agent::executor::SwapExecutor;
use crate::agent::strategy::ThresholdStrategy;
use crate::agent::{TradingAgent, TradingAgentConfig};
use crate::config::Config;
use crate::database::{DatabaseConnection, InMemoryTradeStore, PostgresTradeStore, TradeRecordStore};
use crate::services::{JupiterClient, SolanaLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!("🏁 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let store = open_store(&config).await?;

    let ledger = Arc::new(
        SolanaLedger::new(&config.rpc_url, &config.private_key, &config.public_key)
            .context("Failed to initialise ledger client")?,
    );
    let jupiter = Arc::new(
        JupiterClient::new(&config.jupiter_api_url, config.trading.slippage_bps)
            .context("Failed to initialise Jupiter client")?,
    );

    let trading = &config.trading;
    let policy = Arc::new(
        ThresholdStrategy::new(trading.buy_threshold, trading.sell_threshold)
            .context("Invalid trading thresholds")?,
    );

    let oracle = PriceOracle::new(jupiter.clone(), &trading.base_mint, trading.decimals);
    let executor = SwapExecutor::new(
        jupiter,
        ledger.clone(),
        &trading.base_mint,
        &ledger.pubkey().to_string(),
        trading.decimals,
        trading.confirmation.clone(),
    );

    let agent = TradingAgent::new(
        TradingAgentConfig {
            token_mint: trading.token_mint.clone(),
            poll_interval: trading.poll_interval,
            seed_balance: trading.seed_balance,
        },
        oracle,
        policy,
        executor,
        store,
    );

    tracing::info!(
        token = %trading.token_mint,
        base = %trading.base_mint,
        buy_threshold = %trading.buy_threshold,
        sell_threshold = %trading.sell_threshold,
        wallet = %ledger.pubkey(),
        "📈 trading agent configured"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    agent.run(shutdown).await.context("Trading agent stopped")?;
    Ok(())
}

/// Connect to Postgres when configured, otherwise fall back to process memory.
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn TradeRecordStore>> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("⚠️  DATABASE_URL not set, trade state will not survive a restart");
        return Ok(Arc::new(InMemoryTradeStore::new()));
    };

    let db = DatabaseConnection::from_url(url)
        .await
        .context("Failed to connect to database")?;
    database::migrations::run_migrations(db.pool())
        .await
        .context("Failed to run database migrations")?;

    Ok(Arc::new(PostgresTradeStore::new(db.pool().clone())))
}
