use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::agent::data_fetcher::PriceOracle;
use crate::agent::executor::SwapExecutor;
use crate::agent::strategy::DecisionPolicy;
use crate::agent::types::{AgentError, Decision, Direction, SwapResult};
use crate::database::TradeRecordStore;

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Price could not be fetched
    Skipped,
    Held { price: Decimal },
    Traded { direction: Direction, price: Decimal, signature: String },
    /// A swap was attempted and failed; the record was left untouched
    TradeFailed { direction: Direction, price: Decimal },
}

#[derive(Debug, Clone)]
pub struct TradingAgentConfig {
    pub token_mint: String,
    pub poll_interval: Duration,
    /// Baseline balance written when no record exists at startup
    pub seed_balance: Option<Decimal>,
}

/// Main trading loop: price -> decide -> execute -> persist -> sleep.
pub struct TradingAgent {
    oracle: PriceOracle,
    policy: Arc<dyn DecisionPolicy>,
    executor: SwapExecutor,
    store: Arc<dyn TradeRecordStore>,
    config: TradingAgentConfig,
}

impl TradingAgent {
    pub fn new(
        config: TradingAgentConfig,
        oracle: PriceOracle,
        policy: Arc<dyn DecisionPolicy>,
        executor: SwapExecutor,
        store: Arc<dyn TradeRecordStore>,
    ) -> Self {
        Self {
            oracle,
            policy,
            executor,
            store,
            config,
        }
    }

    /// Run cycles until `shutdown` resolves or a fatal error occurs.
    ///
    /// Shutdown is observed between cycles; a cycle in flight always finishes.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), AgentError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let token = self.config.token_mint.as_str();

        info!(token, interval = ?self.config.poll_interval, "🤖 trading agent started");

        if let Some(balance) = self.config.seed_balance {
            self.seed_position(balance).await?;
        }

        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            let span = info_span!("cycle", token, cycle);
            match self.run_cycle().instrument(span).await {
                Ok(outcome) => debug!(cycle, ?outcome, "cycle finished"),
                Err(e) if !e.is_fatal() => warn!(token, cycle, error = %e, "cycle aborted"),
                Err(e) => {
                    error!(token, cycle, error = %e, "fatal error, stopping trading agent");
                    return Err(e);
                }
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!(token, "shutdown requested, trading agent stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// One full cycle. Only storage failures are returned as errors; price
    /// and swap failures are logged and reported through the outcome.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, AgentError> {
        let token = self.config.token_mint.as_str();

        let price = match self.oracle.get_current_price(token).await {
            Ok(price) => price,
            Err(e) => {
                warn!(token, phase = "price", error = %e, "skipping cycle");
                return Ok(CycleOutcome::Skipped);
            }
        };

        let record = match self.store.get(token).await {
            Ok(record) => Some(record),
            Err(AgentError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        info!(
            token,
            %price,
            last_price = ?record.as_ref().map(|r| r.last_price),
            holding = ?record.as_ref().map(|r| r.holding),
            "current price"
        );

        let (direction, amount) = match self.policy.decide(price, record.as_ref()) {
            Decision::Buy { amount } => (Direction::Buy, amount),
            Decision::Sell { amount } => (Direction::Sell, amount),
            Decision::Hold => return Ok(CycleOutcome::Held { price }),
        };

        info!(token, %direction, %amount, %price, "threshold crossed, executing swap");

        match self.executor.execute_swap(token, amount, direction).await {
            Ok(result) => {
                self.record_trade(price, &result).await?;
                Ok(CycleOutcome::Traded {
                    direction,
                    price,
                    signature: result.signature,
                })
            }
            Err(e @ AgentError::TransactionUnconfirmed { .. }) => {
                // Funds may have moved without the record reflecting it.
                error!(token, phase = "confirmation", %direction, error = %e, "swap state unknown, record left unchanged");
                Ok(CycleOutcome::TradeFailed { direction, price })
            }
            Err(e) => {
                warn!(token, phase = "swap", %direction, error = %e, "swap failed, position unchanged");
                Ok(CycleOutcome::TradeFailed { direction, price })
            }
        }
    }

    async fn record_trade(&self, price: Decimal, result: &SwapResult) -> Result<(), AgentError> {
        let holding = result.direction == Direction::Buy;
        self.store
            .upsert(&self.config.token_mint, price, holding, result.out_amount)
            .await?;

        info!(
            token = %self.config.token_mint,
            %price,
            holding,
            balance = %result.out_amount,
            spent = %result.in_amount,
            status = %result.status,
            signature = %result.signature,
            "trade recorded"
        );
        Ok(())
    }

    /// Write a baseline record at the current price if none exists yet.
    async fn seed_position(&self, balance: Decimal) -> Result<(), AgentError> {
        let token = self.config.token_mint.as_str();
        match self.store.get(token).await {
            Ok(record) => {
                debug!(token, last_price = %record.last_price, "record exists, not seeding");
                return Ok(());
            }
            Err(AgentError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let price = match self.oracle.get_current_price(token).await {
            Ok(price) => price,
            Err(e) => {
                warn!(token, error = %e, "could not price seed position, will retry on next start");
                return Ok(());
            }
        };

        self.store.upsert(token, price, false, balance).await?;
        info!(token, %price, %balance, "🌱 seeded baseline position");
        Ok(())
    }
}
