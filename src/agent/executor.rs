use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::agent::types::{
    AgentError, AssetDecimals, ConfirmationStatus, Direction, SwapResult, from_base_units, to_base_units,
};
use crate::services::{Ledger, SwapService};

/// How long to wait for a broadcast transaction to settle.
///
/// After `settlement_delay` the ledger is polled, starting at `initial_delay`
/// between polls and growing by `backoff_multiplier` up to `max_delay`, until
/// `timeout` has elapsed.
#[derive(Debug, Clone)]
pub struct ConfirmationPolicy {
    pub settlement_delay: Duration,
    pub initial_delay: Duration,
    pub backoff_multiplier: u32,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            settlement_delay: Duration::from_secs(20),
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2,
            max_delay: Duration::from_millis(10_000),
            timeout: Duration::from_secs(90),
        }
    }
}

impl ConfirmationPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        current
            .checked_mul(self.backoff_multiplier.max(1))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Submits swaps through the aggregator and waits for on-chain settlement.
///
/// One attempt per call: a failed quote, submission or confirmation is
/// returned to the caller without re-quoting.
pub struct SwapExecutor {
    swap_service: Arc<dyn SwapService>,
    ledger: Arc<dyn Ledger>,
    reference_mint: String,
    wallet_pubkey: String,
    decimals: AssetDecimals,
    policy: ConfirmationPolicy,
}

impl SwapExecutor {
    pub fn new(
        swap_service: Arc<dyn SwapService>,
        ledger: Arc<dyn Ledger>,
        reference_mint: &str,
        wallet_pubkey: &str,
        decimals: AssetDecimals,
        policy: ConfirmationPolicy,
    ) -> Self {
        Self {
            swap_service,
            ledger,
            reference_mint: reference_mint.to_string(),
            wallet_pubkey: wallet_pubkey.to_string(),
            decimals,
            policy,
        }
    }

    /// Swap `amount` of the input asset for `direction` and wait for confirmation.
    pub async fn execute_swap(
        &self,
        token_mint: &str,
        amount: Decimal,
        direction: Direction,
    ) -> Result<SwapResult, AgentError> {
        let (input_mint, output_mint) = match direction {
            Direction::Buy => (self.reference_mint.as_str(), token_mint),
            Direction::Sell => (token_mint, self.reference_mint.as_str()),
        };

        let input_decimals = self.decimals.input(direction);
        let base_amount = to_base_units(amount, input_decimals)
            .filter(|units| *units > 0)
            .ok_or_else(|| AgentError::QuoteFailed(format!(
                "amount {} is not a positive quantity at {} decimals",
                amount, input_decimals
            )))?;

        info!(token = token_mint, %direction, %amount, base_amount, "requesting swap quote");

        let quote = self.swap_service
            .quote(input_mint, output_mint, base_amount)
            .await
            .map_err(|e| AgentError::QuoteFailed(e.to_string()))?;

        debug!(
            input = %quote.input_mint,
            output = %quote.output_mint,
            in_amount = quote.in_amount,
            out_amount = quote.out_amount,
            "quote received"
        );

        let payload = self.swap_service
            .swap_transaction(&quote, &self.wallet_pubkey)
            .await
            .map_err(|e| AgentError::SwapSubmissionFailed(e.to_string()))?;

        let signature = self.ledger
            .submit_transaction(&payload)
            .await
            .map_err(|e| AgentError::SwapSubmissionFailed(e.to_string()))?;

        info!(token = token_mint, %direction, %signature, "swap transaction broadcast");

        self.await_confirmation(&signature).await?;

        info!(token = token_mint, %direction, %signature, "swap confirmed");

        Ok(SwapResult {
            signature,
            direction,
            in_amount: from_base_units(quote.in_amount, input_decimals),
            out_amount: from_base_units(quote.out_amount, self.decimals.output(direction)),
            status: ConfirmationStatus::Confirmed,
        })
    }

    /// Poll the ledger with backoff until the transaction confirms, fails, or
    /// the policy timeout runs out.
    async fn await_confirmation(&self, signature: &str) -> Result<(), AgentError> {
        sleep(self.policy.settlement_delay).await;

        let deadline = Instant::now() + self.policy.timeout;
        let mut delay = self.policy.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let status = match self.ledger.check_confirmation(signature).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(%signature, attempt, error = %e, "confirmation poll failed");
                    ConfirmationStatus::Error(e.to_string())
                }
            };

            match status {
                ConfirmationStatus::Confirmed => return Ok(()),
                ConfirmationStatus::Failed(reason) => {
                    error!(%signature, %reason, "transaction failed on-chain");
                    return Err(AgentError::TransactionUnconfirmed {
                        signature: signature.to_string(),
                        status: ConfirmationStatus::Failed(reason),
                    });
                }
                pending => {
                    if Instant::now() + delay > deadline {
                        return Err(AgentError::TransactionUnconfirmed {
                            signature: signature.to_string(),
                            status: pending,
                        });
                    }
                    debug!(%signature, attempt, ?delay, "transaction not confirmed yet");
                    sleep(delay).await;
                    delay = self.policy.next_delay(delay);
                }
            }
        }
    }
}
