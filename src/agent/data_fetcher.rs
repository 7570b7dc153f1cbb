use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::agent::types::{AgentError, AssetDecimals, from_base_units};
use crate::services::SwapService;

/// Current token price, read from aggregator quotes.
pub struct PriceOracle {
    swap_service: Arc<dyn SwapService>,
    reference_mint: String,
    decimals: AssetDecimals,
}

impl PriceOracle {
    pub fn new(swap_service: Arc<dyn SwapService>, reference_mint: &str, decimals: AssetDecimals) -> Self {
        Self {
            swap_service,
            reference_mint: reference_mint.to_string(),
            decimals,
        }
    }

    /// Reference units paid for one whole token.
    ///
    /// Quotes exactly one token (10^decimals base units) so the output amount
    /// is the unit price once scaled by the reference decimals.
    pub async fn get_current_price(&self, token_mint: &str) -> Result<Decimal, AgentError> {
        let one_token = 10u64
            .checked_pow(self.decimals.token)
            .ok_or_else(|| AgentError::Configuration(format!("token decimals {} too large", self.decimals.token)))?;

        let quote = self.swap_service
            .quote(token_mint, &self.reference_mint, one_token)
            .await
            .map_err(|e| {
                warn!(token = token_mint, error = %e, "price quote failed");
                AgentError::QuoteUnavailable(e.to_string())
            })?;

        let price = from_base_units(quote.out_amount, self.decimals.reference);
        debug!(token = token_mint, %price, "fetched current price");
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::MockSwapService;
    use std::str::FromStr;

    const DECIMALS: AssetDecimals = AssetDecimals { token: 9, reference: 6 };

    #[tokio::test]
    async fn price_is_output_per_whole_token() {
        let service = Arc::new(MockSwapService::new());
        service.push_quote(Ok(151_230_000));
        let oracle = PriceOracle::new(service.clone(), "USDC", DECIMALS);

        let price = oracle.get_current_price("SOL").await.unwrap();
        assert_eq!(price, Decimal::from_str("151.23").unwrap());

        let calls = service.quote_calls();
        assert_eq!(calls, vec![("SOL".to_string(), "USDC".to_string(), 1_000_000_000)]);
    }

    #[tokio::test]
    async fn service_failure_maps_to_quote_unavailable() {
        let service = Arc::new(MockSwapService::new());
        service.push_quote(Err("HTTP 503".to_string()));
        let oracle = PriceOracle::new(service, "USDC", DECIMALS);

        let err = oracle.get_current_price("SOL").await.unwrap_err();
        assert!(matches!(err, AgentError::QuoteUnavailable(_)));
    }
}
