//! Jupiter aggregator client
//!
//! Quote and swap-transaction building over the Jupiter HTTP API. The rest of
//! the crate only sees the [`SwapService`] trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::agent::types::AgentError;

pub const DEFAULT_JUPITER_API: &str = "https://quote-api.jup.ag/v6";

/// Priced route returned by the aggregator.
///
/// `raw` keeps the full response body, which has to be echoed back verbatim
/// when requesting the swap transaction.
#[derive(Debug, Clone)]
pub struct Quote {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    pub raw: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    input_mint: String,
    in_amount: String,
    output_mint: String,
    out_amount: String,
}

/// Jupiter swap request payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    quote_response: &'a Value,
    user_public_key: &'a str,
    wrap_and_unwrap_sol: bool,
    dynamic_compute_unit_limit: bool,
}

/// Jupiter API swap response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
}

impl Quote {
    /// Parse a quote body, keeping the raw payload.
    pub fn from_value(raw: Value) -> Result<Self, AgentError> {
        let parsed: QuoteResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AgentError::JupiterApi(format!("Failed to parse quote response: {}", e)))?;

        let parse_amount = |field: &str, value: &str| {
            value
                .parse::<u64>()
                .map_err(|e| AgentError::JupiterApi(format!("Invalid {} '{}': {}", field, value, e)))
        };

        Ok(Self {
            in_amount: parse_amount("inAmount", &parsed.in_amount)?,
            out_amount: parse_amount("outAmount", &parsed.out_amount)?,
            input_mint: parsed.input_mint,
            output_mint: parsed.output_mint,
            raw,
        })
    }
}

/// Quote-and-swap capability of a DEX aggregator.
#[async_trait]
pub trait SwapService: Send + Sync {
    /// Quote `amount` base units of `input_mint` into `output_mint`.
    async fn quote(&self, input_mint: &str, output_mint: &str, amount: u64) -> Result<Quote, AgentError>;

    /// Build the unsigned swap transaction (base64) for `quote`, paid by `user_public_key`.
    async fn swap_transaction(&self, quote: &Quote, user_public_key: &str) -> Result<String, AgentError>;
}

/// HTTP client for the Jupiter v6 API
#[derive(Debug, Clone)]
pub struct JupiterClient {
    http_client: Client,
    base_url: String,
    slippage_bps: u16,
}

impl JupiterClient {
    pub fn new(base_url: &str, slippage_bps: u16) -> Result<Self, AgentError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            slippage_bps,
        })
    }
}

#[async_trait]
impl SwapService for JupiterClient {
    async fn quote(&self, input_mint: &str, output_mint: &str, amount: u64) -> Result<Quote, AgentError> {
        let params = [
            ("inputMint", input_mint.to_string()),
            ("outputMint", output_mint.to_string()),
            ("amount", amount.to_string()),
            ("slippageBps", self.slippage_bps.to_string()),
        ];

        let response = self.http_client
            .get(format!("{}/quote", self.base_url))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::JupiterApi(format!(
                "Quote returned HTTP {} for {}/{}",
                response.status(),
                input_mint,
                output_mint
            )));
        }

        let body: Value = response.json().await?;
        Quote::from_value(body)
    }

    async fn swap_transaction(&self, quote: &Quote, user_public_key: &str) -> Result<String, AgentError> {
        let request = SwapRequest {
            quote_response: &quote.raw,
            user_public_key,
            wrap_and_unwrap_sol: true,
            dynamic_compute_unit_limit: true,
        };

        let response = self.http_client
            .post(format!("{}/swap", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.json::<Value>().await.unwrap_or_else(|_| json!(null));
            return Err(AgentError::JupiterApi(format!("Swap returned HTTP {}: {}", status, detail)));
        }

        let swap: SwapResponse = response.json().await?;
        Ok(swap.swap_transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quote_and_keeps_route_data() {
        let body = json!({
            "inputMint": "So11111111111111111111111111111111111111112",
            "inAmount": "1000000000",
            "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "outAmount": "151230000",
            "slippageBps": 50,
            "routePlan": [{ "percent": 100 }]
        });

        let quote = Quote::from_value(body).unwrap();
        assert_eq!(quote.in_amount, 1_000_000_000);
        assert_eq!(quote.out_amount, 151_230_000);
        assert_eq!(quote.raw["routePlan"][0]["percent"], 100);
    }

    #[test]
    fn rejects_non_numeric_amounts() {
        let body = json!({
            "inputMint": "a",
            "inAmount": "1",
            "outputMint": "b",
            "outAmount": "lots"
        });
        assert!(matches!(Quote::from_value(body), Err(AgentError::JupiterApi(_))));
    }

    #[test]
    fn swap_request_uses_camel_case() {
        let raw = json!({ "outAmount": "1" });
        let request = SwapRequest {
            quote_response: &raw,
            user_public_key: "wallet",
            wrap_and_unwrap_sol: true,
            dynamic_compute_unit_limit: true,
        };
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["userPublicKey"], "wallet");
        assert_eq!(encoded["quoteResponse"]["outAmount"], "1");
        assert_eq!(encoded["dynamicComputeUnitLimit"], true);
    }
}
