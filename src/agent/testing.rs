//! Scripted fakes for the external services, shared by the agent tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::agent::types::{AgentError, ConfirmationStatus};
use crate::services::jupiter::Quote;
use crate::services::{Ledger, SwapService};

/// Swap service answering from a queue of scripted responses.
#[derive(Default)]
pub struct MockSwapService {
    quotes: Mutex<VecDeque<Result<u64, String>>>,
    swaps: Mutex<VecDeque<Result<String, String>>>,
    quote_calls: Mutex<Vec<(String, String, u64)>>,
    swap_calls: Mutex<usize>,
}

impl MockSwapService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output amount (or error) of the next quote.
    pub fn push_quote(&self, out_amount: Result<u64, String>) {
        self.quotes.lock().push_back(out_amount);
    }

    pub fn push_swap(&self, payload: Result<String, String>) {
        self.swaps.lock().push_back(payload);
    }

    pub fn quote_calls(&self) -> Vec<(String, String, u64)> {
        self.quote_calls.lock().clone()
    }

    pub fn swap_calls(&self) -> usize {
        *self.swap_calls.lock()
    }
}

#[async_trait]
impl SwapService for MockSwapService {
    async fn quote(&self, input_mint: &str, output_mint: &str, amount: u64) -> Result<Quote, AgentError> {
        self.quote_calls
            .lock()
            .push((input_mint.to_string(), output_mint.to_string(), amount));

        let out_amount = self.quotes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err("no quote scripted".to_string()))
            .map_err(AgentError::JupiterApi)?;

        Ok(Quote {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            in_amount: amount,
            out_amount,
            raw: json!({ "outAmount": out_amount.to_string() }),
        })
    }

    async fn swap_transaction(&self, _quote: &Quote, _user_public_key: &str) -> Result<String, AgentError> {
        *self.swap_calls.lock() += 1;
        self.swaps
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("c3dhcA==".to_string()))
            .map_err(AgentError::JupiterApi)
    }
}

/// Ledger answering confirmation polls from a queue; an empty queue means
/// the transaction never confirms.
#[derive(Default)]
pub struct MockLedger {
    submits: Mutex<VecDeque<Result<String, String>>>,
    statuses: Mutex<VecDeque<Result<ConfirmationStatus, String>>>,
    submit_calls: Mutex<usize>,
    check_calls: Mutex<usize>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger whose first poll reports the transaction as confirmed.
    pub fn confirming() -> Self {
        let ledger = Self::new();
        ledger.push_status(Ok(ConfirmationStatus::Confirmed));
        ledger
    }

    pub fn push_submit(&self, result: Result<String, String>) {
        self.submits.lock().push_back(result);
    }

    pub fn push_status(&self, status: Result<ConfirmationStatus, String>) {
        self.statuses.lock().push_back(status);
    }

    pub fn submit_calls(&self) -> usize {
        *self.submit_calls.lock()
    }

    pub fn check_calls(&self) -> usize {
        *self.check_calls.lock()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn submit_transaction(&self, _payload: &str) -> Result<String, AgentError> {
        let mut calls = self.submit_calls.lock();
        *calls += 1;
        let default_signature = format!("sig-{}", *calls);
        drop(calls);

        self.submits
            .lock()
            .pop_front()
            .unwrap_or(Ok(default_signature))
            .map_err(AgentError::Ledger)
    }

    async fn check_confirmation(&self, _signature: &str) -> Result<ConfirmationStatus, AgentError> {
        *self.check_calls.lock() += 1;
        self.statuses
            .lock()
            .pop_front()
            .unwrap_or(Ok(ConfirmationStatus::NotConfirmed))
            .map_err(AgentError::Ledger)
    }
}
