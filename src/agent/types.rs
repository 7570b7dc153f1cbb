use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Errors surfaced by the trading components.
///
/// Everything except `Configuration` and `Storage` is recoverable: the loop
/// logs it and moves on to the next cycle.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Price quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Swap quote failed: {0}")]
    QuoteFailed(String),

    #[error("Swap submission failed: {0}")]
    SwapSubmissionFailed(String),

    #[error("Transaction {signature} not confirmed (last status: {status})")]
    TransactionUnconfirmed {
        signature: String,
        status: ConfirmationStatus,
    },

    #[error("No trade record for token {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Jupiter API error: {0}")]
    JupiterApi(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AgentError {
    /// Storage failures end the loop; everything else only ends the cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::Configuration(_) | AgentError::Storage(_))
    }
}

/// Side of a swap, always expressed relative to the traded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Reference asset -> token
    Buy,
    /// Token -> reference asset
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "buy"),
            Direction::Sell => write!(f, "sell"),
        }
    }
}

/// Settlement state of a broadcast transaction as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    NotConfirmed,
    /// The transaction landed but the runtime rejected it.
    Failed(String),
    /// The status query itself errored.
    Error(String),
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationStatus::Confirmed => write!(f, "confirmed"),
            ConfirmationStatus::NotConfirmed => write!(f, "not confirmed"),
            ConfirmationStatus::Failed(reason) => write!(f, "failed: {}", reason),
            ConfirmationStatus::Error(reason) => write!(f, "query error: {}", reason),
        }
    }
}

/// Outcome of a confirmed swap.
#[derive(Debug, Clone)]
pub struct SwapResult {
    pub signature: String,
    pub direction: Direction,
    pub in_amount: Decimal,
    pub out_amount: Decimal,
    pub status: ConfirmationStatus,
}

/// Output of a single rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub triggered: bool,
    pub amount: Decimal,
}

impl Signal {
    pub fn none() -> Self {
        Self {
            triggered: false,
            amount: Decimal::ZERO,
        }
    }
}

/// What the loop should do this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Buy { amount: Decimal },
    Sell { amount: Decimal },
    Hold,
}

/// Asset decimals used to move between UI amounts and on-chain base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDecimals {
    pub token: u32,
    pub reference: u32,
}

impl AssetDecimals {
    /// Largest decimals whose unit amount (10^n) still fits in a `u64`.
    pub const MAX: u32 = 19;

    pub fn validate(&self) -> Result<(), AgentError> {
        for (name, value) in [("TOKEN_DECIMALS", self.token), ("BASE_DECIMALS", self.reference)] {
            if value > Self::MAX {
                return Err(AgentError::Configuration(format!(
                    "{} must be at most {}, got {}",
                    name,
                    Self::MAX,
                    value
                )));
            }
        }
        Ok(())
    }

    /// Decimals of the asset spent by a swap in `direction`.
    pub fn input(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Buy => self.reference,
            Direction::Sell => self.token,
        }
    }

    /// Decimals of the asset received by a swap in `direction`.
    pub fn output(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Buy => self.token,
            Direction::Sell => self.reference,
        }
    }
}

/// Converts a UI amount into integer base units, truncating sub-unit dust.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Option<u64> {
    let factor = Decimal::from(10u64.checked_pow(decimals)?);
    amount.checked_mul(factor)?.trunc().to_u64()
}

/// Converts integer base units into an exact UI amount.
pub fn from_base_units(units: u64, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(units as i128, decimals).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn base_units_truncate_dust() {
        let amount = Decimal::from_str("1.2345678").unwrap();
        assert_eq!(to_base_units(amount, 6), Some(1_234_567));
        assert_eq!(to_base_units(Decimal::from_str("0.0000001").unwrap(), 6), Some(0));
    }

    #[test]
    fn base_units_reject_negative_amounts() {
        assert_eq!(to_base_units(Decimal::from(-1), 6), None);
    }

    #[test]
    fn from_base_units_is_exact() {
        assert_eq!(from_base_units(90_010_000, 6), Decimal::from_str("90.01").unwrap());
        assert_eq!(from_base_units(1, 9), Decimal::from_str("0.000000001").unwrap());
    }

    #[test]
    fn decimals_above_u64_range_are_rejected() {
        assert!(AssetDecimals { token: 19, reference: 19 }.validate().is_ok());
        assert!(AssetDecimals { token: 20, reference: 6 }.validate().is_err());
        assert!(matches!(
            AssetDecimals { token: 6, reference: 29 }.validate(),
            Err(AgentError::Configuration(msg)) if msg.contains("BASE_DECIMALS")
        ));
        assert_eq!(from_base_units(u64::MAX, AssetDecimals::MAX), Decimal::from_str("1.8446744073709551615").unwrap());
    }

    #[test]
    fn decimals_follow_direction() {
        let decimals = AssetDecimals { token: 9, reference: 6 };
        assert_eq!(decimals.input(Direction::Buy), 6);
        assert_eq!(decimals.output(Direction::Buy), 9);
        assert_eq!(decimals.input(Direction::Sell), 9);
        assert_eq!(decimals.output(Direction::Sell), 6);
    }

    #[test]
    fn only_storage_and_config_errors_are_fatal() {
        assert!(AgentError::Storage("down".into()).is_fatal());
        assert!(AgentError::Configuration("missing".into()).is_fatal());
        assert!(!AgentError::QuoteFailed("503".into()).is_fatal());
        assert!(!AgentError::NotFound("mint".into()).is_fatal());
    }
}
