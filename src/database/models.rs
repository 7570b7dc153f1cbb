// Database Models
//
// Tokio-postgres compatible models for the trade state persisted between runs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::Row;

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> where Self: Sized;
}

/// Last trade state for a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    pub token_address: String,
    /// Price of the last confirmed trade, in reference units per token
    pub last_price: Decimal,
    pub holding: bool,
    /// Quantity of the asset the next trade spends
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn new(token_address: &str, last_price: Decimal, holding: bool, balance: Decimal) -> Self {
        Self {
            token_address: token_address.to_string(),
            last_price,
            holding,
            balance,
            updated_at: Utc::now(),
        }
    }

    /// True when the stored values match, ignoring the write timestamp.
    pub fn same_state(&self, last_price: Decimal, holding: bool, balance: Decimal) -> bool {
        self.last_price == last_price && self.holding == holding && self.balance == balance
    }
}

impl FromRow for TradeRecord {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            token_address: row.try_get("token_address")?,
            last_price: row.try_get::<_, Decimal>("last_price")?,
            holding: row.try_get("holding")?,
            balance: row.try_get::<_, Decimal>("balance")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
