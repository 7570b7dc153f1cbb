use rust_decimal::Decimal;
use tracing::debug;

use crate::agent::types::{AgentError, Decision, Signal};
use crate::database::models::TradeRecord;

/// Trading rule consulted once per cycle.
///
/// `record` is the last persisted trade for the token, `None` when no trade
/// has happened yet.
pub trait DecisionPolicy: Send + Sync {
    fn should_buy(&self, current_price: Decimal, record: Option<&TradeRecord>) -> Signal;

    fn should_sell(&self, current_price: Decimal, record: Option<&TradeRecord>) -> Signal;

    /// Buy takes precedence; sell is only evaluated when buy did not trigger.
    ///
    /// `balance` is denominated in whatever the last trade received, so a
    /// buy is only taken while flat and a sell only while holding.
    fn decide(&self, current_price: Decimal, record: Option<&TradeRecord>) -> Decision {
        let holding = record.is_some_and(|r| r.holding);

        let buy = self.should_buy(current_price, record);
        if buy.triggered {
            if !holding {
                return Decision::Buy { amount: buy.amount };
            }
            debug!(%current_price, "buy signal ignored, position already open");
            return Decision::Hold;
        }
        let sell = self.should_sell(current_price, record);
        if sell.triggered {
            if holding {
                return Decision::Sell { amount: sell.amount };
            }
            debug!(%current_price, "sell signal ignored, no open position");
        }
        Decision::Hold
    }
}

/// Percentage-threshold rule around the last trade price.
///
/// Buys once the price has dropped `buy_threshold` below the last trade and
/// sells once it has risen `sell_threshold` above it.
#[derive(Debug, Clone)]
pub struct ThresholdStrategy {
    buy_threshold: Decimal,
    sell_threshold: Decimal,
}

impl ThresholdStrategy {
    pub fn new(buy_threshold: Decimal, sell_threshold: Decimal) -> Result<Self, AgentError> {
        if buy_threshold <= Decimal::ZERO || buy_threshold >= Decimal::ONE {
            return Err(AgentError::Configuration(format!(
                "buy threshold must be within (0, 1), got {}",
                buy_threshold
            )));
        }
        if sell_threshold <= Decimal::ZERO {
            return Err(AgentError::Configuration(format!(
                "sell threshold must be positive, got {}",
                sell_threshold
            )));
        }
        Ok(Self { buy_threshold, sell_threshold })
    }

    pub fn buy_trigger_price(&self, last_price: Decimal) -> Decimal {
        last_price * (Decimal::ONE - self.buy_threshold)
    }

    pub fn sell_trigger_price(&self, last_price: Decimal) -> Decimal {
        last_price * (Decimal::ONE + self.sell_threshold)
    }
}

impl DecisionPolicy for ThresholdStrategy {
    fn should_buy(&self, current_price: Decimal, record: Option<&TradeRecord>) -> Signal {
        let Some(record) = record else {
            return Signal::none();
        };
        let trigger = self.buy_trigger_price(record.last_price);
        debug!(%current_price, last_price = %record.last_price, %trigger, "evaluating buy");
        Signal {
            triggered: current_price <= trigger,
            amount: record.balance,
        }
    }

    fn should_sell(&self, current_price: Decimal, record: Option<&TradeRecord>) -> Signal {
        let Some(record) = record else {
            return Signal::none();
        };
        let trigger = self.sell_trigger_price(record.last_price);
        debug!(%current_price, last_price = %record.last_price, %trigger, "evaluating sell");
        Signal {
            triggered: current_price >= trigger,
            amount: record.balance,
        }
    }
}
