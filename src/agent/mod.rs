pub mod types;
pub mod data_fetcher;
pub mod strategy;
pub mod executor;
pub mod trading_agent;

#[cfg(test)]
pub mod testing;

pub use trading_agent::{TradingAgent, TradingAgentConfig};
