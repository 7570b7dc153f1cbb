//! Configuration module for environment variables and application settings

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::agent::executor::ConfirmationPolicy;
use crate::agent::types::{AgentError, AssetDecimals};
use crate::services::jupiter::DEFAULT_JUPITER_API;

/// USDC on Solana mainnet, the default reference asset
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

#[derive(Clone)]
pub struct Config {
    /// Solana RPC endpoint
    pub rpc_url: String,

    /// Jupiter API base URL
    pub jupiter_api_url: String,

    /// Wallet public key the swap transactions are built for
    pub public_key: String,

    /// Base58 keypair; never logged
    pub private_key: String,

    /// Optional Postgres URL; without it trade state lives in memory
    pub database_url: Option<String>,

    /// Trading configuration
    pub trading: TradingConfig,
}

#[derive(Debug, Clone)]
pub struct TradingConfig {
    /// Mint of the traded token
    pub token_mint: String,
    /// Reference asset every buy and sell is denominated in
    pub base_mint: String,
    pub decimals: AssetDecimals,
    /// Fractional drop below the last trade that triggers a buy (0.10 = 10%)
    pub buy_threshold: Decimal,
    /// Fractional rise above the last trade that triggers a sell
    pub sell_threshold: Decimal,
    pub poll_interval: Duration,
    pub slippage_bps: u16,
    pub confirmation: ConfirmationPolicy,
    pub seed_balance: Option<Decimal>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("jupiter_api_url", &self.jupiter_api_url)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("trading", &self.trading)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup: &lookup };

        let confirmation = ConfirmationPolicy {
            settlement_delay: Duration::from_secs(vars.parse_or("SETTLEMENT_DELAY_SECS", 20)?),
            initial_delay: Duration::from_millis(vars.parse_or("CONFIRM_POLL_INTERVAL_MS", 1_000)?),
            backoff_multiplier: 2,
            max_delay: Duration::from_millis(vars.parse_or("CONFIRM_MAX_POLL_INTERVAL_MS", 10_000)?),
            timeout: Duration::from_secs(vars.parse_or("CONFIRM_TIMEOUT_SECS", 90)?),
        };

        let poll_interval_secs: u64 = vars.parse_or("POLL_INTERVAL_SECS", 60)?;
        if poll_interval_secs == 0 {
            return Err(AgentError::Configuration("POLL_INTERVAL_SECS must be positive".to_string()));
        }

        let decimals = AssetDecimals {
            token: vars.parse_or("TOKEN_DECIMALS", 6)?,
            reference: vars.parse_or("BASE_DECIMALS", 6)?,
        };
        decimals.validate()?;

        let seed_balance = vars.parse_opt::<Decimal>("SEED_BALANCE")?;
        if seed_balance.is_some_and(|b| b <= Decimal::ZERO) {
            return Err(AgentError::Configuration("SEED_BALANCE must be positive".to_string()));
        }

        Ok(Self {
            rpc_url: vars.required("RPC_URL")?,
            jupiter_api_url: vars.get("JUPITER_API_URL").unwrap_or_else(|| DEFAULT_JUPITER_API.to_string()),
            public_key: vars.required("PUBLIC_KEY")?,
            private_key: vars.required("PRIVATE_KEY")?,
            database_url: vars.get("DATABASE_URL"),
            trading: TradingConfig {
                token_mint: vars.required("TOKEN_MINT")?,
                base_mint: vars.get("BASE_MINT").unwrap_or_else(|| USDC_MINT.to_string()),
                decimals,
                buy_threshold: vars.parse_or("BUY_THRESHOLD", Decimal::new(10, 2))?,
                sell_threshold: vars.parse_or("SELL_THRESHOLD", Decimal::new(20, 2))?,
                poll_interval: Duration::from_secs(poll_interval_secs),
                slippage_bps: vars.parse_or("SLIPPAGE_BPS", 50)?,
                confirmation,
                seed_balance,
            },
        })
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, AgentError> {
        self.get(key)
            .ok_or_else(|| AgentError::Configuration(format!("{} environment variable is not set", key)))
    }

    fn parse_opt<T>(&self, key: &str) -> Result<Option<T>, AgentError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| AgentError::Configuration(format!("Invalid {} '{}': {}", key, raw, e)))
            })
            .transpose()
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, AgentError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Ok(self.parse_opt(key)?.unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("RPC_URL", "https://api.mainnet-beta.solana.com"),
            ("PUBLIC_KEY", "wallet"),
            ("PRIVATE_KEY", "secret-key"),
            ("TOKEN_MINT", "So11111111111111111111111111111111111111112"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, AgentError> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn applies_defaults() {
        let config = load(&base_vars()).unwrap();
        assert_eq!(config.trading.base_mint, USDC_MINT);
        assert_eq!(config.jupiter_api_url, DEFAULT_JUPITER_API);
        assert_eq!(config.trading.buy_threshold, Decimal::from_str("0.10").unwrap());
        assert_eq!(config.trading.sell_threshold, Decimal::from_str("0.20").unwrap());
        assert_eq!(config.trading.poll_interval, Duration::from_secs(60));
        assert_eq!(config.trading.confirmation.settlement_delay, Duration::from_secs(20));
        assert!(config.database_url.is_none());
        assert!(config.trading.seed_balance.is_none());
    }

    #[test]
    fn missing_required_variable_is_configuration_error() {
        for key in ["RPC_URL", "PUBLIC_KEY", "PRIVATE_KEY", "TOKEN_MINT"] {
            let mut vars = base_vars();
            vars.remove(key);
            match load(&vars) {
                Err(AgentError::Configuration(msg)) => assert!(msg.contains(key)),
                other => panic!("expected configuration error for {}, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut vars = base_vars();
        vars.insert("RPC_URL", "   ");
        vars.insert("BASE_MINT", "");
        assert!(load(&vars).is_err());

        let mut vars = base_vars();
        vars.insert("BASE_MINT", "");
        assert_eq!(load(&vars).unwrap().trading.base_mint, USDC_MINT);
    }

    #[test]
    fn reads_overrides() {
        let mut vars = base_vars();
        vars.insert("BUY_THRESHOLD", "0.05");
        vars.insert("SELL_THRESHOLD", "0.5");
        vars.insert("TOKEN_DECIMALS", "9");
        vars.insert("SEED_BALANCE", "100.5");
        vars.insert("DATABASE_URL", "postgres://localhost/trades");

        let config = load(&vars).unwrap();
        assert_eq!(config.trading.buy_threshold, Decimal::from_str("0.05").unwrap());
        assert_eq!(config.trading.decimals.token, 9);
        assert_eq!(config.trading.seed_balance, Some(Decimal::from_str("100.5").unwrap()));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/trades"));
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let mut vars = base_vars();
        vars.insert("BUY_THRESHOLD", "ten percent");
        assert!(matches!(load(&vars), Err(AgentError::Configuration(_))));

        let mut vars = base_vars();
        vars.insert("POLL_INTERVAL_SECS", "0");
        assert!(matches!(load(&vars), Err(AgentError::Configuration(_))));
    }

    #[test]
    fn rejects_out_of_range_decimals() {
        for (key, value) in [("BASE_DECIMALS", "29"), ("TOKEN_DECIMALS", "20")] {
            let mut vars = base_vars();
            vars.insert(key, value);
            match load(&vars) {
                Err(AgentError::Configuration(msg)) => assert!(msg.contains(key)),
                other => panic!("expected configuration error for {}={}, got {:?}", key, value, other),
            }
        }

        let mut vars = base_vars();
        vars.insert("TOKEN_DECIMALS", "19");
        vars.insert("BASE_DECIMALS", "19");
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn debug_output_hides_private_key() {
        let config = load(&base_vars()).unwrap();
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
