use tracing::debug;

use crate::{Error, Result, TradingMode};

/// Process configuration loaded from environment variables at startup.
///
/// Market parameters (symbol, interval, quantity, predictor) live in the TOML
/// monitor file pointed to by `monitor_config_path`.
#[derive(Debug, Clone)]
pub struct Config {
    // Exchange credentials
    pub binance_api_key: String,
    pub binance_secret: String,

    // Telegram
    pub telegram_token: String,

    // Trading
    pub trading_mode: TradingMode,
    pub paper_slippage_bps: f64,

    // Monitor config file path
    pub monitor_config_path: String,
}

impl Config {
    /// Load configuration from the process environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        if dotenvy::dotenv().is_err() {
            debug!("No .env file found, using process environment only");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                Error::Config(format!(
                    "Required environment variable '{key}' is not set. Check your .env file."
                ))
            })
        };

        let trading_mode = match lookup("TRADING_MODE") {
            Some(raw) => raw
                .parse::<TradingMode>()
                .map_err(|e| Error::Config(format!("TRADING_MODE {e}")))?,
            None => TradingMode::Paper,
        };

        let paper_slippage_bps = match lookup("PAPER_SLIPPAGE_BPS") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                Error::Config(format!("PAPER_SLIPPAGE_BPS must be a number, got: '{raw}'"))
            })?,
            None => 10.0,
        };
        if !(0.0..10_000.0).contains(&paper_slippage_bps) {
            return Err(Error::Config(format!(
                "PAPER_SLIPPAGE_BPS out of range: {paper_slippage_bps}"
            )));
        }

        Ok(Config {
            binance_api_key: required("BINANCE_API_KEY")?,
            binance_secret: required("BINANCE_SECRET")?,
            telegram_token: required("TELEGRAM_TOKEN")?,
            trading_mode,
            paper_slippage_bps,
            monitor_config_path: lookup("MONITOR_CONFIG_PATH")
                .unwrap_or_else(|| "config/monitor.toml".to_string()),
        })
    }
}
