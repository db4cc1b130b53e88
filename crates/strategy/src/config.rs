use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Result};

use crate::predictor::{ConstantPredictor, LinearTrendPredictor, Predictor};

/// Kline intervals accepted by the Binance `/api/v3/klines` endpoint, with
/// their length in seconds (`1M` counted as 30 days).
pub const KLINE_INTERVALS: &[(&str, u64)] = &[
    ("1s", 1),
    ("1m", 60),
    ("3m", 180),
    ("5m", 300),
    ("15m", 900),
    ("30m", 1_800),
    ("1h", 3_600),
    ("2h", 7_200),
    ("4h", 14_400),
    ("6h", 21_600),
    ("8h", 28_800),
    ("12h", 43_200),
    ("1d", 86_400),
    ("3d", 259_200),
    ("1w", 604_800),
    ("1M", 2_592_000),
];

/// Five kline pages. Larger windows cannot be fetched within one call timeout.
pub const MAX_LOOKBACK_BARS: u64 = 5_000;
pub const MAX_EVALUATION_INTERVAL_SECS: u64 = 30 * 86_400;
pub const MAX_CALL_TIMEOUT_SECS: u64 = 300;

/// Monitor config file (TOML).
///
/// Example `config/monitor.toml`:
/// ```toml
/// symbol = "BTCUSDT"
/// kline_interval = "1d"
/// lookback_days = 30
/// order_quantity = 0.001
/// evaluation_interval_secs = 3600
/// call_timeout_secs = 10
///
/// [predictor]
/// kind = "linear"
/// window = 30
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Traded pair, e.g. "BTCUSDT".
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Fixed quantity for every manual order, in base asset units.
    pub order_quantity: f64,
    #[serde(default = "default_evaluation_interval_secs")]
    pub evaluation_interval_secs: u64,
    /// Upper bound on every exchange or chat call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default)]
    pub predictor: PredictorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PredictorConfig {
    Constant {
        #[serde(default)]
        value: f64,
    },
    Linear {
        #[serde(default = "default_predictor_window")]
        window: usize,
    },
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig::Constant { value: 0.0 }
    }
}

impl PredictorConfig {
    pub fn build(&self) -> Arc<dyn Predictor> {
        match *self {
            PredictorConfig::Constant { value } => Arc::new(ConstantPredictor::new(value)),
            PredictorConfig::Linear { window } => Arc::new(LinearTrendPredictor::new(window)),
        }
    }
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_kline_interval() -> String {
    "1d".to_string()
}

fn default_lookback_days() -> u32 {
    30
}

fn default_evaluation_interval_secs() -> u64 {
    3600
}

fn default_call_timeout_secs() -> u64 {
    10
}

fn default_predictor_window() -> usize {
    LinearTrendPredictor::DEFAULT_WINDOW
}

impl MonitorConfig {
    /// Load and validate from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read monitor config at '{path}': {e}"))
        })?;
        let cfg = Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid monitor config at '{path}': {e}")))?;
        info!(path, symbol = %cfg.symbol, "Monitor config loaded");
        Ok(cfg)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: MonitorConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Config("symbol must not be empty".into()));
        }
        let interval_secs = KLINE_INTERVALS
            .iter()
            .find(|(name, _)| *name == self.kline_interval)
            .map(|&(_, secs)| secs)
            .ok_or_else(|| {
                Error::Config(format!("unsupported kline_interval '{}'", self.kline_interval))
            })?;
        if self.lookback_days == 0 {
            return Err(Error::Config("lookback_days must be positive".into()));
        }
        let bars = u64::from(self.lookback_days) * 86_400 / interval_secs;
        if bars > MAX_LOOKBACK_BARS {
            return Err(Error::Config(format!(
                "lookback_days = {} at kline_interval '{}' spans {bars} bars, max {MAX_LOOKBACK_BARS}",
                self.lookback_days, self.kline_interval
            )));
        }
        if !(self.order_quantity.is_finite() && self.order_quantity > 0.0) {
            return Err(Error::Config(format!(
                "order_quantity must be positive, got {}",
                self.order_quantity
            )));
        }
        if self.evaluation_interval_secs == 0 || self.call_timeout_secs == 0 {
            return Err(Error::Config(
                "evaluation_interval_secs and call_timeout_secs must be positive".into(),
            ));
        }
        if self.evaluation_interval_secs > MAX_EVALUATION_INTERVAL_SECS {
            return Err(Error::Config(format!(
                "evaluation_interval_secs must be at most {MAX_EVALUATION_INTERVAL_SECS}"
            )));
        }
        if self.call_timeout_secs > MAX_CALL_TIMEOUT_SECS {
            return Err(Error::Config(format!(
                "call_timeout_secs must be at most {MAX_CALL_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }

    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluation_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}
