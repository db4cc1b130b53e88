use async_trait::async_trait;

use crate::{BarSeries, OrderReceipt, OrderRequest, Result};

/// Read-only market data from the exchange.
///
/// `BinanceClient` implements this against the public REST endpoints.
/// Implementations must be reentrant: the scheduler and command handlers call
/// them concurrently without any locking.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Fetch the bars of `interval` (e.g. `"1d"`) covering the last
    /// `lookback_days`, oldest first.
    async fn fetch_bars(&self, symbol: &str, interval: &str, lookback_days: u32)
        -> Result<BarSeries>;

    /// Latest traded price for a symbol.
    async fn latest_price(&self, symbol: &str) -> Result<f64>;
}

/// Order submission.
///
/// `BinanceClient` implements this for live trading, `PaperClient` for
/// simulation. Only `CommandDispatcher` submits orders; nothing in the
/// evaluation path does.
#[async_trait]
pub trait OrderPort: Send + Sync {
    /// Submit a market order and return the exchange's confirmation.
    async fn submit(&self, order: &OrderRequest) -> Result<OrderReceipt>;
}
