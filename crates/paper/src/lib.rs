use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{MarketDataPort, OrderPort, OrderReceipt, OrderRequest, OrderSide, Result};

/// Simulated order port for paper trading.
///
/// Fills at the exchange's latest price with configurable slippage. No order
/// ever reaches Binance; fills are kept in memory for the process lifetime.
pub struct PaperClient {
    market: Arc<dyn MarketDataPort>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
    fills: RwLock<Vec<OrderReceipt>>,
}

impl PaperClient {
    pub fn new(market: Arc<dyn MarketDataPort>, slippage_bps: f64) -> Self {
        info!(slippage_bps, "PaperClient initialized");
        Self {
            market,
            slippage_bps,
            fills: RwLock::new(Vec::new()),
        }
    }

    /// Simulated fills so far, oldest first.
    pub async fn fills(&self) -> Vec<OrderReceipt> {
        self.fills.read().await.clone()
    }
}

#[async_trait]
impl OrderPort for PaperClient {
    async fn submit(&self, order: &OrderRequest) -> Result<OrderReceipt> {
        let mid_price = self.market.latest_price(&order.symbol).await?;

        // Buys pay more, sells receive less
        let fill_price = match order.side {
            OrderSide::Buy => mid_price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => mid_price * (1.0 - self.slippage_bps / 10_000.0),
        };

        debug!(
            symbol = %order.symbol,
            side = %order.side,
            mid = mid_price,
            fill = fill_price,
            qty = order.quantity,
            "Paper fill simulated"
        );

        let receipt = OrderReceipt {
            order_id: format!("paper-{}", order.client_order_id),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            fill_price: Some(fill_price),
            timestamp: Utc::now(),
        };
        self.fills.write().await.push(receipt.clone());

        Ok(receipt)
    }
}
