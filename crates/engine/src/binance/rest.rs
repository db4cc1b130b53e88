use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

use common::{
    Bar, BarSeries, Error, MarketDataPort, OrderPort, OrderReceipt, OrderRequest, Result,
};

const BASE_URL: &str = "https://api.binance.com";

/// Maximum klines Binance returns per request.
const KLINE_PAGE_LIMIT: usize = 1000;
const MS_PER_DAY: i64 = 86_400_000;

/// REST API client for Binance. Serves market data from the public endpoints
/// and places signed market orders.
pub struct BinanceClient {
    api_key: String,
    secret: String,
    base_url: String,
    http: Client,
}

impl BinanceClient {
    /// Every request made by this client is cut off after `timeout`.
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            secret: secret.into(),
            base_url: BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another host (testnet).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn sign(&self, query: &str) -> String {
        sign_query(&self.secret, query)
    }

    async fn public_get(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    async fn signed_post(&self, path: &str, params: &str) -> Result<String> {
        let ts = Utc::now().timestamp_millis();
        let query = format!("{params}&timestamp={ts}");
        let signature = self.sign(&query);
        let body = format!("{query}&signature={signature}");
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {text}")));
        }
        Ok(text)
    }
}

#[async_trait]
impl MarketDataPort for BinanceClient {
    async fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        lookback_days: u32,
    ) -> Result<BarSeries> {
        let end_ms = Utc::now().timestamp_millis();
        let mut start_ms = end_ms - i64::from(lookback_days) * MS_PER_DAY;
        let limit = KLINE_PAGE_LIMIT.to_string();
        let mut bars = Vec::new();

        loop {
            let start = start_ms.to_string();
            let body = self
                .public_get(
                    "/api/v3/klines",
                    &[
                        ("symbol", symbol),
                        ("interval", interval),
                        ("startTime", start.as_str()),
                        ("limit", limit.as_str()),
                    ],
                )
                .await?;

            let page = parse_klines(&body)?;
            let page_len = page.len();
            if let Some(last) = page.last() {
                start_ms = last.open_time.timestamp_millis() + 1;
            }
            bars.extend(page);

            if page_len < KLINE_PAGE_LIMIT || start_ms > end_ms {
                break;
            }
        }

        debug!(symbol, interval, bars = bars.len(), "Fetched klines");
        Ok(BarSeries::new(bars))
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .public_get("/api/v3/ticker/price", &[("symbol", symbol)])
            .await?;
        let ticker: PriceTicker = serde_json::from_str(&body)?;

        ticker
            .price
            .parse::<f64>()
            .map_err(|e| Error::Exchange(e.to_string()))
    }
}

#[async_trait]
impl OrderPort for BinanceClient {
    async fn submit(&self, order: &OrderRequest) -> Result<OrderReceipt> {
        let params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newClientOrderId={}&newOrderRespType=FULL",
            order.symbol, order.side, order.quantity, order.client_order_id
        );

        debug!(symbol = %order.symbol, side = %order.side, "Submitting order to Binance");
        let body = self.signed_post("/api/v3/order", &params).await?;
        receipt_from_response(order, &body)
    }
}

/// Compute HMAC-SHA256 of `query`, hex-encoded, as Binance expects.
fn sign_query(secret: &str, query: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

// ─── Response parsing ─────────────────────────────────────────────────────────

/// Klines arrive as positional arrays:
/// `[open_time, open, high, low, close, volume, close_time, ...]`
/// with prices as strings and times in epoch milliseconds.
fn parse_klines(body: &str) -> Result<Vec<Bar>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
    rows.iter().map(|row| parse_kline_row(row)).collect()
}

fn parse_kline_row(row: &[Value]) -> Result<Bar> {
    if row.len() < 7 {
        return Err(Error::Exchange(format!(
            "kline row has {} fields, expected at least 7",
            row.len()
        )));
    }

    Ok(Bar {
        open_time: millis_field(&row[0])?,
        open: decimal_field(&row[1])?,
        high: decimal_field(&row[2])?,
        low: decimal_field(&row[3])?,
        close: decimal_field(&row[4])?,
        volume: decimal_field(&row[5])?,
        close_time: millis_field(&row[6])?,
    })
}

fn millis_field(v: &Value) -> Result<DateTime<Utc>> {
    v.as_i64()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .ok_or_else(|| Error::Exchange(format!("invalid kline timestamp: {v}")))
}

fn decimal_field(v: &Value) -> Result<f64> {
    v.as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| Error::Exchange(format!("invalid kline price field: {v}")))
}

fn receipt_from_response(order: &OrderRequest, body: &str) -> Result<OrderReceipt> {
    let resp: OrderResponse =
        serde_json::from_str(body).map_err(|e| Error::Exchange(e.to_string()))?;

    let executed = resp.executed_qty.parse::<f64>().unwrap_or(0.0);
    let quote = resp.cummulative_quote_qty.parse::<f64>().unwrap_or(0.0);
    let fill_price = if executed > 0.0 && quote > 0.0 {
        Some(quote / executed)
    } else {
        resp.fills.first().and_then(|f| f.price.parse::<f64>().ok())
    };

    Ok(OrderReceipt {
        order_id: resp.order_id.to_string(),
        symbol: order.symbol.clone(),
        side: order.side,
        quantity: if executed > 0.0 { executed } else { order.quantity },
        fill_price,
        timestamp: Utc::now(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: u64,
    #[serde(default)]
    executed_qty: String,
    #[serde(default)]
    cummulative_quote_qty: String,
    #[serde(default)]
    fills: Vec<FillDetail>,
}

#[derive(Deserialize)]
struct FillDetail {
    price: String,
}

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderSide;

    #[test]
    fn signature_matches_binance_reference_vector() {
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1\
                     &recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_query(secret, query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn parses_kline_rows() {
        let body = r#"[
            [1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100",
             "148976.11427815", 1499644799999, "2434.19055334", 308, "1756.87402397",
             "28.46694368", "0"],
            [1499644800000, "0.01577100", "0.01600000", "0.01500000", "0.01590000",
             "1000.0", 1500249599999, "15.9", 12, "500.0", "7.9", "0"]
        ]"#;

        let bars = parse_klines(body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open_time.timestamp_millis(), 1_499_040_000_000);
        assert_eq!(bars[0].close_time.timestamp_millis(), 1_499_644_799_999);
        assert_eq!(bars[0].high, 0.8);
        assert_eq!(bars[1].close, 0.0159);
        assert_eq!(bars[1].volume, 1000.0);
    }

    #[test]
    fn empty_kline_page_is_empty_not_an_error() {
        assert!(parse_klines("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_kline_row_is_an_exchange_error() {
        let err = parse_klines(r#"[[1499040000000, "abc", "1", "1", "1", "1", 1499644799999]]"#)
            .unwrap_err();
        assert!(matches!(err, Error::Exchange(_)));

        let err = parse_klines(r#"[[1499040000000, "1"]]"#).unwrap_err();
        assert!(matches!(err, Error::Exchange(_)));
    }

    #[test]
    fn receipt_uses_average_fill_price() {
        let order = OrderRequest::market("BTCUSDT", OrderSide::Buy, 0.002);
        let body = r#"{
            "symbol": "BTCUSDT", "orderId": 28, "clientOrderId": "abc",
            "executedQty": "0.00200000", "cummulativeQuoteQty": "120.00000000",
            "fills": [{"price": "59000.0", "qty": "0.001"}, {"price": "61000.0", "qty": "0.001"}]
        }"#;

        let receipt = receipt_from_response(&order, body).unwrap();
        assert_eq!(receipt.order_id, "28");
        assert_eq!(receipt.side, OrderSide::Buy);
        assert!((receipt.fill_price.unwrap() - 60_000.0).abs() < 1e-6);
    }

    #[test]
    fn receipt_without_execution_has_no_price() {
        let order = OrderRequest::market("BTCUSDT", OrderSide::Sell, 0.5);
        let body = r#"{"orderId": 7, "executedQty": "0.0", "cummulativeQuoteQty": "0.0"}"#;

        let receipt = receipt_from_response(&order, body).unwrap();
        assert_eq!(receipt.fill_price, None);
        assert_eq!(receipt.quantity, 0.5);
    }
}
