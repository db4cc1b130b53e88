#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{oneshot, Notify};

use common::{
    Bar, BarSeries, ConversationId, Error, MarketDataPort, NotifierPort, OrderPort,
    OrderReceipt, OrderRequest, Result,
};
use engine::{CommandDispatcher, EvaluationPipeline, SessionRegistry};
use strategy::{MonitorConfig, PredictionError, Predictor};

pub const DIP: [f64; 10] = [100.0, 101.0, 99.0, 98.0, 97.0, 96.0, 95.0, 94.0, 93.0, 92.0];
pub const FLAT: [f64; 4] = [50.0, 50.0, 50.0, 50.0];

pub fn bars(closes: &[f64]) -> BarSeries {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open_time = Utc.timestamp_opt(i as i64 * 86_400, 0).unwrap();
            Bar {
                open_time,
                close_time: open_time + chrono::Duration::seconds(86_399),
                open: close,
                high: close,
                low: close,
                close,
                volume: 10.0,
            }
        })
        .collect::<Vec<_>>()
        .into()
}

pub fn monitor_config() -> MonitorConfig {
    MonitorConfig::parse(
        r#"
        symbol = "BTCUSDT"
        kline_interval = "1d"
        lookback_days = 30
        order_quantity = 0.001
        evaluation_interval_secs = 3600
        call_timeout_secs = 10
        "#,
    )
    .unwrap()
}

// ─── Market data ──────────────────────────────────────────────────────────────

pub enum MarketMode {
    Series(BarSeries),
    Fail,
    Hang,
}

pub struct StubMarket {
    mode: MarketMode,
    pub calls: AtomicUsize,
}

impl StubMarket {
    pub fn with_closes(closes: &[f64]) -> Self {
        Self::new(MarketMode::Series(bars(closes)))
    }

    pub fn new(mode: MarketMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataPort for StubMarket {
    async fn fetch_bars(&self, _: &str, _: &str, _: u32) -> Result<BarSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            MarketMode::Series(series) => Ok(series.clone()),
            MarketMode::Fail => Err(Error::Http("connection reset".into())),
            MarketMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(BarSeries::default())
            }
        }
    }

    async fn latest_price(&self, _: &str) -> Result<f64> {
        Err(Error::Other("not used".into()))
    }
}

/// Blocks the first fetch until released, so a test can act while an
/// evaluation is in flight.
pub struct GatedMarket {
    series: BarSeries,
    gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
    pub entered: Notify,
}

impl GatedMarket {
    pub fn new(closes: &[f64]) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let market = Self {
            series: bars(closes),
            gate: tokio::sync::Mutex::new(Some(rx)),
            entered: Notify::new(),
        };
        (market, tx)
    }
}

#[async_trait]
impl MarketDataPort for GatedMarket {
    async fn fetch_bars(&self, _: &str, _: &str, _: u32) -> Result<BarSeries> {
        let gate = self.gate.lock().await.take();
        if let Some(rx) = gate {
            self.entered.notify_one();
            let _ = rx.await;
        }
        Ok(self.series.clone())
    }

    async fn latest_price(&self, _: &str) -> Result<f64> {
        Err(Error::Other("not used".into()))
    }
}

// ─── Predictor ────────────────────────────────────────────────────────────────

pub struct CountingPredictor {
    result: std::result::Result<f64, PredictionError>,
    pub calls: AtomicUsize,
}

impl CountingPredictor {
    pub fn returning(value: f64) -> Self {
        Self {
            result: Ok(value),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(PredictionError::InsufficientData {
                needed: 2,
                available: 0,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Predictor for CountingPredictor {
    fn name(&self) -> &str {
        "counting"
    }

    fn predict_next(&self, _series: &BarSeries) -> std::result::Result<f64, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

// ─── Notifier ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<(ConversationId, String)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(ConversationId, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages that are analysis reports (excluding greetings and order
    /// replies).
    pub fn reports(&self) -> Vec<(ConversationId, String)> {
        self.sent()
            .into_iter()
            .filter(|(_, text)| text.starts_with("Analysis for"))
            .collect()
    }
}

#[async_trait]
impl NotifierPort for RecordingNotifier {
    async fn send(&self, conversation: ConversationId, text: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Notify("chat not found".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((conversation, text.to_string()));
        Ok(())
    }
}

// ─── Orders ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubOrders {
    reject_with: Option<String>,
    pub submitted: Mutex<Vec<OrderRequest>>,
}

impl StubOrders {
    pub fn rejecting(reason: &str) -> Self {
        Self {
            reject_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderPort for StubOrders {
    async fn submit(&self, order: &OrderRequest) -> Result<OrderReceipt> {
        self.submitted.lock().unwrap().push(order.clone());
        if let Some(reason) = &self.reject_with {
            return Err(Error::Exchange(reason.clone()));
        }
        Ok(OrderReceipt {
            order_id: "1001".into(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            fill_price: Some(64_000.0),
            timestamp: Utc::now(),
        })
    }
}

// ─── Wiring ───────────────────────────────────────────────────────────────────

pub struct Harness {
    pub predictor: Arc<CountingPredictor>,
    pub notifier: Arc<RecordingNotifier>,
    pub orders: Arc<StubOrders>,
    pub sessions: Arc<SessionRegistry>,
    pub pipeline: Arc<EvaluationPipeline>,
    pub dispatcher: CommandDispatcher,
}

impl Harness {
    pub fn new(market: Arc<dyn MarketDataPort>) -> Self {
        Self::with_parts(
            market,
            CountingPredictor::returning(90.5),
            RecordingNotifier::default(),
            StubOrders::default(),
        )
    }

    pub fn with_parts(
        market: Arc<dyn MarketDataPort>,
        predictor: CountingPredictor,
        notifier: RecordingNotifier,
        orders: StubOrders,
    ) -> Self {
        let cfg = monitor_config();
        let predictor = Arc::new(predictor);
        let notifier = Arc::new(notifier);
        let orders = Arc::new(orders);
        let sessions = Arc::new(SessionRegistry::new());

        let pipeline = Arc::new(EvaluationPipeline::new(
            &cfg,
            market,
            predictor.clone(),
            notifier.clone(),
            sessions.clone(),
        ));
        let dispatcher = CommandDispatcher::new(
            &cfg,
            pipeline.clone(),
            sessions.clone(),
            orders.clone(),
            notifier.clone(),
        );

        Self {
            predictor,
            notifier,
            orders,
            sessions,
            pipeline,
            dispatcher,
        }
    }
}
