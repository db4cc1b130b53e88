use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use common::{ConversationId, MarketDataPort, NotifierPort};
use strategy::{summarize, MonitorConfig, Predictor, Recommendation, SignalSummary};

use crate::call::bounded;
use crate::session::SessionRegistry;

/// What started an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Command(ConversationId),
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Command(conversation) => write!(f, "command from {conversation}"),
        }
    }
}

/// Result of one pass through the pipeline. None of these are errors for
/// the caller; they report which stage the pass ended at.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// Nobody is subscribed; nothing was fetched or sent.
    NoSession,
    /// Market data could not be fetched or was empty.
    DataUnavailable { reason: String },
    /// The session disappeared between fetch and delivery.
    SessionCleared,
    /// The report was built but the notifier failed.
    DeliveryFailed { conversation: ConversationId, reason: String },
    Delivered {
        conversation: ConversationId,
        summary: SignalSummary,
        prediction: Option<f64>,
        message: String,
    },
}

/// Fetch → summarize → (predict) → notify, shared by the scheduler and the
/// `/start` command.
pub struct EvaluationPipeline {
    symbol: String,
    kline_interval: String,
    lookback_days: u32,
    call_timeout: Duration,
    market: Arc<dyn MarketDataPort>,
    predictor: Arc<dyn Predictor>,
    notifier: Arc<dyn NotifierPort>,
    sessions: Arc<SessionRegistry>,
}

impl EvaluationPipeline {
    pub fn new(
        cfg: &MonitorConfig,
        market: Arc<dyn MarketDataPort>,
        predictor: Arc<dyn Predictor>,
        notifier: Arc<dyn NotifierPort>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            symbol: cfg.symbol.clone(),
            kline_interval: cfg.kline_interval.clone(),
            lookback_days: cfg.lookback_days,
            call_timeout: cfg.call_timeout(),
            market,
            predictor,
            notifier,
            sessions,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Run one evaluation. Never fails: every external error is logged and
    /// turned into an outcome.
    pub async fn evaluate(&self, trigger: Trigger) -> EvaluationOutcome {
        if self.sessions.current().await.is_none() {
            info!(%trigger, "No subscribed conversation. Skipping analysis.");
            return EvaluationOutcome::NoSession;
        }

        let series = match bounded(
            "market data fetch",
            self.call_timeout,
            self.market
                .fetch_bars(&self.symbol, &self.kline_interval, self.lookback_days),
        )
        .await
        {
            Ok(series) => series,
            Err(e) => {
                error!(%trigger, symbol = %self.symbol, error = %e, "Error fetching historical data");
                return EvaluationOutcome::DataUnavailable {
                    reason: e.to_string(),
                };
            }
        };

        let Some(summary) = summarize(&series) else {
            warn!(%trigger, symbol = %self.symbol, "Empty price history, nothing to analyze");
            return EvaluationOutcome::DataUnavailable {
                reason: "empty price history".into(),
            };
        };
        debug!(
            %trigger,
            latest = summary.latest_price,
            threshold = summary.threshold,
            recommendation = %summary.recommendation,
            "Price analyzed"
        );

        let prediction = if summary.recommendation == Recommendation::Buy {
            match self.predictor.predict_next(&series) {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!(predictor = self.predictor.name(), error = %e, "Prediction failed, sending summary only");
                    None
                }
            }
        } else {
            None
        };

        let message = format_report(&self.symbol, &summary, prediction);

        // Re-read: a subscribe may have landed while we were fetching.
        let Some(conversation) = self.sessions.current().await else {
            info!(%trigger, "Session cleared before delivery. Dropping report.");
            return EvaluationOutcome::SessionCleared;
        };

        match bounded(
            "analysis delivery",
            self.call_timeout,
            self.notifier.send(conversation, &message),
        )
        .await
        {
            Ok(()) => {
                info!(%trigger, %conversation, recommendation = %summary.recommendation, "Analysis delivered");
                EvaluationOutcome::Delivered {
                    conversation,
                    summary,
                    prediction,
                    message,
                }
            }
            Err(e) => {
                error!(%trigger, %conversation, error = %e, "Failed to deliver analysis");
                EvaluationOutcome::DeliveryFailed {
                    conversation,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Plain-text analysis report. The prediction line only appears for a `BUY`
/// with a successful forecast.
pub fn format_report(symbol: &str, summary: &SignalSummary, prediction: Option<f64>) -> String {
    let mut text = format!(
        "Analysis for {symbol}:\n\
         Latest Price: {:.8}\n\
         Mean Price: {:.8}\n\
         Std Dev: {:.8}\n\
         Threshold (Mean - Std): {:.8}\n\
         Recommendation: {}",
        summary.latest_price,
        summary.mean_price,
        summary.std_price,
        summary.threshold,
        summary.recommendation,
    );
    if let (Recommendation::Buy, Some(price)) = (summary.recommendation, prediction) {
        text.push_str(&format!("\nPredicted Next Price: {price:.8}"));
    }
    text
}
