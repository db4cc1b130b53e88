use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use common::{
    ConversationId, NotifierPort, OperatorCommand, OrderPort, OrderReceipt, OrderRequest,
    OrderSide,
};
use strategy::MonitorConfig;

use crate::call::bounded;
use crate::pipeline::{EvaluationOutcome, EvaluationPipeline, Trigger};
use crate::session::SessionRegistry;

/// Result of a manual order command.
#[derive(Debug, Clone)]
pub enum OrderOutcome {
    Filled(OrderReceipt),
    Failed { reason: String },
}

/// Turns operator commands into actions.
///
/// `/start` writes the session and runs the shared evaluation pipeline.
/// `/buy` and `/sell` go straight to the order port: they do not look at the
/// session or the current recommendation, and are never retried.
pub struct CommandDispatcher {
    symbol: String,
    order_quantity: f64,
    call_timeout: Duration,
    pipeline: Arc<EvaluationPipeline>,
    sessions: Arc<SessionRegistry>,
    orders: Arc<dyn OrderPort>,
    notifier: Arc<dyn NotifierPort>,
}

impl CommandDispatcher {
    pub fn new(
        cfg: &MonitorConfig,
        pipeline: Arc<EvaluationPipeline>,
        sessions: Arc<SessionRegistry>,
        orders: Arc<dyn OrderPort>,
        notifier: Arc<dyn NotifierPort>,
    ) -> Self {
        Self {
            symbol: cfg.symbol.clone(),
            order_quantity: cfg.order_quantity,
            call_timeout: cfg.call_timeout(),
            pipeline,
            sessions,
            orders,
            notifier,
        }
    }

    pub async fn dispatch(&self, command: OperatorCommand, conversation: ConversationId) {
        info!(?command, %conversation, "Operator command received");
        match command {
            OperatorCommand::Start => {
                self.subscribe(conversation).await;
            }
            OperatorCommand::Buy => {
                self.buy(conversation).await;
            }
            OperatorCommand::Sell => {
                self.sell(conversation).await;
            }
        }
    }

    /// Subscribe `conversation` to scheduled updates and send it an analysis
    /// right away.
    pub async fn subscribe(&self, conversation: ConversationId) -> EvaluationOutcome {
        self.sessions.subscribe(conversation).await;
        self.reply(
            conversation,
            &format!("Bot started and monitoring {}.", self.symbol),
        )
        .await;
        self.pipeline.evaluate(Trigger::Command(conversation)).await
    }

    pub async fn buy(&self, conversation: ConversationId) -> OrderOutcome {
        self.place(OrderSide::Buy, conversation).await
    }

    pub async fn sell(&self, conversation: ConversationId) -> OrderOutcome {
        self.place(OrderSide::Sell, conversation).await
    }

    async fn place(&self, side: OrderSide, conversation: ConversationId) -> OrderOutcome {
        let order = OrderRequest::market(&self.symbol, side, self.order_quantity);
        info!(symbol = %order.symbol, %side, qty = order.quantity, "Executing manual order");

        let outcome = match bounded("order submission", self.call_timeout, self.orders.submit(&order))
            .await
        {
            Ok(receipt) => {
                info!(
                    order_id = %receipt.order_id,
                    symbol = %receipt.symbol,
                    price = ?receipt.fill_price,
                    qty = receipt.quantity,
                    "Order filled"
                );
                OrderOutcome::Filled(receipt)
            }
            Err(e) => {
                error!(symbol = %order.symbol, %side, error = %e, "Order submission failed");
                OrderOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        // The order stands even if this notification fails.
        self.reply(conversation, &order_message(side, &outcome)).await;
        outcome
    }

    async fn reply(&self, conversation: ConversationId, text: &str) {
        if let Err(e) = bounded(
            "command reply",
            self.call_timeout,
            self.notifier.send(conversation, text),
        )
        .await
        {
            warn!(%conversation, error = %e, "Failed to send reply");
        }
    }
}

fn order_message(side: OrderSide, outcome: &OrderOutcome) -> String {
    match outcome {
        OrderOutcome::Filled(receipt) => {
            let price = receipt
                .fill_price
                .map(|p| format!(", avg price {p:.8}"))
                .unwrap_or_default();
            format!(
                "{side} order filled: {} {} (order id {}{price})",
                receipt.quantity, receipt.symbol, receipt.order_id
            )
        }
        OrderOutcome::Failed { reason } => format!("{side} order failed: {reason}"),
    }
}
