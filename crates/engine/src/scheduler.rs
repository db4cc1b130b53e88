use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::pipeline::{EvaluationPipeline, Trigger};

/// Drives the evaluation pipeline on a fixed interval for the lifetime of
/// the process.
///
/// The first tick fires one full period after start; `/start` covers the
/// immediate evaluation. Ticks missed while an evaluation overran are
/// skipped rather than replayed in a burst.
pub struct Scheduler {
    pipeline: Arc<EvaluationPipeline>,
    period: Duration,
}

impl Scheduler {
    pub fn new(pipeline: Arc<EvaluationPipeline>, period: Duration) -> Self {
        Self { pipeline, period }
    }

    /// Run on its own task so a slow tick never holds up command handling.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        info!(period = ?self.period, symbol = %self.pipeline.symbol(), "Scheduler running");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let outcome = self.pipeline.evaluate(Trigger::Scheduled).await;
            debug!(?outcome, "Scheduled evaluation finished");
        }
    }
}
