use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, MarketDataPort, NotifierPort, OrderPort, TradingMode};
use engine::{BinanceClient, CommandDispatcher, EvaluationPipeline, Scheduler, SessionRegistry};
use paper::PaperClient;
use strategy::MonitorConfig;
use telegram_ctrl::{start_bot, BotDeps, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("loading environment")?;
    let monitor = MonitorConfig::load(&cfg.monitor_config_path)
        .context("loading monitor config")?;
    let predictor = monitor.predictor.build();
    info!(
        mode = %cfg.trading_mode,
        symbol = %monitor.symbol,
        interval = %monitor.kline_interval,
        lookback_days = monitor.lookback_days,
        predictor = predictor.name(),
        "DipBot starting"
    );

    // ── Exchange ──────────────────────────────────────────────────────────────
    let binance = Arc::new(
        BinanceClient::new(&cfg.binance_api_key, &cfg.binance_secret, monitor.call_timeout())
            .context("building Binance client")?,
    );
    let market: Arc<dyn MarketDataPort> = binance.clone();

    // Order port injected based on TRADING_MODE
    let orders: Arc<dyn OrderPort> = match cfg.trading_mode {
        TradingMode::Live => {
            info!("Live trading mode — orders go to Binance");
            binance
        }
        TradingMode::Paper => {
            info!(slippage_bps = cfg.paper_slippage_bps, "Paper trading mode — using PaperClient");
            Arc::new(PaperClient::new(market.clone(), cfg.paper_slippage_bps))
        }
    };

    // ── Core ──────────────────────────────────────────────────────────────────
    let bot = teloxide::Bot::new(&cfg.telegram_token);
    let notifier: Arc<dyn NotifierPort> = Arc::new(TelegramNotifier::new(bot.clone()));
    let sessions = Arc::new(SessionRegistry::new());

    let pipeline = Arc::new(EvaluationPipeline::new(
        &monitor,
        market,
        predictor,
        notifier.clone(),
        sessions.clone(),
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(
        &monitor,
        pipeline.clone(),
        sessions,
        orders,
        notifier,
    ));

    // ── Spawn scheduler, run bot in the foreground ───────────────────────────
    let scheduler = Scheduler::new(pipeline, monitor.evaluation_interval()).spawn();
    start_bot(bot, BotDeps { dispatcher }).await;

    info!("Shutdown signal received. Exiting.");
    scheduler.abort();
    Ok(())
}
