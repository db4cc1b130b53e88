pub mod binance;
pub mod call;
pub mod dispatcher;
pub mod pipeline;
pub mod scheduler;
pub mod session;

pub use binance::BinanceClient;
pub use dispatcher::{CommandDispatcher, OrderOutcome};
pub use pipeline::{EvaluationOutcome, EvaluationPipeline, Trigger};
pub use scheduler::Scheduler;
pub use session::SessionRegistry;
