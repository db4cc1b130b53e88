pub mod config;
pub mod error;
pub mod exchange;
pub mod notifier;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use exchange::{MarketDataPort, OrderPort};
pub use notifier::NotifierPort;
pub use types::*;
