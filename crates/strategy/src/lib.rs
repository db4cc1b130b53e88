pub mod config;
pub mod predictor;
pub mod signal;

pub use config::{MonitorConfig, PredictorConfig};
pub use predictor::{ConstantPredictor, LinearTrendPredictor, PredictionError, Predictor};
pub use signal::{summarize, Recommendation, SignalSummary};
