use thiserror::Error;

use common::BarSeries;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("insufficient data: need at least {needed} bars, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("model error: {0}")]
    Model(String),
}

/// Forecasts the close of the bar following the series.
///
/// Only called when the signal engine recommends buying, once per
/// evaluation. Implementations should be deterministic for a fixed series and
/// cheap enough to run on every scheduler tick.
pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    fn predict_next(&self, series: &BarSeries) -> Result<f64, PredictionError>;
}

/// Always predicts the same value. The default value `0.0` acts as a
/// placeholder model.
#[derive(Debug, Clone, Default)]
pub struct ConstantPredictor {
    pub value: f64,
}

impl ConstantPredictor {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Predictor for ConstantPredictor {
    fn name(&self) -> &str {
        "constant"
    }

    fn predict_next(&self, _series: &BarSeries) -> Result<f64, PredictionError> {
        Ok(self.value)
    }
}

/// Least-squares line through `(index, close)` of the trailing `window`
/// bars, extrapolated one step past the last bar.
#[derive(Debug, Clone)]
pub struct LinearTrendPredictor {
    window: usize,
}

impl LinearTrendPredictor {
    pub const DEFAULT_WINDOW: usize = 30;
    const MIN_POINTS: usize = 2;

    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(Self::MIN_POINTS),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for LinearTrendPredictor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}

impl Predictor for LinearTrendPredictor {
    fn name(&self) -> &str {
        "linear"
    }

    fn predict_next(&self, series: &BarSeries) -> Result<f64, PredictionError> {
        let ys: Vec<f64> = series.tail(self.window).iter().map(|b| b.close).collect();
        if ys.len() < Self::MIN_POINTS {
            return Err(PredictionError::InsufficientData {
                needed: Self::MIN_POINTS,
                available: ys.len(),
            });
        }

        let n = ys.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = ys.iter().sum::<f64>() / n;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (i, y) in ys.iter().enumerate() {
            let dx = i as f64 - x_mean;
            sxy += dx * (y - y_mean);
            sxx += dx * dx;
        }
        if sxx == 0.0 {
            return Err(PredictionError::Model("degenerate x variance".into()));
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;
        let next = intercept + slope * n;

        if !next.is_finite() {
            return Err(PredictionError::Model(format!("non-finite forecast {next}")));
        }
        Ok(next)
    }
}
