use serde::{Deserialize, Serialize};

use common::BarSeries;

/// Discrete output of the signal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Wait,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Buy => write!(f, "BUY"),
            Recommendation::Wait => write!(f, "WAIT"),
        }
    }
}

/// Statistical snapshot of a bar series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub latest_price: f64,
    pub mean_price: f64,
    pub std_price: f64,
    /// `mean_price - std_price`.
    pub threshold: f64,
    pub recommendation: Recommendation,
}

/// Mean-minus-one-deviation dip detector over close prices.
///
/// Recommends `Buy` when the latest close is strictly below
/// `mean - std` of the window, `Wait` otherwise. Stateless: every call
/// recomputes from the full series.
///
/// `std` is the sample standard deviation (n - 1 denominator). A single bar
/// has no sample deviation; it is treated as `0.0`, which makes the threshold
/// equal to the latest price and the recommendation `Wait`.
///
/// Returns `None` for an empty series.
pub fn summarize(series: &BarSeries) -> Option<SignalSummary> {
    let closes = series.closes();
    let latest_price = *closes.last()?;

    let n = closes.len() as f64;
    let mean_price = closes.iter().sum::<f64>() / n;
    let std_price = if closes.len() < 2 {
        0.0
    } else {
        let sum_sq = closes.iter().map(|c| (c - mean_price).powi(2)).sum::<f64>();
        (sum_sq / (n - 1.0)).sqrt()
    };
    let threshold = mean_price - std_price;

    let recommendation = if latest_price < threshold {
        Recommendation::Buy
    } else {
        Recommendation::Wait
    };

    Some(SignalSummary {
        latest_price,
        mean_price,
        std_price,
        threshold,
        recommendation,
    })
}
