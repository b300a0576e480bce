//! Trend forecasting over recent run means

use super::{interpret, round_to, DEFAULT_ALPHA};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// How many persisted runs feed the trend window
pub const DEFAULT_WINDOW: usize = 5;

/// Slopes within +/- this value count as stable
pub const DEFAULT_DIRECTION_THRESHOLD: f64 = 0.001;

const PLACES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Increasing => write!(f, "increasing"),
            Direction::Decreasing => write!(f, "decreasing"),
            Direction::Stable => write!(f, "stable"),
        }
    }
}

/// Linear fit of mean frequency against run index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub p_value_for_slope: f64,
    pub direction: Direction,
    pub next_period_prediction: f64,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrendOutcome {
    Fitted(TrendFit),
    Skipped { notes: String },
}

impl TrendOutcome {
    pub fn fit(&self) -> Option<&TrendFit> {
        match self {
            TrendOutcome::Fitted(f) => Some(f),
            TrendOutcome::Skipped { .. } => None,
        }
    }
}

/// Forecast section of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilisticInsights {
    /// Means used for the fit, oldest first, current run last
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub window: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_frequency_trend: Option<TrendOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prob_freq_increase_empiric_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prob_freq_decrease_empiric_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProbabilisticInsights {
    pub fn notes_only(notes: impl Into<String>) -> Self {
        Self {
            window: Vec::new(),
            mean_frequency_trend: None,
            prob_freq_increase_empiric_pct: None,
            prob_freq_decrease_empiric_pct: None,
            notes: Some(notes.into()),
        }
    }
}

/// Ordinary least squares of `y` against `0..n`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub p_value: f64,
}

/// Fit `ys` against their indices. Needs at least two points.
pub fn linear_regression(ys: &[f64]) -> Option<Regression> {
    let n = ys.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = ys.iter().sum::<f64>() / nf;

    let (mut ss_x, mut ss_y, mut ss_xy) = (0.0, 0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        ss_x += dx * dx;
        ss_y += dy * dy;
        ss_xy += dx * dy;
    }

    let slope = ss_xy / ss_x;
    let intercept = y_mean - slope * x_mean;
    let r = if ss_x == 0.0 || ss_y == 0.0 {
        0.0
    } else {
        (ss_xy / (ss_x * ss_y).sqrt()).clamp(-1.0, 1.0)
    };

    let p_value = if n == 2 {
        // Two points always fit exactly
        if ys[0] == ys[1] {
            1.0
        } else {
            0.0
        }
    } else {
        const TINY: f64 = 1.0e-20;
        let df = nf - 2.0;
        let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
        match StudentsT::new(0.0, 1.0, df) {
            Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
            Err(_) => f64::NAN,
        }
    };

    Some(Regression {
        slope,
        intercept,
        r,
        p_value,
    })
}

/// Share of positive and negative first differences, in percent (2 decimals)
pub fn step_probabilities(window: &[f64]) -> (f64, f64) {
    let steps: Vec<f64> = window.windows(2).map(|w| w[1] - w[0]).collect();
    if steps.is_empty() {
        return (0.0, 0.0);
    }
    let n = steps.len() as f64;
    let up = steps.iter().filter(|d| **d > 0.0).count() as f64;
    let down = steps.iter().filter(|d| **d < 0.0).count() as f64;
    (round_to(up / n * 100.0, 2), round_to(down / n * 100.0, 2))
}

/// Fits the trend window and projects the next mean
#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    threshold: f64,
    alpha: f64,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTION_THRESHOLD, DEFAULT_ALPHA)
    }
}

impl Forecaster {
    pub fn new(threshold: f64, alpha: f64) -> Self {
        Self {
            threshold: threshold.abs(),
            alpha,
        }
    }

    pub fn direction(&self, slope: f64) -> Direction {
        if slope > self.threshold {
            Direction::Increasing
        } else if slope < -self.threshold {
            Direction::Decreasing
        } else {
            Direction::Stable
        }
    }

    /// Forecast from a chronological window (oldest first, current run last)
    pub fn forecast(&self, window: &[f64]) -> ProbabilisticInsights {
        let window: Vec<f64> = window.iter().copied().filter(|v| v.is_finite()).collect();
        let Some(reg) = linear_regression(&window) else {
            tracing::debug!(points = window.len(), "trend skipped");
            return ProbabilisticInsights {
                window,
                ..ProbabilisticInsights::notes_only("Not enough data points for trend analysis.")
            };
        };

        let prediction = reg.intercept + reg.slope * window.len() as f64;
        let fit = TrendFit {
            slope: round_to(reg.slope, PLACES),
            intercept: round_to(reg.intercept, PLACES),
            r_squared: round_to(reg.r * reg.r, PLACES),
            p_value_for_slope: round_to(reg.p_value, PLACES),
            direction: self.direction(reg.slope),
            next_period_prediction: round_to(prediction, PLACES),
            interpretation: interpret(reg.p_value, self.alpha, "trend in mean frequency"),
        };
        let (up, down) = step_probabilities(&window);

        ProbabilisticInsights {
            window,
            mean_frequency_trend: Some(TrendOutcome::Fitted(fit)),
            prob_freq_increase_empiric_pct: Some(up),
            prob_freq_decrease_empiric_pct: Some(down),
            notes: None,
        }
    }
}
