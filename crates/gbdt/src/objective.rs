//! Link functions applied to the raw ensemble margin

use serde::{Deserialize, Serialize};

/// Output transformation of a trained ensemble.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Objective {
    /// Identity link (squared error, absolute error, huber, ...)
    #[default]
    Regression,
    /// `1 / (1 + exp(-sigmoid * margin))`
    Logistic { sigmoid: f64 },
    /// `exp(margin)` (poisson, gamma, tweedie)
    Exponential,
}

impl Objective {
    /// Map an XGBoost objective name. Unknown names are `None`.
    pub fn from_xgboost(name: &str) -> Option<Self> {
        match name {
            "reg:squarederror" | "reg:linear" | "reg:pseudohubererror" | "reg:absoluteerror"
            | "reg:squaredlogerror" | "reg:quantileerror" => Some(Self::Regression),
            "reg:logistic" | "binary:logistic" => Some(Self::Logistic { sigmoid: 1.0 }),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Some(Self::Exponential),
            _ => None,
        }
    }

    /// Map a LightGBM objective string such as `"binary sigmoid:1"`.
    pub fn from_lightgbm(spec: &str) -> Self {
        let mut parts = spec.split_whitespace();
        let name = parts.next().unwrap_or("regression");

        match name {
            "binary" | "cross_entropy" | "xentropy" => {
                let sigmoid = parts
                    .find_map(|p| p.strip_prefix("sigmoid:"))
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or(1.0);
                Self::Logistic { sigmoid }
            }
            "poisson" | "gamma" | "tweedie" => Self::Exponential,
            _ => Self::Regression,
        }
    }

    /// Convert a base score expressed in output space into margin space.
    ///
    /// XGBoost stores `base_score` after the link function.
    pub fn base_score_to_margin(&self, base_score: f64) -> f64 {
        match self {
            Self::Regression => base_score,
            Self::Logistic { sigmoid } => {
                let p = base_score.clamp(1e-16, 1.0 - 1e-16);
                (p / (1.0 - p)).ln() / sigmoid
            }
            Self::Exponential => base_score.max(f64::MIN_POSITIVE).ln(),
        }
    }

    /// Apply the link function to a margin.
    pub fn transform(&self, margin: f64) -> f64 {
        match self {
            Self::Regression => margin,
            Self::Logistic { sigmoid } => 1.0 / (1.0 + (-sigmoid * margin).exp()),
            Self::Exponential => margin.exp(),
        }
    }
}
