//! Trip scoring: features → model → normalized score

use crate::align::ColumnAligner;
use crate::errors::{PipelineError, Result};
use crate::resources::ScoringResources;
use crate::trip::{build_trip_features, TripLookups, TripRequest};
use serde::{Deserialize, Serialize};
use taxiscore_reference::{ModelKind, ScoreScaler};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripScore {
    /// Raw model output, two decimals.
    pub predicted_score: f64,
    /// Output rescaled into `[0, 1]`, four decimals.
    pub final_score: f64,
}

/// Clip into the scaler range, rescale to `[0, 1]`, clip again.
pub fn normalize_score(raw: f64, scaler: &ScoreScaler) -> f64 {
    let clipped = raw.clamp(scaler.min, scaler.max);
    ((clipped - scaler.min) / scaler.range()).clamp(0.0, 1.0)
}

/// Round to `decimals` places from the exact binary value, ties to even.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

pub fn score_trip(
    request: &TripRequest,
    kind: ModelKind,
    resources: &ScoringResources,
) -> Result<TripScore> {
    let schema = resources.expected_columns(kind);
    let lookups = TripLookups {
        hotness: &resources.hotness,
        duration: &resources.duration,
        zones: &resources.zones,
    };

    let row = build_trip_features(request, lookups)?;
    let features = ColumnAligner::new(schema).align(&row)?;
    let raw = resources.model(kind).predict(&features);

    if !raw.is_finite() {
        return Err(PipelineError::ScoringFailed(format!(
            "{kind} model returned {raw}"
        )));
    }

    let norm = normalize_score(raw, &resources.scaler);
    debug!(
        pickup = %request.pickup_zone,
        dropoff = %request.dropoff_zone,
        %kind,
        raw,
        norm,
        "scored trip"
    );

    Ok(TripScore {
        predicted_score: round_to(raw, 2),
        final_score: round_to(norm, 4),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_clips_both_ends() {
        let scaler = ScoreScaler::new(2.0, 12.0).unwrap();
        assert_eq!(normalize_score(7.0, &scaler), 0.5);
        assert_eq!(normalize_score(-100.0, &scaler), 0.0);
        assert_eq!(normalize_score(100.0, &scaler), 1.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(0.123_456, 4), 0.1235);
        assert_eq!(round_to(-1.005_1, 2), -1.01);
    }

    #[test]
    fn test_round_to_ties_go_to_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(2.625, 2), 2.62);
        assert_eq!(round_to(0.031_25, 4), 0.0312);
        // 2.675 is stored just below the tie.
        assert_eq!(round_to(2.675, 2), 2.67);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    proptest! {
        #[test]
        fn normalized_score_stays_in_unit_interval(
            raw in -1e6f64..1e6,
            min in -100.0f64..100.0,
            width in 0.001f64..500.0,
        ) {
            let scaler = ScoreScaler::new(min, min + width).unwrap();
            let norm = normalize_score(raw, &scaler);
            prop_assert!((0.0..=1.0).contains(&norm));
        }
    }
}
