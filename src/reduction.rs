//! Coordinate reduction.
//!
//! GPS recorders emit a position every few seconds, which makes a year of
//! tracks far too dense to render. Reduction keeps every n-th position of each
//! feature's geometry, where n is the whole part of the reduction factor.

use crate::error::AggregatorError;
use crate::models::{FeatureCollection, Position};

/// Reduction factor applied when the caller does not supply one.
pub const DEFAULT_REDUCTION_FACTOR: f64 = 50.0;

/// A validated coordinate reduction factor.
///
/// The effective stride is the whole part of the supplied factor. Factors
/// below 1 (or non-finite values) are rejected up front, before any storage
/// I/O happens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReductionFactor {
    /// Subsampling stride. Always at least 1.
    stride: usize,
}

impl ReductionFactor {
    /// Resolve an optional caller-supplied factor, falling back to the
    /// default.
    ///
    /// # Arguments
    ///
    /// * `factor`: Optional factor, as received from the trigger
    pub fn resolve(factor: Option<f64>) -> Result<Self, AggregatorError> {
        Self::try_from(factor.unwrap_or(DEFAULT_REDUCTION_FACTOR))
    }

    /// Return the subsampling stride.
    pub fn stride(self) -> usize {
        self.stride
    }
}

impl TryFrom<f64> for ReductionFactor {
    type Error = AggregatorError;

    fn try_from(factor: f64) -> Result<Self, Self::Error> {
        if !factor.is_finite() || factor < 1.0 {
            return Err(AggregatorError::InvalidReductionFactor { factor });
        }
        Ok(Self {
            stride: factor as usize,
        })
    }
}

impl Default for ReductionFactor {
    fn default() -> Self {
        Self {
            stride: DEFAULT_REDUCTION_FACTOR as usize,
        }
    }
}

/// Total coordinate counts before and after a reduction pass.
///
/// Reported for observability only; not a control input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReductionStats {
    /// Coordinate count before reduction.
    pub initial: usize,
    /// Coordinate count after reduction.
    pub reduced: usize,
}

impl std::ops::AddAssign for ReductionStats {
    fn add_assign(&mut self, other: Self) {
        self.initial += other.initial;
        self.reduced += other.reduced;
    }
}

/// Subsample a position sequence by the factor's stride.
///
/// Keeps the positions at indices 0, stride, 2 * stride, ... in their original
/// order, so the starting point of a non-empty track is always retained. The
/// result length is ceil(n / stride).
///
/// # Arguments
///
/// * `positions`: Ordered coordinate sequence
/// * `factor`: Validated reduction factor
pub fn reduce_positions(positions: Vec<Position>, factor: ReductionFactor) -> Vec<Position> {
    positions
        .into_iter()
        .step_by(factor.stride())
        .collect()
}

/// Reduce every feature's coordinates in place.
///
/// Each feature's geometry is subsampled independently; a feature with no
/// coordinates is left empty. Returns the total coordinate counts before and
/// after the pass, which are also logged.
///
/// # Arguments
///
/// * `collection`: The feature collection to reduce
/// * `factor`: Validated reduction factor
pub fn reduce_features(
    collection: &mut FeatureCollection,
    factor: ReductionFactor,
) -> ReductionStats {
    let mut stats = ReductionStats::default();
    for feature in &mut collection.features {
        let coordinates = std::mem::take(&mut feature.geometry.coordinates);
        stats.initial += coordinates.len();
        let reduced = reduce_positions(coordinates, factor);
        stats.reduced += reduced.len();
        feature.geometry.coordinates = reduced;
    }
    tracing::info!(
        "Reduced coordinates: {} -> {} (stride {})",
        stats.initial,
        stats.reduced,
        factor.stride()
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn positions(count: usize) -> Vec<Position> {
        (0..count).map(|i| vec![i as f64, -(i as f64)]).collect()
    }

    #[test]
    fn factor_below_one_is_rejected() {
        let err = ReductionFactor::try_from(0.5).unwrap_err();
        assert!(matches!(
            err,
            AggregatorError::InvalidReductionFactor { factor } if factor == 0.5
        ));
    }

    #[test]
    fn factor_zero_is_rejected() {
        assert!(ReductionFactor::try_from(0.0).is_err());
    }

    #[test]
    fn factor_negative_is_rejected() {
        assert!(ReductionFactor::try_from(-2.0).is_err());
    }

    #[test]
    fn factor_nan_is_rejected() {
        assert!(ReductionFactor::try_from(f64::NAN).is_err());
    }

    #[test]
    fn fractional_factor_truncates() {
        assert_eq!(ReductionFactor::try_from(2.9).unwrap().stride(), 2);
    }

    #[test]
    fn resolve_defaults_to_fifty() {
        assert_eq!(ReductionFactor::resolve(None).unwrap().stride(), 50);
    }

    #[test]
    fn resolve_uses_supplied_factor() {
        assert_eq!(ReductionFactor::resolve(Some(10.0)).unwrap().stride(), 10);
    }

    #[test]
    fn reduce_keeps_stride_indices() {
        let factor = ReductionFactor::try_from(10.0).unwrap();
        let reduced = reduce_positions(positions(100), factor);
        assert_eq!(reduced.len(), 10);
        for (n, position) in reduced.iter().enumerate() {
            assert_eq!(position[0], (n * 10) as f64);
        }
    }

    #[test]
    fn reduce_length_is_ceil_of_quotient() {
        let factor = ReductionFactor::try_from(3.0).unwrap();
        // 7 / 3 rounds up: indices 0, 3, 6.
        let reduced = reduce_positions(positions(7), factor);
        assert_eq!(reduced.len(), 3);
        assert_eq!(reduced[0][0], 0.0);
        assert_eq!(reduced[1][0], 3.0);
        assert_eq!(reduced[2][0], 6.0);
    }

    #[test]
    fn reduce_factor_one_is_identity() {
        let factor = ReductionFactor::try_from(1.0).unwrap();
        let original = positions(17);
        assert_eq!(reduce_positions(original.clone(), factor), original);
    }

    #[test]
    fn reduce_retains_starting_point() {
        let factor = ReductionFactor::try_from(1000.0).unwrap();
        let reduced = reduce_positions(positions(5), factor);
        assert_eq!(reduced, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn reduce_empty_sequence() {
        let factor = ReductionFactor::default();
        assert!(reduce_positions(Vec::new(), factor).is_empty());
    }

    #[test]
    fn reduce_features_reports_totals() {
        let mut collection = test_utils::track_collection(&[100, 7]);
        let factor = ReductionFactor::try_from(10.0).unwrap();
        let stats = reduce_features(&mut collection, factor);
        assert_eq!(stats, ReductionStats { initial: 107, reduced: 11 });
        assert_eq!(collection.features[0].geometry.coordinates.len(), 10);
        assert_eq!(collection.features[1].geometry.coordinates.len(), 1);
    }

    #[test]
    fn reduce_features_keeps_properties() {
        let mut collection = test_utils::track_collection(&[20]);
        collection.features[0].properties = Some(serde_json::json!({"day": "2024-03-01"}));
        let factor = ReductionFactor::try_from(4.0).unwrap();
        reduce_features(&mut collection, factor);
        assert_eq!(
            collection.features[0].properties,
            Some(serde_json::json!({"day": "2024-03-01"}))
        );
    }
}
