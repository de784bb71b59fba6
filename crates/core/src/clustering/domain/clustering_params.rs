use serde::{Deserialize, Serialize};

use crate::clustering::domain::face_clusterer::ClusteringError;
use crate::shared::constants::{DEFAULT_EPSILON, DEFAULT_MIN_POINTS};

/// DBSCAN parameters over cosine distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusteringParams {
    /// Neighborhood radius; cosine distance lies in `[0, 2]`.
    pub epsilon: f64,
    /// Neighbors (self included) required for a core point.
    pub min_points: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}

impl ClusteringParams {
    pub fn validate(&self) -> Result<(), ClusteringError> {
        if !(self.epsilon > 0.0 && self.epsilon <= 2.0) {
            return Err(ClusteringError::InvalidParameters(format!(
                "epsilon must be within (0, 2], got {}",
                self.epsilon
            )));
        }
        if self.min_points == 0 {
            return Err(ClusteringError::InvalidParameters(
                "min_points must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let params = ClusteringParams::default();
        assert_eq!(params.epsilon, 0.45);
        assert_eq!(params.min_points, 1);
        assert!(params.validate().is_ok());
    }

    #[rstest]
    #[case(0.0, 1)]
    #[case(-0.1, 1)]
    #[case(2.01, 1)]
    #[case(f64::NAN, 1)]
    #[case(0.45, 0)]
    fn test_invalid(#[case] epsilon: f64, #[case] min_points: usize) {
        let params = ClusteringParams { epsilon, min_points };
        assert!(matches!(
            params.validate(),
            Err(ClusteringError::InvalidParameters(_))
        ));
    }
}
