//! Scoring of service achievement for a destination served over a given distance.
use crate::units::{Dimensionless, Miles};

/// Scores how well a destination is served by a facility at the given distance.
///
/// Scores are between 0 (not served on time) and 1 (fully served).
pub trait ServiceScoring {
    /// The service achievement for a route of the given length
    fn score(&self, distance: Miles) -> Dimensionless;
}

/// Destinations within the maximum distance are served, others aren't
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceThreshold {
    /// The maximum distance at which a destination counts as served
    pub max_distance: Miles,
}

impl ServiceScoring for DistanceThreshold {
    fn score(&self, distance: Miles) -> Dimensionless {
        if distance <= self.max_distance {
            Dimensionless(1.0)
        } else {
            Dimensionless(0.0)
        }
    }
}

/// Full service up to the maximum distance, then decaying linearly to zero
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDecay {
    /// Distance up to which service is complete
    pub full_service_distance: Miles,
    /// Distance at which service reaches zero
    pub zero_service_distance: Miles,
}

impl LinearDecay {
    /// Decay from full service at `max_distance` to none at twice that
    pub fn new(max_distance: Miles) -> Self {
        Self {
            full_service_distance: max_distance,
            zero_service_distance: Miles(max_distance.value() * 2.0),
        }
    }
}

impl ServiceScoring for LinearDecay {
    fn score(&self, distance: Miles) -> Dimensionless {
        if distance <= self.full_service_distance {
            return Dimensionless(1.0);
        }
        if distance >= self.zero_service_distance {
            return Dimensionless(0.0);
        }

        (self.zero_service_distance - distance)
            / (self.zero_service_distance - self.full_service_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(800.0, 1.0)]
    #[case(800.1, 0.0)]
    #[case(5000.0, 0.0)]
    fn test_distance_threshold(#[case] distance: f64, #[case] expected: f64) {
        let scoring = DistanceThreshold {
            max_distance: Miles(800.0),
        };
        assert_eq!(scoring.score(Miles(distance)), Dimensionless(expected));
    }

    #[rstest]
    #[case(100.0, 1.0)]
    #[case(800.0, 1.0)]
    #[case(1200.0, 0.5)]
    #[case(1600.0, 0.0)]
    #[case(2000.0, 0.0)]
    fn test_linear_decay(#[case] distance: f64, #[case] expected: f64) {
        let scoring = LinearDecay::new(Miles(800.0));
        assert_approx_eq!(
            Dimensionless,
            scoring.score(Miles(distance)),
            Dimensionless(expected)
        );
    }
}
