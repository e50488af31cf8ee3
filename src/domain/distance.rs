//! Monocular distance heuristic.
//!
//! `distance = focal_px * known_height_m / box_height_px`, clamped. Coarse single-frame
//! approximation: no perspective correction, no lens distortion, not calibrated ground truth.

use super::errors::{DomainError, DomainResult};

/// Floor for the box height so a zero-height detector artifact never divides by zero.
pub const HEIGHT_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEstimator {
    focal_length_px: f32,
    known_height_m: f32,
    min_m: f32,
    max_m: f32,
}

impl DistanceEstimator {
    pub fn new(focal_length_px: f32, known_height_m: f32, min_m: f32, max_m: f32) -> DomainResult<Self> {
        if !(focal_length_px.is_finite() && focal_length_px > 0.0) {
            return Err(DomainError::Configuration(format!(
                "focal_length_px debe ser positivo, recibido {focal_length_px}"
            )));
        }
        if !(known_height_m.is_finite() && known_height_m > 0.0) {
            return Err(DomainError::Configuration(format!(
                "known_vehicle_height_m debe ser positivo, recibido {known_height_m}"
            )));
        }
        if !(min_m.is_finite() && max_m.is_finite() && min_m >= 0.0 && min_m <= max_m) {
            return Err(DomainError::Configuration(format!(
                "rango de distancia inválido [{min_m}, {max_m}]"
            )));
        }
        Ok(Self { focal_length_px, known_height_m, min_m, max_m })
    }

    /// Meters to the vehicle whose box spans `box_top..box_bottom`, always in `[min_m, max_m]`.
    pub fn estimate(&self, box_top: f32, box_bottom: f32) -> f32 {
        // NaN.max(eps) == eps, so a broken box lands on max_m instead of NaN
        let height = (box_bottom - box_top).max(HEIGHT_EPSILON);
        let raw = self.focal_length_px * self.known_height_m / height;
        raw.clamp(self.min_m, self.max_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DistanceEstimator {
        DistanceEstimator::new(500.0, 1.6, 0.5, 50.0).unwrap()
    }

    #[test]
    fn test_400px_box_is_two_meters() {
        let d = reference().estimate(100.0, 500.0);
        assert!((d - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_boxes_clamp_to_max() {
        let est = reference();
        assert_eq!(est.estimate(300.0, 301.0), 50.0);
        assert_eq!(est.estimate(300.0, 300.0), 50.0);
        assert_eq!(est.estimate(300.0, 290.0), 50.0);
        assert_eq!(est.estimate(f32::NAN, 300.0), 50.0);
        assert!(est.estimate(0.0, 1.0).is_finite());
    }

    #[test]
    fn test_huge_box_clamps_to_min() {
        assert_eq!(reference().estimate(0.0, 100_000.0), 0.5);
    }

    #[test]
    fn test_output_always_within_range() {
        let est = reference();
        for h in 1..3000 {
            let d = est.estimate(10.0, 10.0 + h as f32 * 0.7);
            assert!((0.5..=50.0).contains(&d), "h={h} d={d}");
        }
    }

    #[test]
    fn test_monotonically_non_increasing_in_height() {
        let est = reference();
        let mut previous = f32::INFINITY;
        for h in 1..2000 {
            let d = est.estimate(0.0, h as f32);
            assert!(d <= previous);
            previous = d;
        }
    }

    #[test]
    fn test_rejects_bad_constants() {
        assert!(matches!(DistanceEstimator::new(0.0, 1.6, 0.5, 50.0), Err(DomainError::Configuration(_))));
        assert!(matches!(DistanceEstimator::new(500.0, -1.0, 0.5, 50.0), Err(DomainError::Configuration(_))));
        assert!(matches!(DistanceEstimator::new(500.0, 1.6, 10.0, 5.0), Err(DomainError::Configuration(_))));
        assert!(DistanceEstimator::new(500.0, 0.0, 0.5, 50.0).is_err());
    }
}
