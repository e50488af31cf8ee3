use crate::{
    config::SystemConfig,
    domain::{
        alert::{ProximityAlertPolicy, VehicleAssessment},
        detection::Detection,
        distance::DistanceEstimator,
        errors::DomainResult,
        zone::ZoneClassifier,
    },
};

/// Caso de uso central: distancia → zona → nivel de alerta para cada detección.
/// Se construye una sola vez a partir de la configuración validada y es inmutable.
#[derive(Debug, Clone)]
pub struct ProximityService {
    estimator: DistanceEstimator,
    classifier: ZoneClassifier,
    policy: ProximityAlertPolicy,
}

impl ProximityService {
    pub fn new(estimator: DistanceEstimator, classifier: ZoneClassifier, policy: ProximityAlertPolicy) -> Self {
        Self { estimator, classifier, policy }
    }

    /// Valida toda la configuración estática; cualquier error aquí es fatal antes de arrancar.
    pub fn from_config(config: &SystemConfig) -> DomainResult<Self> {
        Ok(Self::new(
            config.distance_estimator()?,
            config.zone_classifier()?,
            config.alert_policy()?,
        ))
    }

    pub fn classifier(&self) -> &ZoneClassifier {
        &self.classifier
    }

    pub fn assess(&self, detection: Detection) -> VehicleAssessment {
        let distance_m = self.estimator.estimate(detection.bbox.y1, detection.bbox.y2);
        let zone = self.classifier.classify(detection.bbox.footprint());
        let alert = self.policy.evaluate(distance_m, zone);
        VehicleAssessment { detection, distance_m, zone, alert }
    }

    pub fn assess_all(&self, detections: Vec<Detection>) -> Vec<VehicleAssessment> {
        detections.into_iter().map(|d| self.assess(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{alert::AlertLevel, detection::BoundingBox, zone::ZoneId};

    fn car(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection { bbox: BoundingBox::new(x1, y1, x2, y2), score: 0.9, class_id: 2, label: "car".into() }
    }

    #[test]
    fn test_close_car_in_main_lane_warns() {
        let service = ProximityService::from_config(&SystemConfig::default()).unwrap();
        // 400 px tall → 2.0 m, footprint (1025, 900)
        let a = service.assess(car(925.0, 500.0, 1125.0, 900.0));
        assert!((a.distance_m - 2.0).abs() < 1e-4);
        assert_eq!(a.zone, Some(ZoneId::Main));
        assert_eq!(a.alert, AlertLevel::Warning);
    }

    #[test]
    fn test_same_distance_in_side_lane_is_safe() {
        let service = ProximityService::from_config(&SystemConfig::default()).unwrap();
        // footprint (500, 800) in LEFT, threshold 1.0 m
        let a = service.assess(car(400.0, 400.0, 600.0, 800.0));
        assert_eq!(a.zone, Some(ZoneId::Left));
        assert_eq!(a.alert, AlertLevel::Safe);
    }

    #[test]
    fn test_outside_every_zone_is_safe() {
        let service = ProximityService::from_config(&SystemConfig::default()).unwrap();
        // footprint (0, 0) after a degenerate box: clamps to max distance
        let a = service.assess(car(-10.0, 0.0, 10.0, 0.0));
        assert_eq!(a.zone, None);
        assert_eq!(a.alert, AlertLevel::Safe);
        assert_eq!(a.distance_m, 50.0);
    }

    #[test]
    fn test_every_detection_gets_one_assessment() {
        let service = ProximityService::from_config(&SystemConfig::default()).unwrap();
        let out = service.assess_all(vec![car(0.0, 0.0, 5.0, 5.0), car(900.0, 700.0, 1100.0, 1000.0)]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|a| (0.5..=50.0).contains(&a.distance_m)));
    }
}
