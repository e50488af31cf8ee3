use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::domain::{
    alert::{ProximityAlertPolicy, UnmatchedZonePolicy, ZoneThresholds},
    annotation::{AlertPalette, FrameAnnotator, DEFAULT_VEHICLE_LABELS},
    distance::DistanceEstimator,
    errors::{DomainError, DomainResult},
    geometry::Point,
    model::YoloParams,
    zone::{Zone, ZoneClassifier, ZoneId},
};

/// Static configuration, read once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub detection: DetectionConfig,
    pub distance: DistanceConfig,
    pub alerts: AlertConfig,
    pub zones: Vec<ZoneConfig>,
    pub model: YoloParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
    pub vehicle_labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub focal_length_px: f32,
    pub known_vehicle_height_m: f32,
    pub min_m: f32,
    pub max_m: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub unmatched: UnmatchedZonePolicy,
    pub palette: AlertPalette,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,
    pub polygon: Vec<Point>,
    pub reference_point: Point,
    pub warning_distance_m: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            vehicle_labels: DEFAULT_VEHICLE_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            focal_length_px: 500.0,
            known_vehicle_height_m: 1.6,
            min_m: 0.5,
            max_m: 50.0,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        let zone = |id, polygon: &[[f32; 2]], reference: [f32; 2], warning_distance_m| ZoneConfig {
            id,
            polygon: polygon.iter().copied().map(Point::from).collect(),
            reference_point: reference.into(),
            warning_distance_m,
        };
        Self {
            detection: DetectionConfig::default(),
            distance: DistanceConfig::default(),
            alerts: AlertConfig::default(),
            // 1920x1080 dash-cam framing
            zones: vec![
                zone(ZoneId::Left, &[[240.0, 600.0], [925.0, 550.0], [312.0, 1100.0], [100.0, 1100.0]], [500.0, 800.0], 1.0),
                zone(ZoneId::Main, &[[925.0, 550.0], [1025.0, 550.0], [1712.0, 1100.0], [312.0, 1100.0]], [1025.0, 900.0], 2.0),
                zone(ZoneId::Right, &[[1025.0, 550.0], [1802.0, 600.0], [1942.0, 1100.0], [1712.0, 1100.0]], [1550.0, 800.0], 1.0),
            ],
            model: YoloParams::default(),
        }
    }
}

impl SystemConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("no se pudo leer {}", path.display()))?;
        let config: SystemConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("YAML inválido en {}", path.display()))?;
        Ok(config)
    }

    pub fn confidence_threshold(&self) -> DomainResult<f32> {
        let c = self.detection.confidence_threshold;
        if !(0.0..=1.0).contains(&c) {
            return Err(DomainError::Configuration(format!(
                "confidence_threshold debe estar en [0, 1], recibido {c}"
            )));
        }
        Ok(c)
    }

    pub fn distance_estimator(&self) -> DomainResult<DistanceEstimator> {
        let d = &self.distance;
        DistanceEstimator::new(d.focal_length_px, d.known_vehicle_height_m, d.min_m, d.max_m)
    }

    pub fn zone_classifier(&self) -> DomainResult<ZoneClassifier> {
        if self.zones.is_empty() {
            return Err(DomainError::Configuration("no hay zonas configuradas".into()));
        }
        let zones = self
            .zones
            .iter()
            .map(|z| Zone::new(z.id, z.polygon.clone(), z.reference_point, z.warning_distance_m))
            .collect::<DomainResult<Vec<_>>>()?;
        ZoneClassifier::new(zones)
    }

    pub fn alert_policy(&self) -> DomainResult<ProximityAlertPolicy> {
        if let UnmatchedZonePolicy::FlatThreshold { meters } = self.alerts.unmatched {
            if !(meters.is_finite() && meters > 0.0) {
                return Err(DomainError::Configuration(format!(
                    "flat_threshold debe ser positivo, recibido {meters}"
                )));
            }
        }
        let thresholds: ZoneThresholds = self.zones.iter().map(|z| (z.id, z.warning_distance_m)).collect();
        Ok(ProximityAlertPolicy::new(thresholds, self.alerts.unmatched))
    }

    pub fn annotator(&self) -> DomainResult<FrameAnnotator> {
        if self.detection.vehicle_labels.is_empty() {
            return Err(DomainError::Configuration("vehicle_labels está vacío".into()));
        }
        Ok(FrameAnnotator::new(self.detection.vehicle_labels.iter().cloned(), self.alerts.palette))
    }

    /// Warning distance per zone, for display.
    pub fn warning_distances(&self) -> BTreeMap<ZoneId, f32> {
        self.zones.iter().map(|z| (z.id, z.warning_distance_m)).collect()
    }
}
