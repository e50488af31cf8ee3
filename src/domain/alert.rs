use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::detection::Detection;
use super::zone::ZoneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Safe,
    Warning,
}

impl Display for AlertLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Safe => write!(f, "SAFE"),
            AlertLevel::Warning => write!(f, "WARNING"),
        }
    }
}

/// What to do with detections outside every monitored lane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UnmatchedZonePolicy {
    /// Never warn outside the monitored lanes.
    #[default]
    Safe,
    /// Warn at or below a single lane-independent distance.
    FlatThreshold { meters: f32 },
}

pub type ZoneThresholds = BTreeMap<ZoneId, f32>;

/// `WARNING` iff the matched zone's threshold is reached; unmatched zones are `SAFE`.
pub fn evaluate(distance_m: f32, zone: Option<ZoneId>, thresholds: &ZoneThresholds) -> AlertLevel {
    match zone.and_then(|id| thresholds.get(&id)) {
        Some(&limit) if distance_m <= limit => AlertLevel::Warning,
        _ => AlertLevel::Safe,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityAlertPolicy {
    thresholds: ZoneThresholds,
    unmatched: UnmatchedZonePolicy,
}

impl ProximityAlertPolicy {
    pub fn new(thresholds: ZoneThresholds, unmatched: UnmatchedZonePolicy) -> Self {
        Self { thresholds, unmatched }
    }

    pub fn evaluate(&self, distance_m: f32, zone: Option<ZoneId>) -> AlertLevel {
        // per-zone thresholds always win for matched zones
        if let Some(id) = zone.filter(|id| self.thresholds.contains_key(id)) {
            return evaluate(distance_m, Some(id), &self.thresholds);
        }
        match self.unmatched {
            UnmatchedZonePolicy::Safe => AlertLevel::Safe,
            UnmatchedZonePolicy::FlatThreshold { meters } if distance_m <= meters => AlertLevel::Warning,
            UnmatchedZonePolicy::FlatThreshold { .. } => AlertLevel::Safe,
        }
    }
}

/// One detection after distance estimation, zone classification and alerting.
#[derive(Debug, Clone)]
pub struct VehicleAssessment {
    pub detection: Detection,
    pub distance_m: f32,
    pub zone: Option<ZoneId>,
    pub alert: AlertLevel,
}
