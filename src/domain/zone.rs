use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};
use super::geometry::{Point, Polygon};

/// Lane zones, declared in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneId {
    Left,
    Main,
    Right,
}

impl Display for ZoneId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneId::Left => write!(f, "LEFT"),
            ZoneId::Main => write!(f, "MAIN"),
            ZoneId::Right => write!(f, "RIGHT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub polygon: Polygon,
    pub reference_point: Point,
    pub warning_distance_m: f32,
}

impl Zone {
    pub fn new(id: ZoneId, vertices: Vec<Point>, reference_point: Point, warning_distance_m: f32) -> DomainResult<Self> {
        let polygon = Polygon::new(vertices).map_err(|e| e.into_configuration(&format!("zona {id}")))?;
        if !polygon.contains(reference_point) {
            return Err(DomainError::Configuration(format!(
                "zona {id}: el punto de referencia {reference_point:?} queda fuera de su polígono"
            )));
        }
        if !(warning_distance_m.is_finite() && warning_distance_m > 0.0) {
            return Err(DomainError::Configuration(format!(
                "zona {id}: warning_distance_m debe ser positivo, recibido {warning_distance_m}"
            )));
        }
        Ok(Self { id, polygon, reference_point, warning_distance_m })
    }
}

/// Maps a footprint point to the lane zone containing it.
#[derive(Debug, Clone)]
pub struct ZoneClassifier {
    // sorted by ZoneId priority
    zones: Vec<Zone>,
}

impl ZoneClassifier {
    pub fn new(mut zones: Vec<Zone>) -> DomainResult<Self> {
        zones.sort_by_key(|z| z.id);
        if let Some(pair) = zones.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(DomainError::Configuration(format!("zona {} definida dos veces", pair[0].id)));
        }
        Ok(Self { zones })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Zone containing `footprint`, or `None` when it lies outside every monitored lane.
    ///
    /// Zones are scanned in priority order (LEFT, MAIN, RIGHT) and a lone match is returned
    /// as is. When several polygons contain the point (shared edges, overlaps) the zone whose
    /// reference point is closest wins, and equal distances fall back to the priority order.
    pub fn classify(&self, footprint: Point) -> Option<ZoneId> {
        let mut best: Option<(&Zone, f32)> = None;
        for zone in self.zones.iter().filter(|z| z.polygon.contains(footprint)) {
            let d = zone.reference_point.distance_squared(footprint);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((zone, d)),
            }
        }
        best.map(|(zone, _)| zone.id)
    }
}
