use std::collections::BTreeSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::alert::{AlertLevel, VehicleAssessment};
use super::detection::BoundingBox;
use super::zone::ZoneId;

/// Labels kept by default; COCO exports name the two-wheeler "motorcycle".
pub const DEFAULT_VEHICLE_LABELS: [&str; 5] = ["car", "truck", "bus", "motorbike", "motorcycle"];

pub type Rgb = [u8; 3];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertPalette {
    pub safe: Rgb,
    pub warning: Rgb,
}

impl Default for AlertPalette {
    fn default() -> Self {
        Self {
            safe: [0, 255, 0],
            warning: [255, 0, 0],
        }
    }
}

impl AlertPalette {
    pub fn color(&self, level: AlertLevel) -> Rgb {
        match level {
            AlertLevel::Safe => self.safe,
            AlertLevel::Warning => self.warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub bbox: BoundingBox,
    pub label: String,
    pub distance_m: f32,
    pub zone: Option<ZoneId>,
    pub alert: AlertLevel,
    pub color: Rgb,
}

#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub annotations: Vec<Annotation>,
    /// `None` on the first frame: there is no previous start to measure against.
    pub fps: Option<f32>,
}

impl AnnotatedFrame {
    pub fn warnings(&self) -> usize {
        self.annotations.iter().filter(|a| a.alert == AlertLevel::Warning).count()
    }
}

/// Instantaneous frame rate from consecutive frame-start timestamps.
#[derive(Debug, Default)]
pub struct FrameRateMeter {
    previous: Option<Instant>,
}

impl FrameRateMeter {
    pub fn sample(&mut self, started_at: Instant) -> Option<f32> {
        let fps = self.previous.map(|prev| {
            let dt = started_at.saturating_duration_since(prev).as_secs_f32().max(1e-6);
            1.0 / dt
        });
        self.previous = Some(started_at);
        fps
    }
}

pub struct FrameAnnotator {
    vehicle_labels: BTreeSet<String>,
    palette: AlertPalette,
    fps: FrameRateMeter,
}

impl FrameAnnotator {
    pub fn new(vehicle_labels: impl IntoIterator<Item = String>, palette: AlertPalette) -> Self {
        Self {
            vehicle_labels: vehicle_labels.into_iter().map(|l| l.to_lowercase()).collect(),
            palette,
            fps: FrameRateMeter::default(),
        }
    }

    pub fn is_vehicle(&self, label: &str) -> bool {
        self.vehicle_labels.contains(&label.to_lowercase())
    }

    /// Builds the render payload for one frame. Non-vehicle detections are dropped.
    pub fn annotate(&mut self, assessments: &[VehicleAssessment], frame_started_at: Instant) -> AnnotatedFrame {
        let annotations = assessments
            .iter()
            .filter(|a| self.is_vehicle(&a.detection.label))
            .map(|a| Annotation {
                bbox: a.detection.bbox,
                label: format!("{} {:.1} m", a.detection.label, a.distance_m),
                distance_m: a.distance_m,
                zone: a.zone,
                alert: a.alert,
                color: self.palette.color(a.alert),
            })
            .collect();

        AnnotatedFrame {
            annotations,
            fps: self.fps.sample(frame_started_at),
        }
    }
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new(DEFAULT_VEHICLE_LABELS.iter().map(|l| l.to_string()), AlertPalette::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::Detection;
    use std::time::Duration;

    fn assessment(label: &str, distance_m: f32, alert: AlertLevel) -> VehicleAssessment {
        VehicleAssessment {
            detection: Detection {
                bbox: BoundingBox::new(10.0, 20.0, 110.0, 220.0),
                score: 0.9,
                class_id: 2,
                label: label.to_string(),
            },
            distance_m,
            zone: Some(ZoneId::Main),
            alert,
        }
    }

    #[test]
    fn test_drops_non_vehicle_labels() {
        let mut annotator = FrameAnnotator::default();
        let frame = annotator.annotate(
            &[
                assessment("car", 4.0, AlertLevel::Safe),
                assessment("person", 1.0, AlertLevel::Warning),
                assessment("motorcycle", 1.2, AlertLevel::Warning),
            ],
            Instant::now(),
        );
        assert_eq!(frame.annotations.len(), 2);
        assert_eq!(frame.annotations[0].label, "car 4.0 m");
        assert_eq!(frame.annotations[1].label, "motorcycle 1.2 m");
        assert_eq!(frame.warnings(), 1);
    }

    #[test]
    fn test_colors_follow_alert_level() {
        let mut annotator = FrameAnnotator::default();
        let frame = annotator.annotate(
            &[assessment("car", 4.0, AlertLevel::Safe), assessment("bus", 1.0, AlertLevel::Warning)],
            Instant::now(),
        );
        assert_eq!(frame.annotations[0].color, [0, 255, 0]);
        assert_eq!(frame.annotations[1].color, [255, 0, 0]);
    }

    #[test]
    fn test_fps_needs_a_previous_frame() {
        let mut annotator = FrameAnnotator::default();
        let t0 = Instant::now();
        assert!(annotator.annotate(&[], t0).fps.is_none());
        let fps = annotator.annotate(&[], t0 + Duration::from_millis(40)).fps.unwrap();
        assert!((fps - 25.0).abs() < 0.01);
        let fps = annotator.annotate(&[], t0 + Duration::from_millis(140)).fps.unwrap();
        assert!((fps - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_fps_never_infinite() {
        let mut meter = FrameRateMeter::default();
        let t0 = Instant::now();
        meter.sample(t0);
        assert!(meter.sample(t0).unwrap().is_finite());
    }
}
