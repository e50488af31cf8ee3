use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::domain::annotation::{AnnotatedFrame, Annotation};
use crate::domain::zone::Zone;

const ZONE_COLOR: [u8; 3] = [255, 255, 0];
const BOX_THICKNESS: i32 = 2;

/// Pinta los contornos de zona y las cajas (el texto lo dibuja el cliente).
pub fn draw_overlay(image: &mut RgbImage, zones: &[Zone], annotated: &AnnotatedFrame) {
    for zone in zones {
        for (a, b) in zone.polygon.edges() {
            draw_line_segment_mut(image, (a.x, a.y), (b.x, b.y), Rgb(ZONE_COLOR));
        }
    }
    for ann in &annotated.annotations {
        draw_box(image, ann);
    }
}

fn draw_box(image: &mut RgbImage, ann: &Annotation) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    // recortar al frame; cajas completamente fuera no se pintan
    let x1 = ann.bbox.x1.clamp(0.0, w - 1.0);
    let y1 = ann.bbox.y1.clamp(0.0, h - 1.0);
    let x2 = ann.bbox.x2.clamp(0.0, w - 1.0);
    let y2 = ann.bbox.y2.clamp(0.0, h - 1.0);
    for t in 0..BOX_THICKNESS {
        let bw = (x2 - x1) as i32 - 2 * t;
        let bh = (y2 - y1) as i32 - 2 * t;
        if bw <= 0 || bh <= 0 {
            break;
        }
        let rect = Rect::at(x1 as i32 + t, y1 as i32 + t).of_size(bw as u32, bh as u32);
        draw_hollow_rect_mut(image, rect, Rgb(ann.color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{alert::AlertLevel, detection::BoundingBox};

    fn annotated(bbox: BoundingBox) -> AnnotatedFrame {
        AnnotatedFrame {
            annotations: vec![Annotation {
                bbox,
                label: "car 2.0 m".into(),
                distance_m: 2.0,
                zone: None,
                alert: AlertLevel::Warning,
                color: [255, 0, 0],
            }],
            fps: None,
        }
    }

    #[test]
    fn test_box_outline_uses_alert_color() {
        let mut img = RgbImage::new(50, 50);
        draw_overlay(&mut img, &[], &annotated(BoundingBox::new(10.0, 10.0, 30.0, 30.0)));
        assert_eq!(img.get_pixel(10, 20).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(11, 20).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(20, 20).0, [0, 0, 0]);
    }

    #[test]
    fn test_out_of_frame_boxes_do_not_panic() {
        let mut img = RgbImage::new(20, 20);
        draw_overlay(&mut img, &[], &annotated(BoundingBox::new(-50.0, -50.0, 500.0, 500.0)));
        draw_overlay(&mut img, &[], &annotated(BoundingBox::new(100.0, 100.0, 200.0, 200.0)));
    }
}
