use anyhow::{bail, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use tracing::{debug, info};

use crate::application::ports::DetectorPort;
use crate::domain::camera::Frame;
use crate::domain::detection::{BoundingBox, Detection};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::YoloParams;

const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana",
    "apple", "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza",
    "donut", "cake", "chair", "couch", "potted plant", "bed", "dining table", "toilet", "tv",
    "laptop", "mouse", "remote", "keyboard", "cell phone", "microwave", "oven", "toaster",
    "sink", "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Detector YOLO (export ONNX de Ultralytics, salida [1, 4 + clases, anchors]).
pub struct OnnxYoloEngine {
    session: Session,
    params: YoloParams,
}

impl OnnxYoloEngine {
    pub fn load(path: &str, params: YoloParams) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        // Con `ort` sin default-features, usamos commit_from_memory.
        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;

        info!("Modelo YOLO cargado: {} (imgsz {})", path, params.input_size);
        Ok(Self { session, params })
    }

    pub fn infer(&mut self, rgb: &RgbImage, conf_threshold: f32) -> Result<Vec<Detection>> {
        let imgsz = self.params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (raw, _) = input.into_raw_vec_and_offset();
        let input_tensor = Value::from_array((input_shape, raw))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let view = output_view(&dims, data_out)?;

        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;
        let candidates = decode(view, conf_threshold, sx, sy);

        let kept = non_max_suppression(candidates, self.params.iou_threshold, self.params.max_detections);
        debug!("YOLO: {} detecciones tras NMS", kept.len());
        Ok(kept)
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn detect(&mut self, frame: &Frame, confidence_threshold: f32) -> DomainResult<Vec<Detection>> {
        self.infer(&frame.image, confidence_threshold)
            .map_err(|e| DomainError::DetectionFailure(format!("frame {}: {e:#}", frame.index)))
    }
}

/// Primer elemento del batch como `[4 + clases, anchors]`.
/// Cualquier otra forma (2-D, batch vacío, export transpuesto) es un error, nunca un pánico.
fn output_view<'a>(dims: &[usize], data: &'a [f32]) -> Result<ArrayView2<'a, f32>> {
    if dims.len() != 3 || dims[0] < 1 || dims[1] <= 4 {
        bail!("salida YOLO con forma {:?}, se esperaba [1, 4 + clases, anchors]", dims);
    }
    if dims[1] > dims[2] {
        bail!("salida YOLO {:?} parece transpuesta ([1, anchors, 4 + clases]), no soportada", dims);
    }
    let all = ArrayViewD::from_shape(IxDyn(dims), data)?;
    Ok(all.index_axis_move(Axis(0), 0).into_dimensionality::<Ix2>()?)
}

/// Candidatos con score >= `conf_threshold`, con las cajas reescaladas a píxeles del frame.
fn decode(view: ArrayView2<f32>, conf_threshold: f32, sx: f32, sy: f32) -> Vec<Detection> {
    let mut candidates = Vec::new();

    for i in 0..view.ncols() {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &max_score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if max_score >= conf_threshold {
            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];

            candidates.push(Detection {
                bbox: BoundingBox::new(
                    (cx - w / 2.0) * sx,
                    (cy - h / 2.0) * sy,
                    (cx + w / 2.0) * sx,
                    (cy + h / 2.0) * sy,
                ),
                score: max_score,
                class_id,
                label: COCO_CLASSES.get(class_id).unwrap_or(&"object").to_string(),
            });
        }
    }
    candidates
}

/// Greedy NMS per class, highest score first.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32, max_detections: usize) -> Vec<Detection> {
    detections.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::new();
    for det in detections {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.bbox.iou(&det.bbox) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Salida sintética [84, n] con una columna por candidato (cx, cy, w, h, clase, score).
    fn synthetic(candidates: &[(f32, f32, f32, f32, usize, f32)]) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((4 + COCO_CLASSES.len(), candidates.len()));
        for (i, &(cx, cy, w, h, class_id, score)) in candidates.iter().enumerate() {
            out[[0, i]] = cx;
            out[[1, i]] = cy;
            out[[2, i]] = w;
            out[[3, i]] = h;
            out[[4 + class_id, i]] = score;
        }
        out
    }

    #[test]
    fn test_decode_keeps_scores_at_or_above_threshold() {
        let out = synthetic(&[
            (100.0, 100.0, 20.0, 40.0, 3, 0.7),
            (300.0, 300.0, 20.0, 40.0, 2, 0.69),
            (500.0, 500.0, 20.0, 40.0, 2, 0.9),
        ]);
        let dets = decode(out.view(), 0.7, 1.0, 1.0);
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].score, 0.7);
        assert_eq!(dets[1].score, 0.9);
    }

    #[test]
    fn test_decode_rescales_to_frame_pixels_and_maps_labels() {
        let out = synthetic(&[(100.0, 100.0, 20.0, 40.0, 3, 0.8)]);
        let dets = decode(out.view(), 0.5, 2.0, 0.5);
        let d = &dets[0];
        assert_eq!((d.bbox.x1, d.bbox.y1, d.bbox.x2, d.bbox.y2), (180.0, 40.0, 220.0, 60.0));
        assert_eq!(d.class_id, 3);
        assert_eq!(d.label, "motorcycle");
    }

    #[test]
    fn test_output_view_accepts_ultralytics_layout() {
        let data = vec![0.0f32; 84 * 10];
        let view = output_view(&[1, 84, 10], &data).unwrap();
        assert_eq!(view.shape(), &[84, 10]);
    }

    #[test]
    fn test_output_view_rejects_unexpected_shapes() {
        let data = vec![0.0f32; 84 * 10];
        assert!(output_view(&[84, 10], &data[..840]).is_err());
        assert!(output_view(&[0, 84, 10], &[]).is_err());
        assert!(output_view(&[1, 4, 10], &data[..40]).is_err());
        assert!(output_view(&[1, 10, 84], &data).is_err());
        assert!(output_view(&[1, 84, 20], &data).is_err());
    }

    fn det(class_id: usize, score: f32, x1: f32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x1, 0.0, x1 + 100.0, 100.0),
            score,
            class_id,
            label: COCO_CLASSES[class_id].to_string(),
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let kept = non_max_suppression(vec![det(2, 0.8, 0.0), det(2, 0.9, 5.0), det(2, 0.7, 500.0)], 0.45, 100);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].bbox.x1, 500.0);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let kept = non_max_suppression(vec![det(2, 0.9, 0.0), det(7, 0.8, 0.0)], 0.45, 100);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].label, "truck");
    }

    #[test]
    fn test_nms_caps_results() {
        let many = (0..10).map(|i| det(2, 0.5 + i as f32 * 0.01, i as f32 * 200.0)).collect();
        assert_eq!(non_max_suppression(many, 0.45, 3).len(), 3);
    }
}
