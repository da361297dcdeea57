//! YOLOv5 object detection on ONNX Runtime.
//!
//! The model takes a `1×3×640×640` RGB tensor in `[0, 1]` (letterboxed, grey
//! padding) and emits `1×N×(5+C)` rows of `cx, cy, w, h, objectness, class
//! scores...`. Post-processing is the stock YOLOv5 recipe: confidence gate on
//! objectness × class score, per-class greedy NMS, highest confidence first.

use std::path::Path;

use image::{imageops::FilterType, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use thiserror::Error;

use crate::{Detection, ObjectDetector};

/// Square input resolution of the exported model.
pub const INPUT_SIZE: u32 = 640;
/// Letterbox padding value (YOLOv5 uses grey 114).
const PAD_VALUE: f32 = 114.0 / 255.0;
/// Upper bound on detections kept after NMS.
const MAX_DETECTIONS: usize = 300;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// COCO class names in YOLOv5 output order.
pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to load detector model {path}: {message}")]
    Load { path: String, message: String },
    #[error("detector inference failed: {0}")]
    Inference(String),
    #[error("unexpected detector output shape {0:?}")]
    OutputShape(Vec<i64>),
}

/// Geometry of a letterboxed frame, needed to map boxes back to the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub src_width: u32,
    pub src_height: u32,
}

impl Letterbox {
    pub fn for_frame(width: u32, height: u32) -> Self {
        let scale = (INPUT_SIZE as f32 / width as f32).min(INPUT_SIZE as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((INPUT_SIZE as f32 - new_w) / 2.0).floor(),
            pad_y: ((INPUT_SIZE as f32 - new_h) / 2.0).floor(),
            src_width: width,
            src_height: height,
        }
    }

    fn resized_dims(&self) -> (u32, u32) {
        (
            ((self.src_width as f32 * self.scale).round() as u32).clamp(1, INPUT_SIZE),
            ((self.src_height as f32 * self.scale).round() as u32).clamp(1, INPUT_SIZE),
        )
    }

    /// Map a model-space `(cx, cy, w, h)` box to clamped source-frame `[x1, y1, x2, y2]`.
    pub fn unmap(&self, cx: f32, cy: f32, w: f32, h: f32) -> [f32; 4] {
        let max_x = self.src_width as f32;
        let max_y = self.src_height as f32;
        let x1 = ((cx - w / 2.0 - self.pad_x) / self.scale).clamp(0.0, max_x);
        let y1 = ((cy - h / 2.0 - self.pad_y) / self.scale).clamp(0.0, max_y);
        let x2 = ((cx + w / 2.0 - self.pad_x) / self.scale).clamp(0.0, max_x);
        let y2 = ((cy + h / 2.0 - self.pad_y) / self.scale).clamp(0.0, max_y);
        [x1, y1, x2, y2]
    }
}

/// Build the CHW input tensor data for a frame.
pub fn preprocess(frame: &RgbImage) -> (Vec<f32>, Letterbox) {
    let letterbox = Letterbox::for_frame(frame.width(), frame.height());
    let (new_w, new_h) = letterbox.resized_dims();
    let resized = image::imageops::resize(frame, new_w, new_h, FilterType::Triangle);

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut data = vec![PAD_VALUE; 3 * plane];
    let off_x = letterbox.pad_x as u32;
    let off_y = letterbox.pad_y as u32;

    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = x + off_x;
        let ty = y + off_y;
        if tx >= INPUT_SIZE || ty >= INPUT_SIZE {
            continue;
        }
        let idx = (ty * INPUT_SIZE + tx) as usize;
        for c in 0..3 {
            data[c * plane + idx] = pixel[c] as f32 / 255.0;
        }
    }

    (data, letterbox)
}

struct Candidate {
    class: usize,
    confidence: f32,
    bbox: [f32; 4],
}

/// Turn raw `rows × cols` predictions into labelled detections.
pub fn postprocess(
    predictions: &[f32],
    cols: usize,
    letterbox: &Letterbox,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Vec<Detection> {
    if cols <= 5 {
        return Vec::new();
    }

    let mut candidates: Vec<Candidate> = predictions
        .chunks_exact(cols)
        .filter_map(|row| {
            let objectness = row[4];
            if objectness < confidence_threshold {
                return None;
            }
            let (class, class_score) = row[5..]
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            let confidence = objectness * class_score;
            if confidence < confidence_threshold {
                return None;
            }
            Some(Candidate {
                class,
                confidence,
                bbox: letterbox.unmap(row[0], row[1], row[2], row[3]),
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::new();
    for cand in candidates {
        if kept.len() >= MAX_DETECTIONS {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class == cand.class && iou(&k.bbox, &cand.bbox) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }

    kept.into_iter()
        .map(|c| Detection {
            label: label_for(c.class),
            confidence: c.confidence,
            bbox: c.bbox,
        })
        .collect()
}

fn label_for(class: usize) -> String {
    COCO_LABELS
        .get(class)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("class_{class}"))
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes.
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// YOLOv5 detector backed by an ONNX Runtime session.
pub struct YoloDetector {
    session: Session,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn load(
        path: &Path,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Self, DetectorError> {
        let load_err = |e: &dyn std::fmt::Display| DetectorError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let builder = Session::builder().map_err(|e| load_err(&e))?;
        let builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_err(&e))?;
        let session = builder.commit_from_file(path).map_err(|e| load_err(&e))?;

        tracing::debug!(
            path = %path.display(),
            confidence_threshold,
            iou_threshold,
            "yolo session created"
        );

        Ok(Self {
            session,
            confidence_threshold,
            iou_threshold,
        })
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, DetectorError> {
        let (data, letterbox) = preprocess(frame);
        let input = Tensor::from_array((
            vec![1i64, 3, INPUT_SIZE as i64, INPUT_SIZE as i64],
            data,
        ))
        .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let (shape, predictions) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        if dims.len() != 3 || dims[2] <= 5 {
            return Err(DetectorError::OutputShape(dims));
        }

        Ok(postprocess(
            predictions,
            dims[2] as usize,
            &letterbox,
            self.confidence_threshold,
            self.iou_threshold,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLS: usize = 85;

    /// Helper: one prediction row with a single hot class.
    fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, class: usize, score: f32) -> Vec<f32> {
        let mut r = vec![0.0; COLS];
        r[0] = cx;
        r[1] = cy;
        r[2] = w;
        r[3] = h;
        r[4] = obj;
        r[5 + class] = score;
        r
    }

    fn identity() -> Letterbox {
        Letterbox::for_frame(INPUT_SIZE, INPUT_SIZE)
    }

    #[test]
    fn test_letterbox_wide_frame() {
        let lb = Letterbox::for_frame(1280, 720);
        assert!((lb.scale - 0.5).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 140.0);
        // A box centred in the padded image maps back to the frame centre
        let b = lb.unmap(320.0, 320.0, 100.0, 100.0);
        assert_eq!(b, [540.0, 260.0, 740.0, 460.0]);
    }

    #[test]
    fn test_unmap_clamps_to_frame() {
        let lb = identity();
        let b = lb.unmap(10.0, 10.0, 100.0, 100.0);
        assert_eq!(b[0], 0.0);
        assert_eq!(b[1], 0.0);
    }

    #[test]
    fn test_preprocess_pads_and_normalises() {
        let frame = RgbImage::from_pixel(640, 320, image::Rgb([255, 0, 0]));
        let (data, lb) = preprocess(&frame);
        let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
        assert_eq!(data.len(), 3 * plane);
        assert_eq!(lb.pad_y, 160.0);
        // Top row is padding, middle row is frame content
        assert!((data[0] - PAD_VALUE).abs() < 1e-6);
        let mid = (320 * INPUT_SIZE + 320) as usize;
        assert!((data[mid] - 1.0).abs() < 1e-6);
        assert!(data[plane + mid].abs() < 1e-6);
    }

    #[test]
    fn test_confidence_gate() {
        let mut preds = row(100.0, 100.0, 50.0, 50.0, 0.9, 0, 0.9);
        preds.extend(row(300.0, 300.0, 50.0, 50.0, 0.2, 67, 0.99));
        preds.extend(row(500.0, 500.0, 50.0, 50.0, 0.5, 73, 0.4));
        let dets = postprocess(&preds, COLS, &identity(), 0.25, 0.45);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "person");
    }

    #[test]
    fn test_sorted_by_confidence() {
        let mut preds = row(100.0, 100.0, 50.0, 50.0, 0.6, 0, 0.6);
        preds.extend(row(400.0, 400.0, 50.0, 50.0, 0.95, 67, 0.95));
        let dets = postprocess(&preds, COLS, &identity(), 0.25, 0.45);
        let labels: Vec<&str> = dets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["cell phone", "person"]);
    }

    #[test]
    fn test_nms_is_per_class() {
        // Two overlapping persons collapse; an overlapping phone survives
        let mut preds = row(200.0, 200.0, 100.0, 100.0, 0.9, 0, 0.9);
        preds.extend(row(205.0, 205.0, 100.0, 100.0, 0.8, 0, 0.8));
        preds.extend(row(205.0, 205.0, 100.0, 100.0, 0.7, 67, 0.7));
        let dets = postprocess(&preds, COLS, &identity(), 0.25, 0.45);
        let labels: Vec<&str> = dets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["person", "cell phone"]);
    }

    #[test]
    fn test_iou() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        let half = iou(&a, &[5.0, 0.0, 15.0, 10.0]);
        assert!((half - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_class_index_gets_placeholder_label() {
        assert_eq!(label_for(2), "car");
        assert_eq!(label_for(80), "class_80");
    }
}
