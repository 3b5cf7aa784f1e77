//! Model output decoding.
//!
//! Two export families are supported. Anchor-free single-tensor exports emit
//! one `[1, 4+C, N]` tensor of center-form boxes and per-class confidences;
//! these need suppression afterwards. SSD-style exports emit four tensors
//! (boxes, classes, scores, detection count) with suppression already applied
//! by the exporting graph. The layout is fixed once at load time from the
//! output tensor count and names, never re-detected per frame.

use rayon::prelude::*;

use crate::data::{BBox, Detection, LabelStore, ScoreThresholds};
use crate::detector::RawOutputs;
use crate::error::DetectorError;

/// Output tensor index permutation of SSD exports.
///
/// TF2-style exports (recognizable by their `StatefulPartitionedCall` output
/// names) permute which index holds boxes, classes, scores and count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsdOrder {
    Tf1,
    Tf2,
}

impl SsdOrder {
    /// `(boxes, classes, scores, count)` tensor indices.
    fn indices(&self) -> (usize, usize, usize, usize) {
        match self {
            SsdOrder::Tf1 => (0, 1, 2, 3),
            SsdOrder::Tf2 => (1, 3, 0, 2),
        }
    }
}

/// Output layout of the loaded model. Fixed for the model's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLayout {
    AnchorFree,
    Ssd(SsdOrder),
}

impl ModelLayout {
    /// Determines the layout from the model's declared outputs. Failing here
    /// is fatal: an undecodable model is as useless as a missing one.
    pub fn detect(output_names: &[String]) -> Result<Self, DetectorError> {
        match output_names.len() {
            1 => Ok(ModelLayout::AnchorFree),
            4 => {
                if output_names
                    .iter()
                    .any(|name| name.contains("StatefulPartitionedCall"))
                {
                    Ok(ModelLayout::Ssd(SsdOrder::Tf2))
                } else {
                    Ok(ModelLayout::Ssd(SsdOrder::Tf1))
                }
            }
            n => Err(DetectorError::OutputLayout(format!(
                "expected 1 or 4 output tensors, model declares {n}"
            ))),
        }
    }

    /// SSD exports come pre-suppressed; anchor-free exports do not.
    pub fn needs_suppression(&self) -> bool {
        matches!(self, ModelLayout::AnchorFree)
    }
}

/// Decodes one frame's raw outputs into pixel-space detections.
///
/// Rows at or below their class threshold are dropped, as are boxes that
/// collapse to zero area. An empty result is a valid outcome, not an error.
pub fn decode(
    outputs: &RawOutputs,
    layout: ModelLayout,
    frame_w: u32,
    frame_h: u32,
    thresholds: &ScoreThresholds,
    labels: &LabelStore,
) -> Result<Vec<Detection>, DetectorError> {
    match layout {
        ModelLayout::AnchorFree => decode_anchor_free(outputs, frame_w, frame_h, thresholds, labels),
        ModelLayout::Ssd(order) => decode_ssd(outputs, order, frame_w, frame_h, thresholds, labels),
    }
}

fn decode_anchor_free(
    outputs: &RawOutputs,
    frame_w: u32,
    frame_h: u32,
    thresholds: &ScoreThresholds,
    labels: &LabelStore,
) -> Result<Vec<Detection>, DetectorError> {
    let tensor = outputs
        .by_index(0)
        .ok_or_else(|| DetectorError::Inference("missing output tensor".to_string()))?;

    let shape = tensor.shape();
    if shape.len() != 3 || shape[1] < 5 {
        return Err(DetectorError::Inference(format!(
            "unexpected detection tensor shape {shape:?}"
        )));
    }
    let num_classes = shape[1] - 4;
    let rows = shape[2];
    let (fw, fh) = (frame_w as f32, frame_h as f32);

    // Row-parallel scan; the tensor is [1, 4+C, N], rows live on the last axis.
    let detections: Vec<Detection> = (0..rows)
        .into_par_iter()
        .filter_map(|row| {
            let mut class_id = 0usize;
            let mut score = f32::MIN;
            for c in 0..num_classes {
                let s = tensor[[0, 4 + c, row]];
                if s > score {
                    score = s;
                    class_id = c;
                }
            }
            if score <= thresholds.for_class(class_id) {
                return None;
            }

            let cx = tensor[[0, 0, row]];
            let cy = tensor[[0, 1, row]];
            let w = tensor[[0, 2, row]];
            let h = tensor[[0, 3, row]];
            let bbox = BBox::from_cxcy_wh(cx * fw, cy * fh, w * fw, h * fh);
            if bbox.is_degenerate() {
                return None;
            }

            let mut det = Detection::new(class_id, bbox, score);
            if let Some(label) = labels.get(class_id) {
                det = det.with_label(label);
            }
            Some(det)
        })
        .collect();

    Ok(detections)
}

fn decode_ssd(
    outputs: &RawOutputs,
    order: SsdOrder,
    frame_w: u32,
    frame_h: u32,
    thresholds: &ScoreThresholds,
    labels: &LabelStore,
) -> Result<Vec<Detection>, DetectorError> {
    let (boxes_idx, classes_idx, scores_idx, count_idx) = order.indices();

    let missing = || DetectorError::Inference("missing output tensor".to_string());
    let boxes = outputs.by_index(boxes_idx).ok_or_else(missing)?;
    let classes = outputs.by_index(classes_idx).ok_or_else(missing)?;
    let scores = outputs.by_index(scores_idx).ok_or_else(missing)?;
    let count = outputs.by_index(count_idx).ok_or_else(missing)?;

    let scores: Vec<f32> = scores.iter().copied().collect();
    let classes: Vec<f32> = classes.iter().copied().collect();
    let boxes: Vec<f32> = boxes.iter().copied().collect();

    // The scalar count declares how many leading rows are valid; everything
    // past it is padding.
    let declared = count.iter().next().copied().unwrap_or(0.0).max(0.0) as usize;
    let valid = declared.min(scores.len()).min(classes.len());
    if boxes.len() < valid * 4 {
        return Err(DetectorError::Inference(format!(
            "box tensor too small: {} values for {} detections",
            boxes.len(),
            valid
        )));
    }

    let (fw, fh) = (frame_w as f32, frame_h as f32);
    let mut detections = Vec::new();
    for i in 0..valid {
        let class_id = classes[i].max(0.0) as usize;
        let score = scores[i];
        if score <= thresholds.for_class(class_id) {
            continue;
        }

        // SSD boxes are (y1, x1, y2, x2), normalized.
        let y1 = boxes[i * 4];
        let x1 = boxes[i * 4 + 1];
        let y2 = boxes[i * 4 + 2];
        let x2 = boxes[i * 4 + 3];
        let bbox = BBox::new(x1 * fw, y1 * fh, x2 * fw, y2 * fh);
        if bbox.is_degenerate() {
            continue;
        }

        let mut det = Detection::new(class_id, bbox, score);
        if let Some(label) = labels.get(class_id) {
            det = det.with_label(label);
        }
        detections.push(det);
    }

    Ok(detections)
}
