use std::cmp::Ordering;

use crate::data::Detection;

pub trait Nms {
    fn iou(&self, other: &Self) -> f32;
    fn confidence(&self) -> f32;
}

impl Nms for Detection {
    /// Computes the intersection over union (IoU) between this detection and
    /// another.
    fn iou(&self, other: &Self) -> f32 {
        let union = self.bbox.union(&other.bbox);
        if union <= 0.0 {
            return 0.0;
        }
        self.bbox.intersect(&other.bbox) / union
    }

    fn confidence(&self) -> f32 {
        self.score
    }
}

/// Class-agnostic greedy non-maximum suppression.
///
/// Candidates are visited in descending confidence order (ties broken by the
/// original index, which makes the result deterministic for a fixed input).
/// A candidate is dropped when it overlaps an already-kept detection above
/// `iou_threshold`. The retained detections come back in confidence order,
/// values untouched.
pub fn suppress<T: Nms + Clone>(detections: &[T], iou_threshold: f32) -> Vec<T> {
    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| {
        detections[b]
            .confidence()
            .partial_cmp(&detections[a].confidence())
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut keep: Vec<usize> = Vec::new();
    for &idx in &order {
        let mut drop = false;
        for &kept in &keep {
            if detections[kept].iou(&detections[idx]) > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            keep.push(idx);
        }
    }

    keep.iter().map(|&i| detections[i].clone()).collect()
}
