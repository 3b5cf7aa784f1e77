use serde::{Deserialize, Serialize};

use crate::data::LabelStore;

/// Confidence override for a single label.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct LabelThreshold {
    pub label: String,
    pub threshold: f32,
}

/// Per-class confidence thresholds: one global default plus optional
/// per-label overrides.
#[derive(Debug, Clone)]
pub struct ScoreThresholds {
    default: f32,
    per_class: Vec<f32>,
}

impl ScoreThresholds {
    pub fn uniform(default: f32) -> Self {
        Self {
            default,
            per_class: Vec::new(),
        }
    }

    /// Expands label-keyed overrides into a class-id-indexed table. Overrides
    /// naming labels the store doesn't know are ignored.
    pub fn new(default: f32, overrides: &[LabelThreshold], labels: &LabelStore) -> Self {
        let mut per_class = vec![default; labels.len()];
        for ov in overrides {
            if let Some(idx) = labels.index_of(&ov.label) {
                per_class[idx] = ov.threshold;
            }
        }
        Self { default, per_class }
    }

    /// Threshold for the given class. Classes beyond the configured range get
    /// the global default.
    pub fn for_class(&self, class_id: usize) -> f32 {
        self.per_class.get(class_id).copied().unwrap_or(self.default)
    }

    pub fn default_threshold(&self) -> f32 {
        self.default
    }
}
