use serde::{Deserialize, Serialize};

use crate::data::BBox;

/// One decoded detection. Immutable once produced by the decoder; the
/// suppression and arbitration stages only read it.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub label: Option<String>,
    pub bbox: BBox,
    pub score: f32,
}

impl Detection {
    pub fn new(class_id: usize, bbox: BBox, score: f32) -> Self {
        Self {
            class_id,
            label: None,
            bbox,
            score,
        }
    }

    /// Sets the resolved class label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn get_label(&self) -> &str {
        self.label.as_deref().unwrap_or("unknown")
    }
}
