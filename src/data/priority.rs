use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Priority and actuation code for one configured class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassPriority {
    pub label: String,
    /// Strictly positive for actionable classes. Higher wins arbitration.
    pub priority: u32,
    /// Value written to the controller when this class wins.
    pub code: i16,
}

/// Mapping from class label to priority and actuation code.
///
/// Labels not present in the table map to priority 0 and never win
/// arbitration.
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    entries: HashMap<String, (u32, i16)>,
}

impl PriorityTable {
    pub fn new(classes: &[ClassPriority]) -> Self {
        let entries = classes
            .iter()
            .map(|c| (c.label.clone(), (c.priority, c.code)))
            .collect();
        Self { entries }
    }

    pub fn priority_of(&self, label: &str) -> u32 {
        self.entries.get(label).map(|(p, _)| *p).unwrap_or(0)
    }

    pub fn code_of(&self, label: &str) -> Option<i16> {
        self.entries.get(label).map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of arbitration over one frame's detections.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub label: String,
    pub priority: u32,
    pub code: i16,
}
