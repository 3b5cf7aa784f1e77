//! Priority arbitration: reduces one frame's detections to a single
//! actuation decision.

use crate::data::{Decision, Detection, PriorityTable};

/// Picks the detection whose class has the highest configured priority.
///
/// The scan is first-seen-wins: a later detection replaces the current winner
/// only when its priority is strictly higher. Labels missing from the table
/// carry priority 0 and never produce a decision, so an empty list or a frame
/// of only unknown classes yields `None`.
pub fn arbitrate(detections: &[Detection], table: &PriorityTable) -> Option<Decision> {
    let mut winner: Option<Decision> = None;
    let mut best_priority = 0u32;

    for det in detections {
        let label = det.get_label();
        let priority = table.priority_of(label);
        if priority > best_priority {
            best_priority = priority;
            // code_of is present for every label with a non-zero priority
            let code = table.code_of(label)?;
            winner = Some(Decision {
                label: label.to_string(),
                priority,
                code,
            });
        }
    }

    winner
}
