mod decoder;
mod engine;
pub mod nms;
mod outputs;
mod preprocess;

pub use decoder::{decode, ModelLayout, SsdOrder};
pub use engine::{Engine, STAGE_EXTRACT, STAGE_INFER, STAGE_PREPROCESS};
pub use nms::{suppress, Nms};
pub use outputs::RawOutputs;
pub use preprocess::{preprocess, InputTensor};

use crate::data::{Frame, StageTimes};
use crate::error::DetectorError;

/// Seam between the driver and the model runtime.
///
/// One call fully owns the model's internal buffers for its duration; there
/// is no concurrent inference on the same instance.
pub trait Inference {
    /// Runs one frame through the model and hands back the raw tensors.
    fn infer(&mut self, frame: &Frame) -> Result<RawOutputs, DetectorError>;

    /// Output layout, fixed at load time.
    fn layout(&self) -> ModelLayout;

    /// Per-stage timing, when the implementation records it.
    fn stats(&self) -> Option<&StageTimes> {
        None
    }
}
