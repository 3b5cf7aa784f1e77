mod overlay;
mod snapshot;

pub use overlay::{annotate, class_color};
pub use snapshot::SnapshotDisplay;

use anyhow::Result;

use crate::data::Frame;

/// Sink for processed frames. Headless deployments use [`NullDisplay`].
pub trait Display {
    fn show(&mut self, frame: &Frame) -> Result<()>;
}

/// Discards every frame.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}
