mod v4l_camera;

pub use v4l_camera::V4lCamera;

use anyhow::Result;

use crate::data::Frame;

/// Video source consumed by the driver. Implementations are resolved once at
/// startup from configuration.
pub trait Camera {
    /// Captures the next frame. `Ok(None)` signals end of stream.
    fn capture(&mut self) -> Result<Option<Frame>>;
}
