use thiserror::Error;

/// Errors raised by the detection side of the pipeline.
///
/// Only `ModelLoad` and `OutputLayout` are fatal: without a usable model and a
/// known output layout there is no pipeline. `Preprocess` and `Inference` are
/// per-frame failures the driver skips over.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("frame preprocessing failed: {0}")]
    Preprocess(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unsupported model output layout: {0}")]
    OutputLayout(String),
}

impl DetectorError {
    /// Whether the driver may skip the current frame and keep looping.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DetectorError::Preprocess(_) | DetectorError::Inference(_))
    }
}
