mod bbox;
mod config;
mod detection;
mod frame;
mod labels;
mod priority;
mod thresholds;
mod timing;

pub use bbox::BBox;
pub use config::{CameraConfig, DisplayConfig, LoopConfig, ModelConfig, PlcConfig, SystemConfig};
pub use detection::Detection;
pub use frame::{ChannelOrder, Frame};
pub use labels::LabelStore;
pub use priority::{ClassPriority, Decision, PriorityTable};
pub use thresholds::{LabelThreshold, ScoreThresholds};
pub use timing::StageTimes;
