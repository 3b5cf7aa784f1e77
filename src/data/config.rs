use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::accelerator::AcceleratorCandidate;
use crate::data::{ClassPriority, LabelThreshold};

/// Model file and detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_path: String,
    /// Runtime library used when no accelerator candidate resolves. When
    /// unset the loader falls back to the system's default library lookup.
    pub cpu_runtime_path: Option<String>,
    pub labels_path: Option<String>,
    pub conf_threshold: f32,
    pub label_thresholds: Vec<LabelThreshold>,
    pub iou_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            cpu_runtime_path: None,
            labels_path: None,
            conf_threshold: 0.5,
            label_thresholds: Vec::new(),
            iou_threshold: 0.45,
        }
    }
}

/// Video source selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device: String,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Display sink selection. Interactive windows are out of scope; headless
/// deployments use `None`, commissioning uses periodic snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "sink", rename_all = "snake_case")]
pub enum DisplayConfig {
    #[default]
    None,
    Snapshot {
        directory: String,
        every_n: u32,
    },
}

/// Controller endpoint and link recovery tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlcConfig {
    pub host: String,
    pub port: u16,
    pub rack: u16,
    pub slot: u16,
    pub db: u16,
    pub offset: u16,
    pub retry_interval_secs: u64,
    pub connect_timeout_ms: u64,
    /// Written when a frame yields no actionable class.
    pub idle_code: i16,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            host: "192.168.2.201".to_string(),
            port: 2000,
            rack: 0,
            slot: 1,
            db: 1,
            offset: 0,
            retry_interval_secs: 5,
            connect_timeout_ms: 1500,
            idle_code: 0,
        }
    }
}

/// Driver loop pacing and reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub frame_pause_ms: u64,
    /// Log stage timing averages every this many frames. Zero disables.
    pub stats_interval: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frame_pause_ms: 0,
            stats_interval: 300,
        }
    }
}

/// Immutable top-level configuration, built once at startup and passed
/// explicitly into each component's constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub model: ModelConfig,
    pub accelerators: Vec<AcceleratorCandidate>,
    pub camera: CameraConfig,
    pub display: DisplayConfig,
    pub plc: PlcConfig,
    pub priorities: Vec<ClassPriority>,
    pub pipeline: LoopConfig,
}

impl SystemConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("cannot read config file {:?}", path.as_ref()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("cannot parse config file {:?}", path.as_ref()))?;
        Ok(config)
    }
}
