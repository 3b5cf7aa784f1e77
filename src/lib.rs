pub mod accelerator;
pub mod arbiter;
pub mod data;
pub mod detector;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod plc;

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::data::{DisplayConfig, LabelStore, SystemConfig};
use crate::detector::Engine;
use crate::input::V4lCamera;
use crate::output::{Display, NullDisplay, SnapshotDisplay};
use crate::pipeline::Pipeline;
use crate::plc::{PlcLink, TcpGatewayTransport};

/// Wires up the full pipeline from configuration: accelerator resolution,
/// model load, labels, camera, display sink and PLC link.
pub fn build_pipeline(config: &SystemConfig) -> Result<Pipeline<Engine>> {
    let choice = accelerator::resolve(
        &config.accelerators,
        config.model.cpu_runtime_path.as_deref().map(Path::new),
    );

    let engine = Engine::load(&config.model, &choice).context("cannot initialize detector")?;

    let labels = match &config.model.labels_path {
        Some(path) => LabelStore::load(path)
            .with_context(|| format!("cannot read labels file {path}"))?,
        None => match engine.fetch_names() {
            Some(names) => LabelStore::from_vec(names),
            None => bail!("no labels file configured and none embedded in the model"),
        },
    };
    log::info!("{} classes configured", labels.len());

    let camera = V4lCamera::open(&config.camera)?;

    let display: Box<dyn Display> = match &config.display {
        DisplayConfig::None => Box::new(NullDisplay),
        DisplayConfig::Snapshot { directory, every_n } => {
            Box::new(SnapshotDisplay::new(directory, *every_n)?)
        }
    };

    let transport = TcpGatewayTransport::new(&config.plc);
    let plc = PlcLink::connect(&config.plc, Box::new(transport))
        .context("cannot start PLC link worker")?;

    Ok(Pipeline::new(
        engine,
        Box::new(camera),
        display,
        plc,
        labels,
        config,
    ))
}
