use std::env;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};

use sortcam::data::SystemConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = env::args().nth(1).unwrap_or_else(|| "sortcam.json".to_string());
    let config = SystemConfig::from_file(&config_path)?;

    let mut pipeline = sortcam::build_pipeline(&config)?;

    let stop = pipeline.stop_handle();
    ctrlc::set_handler(move || {
        log::info!("interrupt received, stopping");
        stop.store(true, Ordering::Relaxed);
    })
    .context("cannot install signal handler")?;

    pipeline.run()?;
    pipeline.shutdown();
    Ok(())
}
