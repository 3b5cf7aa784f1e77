//! Driver for the capture → infer → decode → suppress → arbitrate → actuate
//! loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::arbiter::arbitrate;
use crate::data::{
    Decision, LabelStore, PriorityTable, ScoreThresholds, StageTimes, SystemConfig,
};
use crate::detector::{
    decode, suppress, Inference, STAGE_EXTRACT, STAGE_INFER, STAGE_PREPROCESS,
};
use crate::input::Camera;
use crate::output::{annotate, Display};
use crate::plc::PlcLink;

/// Outcome of one loop iteration.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Camera reported end of stream.
    EndOfStream,
    /// Frame dropped after a recoverable detector failure.
    Skipped,
    Processed {
        detections: usize,
        decision: Option<Decision>,
        actuated: bool,
    },
}

/// Orchestrates one camera, one model and one actuator target.
///
/// The loop itself is single-threaded and synchronous; only the PLC link's
/// recovery worker runs concurrently, behind its own lock.
pub struct Pipeline<I: Inference> {
    engine: I,
    camera: Box<dyn Camera>,
    display: Box<dyn Display>,
    plc: PlcLink,
    labels: LabelStore,
    priorities: PriorityTable,
    thresholds: ScoreThresholds,
    iou_threshold: f32,
    idle_code: i16,
    frame_pause: Duration,
    stats_interval: usize,
    frames: u64,
    stop: Arc<AtomicBool>,
}

impl<I: Inference> Pipeline<I> {
    pub fn new(
        engine: I,
        camera: Box<dyn Camera>,
        display: Box<dyn Display>,
        plc: PlcLink,
        labels: LabelStore,
        config: &SystemConfig,
    ) -> Self {
        let thresholds = ScoreThresholds::new(
            config.model.conf_threshold,
            &config.model.label_thresholds,
            &labels,
        );
        let priorities = PriorityTable::new(&config.priorities);
        Self {
            engine,
            camera,
            display,
            plc,
            labels,
            priorities,
            thresholds,
            iou_threshold: config.model.iou_threshold,
            idle_code: config.plc.idle_code,
            frame_pause: Duration::from_millis(config.pipeline.frame_pause_ms),
            stats_interval: config.pipeline.stats_interval,
            frames: 0,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag observed between iterations; setting it stops `run`.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Runs the loop until end of stream, a fatal error, or the stop flag.
    pub fn run(&mut self) -> Result<()> {
        log::info!("vision loop started");
        while !self.stop.load(Ordering::Relaxed) {
            match self.run_once()? {
                FrameOutcome::EndOfStream => {
                    log::info!("camera reported end of stream");
                    break;
                }
                FrameOutcome::Skipped | FrameOutcome::Processed { .. } => {}
            }
            if !self.frame_pause.is_zero() {
                thread::sleep(self.frame_pause);
            }
        }
        log::info!("vision loop finished after {} frames", self.frames);
        Ok(())
    }

    /// One full iteration. Recoverable detector failures skip the frame;
    /// actuation failures never propagate.
    pub fn run_once(&mut self) -> Result<FrameOutcome> {
        let mut frame = match self.camera.capture()? {
            Some(frame) => frame,
            None => return Ok(FrameOutcome::EndOfStream),
        };
        let (frame_w, frame_h) = (frame.width(), frame.height());
        self.frames += 1;

        let raw = match self.engine.infer(&frame) {
            Ok(raw) => raw,
            Err(err) if err.is_recoverable() => {
                log::warn!("skipping frame {}: {err}", self.frames);
                return Ok(FrameOutcome::Skipped);
            }
            Err(err) => return Err(err.into()),
        };

        let layout = self.engine.layout();
        let decoded = match decode(&raw, layout, frame_w, frame_h, &self.thresholds, &self.labels)
        {
            Ok(decoded) => decoded,
            Err(err) => {
                // layout is fixed at load time; a per-frame decode failure is
                // a malformed tensor, not a fatal condition
                log::warn!("skipping frame {}: {err}", self.frames);
                return Ok(FrameOutcome::Skipped);
            }
        };

        let retained = if layout.needs_suppression() {
            suppress(&decoded, self.iou_threshold)
        } else {
            decoded
        };

        let decision = arbitrate(&retained, &self.priorities);
        let code = decision.as_ref().map(|d| d.code).unwrap_or(self.idle_code);
        let actuated = self.plc.write(code);
        match &decision {
            Some(d) => log::debug!(
                "frame {}: {} detections, class {} -> code {} (sent={})",
                self.frames,
                retained.len(),
                d.label,
                code,
                actuated
            ),
            None => log::debug!(
                "frame {}: no actionable class -> idle code {} (sent={})",
                self.frames,
                code,
                actuated
            ),
        }

        annotate(&mut frame.image, &retained);
        if let Err(err) = self.display.show(&frame) {
            log::warn!("display sink failed: {err}");
        }

        self.maybe_log_stats();
        Ok(FrameOutcome::Processed {
            detections: retained.len(),
            decision,
            actuated,
        })
    }

    fn maybe_log_stats(&self) {
        if self.stats_interval == 0 || self.frames % self.stats_interval as u64 != 0 {
            return;
        }
        if let Some(stats) = self.engine.stats() {
            self.log_stats(stats);
        }
    }

    fn log_stats(&self, stats: &StageTimes) {
        log::info!(
            "timing over {} frames: preprocess {:.2?} | inference {:.2?} | extract {:.2?}",
            stats.frames(),
            stats.avg(STAGE_PREPROCESS),
            stats.avg(STAGE_INFER),
            stats.avg(STAGE_EXTRACT),
        );
    }

    /// Releases the engine and camera and permanently disconnects the PLC
    /// link.
    pub fn shutdown(mut self) {
        self.plc.disconnect();
        log::info!("pipeline shut down");
    }
}
