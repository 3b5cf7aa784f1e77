use std::time::Duration;

/// Accumulated per-stage durations (preprocess / inference / postprocess).
///
/// Stage index is the caller's convention; the driver logs averages
/// periodically.
#[derive(Debug, Default)]
pub struct StageTimes {
    frames: usize,
    totals: Vec<Duration>,
}

impl StageTimes {
    pub fn record(&mut self, stage: usize, elapsed: Duration) {
        match self.totals.get_mut(stage) {
            Some(total) => *total += elapsed,
            None => {
                if stage >= self.totals.len() {
                    self.totals.push(elapsed);
                }
            }
        }
    }

    /// Marks one completed frame; averages are per frame, not per sample.
    pub fn frame_done(&mut self) {
        self.frames += 1;
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn avg(&self, stage: usize) -> Duration {
        if self.frames == 0 {
            return Duration::ZERO;
        }
        self.totals
            .get(stage)
            .map(|total| *total / self.frames as u32)
            .unwrap_or(Duration::ZERO)
    }

    pub fn total_avg(&self) -> Duration {
        if self.frames == 0 {
            return Duration::ZERO;
        }
        self.totals.iter().sum::<Duration>() / self.frames as u32
    }

    pub fn clear(&mut self) {
        self.frames = 0;
        self.totals.clear();
    }
}
