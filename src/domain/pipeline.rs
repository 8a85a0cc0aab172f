//! Per-notification processing: decode, smooth, actuate.

use crate::domain::actuation::{Actuation, ActuationMapper, InputSink};
use crate::domain::error::FrameError;
use crate::domain::frame::{decode_frame, Sample};
use crate::domain::models::PipelineStats;
use crate::domain::settings::Settings;
use crate::domain::smoothing::{SmoothedAxes, SmoothingFilter};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Result of one successfully processed notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedFrame {
    pub sample: Sample,
    pub axes: SmoothedAxes,
    pub actuation: Actuation,
}

/// Decoder -> smoothing filter -> actuation mapper, one frame at a time.
pub struct FramePipeline {
    filter: SmoothingFilter,
    mapper: ActuationMapper,
    input: Arc<dyn InputSink>,
    stats: PipelineStats,
    log_raw_frames: bool,
}

impl FramePipeline {
    pub fn new(settings: &Settings, input: Arc<dyn InputSink>) -> Self {
        Self {
            filter: SmoothingFilter::new(),
            mapper: ActuationMapper::new(settings),
            input,
            stats: PipelineStats::default(),
            log_raw_frames: settings.debug_raw_frame_logging,
        }
    }

    /// Process one notification payload received at `now`.
    ///
    /// A malformed payload leaves the filter and debounce state untouched.
    pub fn handle(&mut self, payload: &[u8], now: Instant) -> Result<ProcessedFrame, FrameError> {
        self.stats.frames_received += 1;

        if self.log_raw_frames {
            trace!("Raw frame: {:02X?}", payload);
        }

        let sample = match decode_frame(payload) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.malformed_frames += 1;
                warn!("Dropping notification: {}", e);
                return Err(e);
            }
        };
        self.stats.frames_decoded += 1;

        debug!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            sample.timestamp,
            sample.emg[0],
            sample.emg[1],
            sample.emg[2],
            sample.kal[0],
            sample.kal[1]
        );

        let axes = self.filter.push(sample.kal[0], sample.kal[1]);
        let actuation = self.mapper.map(&sample, axes, now);
        self.inject(&actuation);

        Ok(ProcessedFrame {
            sample,
            axes,
            actuation,
        })
    }

    /// Injection is fire-and-forget: failures are counted and logged only.
    fn inject(&mut self, actuation: &Actuation) {
        match self.input.move_relative(actuation.dx, actuation.dy) {
            Ok(()) => self.stats.pointer_moves += 1,
            Err(e) => {
                self.stats.injection_failures += 1;
                warn!("Pointer move injection failed: {}", e);
            }
        }

        if actuation.double_click {
            debug!("EMG spike, sending double click");
            for _ in 0..2 {
                if let Err(e) = self.input.click_primary() {
                    self.stats.injection_failures += 1;
                    warn!("Click injection failed: {}", e);
                }
            }
            self.stats.double_clicks += 1;
        }
    }

    pub fn window_len(&self) -> usize {
        self.filter.len()
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Clear smoothing and debounce state for a new streaming session.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.mapper.reset();
        self.stats = PipelineStats::default();
    }
}
