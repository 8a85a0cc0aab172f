//! Actuation Mapper
//!
//! Converts smoothed kal axes into relative pointer motion and raw EMG
//! spikes into a debounced double-click.

use crate::domain::frame::Sample;
use crate::domain::settings::Settings;
use crate::domain::smoothing::SmoothedAxes;
use std::time::{Duration, Instant};

/// Host input injection seam
pub trait InputSink: Send + Sync {
    /// Inject a relative pointer move
    fn move_relative(&self, dx: i32, dy: i32) -> anyhow::Result<()>;

    /// Inject a primary button down followed by a primary button up
    fn click_primary(&self) -> anyhow::Result<()>;
}

/// What to inject for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actuation {
    pub dx: i32,
    pub dy: i32,
    pub double_click: bool,
}

#[derive(Debug, Clone)]
pub struct ActuationMapper {
    sensitivity_x: f64,
    sensitivity_y: f64,
    click_threshold: i32,
    debounce: Duration,
    // None until the first click, so the first qualifying sample always fires
    last_click: Option<Instant>,
}

impl ActuationMapper {
    pub fn new(settings: &Settings) -> Self {
        Self {
            sensitivity_x: settings.pointer_sensitivity_x,
            sensitivity_y: settings.pointer_sensitivity_y,
            click_threshold: settings.emg_click_threshold,
            debounce: settings.click_debounce(),
            last_click: None,
        }
    }

    /// Pointer delta for the given axes, truncated toward zero
    pub fn pointer_delta(&self, axes: SmoothedAxes) -> (i32, i32) {
        (
            (axes.kal0 * self.sensitivity_x) as i32,
            (axes.kal1 * self.sensitivity_y) as i32,
        )
    }

    /// Channel 1 is not a click source.
    fn is_click_gesture(&self, sample: &Sample) -> bool {
        sample.emg[0] > self.click_threshold || sample.emg[2] > self.click_threshold
    }

    pub fn map(&mut self, sample: &Sample, axes: SmoothedAxes, now: Instant) -> Actuation {
        let (dx, dy) = self.pointer_delta(axes);

        let debounced = self
            .last_click
            .map_or(true, |last| now.saturating_duration_since(last) >= self.debounce);
        let double_click = self.is_click_gesture(sample) && debounced;
        if double_click {
            self.last_click = Some(now);
        }

        Actuation {
            dx,
            dy,
            double_click,
        }
    }

    pub fn reset(&mut self) {
        self.last_click = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike(emg: [i32; 3]) -> Sample {
        Sample {
            emg,
            ..Default::default()
        }
    }

    #[test]
    fn test_pointer_delta_scalars() {
        let mapper = ActuationMapper::new(&Settings::default());
        assert_eq!(
            mapper.pointer_delta(SmoothedAxes { kal0: 1.0, kal1: 1.0 }),
            (20, -40)
        );
        assert_eq!(
            mapper.pointer_delta(SmoothedAxes { kal0: -0.5, kal1: -0.5 }),
            (-10, 20)
        );
        // Truncation toward zero
        assert_eq!(
            mapper.pointer_delta(SmoothedAxes { kal0: 0.04, kal1: -0.02 }),
            (0, 0)
        );
    }

    #[test]
    fn test_click_debounce_window() {
        let mut mapper = ActuationMapper::new(&Settings::default());
        let t0 = Instant::now();
        let sample = spike([1901, 0, 0]);

        assert!(mapper.map(&sample, SmoothedAxes::default(), t0).double_click);
        assert!(
            !mapper
                .map(&sample, SmoothedAxes::default(), t0 + Duration::from_millis(500))
                .double_click
        );
        assert!(
            mapper
                .map(&sample, SmoothedAxes::default(), t0 + Duration::from_millis(1100))
                .double_click
        );
    }

    #[test]
    fn test_suppressed_spike_does_not_restart_debounce() {
        let mut mapper = ActuationMapper::new(&Settings::default());
        let t0 = Instant::now();
        let sample = spike([0, 0, 2500]);

        assert!(mapper.map(&sample, SmoothedAxes::default(), t0).double_click);
        assert!(
            !mapper
                .map(&sample, SmoothedAxes::default(), t0 + Duration::from_millis(900))
                .double_click
        );
        assert!(
            mapper
                .map(&sample, SmoothedAxes::default(), t0 + Duration::from_millis(1000))
                .double_click
        );
    }

    #[test]
    fn test_threshold_is_strict_and_skips_channel_one() {
        let mut mapper = ActuationMapper::new(&Settings::default());
        let now = Instant::now();

        assert!(!mapper.map(&spike([1900, 0, 1900]), SmoothedAxes::default(), now).double_click);
        assert!(!mapper.map(&spike([0, 5000, 0]), SmoothedAxes::default(), now).double_click);
        assert!(mapper.map(&spike([0, 0, 1901]), SmoothedAxes::default(), now).double_click);
    }

    #[test]
    fn test_motion_is_emitted_with_click() {
        let mut mapper = ActuationMapper::new(&Settings::default());
        let out = mapper.map(
            &spike([3000, 0, 0]),
            SmoothedAxes { kal0: 2.0, kal1: 0.5 },
            Instant::now(),
        );
        assert_eq!(
            out,
            Actuation {
                dx: 40,
                dy: -20,
                double_click: true
            }
        );
    }
}
