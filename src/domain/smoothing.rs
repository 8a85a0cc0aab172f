//! Kal axis smoothing
//!
//! Weighted moving average over the last few `(kal0, kal1)` pairs.

use std::collections::VecDeque;

/// Number of pairs kept in the window
pub const WINDOW_CAPACITY: usize = 5;

/// Weights applied by storage position (oldest first)
pub const WEIGHTS: [f64; WINDOW_CAPACITY] = [0.10, 0.15, 0.20, 0.25, 0.30];

/// `WEIGHTS` expressed in twentieths. Summing integer products keeps the
/// average exact for constant input.
const WEIGHT_TWENTIETHS: [i64; WINDOW_CAPACITY] = [2, 3, 4, 5, 6];

/// Smoothed motion axes for one sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothedAxes {
    pub kal0: f64,
    pub kal1: f64,
}

/// Sliding-window weighted averager
///
/// The weight of an entry is picked by its index in the window, not by its
/// age relative to the newest sample. While the window is filling, the
/// newest entry therefore gets `WEIGHTS[len - 1]` rather than the heaviest
/// weight.
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    window: VecDeque<(i32, i32)>,
}

impl SmoothingFilter {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_CAPACITY),
        }
    }

    /// Push a pair and return the freshly recomputed weighted average
    pub fn push(&mut self, kal0: i32, kal1: i32) -> SmoothedAxes {
        if self.window.len() >= WINDOW_CAPACITY {
            self.window.pop_front();
        }
        self.window.push_back((kal0, kal1));
        self.current()
    }

    fn current(&self) -> SmoothedAxes {
        let mut sum0 = 0i64;
        let mut sum1 = 0i64;
        let mut total = 0i64;

        for (i, &(k0, k1)) in self.window.iter().enumerate() {
            let weight = WEIGHT_TWENTIETHS[i % WINDOW_CAPACITY];
            sum0 += k0 as i64 * weight;
            sum1 += k1 as i64 * weight;
            total += weight;
        }

        if total == 0 {
            return SmoothedAxes::default();
        }

        SmoothedAxes {
            kal0: sum0 as f64 / total as f64,
            kal1: sum1 as f64 / total as f64,
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new()
    }
}
