//! Domain Module
//!
//! Platform-independent telemetry processing.
//!
//! - [`frame`] - 24-byte frame decoding
//! - [`smoothing`] - weighted sliding window over the kal axes
//! - [`actuation`] - pointer motion and debounced clicks
//! - [`pipeline`] - the three steps above, applied per notification
//! - [`settings`] - runtime tunables

pub mod actuation;
pub mod error;
pub mod frame;
pub mod models;
pub mod pipeline;
pub mod settings;
pub mod smoothing;
