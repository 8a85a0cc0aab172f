//! # emg_mouse
//!
//! Drives the host pointer from an EMG sensor streaming over Bluetooth Low
//! Energy.
//!
//! The sensor pushes 24-byte frames (`timestamp`, three EMG channels, two
//! filtered motion axes) as GATT notifications. Each frame is decoded, the
//! motion axes are smoothed over the last five frames and turned into a
//! relative pointer move, and an EMG spike on channel 0 or 2 produces a
//! debounced double click.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`domain`] | Frame decoding, smoothing, actuation mapping, settings |
//! | [`infrastructure`] | BLE platform, input injection, logging |
//! | [`presentation`] | Operator console |
//! | [`session`] | Scan → confirm → stream orchestration |

pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
