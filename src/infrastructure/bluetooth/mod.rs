//! Bluetooth Module
//!
//! BLE discovery, connection and notification streaming for the EMG sensor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   SessionController                      │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼──────────────┐
//!         │             │              │
//!         ▼             ▼              ▼
//! ┌───────────┐  ┌────────────┐  ┌────────────┐
//! │  Scanner  │  │ Connection │  │ Subscriber │
//! │           │  │            │  │            │
//! │ - address │  │ - connect  │  │ - GATT     │
//! │   filter  │  │ - slot     │  │ - CCCD     │
//! └─────┬─────┘  └─────┬──────┘  └─────┬──────┘
//!       └──────────────┼───────────────┘
//!                      ▼
//!              ┌──────────────┐
//!              │   Platform   │  (WinRT on Windows)
//!              └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Fixed sensor address, characteristic UUID and UUID helpers
//! - [`platform`] - Traits over the host Bluetooth stack
//! - [`scanner`] - Time-boxed discovery of the target sensor
//! - [`connection`] - Connect-by-address and the single connection slot
//! - [`subscriber`] - Notification subscription state machine

pub mod connection;
pub mod platform;
pub mod protocol;
pub mod scanner;
pub mod subscriber;
#[cfg(windows)]
pub mod winrt;

#[cfg(windows)]
pub use winrt::WinRtPlatform;
