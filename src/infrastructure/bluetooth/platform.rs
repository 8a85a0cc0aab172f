//! BLE Platform Abstraction
//!
//! The operations this application consumes from the host Bluetooth stack.
//! Platform callbacks never run application logic directly: advertisements
//! and notification payloads are pushed into channels and consumed in order
//! by the discovery manager and the streaming worker.

use crate::domain::error::BleResult;
use crate::domain::models::{BluetoothAddress, CccdValue, GattStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// One received advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisedDevice {
    pub address: BluetoothAddress,
    pub signal_strength: Option<i16>,
}

/// Status plus items, as returned by GATT enumeration calls
#[derive(Clone)]
pub struct GattListing<T> {
    pub status: GattStatus,
    pub items: Vec<T>,
}

impl<T> GattListing<T> {
    pub fn success(items: Vec<T>) -> Self {
        Self {
            status: GattStatus::Success,
            items,
        }
    }

    pub fn failed(status: GattStatus) -> Self {
        Self {
            status,
            items: Vec::new(),
        }
    }
}

/// Where a characteristic delivers its notification payloads.
///
/// Delivery never blocks the platform thread: a full queue drops the
/// payload with a warning.
#[derive(Clone)]
pub struct FrameSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl FrameSink {
    pub fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self { tx }
    }

    pub fn deliver(&self, payload: Vec<u8>) {
        match self.tx.try_send(payload) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Notification queue full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Entry point into the host Bluetooth stack
#[async_trait]
pub trait BlePlatform: Send + Sync {
    /// Create an active-mode advertisement scanner
    fn scanner(&self) -> anyhow::Result<Box<dyn AdvertisementScanner>>;

    /// Establish a device connection by address
    async fn connect(&self, address: BluetoothAddress) -> BleResult<Arc<dyn GattDevice>>;
}

pub trait AdvertisementScanner: Send + Sync {
    /// Start scanning; every advertisement is sent to `sink`
    fn start(&self, sink: mpsc::UnboundedSender<AdvertisedDevice>) -> anyhow::Result<()>;

    /// Stop scanning. Calling this more than once is harmless.
    fn stop(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait GattDevice: Send + Sync {
    fn address(&self) -> BluetoothAddress;

    async fn services(&self) -> BleResult<GattListing<Arc<dyn GattService>>>;

    /// Tear down the link
    fn close(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait GattService: Send + Sync {
    fn uuid(&self) -> u128;

    async fn characteristics(&self) -> BleResult<GattListing<Arc<dyn GattCharacteristic>>>;
}

#[async_trait]
pub trait GattCharacteristic: Send + Sync {
    fn uuid(&self) -> u128;

    /// Register the value-changed callback target
    fn set_notification_sink(&self, sink: FrameSink) -> anyhow::Result<()>;

    fn clear_notification_sink(&self) -> anyhow::Result<()>;

    /// Write the client characteristic configuration descriptor
    async fn write_cccd(&self, value: CccdValue) -> BleResult<GattStatus>;
}
