//! BLE Connection Module
//!
//! Connect-by-address and the single slot the live connection is published into.

use crate::domain::models::BluetoothAddress;
use crate::infrastructure::bluetooth::platform::{BlePlatform, GattDevice};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Holds at most one live device connection.
///
/// Written from the connect task, read by the session controller. The lock
/// is only held for the assignment or the check, never across an await.
#[derive(Clone, Default)]
pub struct ConnectionSlot {
    inner: Arc<Mutex<Option<Arc<dyn GattDevice>>>>,
}

impl ConnectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a connection, replacing any previous one. A replaced
    /// connection is closed.
    pub fn publish(&self, device: Arc<dyn GattDevice>) {
        let previous = match self.inner.lock() {
            Ok(mut slot) => slot.replace(device),
            Err(poisoned) => poisoned.into_inner().replace(device),
        };

        if let Some(old) = previous {
            warn!("Replacing connection to {}", old.address());
            if let Err(e) = old.close() {
                warn!("Failed to close replaced connection: {}", e);
            }
        }
    }

    /// Remove and return the current connection
    pub fn take(&self) -> Option<Arc<dyn GattDevice>> {
        match self.inner.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Connect to `address` in the background and publish the result into `slot`.
///
/// Failure is logged and leaves the slot untouched. There is no retry.
pub fn spawn_connect(
    platform: Arc<dyn BlePlatform>,
    address: BluetoothAddress,
    slot: ConnectionSlot,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Connecting to Bluetooth device: {}", address);
        match platform.connect(address).await {
            Ok(device) => {
                info!("Connected to device: {}", device.address());
                slot.publish(device);
            }
            Err(e) => {
                error!("Failed to connect to the device: {}", e);
            }
        }
    })
}
