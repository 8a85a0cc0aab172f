//! Error taxonomy for the BLE telemetry session.

use crate::domain::models::{BluetoothAddress, GattStatus};
use thiserror::Error;

/// Decoder failure. The offending notification is dropped and the stream continues.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
}

/// Phase failures. Each one aborts the phase it occurs in; none are retried.
#[derive(Debug, Error)]
pub enum BleError {
    #[error("failed to get GATT services: {status:?}")]
    ServiceDiscovery { status: GattStatus },

    #[error("characteristic {uuid} not found on device {address}")]
    CharacteristicNotFound {
        uuid: String,
        address: BluetoothAddress,
    },

    #[error("failed to enable notifications: {status:?}")]
    Subscription { status: GattStatus },

    #[error("failed to connect to {address}: {reason}")]
    Connection {
        address: BluetoothAddress,
        reason: String,
    },

    #[error("platform fault: {0}")]
    Platform(#[from] anyhow::Error),
}

impl BleError {
    pub fn connection(address: BluetoothAddress, reason: impl ToString) -> Self {
        Self::Connection {
            address,
            reason: reason.to_string(),
        }
    }
}

pub type BleResult<T> = Result<T, BleError>;
