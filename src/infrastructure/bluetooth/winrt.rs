//! WinRT Bluetooth backend
//!
//! Implements the platform traits on top of `Windows.Devices.Bluetooth`.
//! Event handlers run on WinRT threads and only forward into channels.

use crate::domain::error::{BleError, BleResult};
use crate::domain::models::{BluetoothAddress, CccdValue, GattStatus};
use crate::infrastructure::bluetooth::platform::{
    AdvertisedDevice, AdvertisementScanner, BlePlatform, FrameSink, GattCharacteristic,
    GattDevice, GattListing, GattService,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{info, trace};
use windows::core::GUID;
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEScanningMode,
};
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic as WinGattCharacteristic,
    GattClientCharacteristicConfigurationDescriptorValue, GattCommunicationStatus,
    GattDeviceService, GattValueChangedEventArgs,
};
use windows::Devices::Bluetooth::BluetoothLEDevice;
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::DataReader;

fn map_status(status: GattCommunicationStatus) -> GattStatus {
    match status {
        GattCommunicationStatus::Success => GattStatus::Success,
        GattCommunicationStatus::AccessDenied => GattStatus::AccessDenied,
        GattCommunicationStatus::ProtocolError => GattStatus::ProtocolError,
        _ => GattStatus::Unreachable,
    }
}

fn platform_fault(e: windows::core::Error) -> BleError {
    BleError::Platform(anyhow::Error::new(e))
}

/// Host Bluetooth stack
#[derive(Default)]
pub struct WinRtPlatform;

impl WinRtPlatform {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BlePlatform for WinRtPlatform {
    fn scanner(&self) -> Result<Box<dyn AdvertisementScanner>> {
        Ok(Box::new(WinRtScanner::new()))
    }

    async fn connect(&self, address: BluetoothAddress) -> BleResult<Arc<dyn GattDevice>> {
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(address.as_u64())
            .map_err(|e| BleError::connection(address, e))?
            .await
            .map_err(|e| BleError::connection(address, e))?;

        if let Ok(name) = device.Name() {
            info!("Device connected: {:?}", name.to_string());
        }
        Ok(Arc::new(WinRtDevice { address, device }))
    }
}

/// Active-mode advertisement watcher
pub struct WinRtScanner {
    watcher: Mutex<Option<BluetoothLEAdvertisementWatcher>>,
}

impl WinRtScanner {
    pub fn new() -> Self {
        Self {
            watcher: Mutex::new(None),
        }
    }

    fn take_watcher(&self) -> Option<BluetoothLEAdvertisementWatcher> {
        match self.watcher.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl Default for WinRtScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvertisementScanner for WinRtScanner {
    fn start(&self, sink: mpsc::UnboundedSender<AdvertisedDevice>) -> Result<()> {
        // Stop any existing scan
        self.stop()?;

        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let device = AdvertisedDevice {
                        address: BluetoothAddress::new(args.BluetoothAddress()?),
                        signal_strength: args.RawSignalStrengthInDBm().ok(),
                    };
                    // Receiver gone means discovery is over
                    let _ = sink.send(device);
                }
                Ok(())
            },
        );

        watcher.Received(&handler)?;
        watcher.Start()?;

        match self.watcher.lock() {
            Ok(mut guard) => *guard = Some(watcher),
            Err(poisoned) => *poisoned.into_inner() = Some(watcher),
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if let Some(watcher) = self.take_watcher() {
            info!("Stopping BLE scan...");
            watcher.Stop()?;
        }
        Ok(())
    }
}

impl Drop for WinRtScanner {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

pub struct WinRtDevice {
    address: BluetoothAddress,
    device: BluetoothLEDevice,
}

#[async_trait]
impl GattDevice for WinRtDevice {
    fn address(&self) -> BluetoothAddress {
        self.address
    }

    async fn services(&self) -> BleResult<GattListing<Arc<dyn GattService>>> {
        let result = self
            .device
            .GetGattServicesAsync()
            .map_err(platform_fault)?
            .await
            .map_err(platform_fault)?;

        let status = map_status(result.Status().map_err(platform_fault)?);
        if !status.is_success() {
            return Ok(GattListing::failed(status));
        }

        let services = result.Services().map_err(platform_fault)?;
        let mut items: Vec<Arc<dyn GattService>> = Vec::new();
        for i in 0..services.Size().map_err(platform_fault)? {
            let service = services.GetAt(i).map_err(platform_fault)?;
            items.push(Arc::new(WinRtService { service }));
        }
        Ok(GattListing::success(items))
    }

    fn close(&self) -> Result<()> {
        self.device.Close()?;
        Ok(())
    }
}

pub struct WinRtService {
    service: GattDeviceService,
}

#[async_trait]
impl GattService for WinRtService {
    fn uuid(&self) -> u128 {
        self.service.Uuid().map(|g| g.to_u128()).unwrap_or_default()
    }

    async fn characteristics(&self) -> BleResult<GattListing<Arc<dyn GattCharacteristic>>> {
        let result = self
            .service
            .GetCharacteristicsAsync()
            .map_err(platform_fault)?
            .await
            .map_err(platform_fault)?;

        let status = map_status(result.Status().map_err(platform_fault)?);
        if !status.is_success() {
            return Ok(GattListing::failed(status));
        }

        let characteristics = result.Characteristics().map_err(platform_fault)?;
        let mut items: Vec<Arc<dyn GattCharacteristic>> = Vec::new();
        for i in 0..characteristics.Size().map_err(platform_fault)? {
            let characteristic = characteristics.GetAt(i).map_err(platform_fault)?;
            items.push(Arc::new(WinRtCharacteristic {
                characteristic,
                token: Mutex::new(None),
            }));
        }
        Ok(GattListing::success(items))
    }
}

pub struct WinRtCharacteristic {
    characteristic: WinGattCharacteristic,
    token: Mutex<Option<i64>>,
}

impl WinRtCharacteristic {
    fn swap_token(&self, token: Option<i64>) -> Option<i64> {
        match self.token.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, token),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), token),
        }
    }
}

#[async_trait]
impl GattCharacteristic for WinRtCharacteristic {
    fn uuid(&self) -> u128 {
        self.characteristic
            .Uuid()
            .map(|g: GUID| g.to_u128())
            .unwrap_or_default()
    }

    fn set_notification_sink(&self, sink: FrameSink) -> Result<()> {
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<WinGattCharacteristic>,
                  args: windows::core::Ref<GattValueChangedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let buffer = args.CharacteristicValue()?;
                    let reader = DataReader::FromBuffer(&buffer)?;
                    let length = reader.UnconsumedBufferLength()? as usize;
                    let mut bytes = vec![0u8; length];
                    reader.ReadBytes(&mut bytes)?;
                    trace!("Notification: {} bytes", length);
                    sink.deliver(bytes);
                }
                Ok(())
            },
        );

        let token = self.characteristic.ValueChanged(&handler)?;
        if let Some(previous) = self.swap_token(Some(token)) {
            self.characteristic.RemoveValueChanged(previous)?;
        }
        Ok(())
    }

    fn clear_notification_sink(&self) -> Result<()> {
        if let Some(token) = self.swap_token(None) {
            self.characteristic.RemoveValueChanged(token)?;
        }
        Ok(())
    }

    async fn write_cccd(&self, value: CccdValue) -> BleResult<GattStatus> {
        let value = match value {
            CccdValue::Notify => GattClientCharacteristicConfigurationDescriptorValue::Notify,
            CccdValue::None => GattClientCharacteristicConfigurationDescriptorValue::None,
        };
        let status = self
            .characteristic
            .WriteClientCharacteristicConfigurationDescriptorAsync(value)
            .map_err(platform_fault)?
            .await
            .map_err(platform_fault)?;
        Ok(map_status(status))
    }
}
