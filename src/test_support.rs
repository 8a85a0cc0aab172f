//! In-memory stand-ins for the BLE stack, input injection and the operator
//! console.

use crate::domain::actuation::InputSink;
use crate::domain::error::{BleError, BleResult};
use crate::domain::models::{BluetoothAddress, CccdValue, GattStatus};
use crate::infrastructure::bluetooth::platform::{
    AdvertisedDevice, AdvertisementScanner, BlePlatform, FrameSink, GattCharacteristic,
    GattDevice, GattListing, GattService,
};
use crate::presentation::console::OperatorConsole;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ── Input ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Move(i32, i32),
    Click,
}

#[derive(Default)]
pub struct RecordingInput {
    events: Mutex<Vec<InputEvent>>,
    fail: bool,
}

impl RecordingInput {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, kind: InputEvent) -> usize {
        self.events()
            .iter()
            .filter(|e| match (e, kind) {
                (InputEvent::Click, InputEvent::Click) => true,
                (InputEvent::Move(..), InputEvent::Move(..)) => true,
                _ => false,
            })
            .count()
    }

    fn record(&self, event: InputEvent) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("injection rejected");
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl InputSink for RecordingInput {
    fn move_relative(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.record(InputEvent::Move(dx, dy))
    }

    fn click_primary(&self) -> anyhow::Result<()> {
        self.record(InputEvent::Click)
    }
}

// ── BLE ───────────────────────────────────────────────────────────────────────

pub struct FakeCharacteristic {
    uuid: u128,
    frames: Vec<Vec<u8>>,
    enable_status: GattStatus,
    disable_status: GattStatus,
    enable_fault: bool,
    sink: Mutex<Option<FrameSink>>,
    writes: Mutex<Vec<CccdValue>>,
}

impl FakeCharacteristic {
    pub fn new(uuid: u128) -> Self {
        Self {
            uuid,
            frames: Vec::new(),
            enable_status: GattStatus::Success,
            disable_status: GattStatus::Success,
            enable_fault: false,
            sink: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Frames pushed to the sink as soon as notifications are enabled
    pub fn emitting(mut self, frames: Vec<Vec<u8>>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_enable_status(mut self, status: GattStatus) -> Self {
        self.enable_status = status;
        self
    }

    pub fn with_disable_status(mut self, status: GattStatus) -> Self {
        self.disable_status = status;
        self
    }

    /// Enabling notifications raises a platform error instead of a status
    pub fn faulting_enable(mut self) -> Self {
        self.enable_fault = true;
        self
    }

    pub fn cccd_writes(&self) -> Vec<CccdValue> {
        self.writes.lock().unwrap().clone()
    }

    pub fn has_sink(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }
}

#[async_trait]
impl GattCharacteristic for FakeCharacteristic {
    fn uuid(&self) -> u128 {
        self.uuid
    }

    fn set_notification_sink(&self, sink: FrameSink) -> anyhow::Result<()> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn clear_notification_sink(&self) -> anyhow::Result<()> {
        *self.sink.lock().unwrap() = None;
        Ok(())
    }

    async fn write_cccd(&self, value: CccdValue) -> BleResult<GattStatus> {
        self.writes.lock().unwrap().push(value);
        match value {
            CccdValue::Notify if self.enable_fault => {
                Err(anyhow::anyhow!("COM fault while writing descriptor").into())
            }
            CccdValue::Notify => {
                if self.enable_status.is_success() {
                    if let Some(sink) = self.sink.lock().unwrap().as_ref() {
                        for frame in &self.frames {
                            sink.deliver(frame.clone());
                        }
                    }
                }
                Ok(self.enable_status)
            }
            CccdValue::None => Ok(self.disable_status),
        }
    }
}

pub struct FakeService {
    uuid: u128,
    characteristics: Vec<Arc<dyn GattCharacteristic>>,
    fail: bool,
}

impl FakeService {
    pub fn new(uuid: u128) -> Self {
        Self {
            uuid,
            characteristics: Vec::new(),
            fail: false,
        }
    }

    pub fn with_characteristic(mut self, characteristic: Arc<FakeCharacteristic>) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    /// Characteristic enumeration reports a non-success status
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl GattService for FakeService {
    fn uuid(&self) -> u128 {
        self.uuid
    }

    async fn characteristics(&self) -> BleResult<GattListing<Arc<dyn GattCharacteristic>>> {
        if self.fail {
            return Ok(GattListing::failed(GattStatus::Unreachable));
        }
        Ok(GattListing::success(self.characteristics.clone()))
    }
}

pub struct FakeDevice {
    address: BluetoothAddress,
    services: Vec<Arc<dyn GattService>>,
    services_status: GattStatus,
    closed: AtomicBool,
}

impl FakeDevice {
    pub fn new(address: BluetoothAddress) -> Self {
        Self {
            address,
            services: Vec::new(),
            services_status: GattStatus::Success,
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_service(mut self, service: FakeService) -> Self {
        self.services.push(Arc::new(service));
        self
    }

    pub fn with_services_status(mut self, status: GattStatus) -> Self {
        self.services_status = status;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GattDevice for FakeDevice {
    fn address(&self) -> BluetoothAddress {
        self.address
    }

    async fn services(&self) -> BleResult<GattListing<Arc<dyn GattService>>> {
        if !self.services_status.is_success() {
            return Ok(GattListing::failed(self.services_status));
        }
        Ok(GattListing::success(self.services.clone()))
    }

    fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeScanner {
    advertisements: Vec<AdvertisedDevice>,
    stops: Arc<AtomicUsize>,
}

impl AdvertisementScanner for FakeScanner {
    fn start(&self, sink: mpsc::UnboundedSender<AdvertisedDevice>) -> anyhow::Result<()> {
        for adv in &self.advertisements {
            let _ = sink.send(*adv);
        }
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePlatform {
    advertisements: Vec<AdvertisedDevice>,
    device: Option<Arc<FakeDevice>>,
    fail_connect: bool,
    panic_connect: bool,
    connect_delay: Duration,
    connects: AtomicUsize,
    stops: Arc<AtomicUsize>,
}

impl FakePlatform {
    pub fn new(advertisements: Vec<AdvertisedDevice>) -> Self {
        Self {
            advertisements,
            device: None,
            fail_connect: false,
            panic_connect: false,
            connect_delay: Duration::ZERO,
            connects: AtomicUsize::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Device handed out on connect, instead of an empty one
    pub fn with_device(mut self, device: Arc<FakeDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn panicking_connect(mut self) -> Self {
        self.panic_connect = true;
        self
    }

    /// Connect completes only after `delay`
    pub fn slow_connect(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn connect_attempts(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn scan_stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlePlatform for FakePlatform {
    fn scanner(&self) -> anyhow::Result<Box<dyn AdvertisementScanner>> {
        Ok(Box::new(FakeScanner {
            advertisements: self.advertisements.clone(),
            stops: self.stops.clone(),
        }))
    }

    async fn connect(&self, address: BluetoothAddress) -> BleResult<Arc<dyn GattDevice>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if self.panic_connect {
            panic!("platform connect crashed");
        }
        if self.fail_connect {
            return Err(BleError::connection(address, "device unreachable"));
        }
        let device: Arc<dyn GattDevice> = match &self.device {
            Some(device) => device.clone(),
            None => Arc::new(FakeDevice::new(address)),
        };
        Ok(device)
    }
}

// ── Console ───────────────────────────────────────────────────────────────────

/// Console that answers prompts from a script and records what was shown
#[derive(Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedConsole {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
            prompts: Vec::new(),
        }
    }
}

#[async_trait]
impl OperatorConsole for ScriptedConsole {
    async fn prompt(&mut self, message: &str) -> anyhow::Result<Option<String>> {
        self.prompts.push(message.to_string());
        Ok(self.answers.pop_front())
    }
}
