//! BLE Discovery Module
//!
//! Time-boxed active scan for the target sensor. The first matching
//! advertisement stops the scan and starts exactly one connection attempt.

use crate::domain::models::BluetoothAddress;
use crate::infrastructure::bluetooth::connection::{spawn_connect, ConnectionSlot};
use crate::infrastructure::bluetooth::platform::{
    AdvertisedDevice, AdvertisementScanner, BlePlatform, GattDevice,
};
use crate::infrastructure::bluetooth::subscriber::stop_requested;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    TargetMatched(BluetoothAddress),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryAction {
    Ignore,
    StopAndConnect(BluetoothAddress),
}

/// Address filter. Leaves `Idle` at most once.
#[derive(Debug, Clone)]
pub struct TargetFilter {
    target: String,
    state: DiscoveryState,
}

impl TargetFilter {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.trim().to_string(),
            state: DiscoveryState::Idle,
        }
    }

    pub fn observe(&mut self, adv: &AdvertisedDevice) -> DiscoveryAction {
        if self.state != DiscoveryState::Idle {
            return DiscoveryAction::Ignore;
        }

        match adv.signal_strength {
            Some(rssi) => debug!("Device found: {} ({} dBm)", adv.address, rssi),
            None => debug!("Device found: {}", adv.address),
        }
        if !adv.address.matches(&self.target) {
            return DiscoveryAction::Ignore;
        }

        info!("Target device found: {}", adv.address);
        self.state = DiscoveryState::TargetMatched(adv.address);
        DiscoveryAction::StopAndConnect(adv.address)
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }
}

/// Result of one scan window
pub struct DiscoveryOutcome {
    pub matched: Option<BluetoothAddress>,
    slot: ConnectionSlot,
    pending: Option<JoinHandle<()>>,
}

impl DiscoveryOutcome {
    /// Wait at most `timeout` for an in-flight connection attempt, then
    /// take whatever connection the slot holds. A stop request cuts the
    /// wait short and cancels the attempt.
    pub async fn into_connection(
        self,
        timeout: Duration,
        stop: &mut watch::Receiver<bool>,
    ) -> Option<Arc<dyn GattDevice>> {
        if let Some(pending) = self.pending {
            if !pending.is_finished() {
                info!("Waiting for connection to complete...");
            }
            let attempt = pending.abort_handle();
            tokio::select! {
                joined = tokio::time::timeout(timeout, pending) => match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Connection task failed: {}", e),
                    Err(_) => {
                        warn!("Connection attempt timed out after {:?}", timeout);
                        attempt.abort();
                    }
                },
                _ = stop_requested(stop) => {
                    info!("Stop requested while connecting");
                    attempt.abort();
                }
            }
        }
        self.slot.take()
    }
}

pub struct DeviceDiscovery {
    platform: Arc<dyn BlePlatform>,
    target: String,
    scan_duration: Duration,
}

impl DeviceDiscovery {
    pub fn new(platform: Arc<dyn BlePlatform>, target: &str, scan_duration: Duration) -> Self {
        Self {
            platform,
            target: target.to_string(),
            scan_duration,
        }
    }

    /// Scan for the full window. A platform failure to start the scan is
    /// returned; everything after that is logged.
    pub async fn run(&self) -> Result<DiscoveryOutcome> {
        let scanner = self.platform.scanner()?;
        let (tx, mut rx) = mpsc::unbounded_channel();

        info!("Starting BLE scan for {}", self.target);
        scanner.start(tx)?;

        let slot = ConnectionSlot::new();
        let mut filter = TargetFilter::new(&self.target);
        let mut pending = None;

        let window = tokio::time::sleep(self.scan_duration);
        tokio::pin!(window);

        loop {
            tokio::select! {
                _ = &mut window => break,
                adv = rx.recv() => {
                    let Some(adv) = adv else {
                        warn!("Advertisement stream ended early");
                        break;
                    };
                    if let DiscoveryAction::StopAndConnect(address) = filter.observe(&adv) {
                        stop_scanner(scanner.as_ref());
                        pending = Some(spawn_connect(self.platform.clone(), address, slot.clone()));
                        break;
                    }
                }
            }
        }

        // Later advertisements are discarded, not queued
        drop(rx);
        window.await;
        stop_scanner(scanner.as_ref());

        if pending.is_none() {
            warn!("Target device {} not seen during scan", self.target);
        }

        Ok(DiscoveryOutcome {
            matched: match filter.state() {
                DiscoveryState::TargetMatched(address) => Some(address),
                DiscoveryState::Idle => None,
            },
            slot,
            pending,
        })
    }
}

fn stop_scanner(scanner: &dyn AdvertisementScanner) {
    if let Err(e) = scanner.stop() {
        warn!("Failed to stop BLE scan: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::protocol::TARGET_ADDRESS;
    use crate::test_support::FakePlatform;

    fn adv(raw: u64) -> AdvertisedDevice {
        AdvertisedDevice {
            address: BluetoothAddress::new(raw),
            signal_strength: Some(-60),
        }
    }

    #[test]
    fn test_non_target_stays_idle() {
        let mut filter = TargetFilter::new(TARGET_ADDRESS);
        for raw in [0u64, 0x08D1_F9FD_407F, 0xFFFF_FFFF_FFFF] {
            assert_eq!(filter.observe(&adv(raw)), DiscoveryAction::Ignore);
        }
        assert_eq!(filter.state(), DiscoveryState::Idle);
    }

    #[test]
    fn test_target_transitions_exactly_once() {
        let mut filter = TargetFilter::new("08:D1:F9:FD:40:7E");
        let target = adv(0x08D1_F9FD_407E);

        assert_eq!(
            filter.observe(&target),
            DiscoveryAction::StopAndConnect(target.address)
        );
        for _ in 0..3 {
            assert_eq!(filter.observe(&target), DiscoveryAction::Ignore);
        }
        assert_eq!(filter.state(), DiscoveryState::TargetMatched(target.address));
    }

    #[tokio::test]
    async fn test_scan_connects_once_and_stops() {
        let target = adv(0x08D1_F9FD_407E);
        let platform = Arc::new(FakePlatform::new(vec![adv(1), target, target, adv(2), target]));
        let discovery =
            DeviceDiscovery::new(platform.clone(), TARGET_ADDRESS, Duration::from_millis(20));

        let outcome = discovery.run().await.unwrap();
        assert_eq!(outcome.matched, Some(target.address));
        assert!(platform.scan_stops() >= 1);

        let (_stop_tx, mut stop_rx) = watch::channel(false);
        let device = outcome
            .into_connection(Duration::from_secs(1), &mut stop_rx)
            .await;
        assert_eq!(device.unwrap().address(), target.address);
        assert_eq!(platform.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_scan_without_target() {
        let platform = Arc::new(FakePlatform::new(vec![adv(1), adv(2)]));
        let discovery =
            DeviceDiscovery::new(platform.clone(), TARGET_ADDRESS, Duration::from_millis(20));

        let outcome = discovery.run().await.unwrap();
        assert_eq!(outcome.matched, None);
        let (_stop_tx, mut stop_rx) = watch::channel(false);
        assert!(outcome
            .into_connection(Duration::from_millis(10), &mut stop_rx)
            .await
            .is_none());
        assert_eq!(platform.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_failed_connect_yields_no_connection() {
        let platform = Arc::new(FakePlatform::new(vec![adv(0x08D1_F9FD_407E)]).failing_connect());
        let discovery = DeviceDiscovery::new(platform, TARGET_ADDRESS, Duration::from_millis(10));

        let outcome = discovery.run().await.unwrap();
        assert!(outcome.matched.is_some());
        let (_stop_tx, mut stop_rx) = watch::channel(false);
        assert!(outcome
            .into_connection(Duration::from_secs(1), &mut stop_rx)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_crashed_connect_task_yields_no_connection() {
        let platform =
            Arc::new(FakePlatform::new(vec![adv(0x08D1_F9FD_407E)]).panicking_connect());
        let discovery =
            DeviceDiscovery::new(platform.clone(), TARGET_ADDRESS, Duration::from_millis(10));

        let outcome = discovery.run().await.unwrap();
        let (_stop_tx, mut stop_rx) = watch::channel(false);
        assert!(outcome
            .into_connection(Duration::from_secs(1), &mut stop_rx)
            .await
            .is_none());
        assert_eq!(platform.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_stop_cuts_connect_wait_short() {
        let platform = Arc::new(
            FakePlatform::new(vec![adv(0x08D1_F9FD_407E)]).slow_connect(Duration::from_secs(30)),
        );
        let discovery = DeviceDiscovery::new(platform, TARGET_ADDRESS, Duration::from_millis(10));
        let outcome = discovery.run().await.unwrap();

        let (stop_tx, mut stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop_tx.send_replace(true);
        });

        let started = std::time::Instant::now();
        let device = outcome
            .into_connection(Duration::from_secs(30), &mut stop_rx)
            .await;
        assert!(device.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
