//! Notification Subscriber
//!
//! Drives one subscription through
//! `Idle -> ServicesDiscovered -> CharacteristicMatched -> NotifyEnabled ->
//! Streaming -> NotifyDisabled -> Done`, with `Failed` reachable from any
//! non-terminal state. While streaming, every notification runs through the
//! [`FramePipeline`] to completion before the next one is taken.

use crate::domain::error::{BleError, BleResult};
use crate::domain::models::{CccdValue, PipelineStats, SubscriptionState};
use crate::domain::pipeline::FramePipeline;
use crate::infrastructure::bluetooth::platform::{FrameSink, GattCharacteristic, GattDevice};
use crate::infrastructure::bluetooth::protocol::format_uuid;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Final report of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionReport {
    pub state: SubscriptionState,
    pub stats: PipelineStats,
}

pub struct NotificationSubscriber {
    device: Arc<dyn GattDevice>,
    characteristic_uuid: u128,
    queue_depth: usize,
    state: SubscriptionState,
}

impl NotificationSubscriber {
    pub fn new(device: Arc<dyn GattDevice>, characteristic_uuid: u128, queue_depth: usize) -> Self {
        Self {
            device,
            characteristic_uuid,
            queue_depth: queue_depth.max(1),
            state: SubscriptionState::Idle,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    fn transition(&mut self, next: SubscriptionState) {
        debug!("Subscription {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run the whole lifecycle until `stop` flips to `true` or the
    /// notification stream closes.
    pub async fn run(
        &mut self,
        pipeline: &mut FramePipeline,
        stop: watch::Receiver<bool>,
    ) -> BleResult<SubscriptionReport> {
        match self.run_inner(pipeline, stop).await {
            Ok(()) => Ok(SubscriptionReport {
                state: self.state,
                stats: pipeline.stats(),
            }),
            Err(e) => {
                error!("Subscription failed in state {:?}: {}", self.state, e);
                self.transition(SubscriptionState::Failed);
                Err(e)
            }
        }
    }

    async fn run_inner(
        &mut self,
        pipeline: &mut FramePipeline,
        mut stop: watch::Receiver<bool>,
    ) -> BleResult<()> {
        let characteristic = self.find_characteristic().await?;

        let (tx, mut frames) = mpsc::channel(self.queue_depth);
        characteristic.set_notification_sink(FrameSink::new(tx))?;
        info!("Notification handler registered");

        let enabled = match characteristic.write_cccd(CccdValue::Notify).await {
            Ok(status) if status.is_success() => Ok(()),
            Ok(status) => Err(BleError::Subscription { status }),
            Err(e) => Err(e),
        };
        if let Err(e) = enabled {
            remove_sink(characteristic.as_ref());
            return Err(e);
        }
        self.transition(SubscriptionState::NotifyEnabled);
        info!("Started receiving notifications");

        pipeline.reset();
        self.transition(SubscriptionState::Streaming);
        loop {
            tokio::select! {
                biased;
                frame = frames.recv() => match frame {
                    Some(payload) => {
                        let _ = pipeline.handle(&payload, Instant::now());
                    }
                    None => {
                        warn!("Notification stream closed by platform");
                        break;
                    }
                },
                _ = stop_requested(&mut stop) => {
                    info!("Stop requested");
                    break;
                }
            }
        }

        self.disable_notifications(characteristic.as_ref()).await;
        self.transition(SubscriptionState::Done);
        Ok(())
    }

    /// Enumerate services and their characteristics until the telemetry
    /// characteristic turns up. Services whose characteristics cannot be
    /// listed are skipped.
    async fn find_characteristic(&mut self) -> BleResult<Arc<dyn GattCharacteristic>> {
        let services = self.device.services().await?;
        if !services.status.is_success() {
            return Err(BleError::ServiceDiscovery {
                status: services.status,
            });
        }
        info!("Found {} GATT services", services.items.len());
        self.transition(SubscriptionState::ServicesDiscovered);

        for service in &services.items {
            let characteristics = match service.characteristics().await {
                Ok(listing) if listing.status.is_success() => listing.items,
                Ok(listing) => {
                    debug!(
                        "Skipping service {}: {:?}",
                        format_uuid(service.uuid()),
                        listing.status
                    );
                    continue;
                }
                Err(e) => {
                    debug!("Skipping service {}: {}", format_uuid(service.uuid()), e);
                    continue;
                }
            };

            if let Some(found) = characteristics
                .into_iter()
                .find(|c| c.uuid() == self.characteristic_uuid)
            {
                info!("Found telemetry characteristic");
                self.transition(SubscriptionState::CharacteristicMatched);
                return Ok(found);
            }
        }

        Err(BleError::CharacteristicNotFound {
            uuid: format_uuid(self.characteristic_uuid),
            address: self.device.address(),
        })
    }

    /// Best effort: failures are logged only.
    async fn disable_notifications(&mut self, characteristic: &dyn GattCharacteristic) {
        match characteristic.write_cccd(CccdValue::None).await {
            Ok(status) if status.is_success() => info!("Notifications disabled"),
            Ok(status) => warn!("Disabling notifications returned status: {:?}", status),
            Err(e) => warn!("Failed to disable notifications: {}", e),
        }
        remove_sink(characteristic);
        self.transition(SubscriptionState::NotifyDisabled);
    }
}

fn remove_sink(characteristic: &dyn GattCharacteristic) {
    if let Err(e) = characteristic.clear_notification_sink() {
        warn!("Failed to remove notification handler: {}", e);
    }
}

/// Resolve once the stop flag is set. A dropped sender counts as a stop.
pub async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *stop.borrow_and_update();
        if stopped || stop.changed().await.is_err() {
            return;
        }
    }
}
