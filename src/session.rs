//! Session Controller
//!
//! Scan, ask the operator, stream, report. Every phase failure is logged
//! here and turned into a [`SessionOutcome`]; nothing escapes as a panic or
//! an unhandled error.

use crate::domain::actuation::InputSink;
use crate::domain::error::BleError;
use crate::domain::pipeline::FramePipeline;
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::platform::{BlePlatform, GattDevice};
use crate::infrastructure::bluetooth::protocol::{CHARACTERISTIC_UUID, TARGET_ADDRESS};
use crate::infrastructure::bluetooth::scanner::DeviceDiscovery;
use crate::infrastructure::bluetooth::subscriber::{
    stop_requested, NotificationSubscriber, SubscriptionReport,
};
use crate::presentation::console::{is_start_command, is_stop_command, OperatorConsole};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const START_PROMPT: &str = "Type 'start' to begin reading BLE data: ";
const STOP_PROMPT: &str = "Type 'stop' to end streaming: ";

#[derive(Debug)]
pub enum SessionOutcome {
    /// The operator did not type `start`, or a stop arrived before streaming
    Declined,
    /// No connection was available after discovery
    NoDevice,
    /// Streaming ran and finished cleanly
    Completed(SubscriptionReport),
    /// A phase failed
    Failed(BleError),
}

impl SessionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::NoDevice | Self::Failed(_))
    }
}

pub struct SessionController {
    platform: Arc<dyn BlePlatform>,
    input: Arc<dyn InputSink>,
    settings: Settings,
    stop: Arc<watch::Sender<bool>>,
}

impl SessionController {
    pub fn new(platform: Arc<dyn BlePlatform>, input: Arc<dyn InputSink>, settings: Settings) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            platform,
            input,
            settings,
            stop: Arc::new(stop),
        }
    }

    /// Handle for requesting a stop from outside, e.g. a Ctrl-C listener
    pub fn stop_handle(&self) -> Arc<watch::Sender<bool>> {
        self.stop.clone()
    }

    pub async fn run(&self, console: &mut dyn OperatorConsole) -> SessionOutcome {
        info!("Waiting for connection...");
        let discovery = DeviceDiscovery::new(
            self.platform.clone(),
            TARGET_ADDRESS,
            self.settings.scan_duration(),
        );
        let outcome = match discovery.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("BLE scan failed: {:#}", e);
                return SessionOutcome::Failed(BleError::Platform(e));
            }
        };

        let mut stop_rx = self.stop.subscribe();
        if !self.confirm_start(console).await {
            info!("Invalid input, exiting.");
            if let Some(device) = outcome.into_connection(Duration::ZERO, &mut stop_rx).await {
                close_device(device.as_ref());
            }
            return SessionOutcome::Declined;
        }

        info!("Starting BLE data read");
        let matched = outcome.matched;
        let connection = outcome
            .into_connection(self.settings.connect_timeout(), &mut stop_rx)
            .await;
        if *stop_rx.borrow() {
            info!("Stopped before streaming started");
            if let Some(device) = connection {
                close_device(device.as_ref());
            }
            return SessionOutcome::Declined;
        }
        let Some(device) = connection else {
            match matched {
                Some(address) => error!("Failed to connect to the BLE device {}.", address),
                None => error!("BLE device {} was not found.", TARGET_ADDRESS),
            }
            return SessionOutcome::NoDevice;
        };

        let mut subscriber = NotificationSubscriber::new(
            device.clone(),
            CHARACTERISTIC_UUID,
            self.settings.notification_queue_depth,
        );
        let mut pipeline = FramePipeline::new(&self.settings, self.input.clone());
        let stop_rx = self.stop.subscribe();
        let mut worker =
            tokio::spawn(async move { subscriber.run(&mut pipeline, stop_rx).await });

        let mut console_open = true;
        let joined = loop {
            tokio::select! {
                joined = &mut worker => break joined,
                line = console.prompt(STOP_PROMPT), if console_open => match line {
                    Ok(Some(line)) if is_stop_command(&line) => {
                        self.stop.send_replace(true);
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => console_open = false,
                    Err(e) => {
                        warn!("Console input unavailable: {}", e);
                        console_open = false;
                    }
                },
            }
        };

        close_device(device.as_ref());

        match joined {
            Ok(Ok(report)) => {
                info!(
                    "Finished BLE data read: {} frames ({} malformed), {} double clicks",
                    report.stats.frames_received,
                    report.stats.malformed_frames,
                    report.stats.double_clicks
                );
                SessionOutcome::Completed(report)
            }
            Ok(Err(e)) => SessionOutcome::Failed(e),
            Err(e) => {
                error!("Streaming worker aborted: {}", e);
                SessionOutcome::Failed(BleError::Platform(e.into()))
            }
        }
    }

    /// Ask for the go-ahead. A stop request while waiting counts as a decline.
    async fn confirm_start(&self, console: &mut dyn OperatorConsole) -> bool {
        let mut stop_rx = self.stop.subscribe();
        tokio::select! {
            answer = console.prompt(START_PROMPT) => match answer {
                Ok(Some(answer)) => is_start_command(&answer),
                Ok(None) => false,
                Err(e) => {
                    warn!("Failed to read operator input: {}", e);
                    false
                }
            },
            _ = stop_requested(&mut stop_rx) => false,
        }
    }
}

fn close_device(device: &dyn GattDevice) {
    if let Err(e) = device.close() {
        warn!("Failed to close device {}: {}", device.address(), e);
    } else {
        info!("Disconnected from device {}", device.address());
    }
}
