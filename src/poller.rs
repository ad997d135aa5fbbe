use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::client::TuyaClient;
use crate::config::DEFAULT_POLL_INTERVAL;
use crate::diff::diff_status;
use crate::types::{DeviceStatus, Event};
use crate::{Error, Result};

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&str, &[DeviceStatus]) + Send + Sync>;

pub const AUTH_ATTEMPTS: u32 = 3;
pub const AUTH_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Periodically fetches status for a set of devices and reports changes.
pub struct Poller {
    client: TuyaClient,
    devices: Vec<String>,
    interval: Duration,
    previous: HashMap<String, Vec<DeviceStatus>>,
    event_callbacks: Vec<EventCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
}

impl Poller {
    pub fn new(client: TuyaClient) -> Self {
        Self {
            client,
            devices: Vec::new(),
            interval: DEFAULT_POLL_INTERVAL,
            previous: HashMap::new(),
            event_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
        }
    }

    pub fn device(mut self, id: impl Into<String>) -> Self {
        self.devices.push(id.into());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    /// Called with the device id and its full status list after every
    /// successful fetch.
    pub fn on_snapshot(mut self, f: impl Fn(&str, &[DeviceStatus]) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn client(&mut self) -> &mut TuyaClient {
        &mut self.client
    }

    pub fn last_status(&self, device_id: &str) -> Option<&[DeviceStatus]> {
        self.previous.get(device_id).map(Vec::as_slice)
    }

    pub async fn authenticate_with_retry(&mut self, max_attempts: u32, delay: Duration) -> Result<()> {
        let mut last_err = None;
        for attempt in 1..=max_attempts {
            match self.client.authenticate().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "authentication attempt failed");
                    last_err = Some(e);
                    if attempt < max_attempts {
                        debug!(delay_secs = delay.as_secs(), "retrying authentication");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Config("max_attempts must be at least 1".into())))
    }

    /// One pass over every device. A failing device is logged and skipped.
    pub async fn poll_once(&mut self) {
        for device_id in self.devices.clone() {
            let status = match self.client.device_status(&device_id).await {
                Ok(status) => status,
                Err(e) => {
                    error!(device_id = %device_id, error = %e, "failed to poll device");
                    continue;
                }
            };

            let previous = self.previous.get(&device_id).map(Vec::as_slice).unwrap_or(&[]);
            for event in diff_status(&device_id, previous, &status) {
                for cb in &self.event_callbacks {
                    cb(&event);
                }
            }
            for cb in &self.snapshot_callbacks {
                cb(&device_id, &status);
            }
            self.previous.insert(device_id, status);
        }
    }

    /// Logs in (retrying until it succeeds) and then polls forever.
    pub async fn run(mut self) {
        while let Err(e) = self
            .authenticate_with_retry(AUTH_ATTEMPTS, AUTH_RETRY_DELAY)
            .await
        {
            error!(error = %e, retry_secs = RECONNECT_DELAY.as_secs(), "failed to authenticate after retries");
            tokio::time::sleep(RECONNECT_DELAY).await;
        }

        info!(interval_secs = self.interval.as_secs(), devices = self.devices.len(), "starting status polling");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}
