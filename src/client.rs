use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::Command;
use crate::coordinator::{Coordinator, CoordinatorState, Listeners};
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{self, Endpoint};
use crate::snapshot::{Snapshot, SnapshotKind};
use crate::transport::Transport;
use crate::types::*;
use crate::{Error, Result};

pub struct SaunaClientBuilder {
    address: String,
    protocol: String,
    timeout: Duration,
    status_interval: Duration,
    settings_interval: Duration,
    settle_delay: Duration,
    entry_id: Option<Uuid>,
    listeners: Listeners,
    log_mode: Option<MessageLogMode>,
    log_path: Option<PathBuf>,
}

impl SaunaClientBuilder {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            protocol: protocol::DEFAULT_PROTOCOL.to_string(),
            timeout: protocol::REQUEST_TIMEOUT,
            status_interval: protocol::STATUS_INTERVAL,
            settings_interval: protocol::SETTINGS_INTERVAL,
            settle_delay: protocol::SETTLE_DELAY,
            entry_id: None,
            listeners: Listeners::default(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn protocol(mut self, proto: &str) -> Self {
        self.protocol = proto.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    pub fn settings_interval(mut self, interval: Duration) -> Self {
        self.settings_interval = interval;
        self
    }

    /// How long to wait after switching something off before refreshing.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Reuse a persisted id instead of generating one.
    pub fn entry_id(mut self, id: Uuid) -> Self {
        self.entry_id = Some(id);
        self
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.listeners.events.push(Box::new(f));
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.listeners.snapshots.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<PathBuf>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SaunaClient> {
        let address = self.address.trim().trim_end_matches('/').to_string();
        if address.is_empty() {
            return Err(Error::InvalidAddress(self.address));
        }
        let base_url = format!("{}://{}", self.protocol, address);
        match reqwest::Url::parse(&base_url) {
            Ok(url) if url.host().is_some() && url.path() == "/" => {}
            _ => return Err(Error::InvalidAddress(self.address)),
        }

        let mut transport = Transport::new(base_url, self.timeout)?;
        if let (Some(mode), Some(path)) = (self.log_mode, self.log_path) {
            let logger = MessageLogger::new(mode, &path).map_err(|e| {
                Error::client(format!("failed to open message log {}", path.display()), e)
            })?;
            transport = transport.with_logger(logger);
        }

        Ok(SaunaClient {
            transport: Arc::new(transport),
            address,
            entry_id: self.entry_id.unwrap_or_else(Uuid::new_v4),
            status_interval: self.status_interval,
            settings_interval: self.settings_interval,
            settle_delay: self.settle_delay,
            listeners: Arc::new(self.listeners),
            session: None,
        })
    }
}

struct Session {
    status: Arc<Coordinator>,
    settings: Arc<Coordinator>,
}

impl Session {
    fn coordinator(&self, kind: SnapshotKind) -> &Arc<Coordinator> {
        match kind {
            SnapshotKind::ActualStatus => &self.status,
            SnapshotKind::DesiredSettings => &self.settings,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.status.stop();
        self.settings.stop();
    }
}

/// Everything belonging to one sauna: the transport and, while open, both
/// coordinators and their poll tasks.
pub struct SaunaClient {
    transport: Arc<Transport>,
    address: String,
    entry_id: Uuid,
    status_interval: Duration,
    settings_interval: Duration,
    settle_delay: Duration,
    listeners: Arc<Listeners>,
    session: Option<Session>,
}

impl SaunaClient {
    pub fn builder(address: impl Into<String>) -> SaunaClientBuilder {
        SaunaClientBuilder::new(address)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn entry_id(&self) -> Uuid {
        self.entry_id
    }

    /// Stable id for an entity derived from this connection.
    pub fn unique_id(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.entry_id)
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Fetch the status endpoint once without opening the connection.
    pub async fn check_connection(&self) -> Result<()> {
        let body = self.transport.fetch(Endpoint::Status).await?;
        Snapshot::from_json(SnapshotKind::ActualStatus, &body)?;
        Ok(())
    }

    /// Refresh both snapshots and start polling. Fails without keeping any
    /// state if either first refresh fails.
    pub async fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!(address = %self.address, "already open");
            return Ok(());
        }

        let status = Arc::new(Coordinator::new(
            SnapshotKind::ActualStatus,
            self.status_interval,
            Arc::clone(&self.transport),
        ));
        let settings = Arc::new(Coordinator::new(
            SnapshotKind::DesiredSettings,
            self.settings_interval,
            Arc::clone(&self.transport),
        ));

        let (status_res, settings_res) = tokio::join!(status.refresh(), settings.refresh());
        if let Err(e) = status_res.and(settings_res) {
            error!(address = %self.address, error = %e, "initial refresh failed");
            return Err(e);
        }

        status.attach(Arc::clone(&self.listeners));
        settings.attach(Arc::clone(&self.listeners));

        status.spawn_polling();
        settings.spawn_polling();

        info!(address = %self.address, entry = %self.entry_id, "sauna connection open");
        self.session = Some(Session { status, settings });
        Ok(())
    }

    /// Stop polling and pending refreshes, then drop both snapshots. No
    /// callback fires after this returns.
    pub async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        tokio::join!(session.status.shutdown(), session.settings.shutdown());
        info!(address = %self.address, "sauna connection closed");
    }

    pub fn coordinator(&self, kind: SnapshotKind) -> Option<&Arc<Coordinator>> {
        self.session.as_ref().map(|s| s.coordinator(kind))
    }

    pub fn snapshot(&self, kind: SnapshotKind) -> Option<Arc<Snapshot>> {
        self.coordinator(kind).and_then(|c| c.snapshot())
    }

    pub fn last_error(&self, kind: SnapshotKind) -> Option<Error> {
        self.coordinator(kind).and_then(|c| c.last_error())
    }

    pub fn last_update_success(&self, kind: SnapshotKind) -> bool {
        self.coordinator(kind)
            .is_some_and(|c| c.last_update_success())
    }

    pub fn subscribe(&self, kind: SnapshotKind) -> Option<watch::Receiver<CoordinatorState>> {
        self.coordinator(kind).map(|c| c.subscribe())
    }

    pub async fn refresh(&self, kind: SnapshotKind) -> Result<Arc<Snapshot>> {
        let coordinator = self.coordinator(kind).ok_or(Error::NotConnected)?;
        coordinator.refresh().await
    }

    /// Ask for a refresh soon; returns without waiting for it.
    pub fn request_refresh(&self, kind: SnapshotKind) {
        match self.coordinator(kind) {
            Some(coordinator) => {
                coordinator.request_refresh();
            }
            None => debug!(%kind, "refresh requested while closed"),
        }
    }

    pub fn actual_status(&self) -> Option<ActualStatus> {
        self.snapshot(SnapshotKind::ActualStatus)
            .map(|s| ActualStatus::from_snapshot(&s))
    }

    pub fn desired_settings(&self) -> Option<DesiredSettings> {
        self.snapshot(SnapshotKind::DesiredSettings)
            .map(|s| DesiredSettings::from_snapshot(&s))
    }

    pub fn heating_action(&self) -> Option<HeatingAction> {
        let status = self.actual_status()?.status?;
        Some(HeatingAction::from_status(status))
    }

    // -- Command methods --

    /// Validate and send one control value, then refresh what it affects.
    pub async fn send_command(&self, key: &str, value: i64) -> Result<Value> {
        let command = Command::from_key(key).ok_or_else(|| {
            warn!(key, "rejected unknown control key");
            Error::validation(key, "unknown control key")
        })?;
        self.dispatch(command, value).await
    }

    pub async fn set_sauna_power(&self, on: bool) -> Result<Value> {
        self.dispatch(Command::SAUNA_POWER, i64::from(on)).await
    }

    pub async fn set_vapor_power(&self, on: bool) -> Result<Value> {
        self.dispatch(Command::VAPOR_POWER, i64::from(on)).await
    }

    pub async fn set_light_power(&self, on: bool) -> Result<Value> {
        self.dispatch(Command::LIGHT_POWER, i64::from(on)).await
    }

    pub async fn set_target_temperature(&self, celsius: i64) -> Result<Value> {
        self.dispatch(Command::TARGET_TEMPERATURE, celsius).await
    }

    pub async fn set_target_humidity(&self, percent: i64) -> Result<Value> {
        self.dispatch(Command::TARGET_HUMIDITY, percent).await
    }

    pub async fn set_light_intensity(&self, percent: i64) -> Result<Value> {
        self.dispatch(Command::LIGHT_INTENSITY, percent).await
    }

    /// Set intensity from a 0..=255 brightness and switch the light on if
    /// it isn't already. Whether it is on is read from the cached desired
    /// settings, which may predate a refresh still running.
    pub async fn set_light_brightness(&self, brightness: u8) -> Result<Value> {
        let response = self
            .dispatch(Command::LIGHT_INTENSITY, brightness_to_intensity(brightness))
            .await?;
        let light_on = self.desired_settings().and_then(|d| d.light_on);
        if light_on == Some(true) {
            return Ok(response);
        }
        self.dispatch(Command::LIGHT_POWER, 1).await
    }

    async fn dispatch(&self, command: Command, value: i64) -> Result<Value> {
        let key = command.key();
        let wire = command.validate(value).inspect_err(|e| {
            warn!(key, value, error = %e, "command rejected");
        })?;
        let session = self.session.as_ref().ok_or(Error::NotConnected)?;

        debug!(key, value = wire, "sending command");
        let response = self
            .transport
            .send(Endpoint::Control, key, wire)
            .await
            .inspect_err(|e| warn!(key, value = wire, error = %e, "command failed"))?;

        if command.needs_settle(wire) {
            debug!(key, delay = ?self.settle_delay, "waiting for device to settle");
            tokio::time::sleep(self.settle_delay).await;
        }
        for kind in command.affected() {
            session.coordinator(*kind).request_refresh();
        }
        Ok(response)
    }
}
