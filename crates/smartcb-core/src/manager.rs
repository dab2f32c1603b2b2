// ── Device manager ──
//
// Single writer of the connection state machine. Scan, connect and
// disconnect are serialized by one operation lock; observers follow the
// state through a `watch` channel and never write it.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, warn};

use smartcb_api::{DeviceClient, DeviceInfo, TransportConfig, is_supported_model};

use crate::config::ManagerConfig;
use crate::discovery::{self, CandidateSet, ScanResult};
use crate::error::CoreError;
use crate::model::{DeviceEndpoint, Reading, Thresholds};
use crate::store::ConfigStore;
use crate::sync::{self, StepOutcome, WallClock};

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Idle,
    Scanning,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    /// Whether the state machine allows `self -> next`.
    ///
    /// `Connected -> Failed` does not exist: ongoing reachability is not
    /// tracked here.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Failed, Self::Scanning | Self::Connecting)
                | (Self::Scanning | Self::Connected | Self::Failed, Self::Idle)
                | (Self::Connecting, Self::Connected | Self::Failed)
        )
    }

    /// A scan or connect is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Scanning | Self::Connecting)
    }
}

// ── Sync session & report ────────────────────────────────────────

/// Per-connect working context. Lives for one `connect` call; the
/// synchronizers borrow its client.
#[derive(Debug)]
pub struct SyncSession {
    endpoint: DeviceEndpoint,
    client: DeviceClient,
    started_at: DateTime<Utc>,
}

impl SyncSession {
    fn new(endpoint: DeviceEndpoint, client: DeviceClient) -> Self {
        Self {
            endpoint,
            client,
            started_at: Utc::now(),
        }
    }

    pub fn endpoint(&self) -> DeviceEndpoint {
        self.endpoint
    }

    pub fn client(&self) -> &DeviceClient {
        &self.client
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn finish(self, device: DeviceInfo, pull: sync::SyncPull, clock: StepOutcome) -> SyncReport {
        SyncReport {
            endpoint: self.endpoint,
            device,
            settings: pull.settings,
            schedules: pull.schedules,
            clock,
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }
}

/// What a connect (or resync) achieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub endpoint: DeviceEndpoint,
    pub device: DeviceInfo,
    pub settings: StepOutcome,
    pub schedules: StepOutcome,
    pub clock: StepOutcome,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SyncReport {
    /// Connected, but at least one sync step failed.
    pub fn partial_failure(&self) -> bool {
        self.steps().iter().any(|(_, outcome)| outcome.is_failed())
    }

    pub fn is_degraded(&self) -> bool {
        self.partial_failure()
    }

    /// `(step, reason)` for every failed step.
    pub fn failures(&self) -> Vec<(&'static str, &str)> {
        self.steps()
            .into_iter()
            .filter_map(|(step, outcome)| outcome.reason().map(|r| (step, r)))
            .collect()
    }

    fn steps(&self) -> [(&'static str, &StepOutcome); 3] {
        [
            ("settings", &self.settings),
            ("schedules", &self.schedules),
            ("clock", &self.clock),
        ]
    }
}

// ── DeviceManager ────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ManagerInner>`. Owns the connection state,
/// the active endpoint, and the local configuration store.
#[derive(Clone)]
pub struct DeviceManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: ManagerConfig,
    store: ConfigStore,
    state: watch::Sender<ConnectionState>,
    active: RwLock<Option<ActiveDevice>>,
    last_report: RwLock<Option<SyncReport>>,
    op_lock: Mutex<()>,
}

#[derive(Debug, Clone)]
struct ActiveDevice {
    endpoint: DeviceEndpoint,
    client: DeviceClient,
}

impl ManagerInner {
    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "connection state changed");
        }
    }

    fn set_active(&self, active: Option<ActiveDevice>) {
        *self.active.write().expect("active device lock poisoned") = active;
    }

    fn clear_session(&self) {
        self.set_active(None);
        *self.last_report.write().expect("report lock poisoned") = None;
    }
}

/// Puts the manager into a terminal state if an operation's future is
/// dropped or returns early.
struct StateGuard<'a> {
    inner: &'a ManagerInner,
    on_drop: ConnectionState,
    clear_session: bool,
    armed: bool,
}

impl<'a> StateGuard<'a> {
    fn new(inner: &'a ManagerInner, on_drop: ConnectionState, clear_session: bool) -> Self {
        Self {
            inner,
            on_drop,
            clear_session,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if self.clear_session {
                self.inner.clear_session();
            }
            self.inner.set_state(self.on_drop);
        }
    }
}

impl DeviceManager {
    /// Create a manager in `Idle`. Does not touch the network.
    pub fn new(config: ManagerConfig, store: ConfigStore) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            inner: Arc::new(ManagerInner {
                config,
                store,
                state,
                active: RwLock::new(None),
                last_report: RwLock::new(None),
                op_lock: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &ConfigStore {
        &self.inner.store
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// The endpoint being connected to or currently connected.
    pub fn endpoint(&self) -> Option<DeviceEndpoint> {
        self.inner
            .active
            .read()
            .expect("active device lock poisoned")
            .as_ref()
            .map(|a| a.endpoint)
    }

    /// Report of the most recent successful connect or resync.
    pub fn last_report(&self) -> Option<SyncReport> {
        self.inner
            .last_report
            .read()
            .expect("report lock poisoned")
            .clone()
    }

    /// The active client, only while `Connected`.
    pub fn client(&self) -> Result<DeviceClient, CoreError> {
        if self.state() != ConnectionState::Connected {
            return Err(CoreError::NotConnected);
        }
        self.inner
            .active
            .read()
            .expect("active device lock poisoned")
            .as_ref()
            .map(|a| a.client.clone())
            .ok_or(CoreError::NotConnected)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Probe `candidates` for breakers. Never connects.
    ///
    /// `Idle | Failed -> Scanning -> Idle`, also when the future is dropped.
    pub async fn scan(&self, candidates: &CandidateSet) -> Result<ScanResult, CoreError> {
        let _op = self.begin(ConnectionState::Scanning)?;
        self.inner.set_state(ConnectionState::Scanning);
        let _reset = StateGuard::new(&self.inner, ConnectionState::Idle, false);

        info!(candidates = candidates.len(), "scanning for devices");
        discovery::scan(candidates, &self.inner.config.scan).await
    }

    /// Connect to `endpoint`, then pull configuration and push the clock.
    ///
    /// Disconnects first when already connected. A handshake failure
    /// leaves the manager `Failed` with no endpoint; sync step failures
    /// only mark the returned report as degraded.
    pub async fn connect(&self, endpoint: DeviceEndpoint) -> Result<SyncReport, CoreError> {
        self.connect_inner(endpoint, None).await
    }

    /// [`connect`](Self::connect) pushing a fixed clock instead of local time.
    pub async fn connect_at(
        &self,
        endpoint: DeviceEndpoint,
        clock: WallClock,
    ) -> Result<SyncReport, CoreError> {
        self.connect_inner(endpoint, Some(clock)).await
    }

    async fn connect_inner(
        &self,
        endpoint: DeviceEndpoint,
        clock: Option<WallClock>,
    ) -> Result<SyncReport, CoreError> {
        let _op = self.begin(ConnectionState::Connecting)?;
        let inner = &*self.inner;

        if self.state() == ConnectionState::Connected {
            info!(previous = ?self.endpoint(), "disconnecting before reconnect");
            inner.clear_session();
            inner.set_state(ConnectionState::Idle);
        }

        inner.set_state(ConnectionState::Connecting);
        let failed = StateGuard::new(inner, ConnectionState::Failed, true);

        let transport = TransportConfig {
            timeout: inner.config.timeout,
            ..TransportConfig::default()
        };
        let client = DeviceClient::for_host(endpoint.host, endpoint.port, &transport)?;
        inner.set_active(Some(ActiveDevice {
            endpoint,
            client: client.clone(),
        }));
        let session = SyncSession::new(endpoint, client);

        info!(%endpoint, "connecting");
        let device = match session.client().get_info().await {
            Ok(device) if is_supported_model(&device.model) => device,
            Ok(device) => {
                warn!(%endpoint, model = %device.model, "handshake answered by a foreign device");
                return Err(CoreError::UnsupportedDevice {
                    endpoint: endpoint.to_string(),
                    model: device.model,
                });
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "handshake failed");
                return Err(handshake_error(endpoint, e));
            }
        };
        debug!(model = %device.model, firmware = ?device.firmware, "handshake ok");

        let pull = sync::pull_configuration(session.client(), &inner.store).await;
        let clock = if inner.config.sync_clock {
            sync::push_clock(session.client(), clock.unwrap_or_else(WallClock::now)).await
        } else {
            StepOutcome::Skipped
        };

        let report = session.finish(device, pull, clock);
        failed.disarm();
        *inner.last_report.write().expect("report lock poisoned") = Some(report.clone());
        inner.set_state(ConnectionState::Connected);

        if report.partial_failure() {
            warn!(%endpoint, failures = ?report.failures(), "connected with partial sync failure");
        } else {
            info!(%endpoint, model = %report.device.model, "connected");
        }
        Ok(report)
    }

    /// Drop the connection and forget the endpoint. Idempotent.
    pub fn disconnect(&self) -> Result<(), CoreError> {
        let _op = self.begin(ConnectionState::Idle)?;
        let was = self.state();
        self.inner.clear_session();
        self.inner.set_state(ConnectionState::Idle);
        if was == ConnectionState::Connected {
            info!("disconnected");
        }
        Ok(())
    }

    /// Re-run configuration pull and clock push on the current connection.
    pub async fn resync(&self) -> Result<SyncReport, CoreError> {
        let _op = self.try_op()?;
        let client = self.client()?;
        let previous = self.last_report().ok_or(CoreError::NotConnected)?;

        let session = SyncSession::new(previous.endpoint, client);
        let pull = sync::pull_configuration(session.client(), &self.inner.store).await;
        let clock = if self.inner.config.sync_clock {
            sync::push_clock(session.client(), WallClock::now()).await
        } else {
            StepOutcome::Skipped
        };

        let report = session.finish(previous.device, pull, clock);
        *self.inner.last_report.write().expect("report lock poisoned") = Some(report.clone());
        info!(degraded = report.partial_failure(), "resync complete");
        Ok(report)
    }

    // ── Device operations ────────────────────────────────────────

    /// Fetch one reading from the connected device.
    pub async fn read_current(&self) -> Result<Reading, CoreError> {
        let client = self.client()?;
        let wire = client.get_reading().await?;
        Ok(Reading::from_wire(wire, Utc::now()))
    }

    pub async fn set_relay(&self, on: bool) -> Result<(), CoreError> {
        let client = self.client()?;
        client.set_relay(on).await?;
        info!(on, "relay switched");
        Ok(())
    }

    /// Validate, push to the device, then adopt locally.
    pub async fn push_thresholds(&self, thresholds: Thresholds) -> Result<(), CoreError> {
        thresholds.validate()?;
        let client = self.client()?;
        client.update_settings(&thresholds.to_wire()).await?;
        self.inner.store.set_thresholds(thresholds);
        info!("thresholds pushed to device");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────

    fn try_op(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.inner.op_lock.try_lock().map_err(|_| CoreError::Busy {
            state: self.state(),
        })
    }

    /// Take the operation lock and check that `target` is reachable.
    fn begin(&self, target: ConnectionState) -> Result<MutexGuard<'_, ()>, CoreError> {
        let guard = self.inner.op_lock.try_lock().map_err(|_| {
            let from = self.state();
            if from.is_busy() && target.is_busy() {
                CoreError::InvalidTransition { from, to: target }
            } else {
                CoreError::Busy { state: from }
            }
        })?;

        let from = self.state();
        let allowed = match target {
            // Disconnect is always accepted once no operation is running.
            ConnectionState::Idle => true,
            // Reconnect goes through Idle first.
            ConnectionState::Connecting if from == ConnectionState::Connected => true,
            _ => from.can_transition_to(target),
        };
        if !allowed {
            return Err(CoreError::InvalidTransition { from, to: target });
        }
        Ok(guard)
    }
}

fn handshake_error(endpoint: DeviceEndpoint, err: smartcb_api::Error) -> CoreError {
    match err {
        smartcb_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
        other => CoreError::ConnectionFailed {
            url: endpoint.base_url(),
            reason: other.to_string(),
        },
    }
}
