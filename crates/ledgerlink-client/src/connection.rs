//! Connection lifecycle and endpoint failover.
//!
//! One logical connection per adapter instance. The manager owns the
//! link to the ledger node, exposes connect/disconnect/is-connected,
//! and runs a periodic health probe that flips between the primary
//! and secondary endpoints when the link dies. A monotonically
//! increasing generation counter makes probe-driven reconnects that
//! complete after a manual disconnect stale, so they never resurrect
//! a connection the caller believed closed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};

use crate::error::ClientError;
use crate::node::{NodeConnector, NodeHandle};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    ConnectingPrimary,
    ConnectingSecondary,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::ConnectingPrimary => write!(f, "connecting-primary"),
            Self::ConnectingSecondary => write!(f, "connecting-secondary"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Link-level events emitted to the plugin layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A store handle was bound (initial connect or probe reconnect).
    Up,
    /// The link was closed (manual disconnect or probe-detected death).
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveEndpoint {
    Primary,
    Secondary,
}

struct Inner {
    state: ConnectionState,
    handle: Option<Arc<dyn NodeHandle>>,
    active: ActiveEndpoint,
    /// Bumped on every successful bind and every close. A reconnect
    /// attempt captures the generation at its start and discards its
    /// result if the counter moved underneath it.
    generation: u64,
}

/// Owns the live link to the ledger node.
pub struct ConnectionManager {
    connector: Option<Arc<dyn NodeConnector>>,
    primary: String,
    secondary: Option<String>,
    external: Option<Arc<dyn NodeHandle>>,
    probe_interval: Duration,
    probe_started: AtomicBool,
    inner: Mutex<Inner>,
    event_tx: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionManager {
    /// Manager that owns its connection lifecycle, dialing through
    /// `connector`.
    pub fn new(
        connector: Arc<dyn NodeConnector>,
        primary: String,
        secondary: Option<String>,
        probe_interval: Duration,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            connector: Some(connector),
            primary,
            secondary,
            external: None,
            probe_interval,
            probe_started: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                handle: None,
                active: ActiveEndpoint::Primary,
                generation: 0,
            }),
            event_tx,
        }
    }

    /// Manager bound to an externally supplied node handle. No dialing
    /// and no health probing happen in this mode; the choice is fixed
    /// for the lifetime of the instance.
    pub fn with_external(handle: Arc<dyn NodeHandle>) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            connector: None,
            primary: String::new(),
            secondary: None,
            external: Some(handle),
            probe_interval: Duration::ZERO,
            probe_started: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                handle: None,
                active: ActiveEndpoint::Primary,
                generation: 0,
            }),
            event_tx,
        }
    }

    /// Subscribe to link-level events.
    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    /// Establish the link. No-op when already connected. On failure
    /// the error propagates and the state remains `Disconnected`.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;

        if inner.handle.is_some() {
            return Ok(());
        }

        if let Some(external) = &self.external {
            inner.handle = Some(Arc::clone(external));
            inner.state = ConnectionState::Connected;
            inner.generation += 1;
            tracing::info!("bound externally supplied node handle");
            let _ = self.event_tx.send(ConnectionEvent::Up);
            return Ok(());
        }

        let endpoint = self.endpoint_for(inner.active).to_string();
        inner.state = match inner.active {
            ActiveEndpoint::Primary => ConnectionState::ConnectingPrimary,
            ActiveEndpoint::Secondary => ConnectionState::ConnectingSecondary,
        };

        // Hold the lock across the dial: a concurrent manual call
        // should observe either the old state or the final one.
        match self.connector().dial(&endpoint).await {
            Ok(handle) => {
                inner.handle = Some(handle);
                inner.state = ConnectionState::Connected;
                inner.generation += 1;
                tracing::info!(%endpoint, "connected to ledger node");
                let _ = self.event_tx.send(ConnectionEvent::Up);
                Ok(())
            }
            Err(err) => {
                inner.state = ConnectionState::Disconnected;
                tracing::warn!(%endpoint, error = %err, "connect failed");
                Err(err)
            }
        }
    }

    /// Close the link, clear the store handle, and emit a down event.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.handle.take() {
            handle.close().await;
        }
        inner.state = ConnectionState::Disconnected;
        inner.generation += 1;
        tracing::info!("disconnected from ledger node");
        let _ = self.event_tx.send(ConnectionEvent::Down);
    }

    /// True iff a store handle is currently bound.
    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.handle.is_some()
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// The currently bound handle, if any.
    pub async fn handle(&self) -> Result<Arc<dyn NodeHandle>, ClientError> {
        self.inner
            .lock()
            .await
            .handle
            .as_ref()
            .map(Arc::clone)
            .ok_or(ClientError::NotConnected)
    }

    /// The endpoint the next owned-mode dial will target.
    pub async fn active_endpoint(&self) -> String {
        let inner = self.inner.lock().await;
        self.endpoint_for(inner.active).to_string()
    }

    /// Start the periodic health probe. At most one probe task per
    /// manager instance; a no-op in external-handle mode.
    pub fn start_health_probe(self: &Arc<Self>) {
        if self.external.is_some() {
            return;
        }
        if self.probe_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mgr = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(mgr.probe_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately;
            // consume it so probing starts one interval from now.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                mgr.probe_once().await;
            }
        });
    }

    /// One probe iteration: keep-alive when connected, reconnect with
    /// endpoint flip when not.
    async fn probe_once(&self) {
        let (handle, generation) = {
            let inner = self.inner.lock().await;
            (inner.handle.as_ref().map(Arc::clone), inner.generation)
        };

        match handle {
            Some(handle) => {
                if let Err(err) = handle.liveness().await {
                    tracing::warn!(error = %err, "liveness check failed, failing over");
                    let flip_generation = {
                        let mut inner = self.inner.lock().await;
                        if inner.generation != generation {
                            // Manual connect/disconnect intervened.
                            return;
                        }
                        if let Some(dead) = inner.handle.take() {
                            dead.close().await;
                        }
                        inner.state = ConnectionState::Disconnected;
                        inner.active = self.flipped(inner.active);
                        inner.generation += 1;
                        let _ = self.event_tx.send(ConnectionEvent::Down);
                        inner.generation
                    };
                    self.reconnect(flip_generation).await;
                }
            }
            None => {
                let flip_generation = {
                    let mut inner = self.inner.lock().await;
                    if inner.generation != generation {
                        return;
                    }
                    inner.active = self.flipped(inner.active);
                    inner.generation
                };
                self.reconnect(flip_generation).await;
            }
        }
    }

    /// Dial the active endpoint and bind the result unless the
    /// generation moved (a manual action won the race).
    async fn reconnect(&self, expected_generation: u64) {
        let endpoint = self.active_endpoint().await;
        tracing::info!(%endpoint, "probe reconnect attempt");

        match self.connector().dial(&endpoint).await {
            Ok(handle) => {
                let mut inner = self.inner.lock().await;
                if inner.generation != expected_generation || inner.handle.is_some() {
                    tracing::debug!(%endpoint, "discarding stale reconnect");
                    drop(inner);
                    handle.close().await;
                    return;
                }
                inner.handle = Some(handle);
                inner.state = ConnectionState::Connected;
                inner.generation += 1;
                tracing::info!(%endpoint, "reconnected to ledger node");
                let _ = self.event_tx.send(ConnectionEvent::Up);
            }
            Err(err) => {
                tracing::warn!(%endpoint, error = %err, "probe reconnect failed");
            }
        }
    }

    fn connector(&self) -> &dyn NodeConnector {
        // Only reachable in owned mode; with_external never dials.
        self.connector
            .as_deref()
            .expect("connector present in owned-connection mode")
    }

    fn endpoint_for(&self, active: ActiveEndpoint) -> &str {
        match active {
            ActiveEndpoint::Primary => &self.primary,
            ActiveEndpoint::Secondary => self.secondary.as_deref().unwrap_or(&self.primary),
        }
    }

    fn flipped(&self, active: ActiveEndpoint) -> ActiveEndpoint {
        if self.secondary.is_none() {
            return ActiveEndpoint::Primary;
        }
        match active {
            ActiveEndpoint::Primary => ActiveEndpoint::Secondary,
            ActiveEndpoint::Secondary => ActiveEndpoint::Primary,
        }
    }
}
