//! The public adapter surface.
//!
//! [`LedgerPlugin`] wires the connection manager, transaction
//! submitter, retry coordinator, and event router together behind the
//! operation set a payment-routing agent consumes. Whether the plugin
//! owns its connection lifecycle or binds an externally supplied node
//! handle is decided at construction and never changes afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use uuid::Uuid;

use ledgerlink_core::{codec, DigitalMoney, LedgerInfo, Transfer, TransferState, ValueDirection};
use ledgerlink_client::{
    with_sequence_retry, ConnectionEvent, ConnectionManager, FeePolicy, NodeConnector,
    NodeHandle, RequestSigner, RetryPolicy, TxSubmitter,
};

use crate::config::PluginConfig;
use crate::error::PluginError;
use crate::events::PluginEvent;
use crate::router::EventRouter;

/// Bridge adapter between an escrow-ledger and a payment-routing
/// agent.
pub struct LedgerPlugin {
    config: PluginConfig,
    conn: Arc<ConnectionManager>,
    submitter: TxSubmitter,
    retry: RetryPolicy,
    router: Arc<EventRouter>,
    event_tx: broadcast::Sender<PluginEvent>,
    forwarder_started: AtomicBool,
}

impl LedgerPlugin {
    /// Plugin that owns its connection lifecycle, dialing through
    /// `connector` with health-probe failover between the configured
    /// endpoints.
    pub fn new(
        config: PluginConfig,
        connector: Arc<dyn NodeConnector>,
    ) -> Result<Self, PluginError> {
        config.validate()?;
        let conn = Arc::new(ConnectionManager::new(
            connector,
            config.provider.clone(),
            config.secondary_provider.clone(),
            Duration::from_millis(config.probe_interval_ms),
        ));
        Self::build(config, conn)
    }

    /// Plugin bound to an externally supplied node handle. No dialing,
    /// no health probing.
    pub fn with_external_node(
        config: PluginConfig,
        handle: Arc<dyn NodeHandle>,
    ) -> Result<Self, PluginError> {
        config.validate()?;
        let conn = Arc::new(ConnectionManager::with_external(handle));
        Self::build(config, conn)
    }

    fn build(config: PluginConfig, conn: Arc<ConnectionManager>) -> Result<Self, PluginError> {
        let signer = RequestSigner::from_seed_hex(&config.secret_key)?;
        let submitter = TxSubmitter::new(
            config.account.clone(),
            config.contract_address.clone(),
            signer,
            FeePolicy {
                price: config.fee_price,
                limit: config.fee_limit,
            },
            config.routing_tag.clone(),
        );
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        let router = Arc::new(EventRouter::new(
            config.account.clone(),
            config.prefix.clone(),
            config.outgoing_addresses.clone(),
            config.incoming_addresses.clone(),
            event_tx.clone(),
        ));
        Ok(Self {
            retry: RetryPolicy {
                backoff: Duration::from_millis(config.retry_backoff_ms),
            },
            config,
            conn,
            submitter,
            router,
            event_tx,
            forwarder_started: AtomicBool::new(false),
        })
    }

    /// The adapter's own ledger account address.
    pub fn account(&self) -> &str {
        &self.config.account
    }

    /// Static ledger description for the routing agent.
    pub fn info(&self) -> LedgerInfo {
        LedgerInfo {
            prefix: self.config.prefix.clone(),
            currency_code: self.config.currency_code.clone(),
            currency_scale: self.config.currency_scale,
            connectors: self.config.connectors.clone(),
        }
    }

    /// Subscribe to lifecycle events. At-least-once delivery;
    /// consumers must be idempotent.
    pub fn subscribe(&self) -> broadcast::Receiver<PluginEvent> {
        self.event_tx.subscribe()
    }

    /// Establish the link and start event routing. Safe to call when
    /// already connected.
    pub async fn connect(&self) -> Result<(), PluginError> {
        self.start_forwarder();
        self.conn.connect().await?;
        self.conn.start_health_probe();
        Ok(())
    }

    /// Close the link and notify listeners.
    pub async fn disconnect(&self) {
        self.conn.disconnect().await;
    }

    /// True iff a store handle is currently bound.
    pub async fn is_connected(&self) -> bool {
        self.conn.is_connected().await
    }

    /// Read and project the escrow record for a transfer id.
    /// `Ok(None)` when the store has no record.
    pub async fn get_transfer(&self, id: &Uuid) -> Result<Option<Transfer>, PluginError> {
        let handle = self.conn.handle().await?;
        let ledger_id = codec::to_ledger_id(&id.to_string())?;
        self.router.resolve(handle.as_ref(), &ledger_id).await
    }

    /// List transfer ids matching an address, state, and direction.
    pub async fn get_requests(
        &self,
        address: &str,
        state: TransferState,
        direction: ValueDirection,
    ) -> Result<Vec<Uuid>, PluginError> {
        let handle = self.conn.handle().await?;
        let ledger_ids = handle.get_requests(address, state, direction).await?;
        let mut ids = Vec::with_capacity(ledger_ids.len());
        for ledger_id in ledger_ids {
            let canonical = codec::to_canonical(&ledger_id)?;
            ids.push(
                Uuid::parse_str(&canonical)
                    .map_err(|_| ledgerlink_core::CoreError::MalformedIdentifier(canonical))?,
            );
        }
        Ok(ids)
    }

    /// Read denomination metadata from the store.
    pub async fn get_digital_money(&self, money_id: &str) -> Result<DigitalMoney, PluginError> {
        let handle = self.conn.handle().await?;
        Ok(handle.get_money(money_id).await?)
    }

    /// Submit a create-transfer, absorbing sequencing conflicts until
    /// the store accepts it. Returns the node's transaction reference.
    pub async fn send_transfer(&self, transfer: &Transfer) -> Result<String, PluginError> {
        let handle = self.conn.handle().await?;
        let tx_ref = with_sequence_retry(&self.retry, || {
            self.submitter.create_transfer(handle.as_ref(), transfer)
        })
        .await?;
        Ok(tx_ref)
    }

    /// Submit a fulfill-transfer with canonical proof bytes, then
    /// immediately re-emit the fulfill event so listeners don't wait
    /// for the notification round trip (which will re-deliver;
    /// consumers are idempotent by contract).
    pub async fn fulfill_condition(
        &self,
        id: &Uuid,
        fulfillment: &str,
        ilp: &str,
    ) -> Result<String, PluginError> {
        let handle = self.conn.handle().await?;
        let tx_ref = with_sequence_retry(&self.retry, || {
            self.submitter.fulfill_transfer(handle.as_ref(), id, fulfillment)
        })
        .await?;

        if let Err(err) = self
            .router
            .force_emit_fulfill(handle.as_ref(), id, fulfillment, ilp)
            .await
        {
            tracing::warn!(%id, error = %err, "post-fulfill re-emission failed");
        }
        Ok(tx_ref)
    }

    /// Submit an abort-transfer for an incoming transfer, absorbing
    /// sequencing conflicts.
    pub async fn reject_incoming_transfer(&self, id: &Uuid) -> Result<String, PluginError> {
        let handle = self.conn.handle().await?;
        let tx_ref = with_sequence_retry(&self.retry, || {
            self.submitter.abort_transfer(handle.as_ref(), id)
        })
        .await?;
        Ok(tx_ref)
    }

    /// Re-emit the prepare event for a transfer (allow-list matches
    /// count as directional). Returns whether an event was emitted.
    pub async fn force_emit_prepare(&self, id: &Uuid) -> Result<bool, PluginError> {
        let handle = self.conn.handle().await?;
        self.router.force_emit_prepare(handle.as_ref(), id).await
    }

    /// Re-emit the fulfill event for a transfer with caller-supplied
    /// proof and payload. Returns whether an event was emitted.
    pub async fn force_emit_fulfill(
        &self,
        id: &Uuid,
        fulfillment: &str,
        ilp: &str,
    ) -> Result<bool, PluginError> {
        let handle = self.conn.handle().await?;
        self.router
            .force_emit_fulfill(handle.as_ref(), id, fulfillment, ilp)
            .await
    }

    /// Bridge link events to plugin events and (re)start the router
    /// loop on every bind. Started at most once per instance.
    fn start_forwarder(&self) {
        if self.forwarder_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let conn = Arc::clone(&self.conn);
        let router = Arc::clone(&self.router);
        let event_tx = self.event_tx.clone();
        let mut rx = self.conn.events();

        tokio::spawn(async move {
            let mut router_task: Option<tokio::task::JoinHandle<()>> = None;
            loop {
                match rx.recv().await {
                    Ok(ConnectionEvent::Up) => {
                        if let Some(task) = router_task.take() {
                            task.abort();
                        }
                        match conn.handle().await {
                            Ok(handle) => {
                                let notifications = handle.notifications();
                                router_task = Some(tokio::spawn(
                                    Arc::clone(&router).run(handle, notifications),
                                ));
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, "link up without bound handle");
                            }
                        }
                        let _ = event_tx.send(PluginEvent::Connect);
                    }
                    Ok(ConnectionEvent::Down) => {
                        if let Some(task) = router_task.take() {
                            task.abort();
                        }
                        let _ = event_tx.send(PluginEvent::Disconnect);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "link event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
