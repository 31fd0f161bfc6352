//! Notification-to-lifecycle-event routing.
//!
//! The router consumes the escrow store's notification stream, resolves
//! each notification to a full [`Transfer`] through a fresh store read,
//! determines the adapter account's relationship to the transfer, and
//! emits the corresponding [`PluginEvent`]. Resolution failures during
//! notification handling are logged and skipped: store state is
//! authoritative and should not be unavailable once a notification has
//! fired, so a failure here is a defect to surface in logs, not a
//! reason to kill the stream.

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use ledgerlink_core::{codec, projection, RelativeDirection, Transfer, TransferState};
use ledgerlink_client::{NodeHandle, Notification};

use crate::error::PluginError;
use crate::events::PluginEvent;

/// Routes store notifications to plugin listeners.
pub struct EventRouter {
    account: String,
    prefix: String,
    outgoing_addresses: Vec<String>,
    incoming_addresses: Vec<String>,
    event_tx: broadcast::Sender<PluginEvent>,
}

impl EventRouter {
    pub fn new(
        account: String,
        prefix: String,
        outgoing_addresses: Vec<String>,
        incoming_addresses: Vec<String>,
        event_tx: broadcast::Sender<PluginEvent>,
    ) -> Self {
        Self {
            account,
            prefix,
            outgoing_addresses,
            incoming_addresses,
            event_tx,
        }
    }

    /// Consume notifications until the stream closes (the handle was
    /// dropped on disconnect). Spawned once per bound connection.
    pub async fn run(
        self: Arc<Self>,
        node: Arc<dyn NodeHandle>,
        mut rx: broadcast::Receiver<Notification>,
    ) {
        loop {
            match rx.recv().await {
                Ok(notification) => {
                    if let Err(err) = self.handle_notification(node.as_ref(), notification).await
                    {
                        tracing::error!(error = %err, "notification handling failed");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("notification stream closed");
                    break;
                }
            }
        }
    }

    /// Handle a single notification.
    pub async fn handle_notification(
        &self,
        node: &dyn NodeHandle,
        notification: Notification,
    ) -> Result<(), PluginError> {
        match notification {
            Notification::Deposit { ledger_id, amount } => {
                tracing::debug!(%ledger_id, amount, "deposit notification");
                Ok(())
            }
            Notification::Withdraw { ledger_id, amount } => {
                tracing::debug!(%ledger_id, amount, "withdraw notification");
                Ok(())
            }
            Notification::Fulfill {
                ledger_id,
                fulfillment_hex,
            } => {
                let fulfillment =
                    projection::hex_to_canonical("fulfillment", &fulfillment_hex)?;
                match self.resolve(node, &ledger_id).await? {
                    Some(transfer) => {
                        self.dispatch(transfer, Some(fulfillment));
                        Ok(())
                    }
                    None => {
                        tracing::warn!(%ledger_id, "fulfill notification for unknown transfer");
                        Ok(())
                    }
                }
            }
            Notification::Update { ledger_id } => match self.resolve(node, &ledger_id).await? {
                Some(transfer) => {
                    self.dispatch(transfer, None);
                    Ok(())
                }
                None => {
                    tracing::warn!(%ledger_id, "update notification for unknown transfer");
                    Ok(())
                }
            },
        }
    }

    /// Resolve a ledger id to a full [`Transfer`] via fresh store
    /// reads. Returns `None` for the zero-address sentinel.
    pub async fn resolve(
        &self,
        node: &dyn NodeHandle,
        ledger_id: &str,
    ) -> Result<Option<Transfer>, PluginError> {
        let record = node.get_transfer(ledger_id).await?;
        if projection::is_zero_address(&record.from) {
            return Ok(None);
        }
        let money_id = node.get_money_id(ledger_id).await?;
        let ilp_hex = node.get_ilp_packet(ledger_id).await?;
        Ok(projection::project(ledger_id, &record, &money_id, &ilp_hex)?)
    }

    /// Re-run resolve + dispatch for a transfer whose prepare event a
    /// caller missed. Allow-list membership counts as a directional
    /// match here, not only exact self-account match. Returns whether
    /// a directional match was found and an event emitted.
    pub async fn force_emit_prepare(
        &self,
        node: &dyn NodeHandle,
        id: &Uuid,
    ) -> Result<bool, PluginError> {
        let ledger_id = codec::to_ledger_id(&id.to_string())?;
        let mut transfer = match self.resolve(node, &ledger_id).await? {
            Some(t) => t,
            None => return Err(PluginError::TransferNotFound(*id)),
        };

        let direction = self.relative_direction(&transfer, true);
        if direction.is_none() {
            return Ok(false);
        }
        transfer.ledger = Some(self.prefix.clone());
        transfer.direction = direction;
        let _ = self.event_tx.send(PluginEvent::Prepare {
            direction,
            transfer,
        });
        Ok(true)
    }

    /// Re-emit a fulfill event with caller-supplied proof and payload
    /// bytes (canonical encoding). No deduplication: calling this
    /// twice for the same transfer emits twice. Returns whether a
    /// directional match was found and an event emitted.
    pub async fn force_emit_fulfill(
        &self,
        node: &dyn NodeHandle,
        id: &Uuid,
        fulfillment: &str,
        ilp: &str,
    ) -> Result<bool, PluginError> {
        let ledger_id = codec::to_ledger_id(&id.to_string())?;
        let mut transfer = match self.resolve(node, &ledger_id).await? {
            Some(t) => t,
            None => return Err(PluginError::TransferNotFound(*id)),
        };

        let direction = self.relative_direction(&transfer, false);
        if direction.is_none() {
            return Ok(false);
        }
        transfer.ledger = Some(self.prefix.clone());
        transfer.direction = direction;
        let _ = self.event_tx.send(PluginEvent::Fulfill {
            direction,
            transfer,
            fulfillment: fulfillment.to_string(),
            ilp: ilp.to_string(),
        });
        Ok(true)
    }

    /// The adapter account's relationship to a transfer.
    fn relative_direction(
        &self,
        transfer: &Transfer,
        with_allow_lists: bool,
    ) -> Option<RelativeDirection> {
        if transfer.from == self.account
            || (with_allow_lists && self.outgoing_addresses.contains(&transfer.from))
        {
            Some(RelativeDirection::Outgoing)
        } else if transfer.to == self.account
            || (with_allow_lists && self.incoming_addresses.contains(&transfer.to))
        {
            Some(RelativeDirection::Incoming)
        } else {
            None
        }
    }

    /// Emit the lifecycle event for a resolved transfer. Directed
    /// transfers get the adapter prefix stamped; third-party transfers
    /// are still surfaced, with no directional semantics attached.
    fn dispatch(&self, mut transfer: Transfer, fulfillment: Option<String>) {
        let direction = self.relative_direction(&transfer, false);
        if direction.is_some() {
            transfer.ledger = Some(self.prefix.clone());
        }
        transfer.direction = direction;

        let state = match transfer.state {
            Some(state) => state,
            None => {
                tracing::warn!(id = %transfer.id, "dispatch skipped: transfer has no state");
                return;
            }
        };

        tracing::info!(
            id = %transfer.id,
            %state,
            direction = direction.map(|d| d.to_string()).unwrap_or_else(|| "none".into()),
            "dispatching lifecycle event"
        );

        let ilp = transfer.ilp.clone();
        let event = match state {
            TransferState::Prepare => PluginEvent::Prepare {
                direction,
                transfer,
            },
            TransferState::Fulfill => PluginEvent::Fulfill {
                direction,
                transfer,
                fulfillment: fulfillment.unwrap_or_default(),
                ilp,
            },
            TransferState::Abort => PluginEvent::Abort {
                direction,
                transfer,
            },
        };
        let _ = self.event_tx.send(event);
    }
}
