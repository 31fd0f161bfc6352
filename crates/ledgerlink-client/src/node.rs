//! Trait seams to the ledger node.
//!
//! The adapter never speaks the node's wire protocol directly: it
//! dials endpoints through a [`NodeConnector`] and performs all reads,
//! submissions, and subscriptions through the returned [`NodeHandle`].
//! This keeps the signing/encoding transport swappable and lets tests
//! run against the in-memory ledger in [`crate::testing`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use ledgerlink_core::{DigitalMoney, RawEscrowRecord, TransferState, ValueDirection};

use crate::error::ClientError;
use crate::submitter::SignedRequest;

/// A notification delivered by the escrow store.
///
/// `Deposit` and `Withdraw` are diagnostic only; `Fulfill` and
/// `Update` drive lifecycle-event dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Value entered escrow for a transfer.
    Deposit { ledger_id: String, amount: u64 },
    /// Value left escrow for a transfer.
    Withdraw { ledger_id: String, amount: u64 },
    /// A transfer's condition was satisfied. Carries the proof bytes
    /// in ledger-native hex encoding.
    Fulfill {
        ledger_id: String,
        fulfillment_hex: String,
    },
    /// Generic state-change signal (prepare, abort, and anything the
    /// other channels don't cover explicitly).
    Update { ledger_id: String },
}

impl Notification {
    /// The ledger id this notification refers to.
    pub fn ledger_id(&self) -> &str {
        match self {
            Self::Deposit { ledger_id, .. }
            | Self::Withdraw { ledger_id, .. }
            | Self::Fulfill { ledger_id, .. }
            | Self::Update { ledger_id } => ledger_id,
        }
    }
}

/// A live, bound link to a ledger node and its escrow store.
#[async_trait]
pub trait NodeHandle: Send + Sync {
    /// Lightweight liveness query used by the health probe. Also
    /// serves as a keep-alive against idle-link termination.
    async fn liveness(&self) -> Result<(), ClientError>;

    /// Read the raw escrow record for a ledger id.
    async fn get_transfer(&self, ledger_id: &str) -> Result<RawEscrowRecord, ClientError>;

    /// Read the denomination id associated with a transfer.
    async fn get_money_id(&self, ledger_id: &str) -> Result<String, ClientError>;

    /// Read the transport payload (ledger-native hex) for a transfer.
    async fn get_ilp_packet(&self, ledger_id: &str) -> Result<String, ClientError>;

    /// List ledger ids matching an address, state, and direction.
    async fn get_requests(
        &self,
        address: &str,
        state: TransferState,
        direction: ValueDirection,
    ) -> Result<Vec<String>, ClientError>;

    /// Read denomination metadata.
    async fn get_money(&self, money_id: &str) -> Result<DigitalMoney, ClientError>;

    /// The account's current pending sequencing token.
    async fn pending_sequence(&self, account: &str) -> Result<u64, ClientError>;

    /// Submit a signed request; resolves on acceptance (not finality)
    /// with the node's transaction reference.
    async fn submit(&self, request: &SignedRequest) -> Result<String, ClientError>;

    /// Subscribe to the store's notification stream.
    fn notifications(&self) -> broadcast::Receiver<Notification>;

    /// Close the underlying link. Idempotent.
    async fn close(&self);
}

/// Dials a configured endpoint and returns a bound [`NodeHandle`].
#[async_trait]
pub trait NodeConnector: Send + Sync {
    async fn dial(&self, endpoint: &str) -> Result<Arc<dyn NodeHandle>, ClientError>;
}
