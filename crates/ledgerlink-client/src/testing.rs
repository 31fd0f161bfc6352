//! In-memory ledger node for tests.
//!
//! Implements the [`NodeConnector`]/[`NodeHandle`] seams against a
//! shared in-memory escrow store with scripted rejections, endpoint
//! kill switches, and manual notification injection. Used by the unit
//! tests in this crate and by the plugin and integration test suites.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::broadcast;

use ledgerlink_core::{
    DigitalMoney, RawEscrowRecord, TransferState, ValueDirection, ZERO_ADDRESS,
};

use crate::error::ClientError;
use crate::node::{NodeConnector, NodeHandle, Notification};
use crate::submitter::{EscrowCall, SignedRequest};

/// One stored escrow entry.
#[derive(Debug, Clone)]
struct StoredTransfer {
    record: RawEscrowRecord,
    money_id: String,
    ilp_hex: String,
}

/// Shared in-memory ledger state behind every [`MemoryHandle`].
pub struct MemoryLedger {
    transfers: DashMap<String, StoredTransfer>,
    monies: DashMap<String, DigitalMoney>,
    sequence: AtomicU64,
    live: AtomicBool,
    counterparty: Mutex<String>,
    dead_endpoints: DashSet<String>,
    dials: Mutex<Vec<String>>,
    rejections: Mutex<VecDeque<String>>,
    submissions: Mutex<Vec<SignedRequest>>,
    notif_tx: broadcast::Sender<Notification>,
}

impl MemoryLedger {
    pub fn new() -> Arc<Self> {
        let (notif_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            transfers: DashMap::new(),
            monies: DashMap::new(),
            sequence: AtomicU64::new(0),
            live: AtomicBool::new(true),
            counterparty: Mutex::new("0x00000000000000000000000000000000000000cb".into()),
            dead_endpoints: DashSet::new(),
            dials: Mutex::new(Vec::new()),
            rejections: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            notif_tx,
        })
    }

    /// A handle bound directly to this ledger, bypassing dialing.
    pub fn handle(self: &Arc<Self>, endpoint: &str) -> Arc<dyn NodeHandle> {
        Arc::new(MemoryHandle {
            ledger: Arc::clone(self),
            endpoint: endpoint.to_string(),
        })
    }

    /// Toggle liveness-query results for every bound handle.
    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    /// Make dials to `endpoint` fail with a transport error.
    pub fn kill_endpoint(&self, endpoint: &str) {
        self.dead_endpoints.insert(endpoint.to_string());
    }

    /// Allow dials to `endpoint` again.
    pub fn revive_endpoint(&self, endpoint: &str) {
        self.dead_endpoints.remove(endpoint);
    }

    /// The receiver address stamped onto created transfers.
    pub fn set_counterparty(&self, address: &str) {
        *self.counterparty.lock().unwrap() = address.to_string();
    }

    /// Queue a rejection text for the next submission.
    pub fn push_rejection(&self, reason: &str) {
        self.rejections.lock().unwrap().push_back(reason.to_string());
    }

    /// Seed a raw escrow entry directly, bypassing submission.
    pub fn seed_transfer(
        &self,
        ledger_id: &str,
        record: RawEscrowRecord,
        money_id: &str,
        ilp_hex: &str,
    ) {
        self.transfers.insert(
            ledger_id.to_string(),
            StoredTransfer {
                record,
                money_id: money_id.to_string(),
                ilp_hex: ilp_hex.to_string(),
            },
        );
    }

    /// Seed denomination metadata.
    pub fn seed_money(&self, money: DigitalMoney) {
        self.monies.insert(money.id.clone(), money);
    }

    pub fn dial_count(&self) -> usize {
        self.dials.lock().unwrap().len()
    }

    pub fn dialed_endpoints(&self) -> Vec<String> {
        self.dials.lock().unwrap().clone()
    }

    /// All accepted or rejected submissions, in order.
    pub fn submissions(&self) -> Vec<SignedRequest> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    /// Inject a generic state-change notification.
    pub fn emit_update(&self, ledger_id: &str) {
        let _ = self.notif_tx.send(Notification::Update {
            ledger_id: ledger_id.to_string(),
        });
    }

    /// Inject a fulfill notification with ledger-native proof bytes.
    pub fn emit_fulfill(&self, ledger_id: &str, fulfillment_hex: &str) {
        let _ = self.notif_tx.send(Notification::Fulfill {
            ledger_id: ledger_id.to_string(),
            fulfillment_hex: fulfillment_hex.to_string(),
        });
    }

    pub fn emit_deposit(&self, ledger_id: &str, amount: u64) {
        let _ = self.notif_tx.send(Notification::Deposit {
            ledger_id: ledger_id.to_string(),
            amount,
        });
    }

    pub fn emit_withdraw(&self, ledger_id: &str, amount: u64) {
        let _ = self.notif_tx.send(Notification::Withdraw {
            ledger_id: ledger_id.to_string(),
            amount,
        });
    }

    /// Apply an accepted call to the store. Terminal states are never
    /// overwritten, matching the escrow contract's behavior.
    fn apply(&self, sender: &str, call: EscrowCall) {
        match call {
            EscrowCall::CreateTransfer {
                money_id,
                amount,
                condition_hex,
                ledger_id,
                expires_at,
                ilp_hex,
                direction,
            } => {
                let to = self.counterparty.lock().unwrap().clone();
                self.transfers.entry(ledger_id).or_insert(StoredTransfer {
                    record: RawEscrowRecord {
                        from: sender.to_string(),
                        to,
                        amount,
                        condition_hex,
                        expires_at,
                        state_code: TransferState::Prepare.code(),
                        direction_code: direction,
                    },
                    money_id,
                    ilp_hex,
                });
            }
            EscrowCall::FulfillTransfer { ledger_id, .. } => {
                self.transition(&ledger_id, TransferState::Fulfill);
            }
            EscrowCall::AbortTransfer { ledger_id } => {
                self.transition(&ledger_id, TransferState::Abort);
            }
        }
    }

    fn transition(&self, ledger_id: &str, next: TransferState) {
        if let Some(mut entry) = self.transfers.get_mut(ledger_id) {
            let current = TransferState::from_code(entry.record.state_code).ok();
            if matches!(current, Some(s) if !s.is_terminal()) {
                entry.record.state_code = next.code();
            }
        }
    }
}

/// Connector over a shared [`MemoryLedger`].
pub struct MemoryConnector {
    ledger: Arc<MemoryLedger>,
}

impl MemoryConnector {
    pub fn new(ledger: Arc<MemoryLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl NodeConnector for MemoryConnector {
    async fn dial(&self, endpoint: &str) -> Result<Arc<dyn NodeHandle>, ClientError> {
        if self.ledger.dead_endpoints.contains(endpoint) {
            return Err(ClientError::Transport(format!(
                "connection refused: {endpoint}"
            )));
        }
        self.ledger.dials.lock().unwrap().push(endpoint.to_string());
        Ok(self.ledger.handle(endpoint))
    }
}

/// Handle bound to a [`MemoryLedger`].
pub struct MemoryHandle {
    ledger: Arc<MemoryLedger>,
    endpoint: String,
}

impl MemoryHandle {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NodeHandle for MemoryHandle {
    async fn liveness(&self) -> Result<(), ClientError> {
        if self.ledger.live.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Transport("liveness query timed out".into()))
        }
    }

    async fn get_transfer(&self, ledger_id: &str) -> Result<RawEscrowRecord, ClientError> {
        Ok(self
            .ledger
            .transfers
            .get(ledger_id)
            .map(|e| e.record.clone())
            .unwrap_or_else(|| RawEscrowRecord {
                from: ZERO_ADDRESS.to_string(),
                to: ZERO_ADDRESS.to_string(),
                amount: 0,
                condition_hex: String::new(),
                expires_at: 0,
                state_code: 0,
                direction_code: 0,
            }))
    }

    async fn get_money_id(&self, ledger_id: &str) -> Result<String, ClientError> {
        Ok(self
            .ledger
            .transfers
            .get(ledger_id)
            .map(|e| e.money_id.clone())
            .unwrap_or_default())
    }

    async fn get_ilp_packet(&self, ledger_id: &str) -> Result<String, ClientError> {
        Ok(self
            .ledger
            .transfers
            .get(ledger_id)
            .map(|e| e.ilp_hex.clone())
            .unwrap_or_default())
    }

    async fn get_requests(
        &self,
        address: &str,
        state: TransferState,
        direction: ValueDirection,
    ) -> Result<Vec<String>, ClientError> {
        Ok(self
            .ledger
            .transfers
            .iter()
            .filter(|e| {
                (e.record.from == address || e.record.to == address)
                    && e.record.state_code == state.code()
                    && e.record.direction_code == direction.code()
            })
            .map(|e| e.key().clone())
            .collect())
    }

    async fn get_money(&self, money_id: &str) -> Result<DigitalMoney, ClientError> {
        self.ledger
            .monies
            .get(money_id)
            .map(|e| e.clone())
            .ok_or_else(|| ClientError::Transport(format!("unknown money id: {money_id}")))
    }

    async fn pending_sequence(&self, _account: &str) -> Result<u64, ClientError> {
        Ok(self.ledger.sequence.load(Ordering::SeqCst))
    }

    async fn submit(&self, request: &SignedRequest) -> Result<String, ClientError> {
        self.ledger.submissions.lock().unwrap().push(request.clone());

        if let Some(reason) = self.ledger.rejections.lock().unwrap().pop_front() {
            return Err(ClientError::SubmissionRejected(reason));
        }

        let call: EscrowCall = serde_json::from_slice(&request.payload)?;
        self.ledger.apply(&request.sender, call);
        let seq = self.ledger.sequence.fetch_add(1, Ordering::SeqCst);
        Ok(format!("0xtx{seq:08x}"))
    }

    fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.ledger.notif_tx.subscribe()
    }

    async fn close(&self) {}
}
