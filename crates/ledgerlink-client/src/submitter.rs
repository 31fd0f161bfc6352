//! Building, signing, and submitting escrow-store state transitions.
//!
//! Each operation encodes a call with canonical arguments, fetches the
//! account's pending sequencing token, applies the fee policy, signs,
//! and submits to the connected node. Rejections whose text matches
//! the known sequencing-collision patterns are reclassified as
//! [`ClientError::SequenceConflict`] so the retry coordinator can
//! absorb them; everything else surfaces verbatim.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledgerlink_core::{codec, Transfer};

use crate::error::ClientError;
use crate::node::NodeHandle;
use crate::signer::RequestSigner;

/// Node rejection texts that indicate a transaction-ordering collision
/// rather than a genuine rejection.
pub const SEQUENCE_CONFLICT_PATTERNS: [&str; 2] =
    ["replacement transaction underpriced", "known transaction"];

/// Fee/limit policy applied to every submission.
///
/// The reference policy is zero fee price with a fixed upper resource
/// limit; callers may override both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Price per resource unit.
    pub price: u64,
    /// Upper resource limit for a single submission.
    pub limit: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            price: 0,
            limit: 1_000_000,
        }
    }
}

/// An encoded call against the escrow store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowCall {
    CreateTransfer {
        money_id: String,
        amount: u64,
        condition_hex: String,
        ledger_id: String,
        expires_at: u64,
        ilp_hex: String,
        direction: u8,
    },
    FulfillTransfer {
        ledger_id: String,
        fulfillment_hex: String,
    },
    AbortTransfer {
        ledger_id: String,
    },
}

/// A fully built, signed request ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    /// Submitting account address.
    pub sender: String,
    /// Escrow-store contract address.
    pub contract: String,
    /// Per-account sequencing token claimed by this request.
    pub sequence: u64,
    pub fee_price: u64,
    pub fee_limit: u64,
    /// Optional private-transaction routing tag.
    pub routing_tag: Option<String>,
    /// Encoded call payload.
    pub payload: Vec<u8>,
    /// Ed25519 signature over [`SignedRequest::signing_payload`].
    pub signature: Vec<u8>,
}

impl SignedRequest {
    /// The canonical byte string covered by the signature.
    pub fn signing_payload(
        sender: &str,
        contract: &str,
        sequence: u64,
        fee_price: u64,
        fee_limit: u64,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(sender.len() + contract.len() + 24 + payload.len());
        out.extend_from_slice(sender.as_bytes());
        out.extend_from_slice(contract.as_bytes());
        out.extend_from_slice(&sequence.to_be_bytes());
        out.extend_from_slice(&fee_price.to_be_bytes());
        out.extend_from_slice(&fee_limit.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }
}

/// Reclassify a node rejection: the two known sequencing-collision
/// texts become [`ClientError::SequenceConflict`].
pub fn classify_rejection(err: ClientError) -> ClientError {
    match err {
        ClientError::SubmissionRejected(reason)
            if SEQUENCE_CONFLICT_PATTERNS
                .iter()
                .any(|p| reason.contains(p)) =>
        {
            ClientError::SequenceConflict(reason)
        }
        other => other,
    }
}

/// Builds, signs, and submits escrow-store state transitions on
/// behalf of a single account.
pub struct TxSubmitter {
    account: String,
    contract: String,
    signer: RequestSigner,
    fee: FeePolicy,
    routing_tag: Option<String>,
}

impl TxSubmitter {
    pub fn new(
        account: String,
        contract: String,
        signer: RequestSigner,
        fee: FeePolicy,
        routing_tag: Option<String>,
    ) -> Self {
        Self {
            account,
            contract,
            signer,
            fee,
            routing_tag,
        }
    }

    /// The submitting account address.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Submit a create-transfer call for a prepared [`Transfer`].
    pub async fn create_transfer(
        &self,
        node: &dyn NodeHandle,
        transfer: &Transfer,
    ) -> Result<String, ClientError> {
        let call = EscrowCall::CreateTransfer {
            money_id: transfer.money_id.clone(),
            amount: transfer.amount,
            condition_hex: canonical_to_hex("condition", &transfer.execution_condition)?,
            ledger_id: codec::to_ledger_id(&transfer.id.to_string())?,
            expires_at: transfer
                .expires_at
                .map(|t| t.timestamp() as u64)
                .unwrap_or(0),
            ilp_hex: canonical_to_hex("ilp", &transfer.ilp)?,
            direction: transfer.value_direction.code(),
        };
        self.sign_and_submit(node, call).await
    }

    /// Submit a fulfill-transfer call with proof bytes in canonical
    /// (url-safe base64) encoding.
    pub async fn fulfill_transfer(
        &self,
        node: &dyn NodeHandle,
        id: &Uuid,
        fulfillment: &str,
    ) -> Result<String, ClientError> {
        let call = EscrowCall::FulfillTransfer {
            ledger_id: codec::to_ledger_id(&id.to_string())?,
            fulfillment_hex: canonical_to_hex("fulfillment", fulfillment)?,
        };
        self.sign_and_submit(node, call).await
    }

    /// Submit an abort-transfer call.
    pub async fn abort_transfer(
        &self,
        node: &dyn NodeHandle,
        id: &Uuid,
    ) -> Result<String, ClientError> {
        let call = EscrowCall::AbortTransfer {
            ledger_id: codec::to_ledger_id(&id.to_string())?,
        };
        self.sign_and_submit(node, call).await
    }

    async fn sign_and_submit(
        &self,
        node: &dyn NodeHandle,
        call: EscrowCall,
    ) -> Result<String, ClientError> {
        let payload = serde_json::to_vec(&call)?;
        let sequence = node.pending_sequence(&self.account).await?;
        let signature = self.signer.sign(&SignedRequest::signing_payload(
            &self.account,
            &self.contract,
            sequence,
            self.fee.price,
            self.fee.limit,
            &payload,
        ));
        let request = SignedRequest {
            sender: self.account.clone(),
            contract: self.contract.clone(),
            sequence,
            fee_price: self.fee.price,
            fee_limit: self.fee.limit,
            routing_tag: self.routing_tag.clone(),
            payload,
            signature,
        };

        match node.submit(&request).await {
            Ok(tx_ref) => {
                tracing::info!(%tx_ref, sequence, "submission accepted");
                Ok(tx_ref)
            }
            Err(err) => Err(classify_rejection(err)),
        }
    }
}

/// Decode a canonical url-safe-base64 field back to ledger-native hex.
fn canonical_to_hex(field: &'static str, value: &str) -> Result<String, ClientError> {
    if value.is_empty() {
        return Ok(String::new());
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| ClientError::InvalidEncoding {
            field,
            reason: e.to_string(),
        })?;
    Ok(format!("0x{}", hex::encode(bytes)))
}
