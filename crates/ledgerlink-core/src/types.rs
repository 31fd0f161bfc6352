use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CoreError;

/// Lifecycle state of a transfer as recorded by the escrow store.
///
/// Transitions are one-way: `Prepare` → `Fulfill` or `Prepare` →
/// `Abort`. A terminal state is never overwritten by a later
/// notification for the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferState {
    /// Value is escrowed, awaiting fulfillment or expiry.
    Prepare,
    /// The execution condition was satisfied and value released.
    Fulfill,
    /// The transfer was rejected or expired and value returned.
    Abort,
}

impl TransferState {
    /// Map the escrow store's numeric state code.
    pub fn from_code(code: u8) -> Result<Self, CoreError> {
        match code {
            0 => Ok(Self::Prepare),
            1 => Ok(Self::Fulfill),
            2 => Ok(Self::Abort),
            _ => Err(CoreError::ProtocolMismatch {
                field: "state",
                code,
            }),
        }
    }

    /// The ledger-native numeric code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Prepare => 0,
            Self::Fulfill => 1,
            Self::Abort => 2,
        }
    }

    /// Whether this state is terminal (fulfill or abort).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Prepare)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Fulfill => write!(f, "fulfill"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Which side of a transfer initiated value movement on the ledger.
///
/// Distinct from [`RelativeDirection`], which is computed relative to
/// the adapter's own account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueDirection {
    Deposit,
    Withdraw,
}

impl ValueDirection {
    /// Map the escrow store's numeric direction code.
    pub fn from_code(code: u8) -> Result<Self, CoreError> {
        match code {
            0 => Ok(Self::Deposit),
            1 => Ok(Self::Withdraw),
            _ => Err(CoreError::ProtocolMismatch {
                field: "direction",
                code,
            }),
        }
    }

    /// The ledger-native numeric code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Deposit => 0,
            Self::Withdraw => 1,
        }
    }
}

impl fmt::Display for ValueDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// The adapter-local relationship of a transfer to the configured
/// account: `Outgoing` when we are the sender, `Incoming` when we are
/// the receiver. Absent for third-party transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelativeDirection {
    Incoming,
    Outgoing,
}

impl fmt::Display for RelativeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incoming => write!(f, "incoming"),
            Self::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// The canonical unit of value-movement state.
///
/// A `Transfer` is a stateless projection of an escrow-store record;
/// the adapter never holds an authoritative copy. Every notification
/// triggers a fresh read against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Opaque 128-bit identifier; canonical string form is the UUID.
    pub id: Uuid,
    /// Sender ledger account address.
    pub from: String,
    /// Receiver ledger account address.
    pub to: String,
    /// The adapter's address prefix, stamped at dispatch when the
    /// transfer is directional relative to the adapter account.
    pub ledger: Option<String>,
    /// Non-negative amount in ledger-native denomination units.
    pub amount: u64,
    /// Opaque transport payload, url-safe base64 without padding.
    pub ilp: String,
    /// Opaque execution condition, url-safe base64 without padding.
    pub execution_condition: String,
    /// Absolute expiry, second resolution.
    pub expires_at: Option<DateTime<Utc>>,
    /// Denomination/asset identifier for this transfer.
    pub money_id: String,
    /// Which side initiated value movement.
    pub value_direction: ValueDirection,
    /// Escrow-store lifecycle state. `None` only in the legacy
    /// all-empty shape produced by [`Transfer::empty`].
    pub state: Option<TransferState>,
    /// Adapter-local direction, set at dispatch time.
    pub direction: Option<RelativeDirection>,
}

impl Transfer {
    /// The legacy "not found" shape: all fields empty or zero.
    ///
    /// Kept for callers that depended on the magic empty record during
    /// the migration to `Option<Transfer>` results.
    pub fn empty() -> Self {
        Self {
            id: Uuid::nil(),
            from: String::new(),
            to: String::new(),
            ledger: None,
            amount: 0,
            ilp: String::new(),
            execution_condition: String::new(),
            expires_at: None,
            money_id: String::new(),
            value_direction: ValueDirection::Deposit,
            state: None,
            direction: None,
        }
    }
}

/// Metadata for a denomination/asset held by the escrow store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalMoney {
    /// Denomination identifier, e.g. "JPY-1".
    pub id: String,
    /// Display symbol, e.g. "JPY".
    pub symbol: String,
    /// Issuing account address.
    pub issuer: String,
    /// Total supply in ledger-native units.
    pub total_supply: u64,
}

/// Static adapter/ledger description returned to the routing agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    /// Adapter address prefix.
    pub prefix: String,
    /// Currency code of the ledger's denomination.
    pub currency_code: String,
    /// Decimal scale of the denomination.
    pub currency_scale: u32,
    /// Known connector addresses on this ledger.
    pub connectors: Vec<String>,
}
