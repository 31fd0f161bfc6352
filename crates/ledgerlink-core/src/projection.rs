//! Projection of raw on-ledger escrow records into the canonical
//! [`Transfer`] entity.
//!
//! The escrow store is the single source of truth; the functions here
//! are pure and are re-run against a fresh record on every
//! notification.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;

use crate::codec;
use crate::error::CoreError;
use crate::types::{Transfer, TransferState, ValueDirection};

/// The ledger's zero-address sentinel. A record whose `from` field
/// equals it means the store has no entry for the queried id.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Check whether an address is the zero-address sentinel, tolerating
/// a missing marker prefix.
pub fn is_zero_address(addr: &str) -> bool {
    let body = addr.strip_prefix("0x").unwrap_or(addr);
    !body.is_empty() && body.bytes().all(|b| b == b'0')
}

/// A raw escrow record exactly as the store returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEscrowRecord {
    /// Sender account address.
    pub from: String,
    /// Receiver account address.
    pub to: String,
    /// Amount in ledger-native units.
    pub amount: u64,
    /// Execution condition, ledger-native hex encoding.
    pub condition_hex: String,
    /// Expiry as integer seconds since the UNIX epoch.
    pub expires_at: u64,
    /// Numeric state code: 0 prepare, 1 fulfill, 2 abort.
    pub state_code: u8,
    /// Numeric direction code: 0 deposit, 1 withdraw.
    pub direction_code: u8,
}

/// Re-encode a ledger-native hex field into the adapter's canonical
/// byte-text encoding (url-safe base64 without padding).
pub fn hex_to_canonical(field: &'static str, value: &str) -> Result<String, CoreError> {
    if value.is_empty() {
        return Ok(String::new());
    }
    let body = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(body).map_err(|e| CoreError::InvalidHex {
        field,
        reason: e.to_string(),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Project a raw escrow record into a canonical [`Transfer`].
///
/// Returns `Ok(None)` when the record carries the zero-address
/// sentinel in `from` (no entry for this id). An out-of-range state or
/// direction code is a [`CoreError::ProtocolMismatch`].
pub fn project(
    ledger_id: &str,
    record: &RawEscrowRecord,
    money_id: &str,
    ilp_hex: &str,
) -> Result<Option<Transfer>, CoreError> {
    if is_zero_address(&record.from) {
        return Ok(None);
    }

    let canonical = codec::to_canonical(ledger_id)?;
    let id = uuid::Uuid::parse_str(&canonical)
        .map_err(|_| CoreError::MalformedIdentifier(canonical))?;

    let expires_at = if record.expires_at == 0 {
        None
    } else {
        Some(
            DateTime::from_timestamp(record.expires_at as i64, 0)
                .ok_or(CoreError::InvalidTimestamp(record.expires_at as i64))?,
        )
    };

    Ok(Some(Transfer {
        id,
        from: record.from.clone(),
        to: record.to.clone(),
        ledger: None,
        amount: record.amount,
        ilp: hex_to_canonical("ilp", ilp_hex)?,
        execution_condition: hex_to_canonical("condition", &record.condition_hex)?,
        expires_at,
        money_id: money_id.to_string(),
        value_direction: ValueDirection::from_code(record.direction_code)?,
        state: Some(TransferState::from_code(record.state_code)?),
        direction: None,
    }))
}
