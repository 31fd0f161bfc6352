//! Conversion between canonical transfer identifiers (UUID strings)
//! and the fixed-width ledger-native encoding used for escrow lookups
//! and event correlation.

use uuid::Uuid;

use crate::error::CoreError;

/// Fixed marker prefixing every ledger-native identifier.
pub const LEDGER_ID_MARKER: &str = "0x";

/// Length of the hex body of a ledger id (128 bits, no separators).
const LEDGER_ID_HEX_LEN: usize = 32;

/// Encode a canonical UUID string as a ledger id.
///
/// Strips the UUID separators and prefixes [`LEDGER_ID_MARKER`].
pub fn to_ledger_id(uuid: &str) -> Result<String, CoreError> {
    let parsed = Uuid::parse_str(uuid)
        .map_err(|_| CoreError::MalformedIdentifier(uuid.to_string()))?;
    Ok(format!("{}{}", LEDGER_ID_MARKER, parsed.simple()))
}

/// Decode a ledger id back to the canonical hyphenated UUID string.
pub fn to_canonical(ledger_id: &str) -> Result<String, CoreError> {
    let body = ledger_id
        .strip_prefix(LEDGER_ID_MARKER)
        .ok_or_else(|| CoreError::MalformedIdentifier(ledger_id.to_string()))?;
    if body.len() != LEDGER_ID_HEX_LEN {
        return Err(CoreError::MalformedIdentifier(ledger_id.to_string()));
    }
    let parsed = Uuid::parse_str(body)
        .map_err(|_| CoreError::MalformedIdentifier(ledger_id.to_string()))?;
    Ok(parsed.hyphenated().to_string())
}
