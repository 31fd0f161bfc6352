/// Core-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The identifier does not have the expected shape. Local
    /// validation failure, never retried.
    #[error("malformed transfer identifier: {0}")]
    MalformedIdentifier(String),

    /// The escrow store returned a numeric code outside the fixed
    /// lookup tables. Indicates contract/adapter version skew; fatal.
    #[error("protocol mismatch: unexpected {field} code {code}")]
    ProtocolMismatch { field: &'static str, code: u8 },

    /// A ledger timestamp could not be converted to an instant.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// A ledger-native hex field failed to decode.
    #[error("invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },
}
