//! Client-layer error types.

use ledgerlink_core::CoreError;

/// Errors that can occur while talking to the ledger node.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No store handle is currently bound.
    #[error("not connected to a ledger node")]
    NotConnected,

    /// Socket/transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node rejected a submission. The raw rejection text is
    /// carried verbatim; this class is never retried.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// A transient transaction-ordering collision. The only error
    /// class that is locally absorbed and retried.
    #[error("sequence conflict: {0}")]
    SequenceConflict(String),

    /// Notification subscription failure.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// Request encoding failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A canonical base64 field failed to decode.
    #[error("invalid encoding in {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    /// The configured signing key is unusable.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// Error from the core layer.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
