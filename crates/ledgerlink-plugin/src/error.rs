use ledgerlink_core::CoreError;
use ledgerlink_client::ClientError;

/// Plugin-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no escrow record for transfer {0}")]
    TransferNotFound(uuid::Uuid),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_wraps() {
        let err: PluginError = ClientError::NotConnected.into();
        assert_eq!(err.to_string(), "client error: not connected to a ledger node");
    }

    #[test]
    fn test_core_error_wraps() {
        let err: PluginError = CoreError::MalformedIdentifier("x".into()).into();
        assert!(err.to_string().contains("malformed transfer identifier"));
    }
}
