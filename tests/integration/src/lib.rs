//! Shared fixtures for the ledgerlink integration tests.

use std::sync::Arc;

use uuid::Uuid;

use ledgerlink_client::testing::{MemoryConnector, MemoryLedger};
use ledgerlink_core::{Transfer, TransferState, ValueDirection};
use ledgerlink_plugin::{LedgerPlugin, PluginConfig};

pub const SELF_ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";
pub const COUNTERPARTY: &str = "0x00000000000000000000000000000000000000cb";
pub const CONTRACT: &str = "0x00000000000000000000000000000000000000ee";
pub const PRIMARY: &str = "ws://primary:8546";
pub const SECONDARY: &str = "ws://secondary:8546";
pub const PREFIX: &str = "example.jpy.";

/// A config wired for the in-memory ledger, with fast probe and retry
/// intervals so paused-clock tests stay quick.
pub fn test_config() -> PluginConfig {
    PluginConfig {
        provider: PRIMARY.into(),
        secondary_provider: Some(SECONDARY.into()),
        account: SELF_ACCOUNT.into(),
        secret_key: "42".repeat(32),
        contract_address: CONTRACT.into(),
        contract_schema: None,
        prefix: PREFIX.into(),
        currency_code: "JPY".into(),
        currency_scale: 0,
        connectors: vec![],
        routing_tag: None,
        outgoing_addresses: vec![],
        incoming_addresses: vec![],
        probe_interval_ms: 100,
        retry_backoff_ms: 1,
        fee_price: 0,
        fee_limit: 1_000_000,
        event_channel_capacity: 64,
    }
}

/// A plugin over a fresh in-memory ledger.
pub fn plugin_with_ledger() -> (LedgerPlugin, Arc<MemoryLedger>) {
    let ledger = MemoryLedger::new();
    let plugin = LedgerPlugin::new(
        test_config(),
        Arc::new(MemoryConnector::new(Arc::clone(&ledger))),
    )
    .expect("plugin construction");
    (plugin, ledger)
}

/// A prepared outgoing transfer from the adapter account.
pub fn prepared_transfer(id: Uuid, amount: u64, money_id: &str) -> Transfer {
    Transfer {
        id,
        from: SELF_ACCOUNT.into(),
        to: String::new(),
        ledger: None,
        amount,
        ilp: "AQI".into(),
        execution_condition: "3q2-7w".into(),
        expires_at: None,
        money_id: money_id.into(),
        value_direction: ValueDirection::Deposit,
        state: Some(TransferState::Prepare),
        direction: None,
    }
}
