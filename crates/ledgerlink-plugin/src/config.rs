use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Configuration for a [`crate::LedgerPlugin`] instance.
///
/// Consumed at construction; none of these fields may change after
/// `connect()` has been called once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Primary ledger-node endpoint.
    pub provider: String,
    /// Optional secondary endpoint for health-probe failover.
    pub secondary_provider: Option<String>,
    /// The adapter's own ledger account address.
    pub account: String,
    /// Hex-encoded 32-byte signing-key seed.
    pub secret_key: String,
    /// Escrow-store contract address.
    pub contract_address: String,
    /// Optional escrow-store interface schema handed to the connector.
    pub contract_schema: Option<String>,
    /// Address prefix stamped onto directional transfers.
    pub prefix: String,
    /// Currency code reported by `info()`.
    pub currency_code: String,
    /// Currency scale reported by `info()`.
    #[serde(default)]
    pub currency_scale: u32,
    /// Known connector addresses reported by `info()`.
    #[serde(default)]
    pub connectors: Vec<String>,
    /// Optional private-transaction routing tag.
    pub routing_tag: Option<String>,
    /// Addresses treated as outgoing matches by forced re-emission.
    #[serde(default)]
    pub outgoing_addresses: Vec<String>,
    /// Addresses treated as incoming matches by forced re-emission.
    #[serde(default)]
    pub incoming_addresses: Vec<String>,
    /// Health-probe interval in milliseconds.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Sequencing-conflict retry backoff in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Fee price per resource unit.
    #[serde(default)]
    pub fee_price: u64,
    /// Upper resource limit per submission.
    #[serde(default = "default_fee_limit")]
    pub fee_limit: u64,
    /// Capacity of the lifecycle-event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_fee_limit() -> u64 {
    1_000_000
}

fn default_event_capacity() -> usize {
    256
}

impl PluginConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, PluginError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| PluginError::Config(e.to_string()))
    }

    /// Validate fields that must be present and well-formed.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.provider.is_empty() {
            return Err(PluginError::Config("provider must not be empty".into()));
        }
        if self.account.is_empty() {
            return Err(PluginError::Config("account must not be empty".into()));
        }
        if self.contract_address.is_empty() {
            return Err(PluginError::Config(
                "contract_address must not be empty".into(),
            ));
        }
        if self.prefix.is_empty() {
            return Err(PluginError::Config("prefix must not be empty".into()));
        }
        Ok(())
    }
}
