//! Typed transfer-lifecycle events emitted to plugin listeners.
//!
//! A closed tagged-variant type replaces the dynamically named events
//! of older adapters: the "undirected" vs "directed" distinction is an
//! `Option<RelativeDirection>` field rather than part of an event
//! name. Delivery is at-least-once over a tokio broadcast channel;
//! consumers are expected to be idempotent.

use ledgerlink_core::{RelativeDirection, Transfer};

/// Lifecycle events emitted by the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    /// The link to the ledger node came up.
    Connect,
    /// The link to the ledger node was closed.
    Disconnect,
    /// A transfer is escrowed. `direction` is `None` for third-party
    /// transfers surfaced for observability.
    Prepare {
        direction: Option<RelativeDirection>,
        transfer: Transfer,
    },
    /// A transfer's condition was satisfied. Carries the proof bytes
    /// and the transfer's transport payload, both in canonical
    /// url-safe-base64 encoding.
    Fulfill {
        direction: Option<RelativeDirection>,
        transfer: Transfer,
        fulfillment: String,
        ilp: String,
    },
    /// A transfer was rejected or expired.
    Abort {
        direction: Option<RelativeDirection>,
        transfer: Transfer,
    },
}

impl PluginEvent {
    /// The transfer this event refers to, if any.
    pub fn transfer(&self) -> Option<&Transfer> {
        match self {
            Self::Prepare { transfer, .. }
            | Self::Fulfill { transfer, .. }
            | Self::Abort { transfer, .. } => Some(transfer),
            Self::Connect | Self::Disconnect => None,
        }
    }

    /// The adapter-local direction attached to this event, if any.
    pub fn direction(&self) -> Option<RelativeDirection> {
        match self {
            Self::Prepare { direction, .. }
            | Self::Fulfill { direction, .. }
            | Self::Abort { direction, .. } => *direction,
            Self::Connect | Self::Disconnect => None,
        }
    }
}
