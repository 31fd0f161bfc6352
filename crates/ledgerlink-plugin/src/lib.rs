//! Ledgerlink plugin layer
//!
//! The public face of the adapter: [`LedgerPlugin`] projects an
//! escrow-ledger into a stream of typed transfer-lifecycle events and
//! submits signed state changes on behalf of a single account, so a
//! payment-routing agent can treat the ledger as an interchangeable
//! backend behind a uniform prepare → fulfill/abort interface.

pub mod config;
pub mod error;
pub mod events;
pub mod plugin;
pub mod router;

pub use config::PluginConfig;
pub use error::PluginError;
pub use events::PluginEvent;
pub use plugin::LedgerPlugin;
pub use router::EventRouter;
