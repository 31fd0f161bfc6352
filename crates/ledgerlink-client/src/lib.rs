//! Ledgerlink client layer
//!
//! Owns all ledger I/O for the adapter: the trait seams to the node
//! ([`NodeConnector`] / [`NodeHandle`]), the failover-capable
//! [`ConnectionManager`], signed request submission via
//! [`TxSubmitter`], and the sequencing-conflict retry coordinator.
//!
//! The wire transport behind the trait seams is deliberately outside
//! this crate's scope; [`testing`] provides an in-memory ledger used
//! by unit and integration tests.

pub mod connection;
pub mod error;
pub mod node;
pub mod retry;
pub mod signer;
pub mod submitter;
pub mod testing;

pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use error::ClientError;
pub use node::{NodeConnector, NodeHandle, Notification};
pub use retry::{with_sequence_retry, RetryPolicy};
pub use signer::RequestSigner;
pub use submitter::{EscrowCall, FeePolicy, SignedRequest, TxSubmitter};
