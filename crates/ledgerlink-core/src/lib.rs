//! Ledgerlink core layer
//!
//! Pure types and functions shared by the client and plugin crates:
//! the canonical [`Transfer`] entity, the ledger-identifier codec, and
//! the projection from raw on-ledger escrow records into `Transfer`s.
//! No I/O lives here.

pub mod codec;
pub mod error;
pub mod projection;
pub mod types;

pub use codec::{to_canonical, to_ledger_id, LEDGER_ID_MARKER};
pub use error::CoreError;
pub use projection::{is_zero_address, project, RawEscrowRecord, ZERO_ADDRESS};
pub use types::{
    DigitalMoney, LedgerInfo, RelativeDirection, Transfer, TransferState, ValueDirection,
};
