//! Fund-distribution ledger.
//!
//! An owner maintains a roster of peers. Anyone may deposit an amount to be
//! split evenly across all peers or a chosen subset; each peer accrues a
//! balance and withdraws it on demand (pull payment).
//!
//! - [`PeerRegistry`] keeps the ordered set of active peers with 1-based
//!   back-pointer indices and O(1) swap-and-pop removal.
//! - [`split`] stages an even split with checked arithmetic before anything is written.
//! - [`Splitter`] is the service type: access control, split, claim and
//!   all-or-nothing rollback around outbound value transfers.

pub mod config;
pub mod error;
pub mod event;
pub mod peer;
pub mod registry;
pub mod snapshot;
pub mod split;
pub mod splitter;
pub mod transfer;

pub use config::{SplitterConfig, DEFAULT_MAX_PEERS};
pub use error::LedgerError;
pub use event::LedgerEvent;
pub use peer::PeerRecord;
pub use registry::PeerRegistry;
pub use snapshot::LedgerSnapshot;
pub use split::{SplitPlan, SplitReceipt};
pub use splitter::Splitter;
pub use transfer::{TransferRejected, ValueTransfer};
