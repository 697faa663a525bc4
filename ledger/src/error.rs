use splitter_types::{Address, Amount};
use thiserror::Error;

use crate::transfer::TransferRejected;

/// Every way a ledger operation can fail.
///
/// A failed operation leaves registry order, indices and balances exactly as
/// they were before the call. Some display strings are kept verbatim for
/// callers that match on them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Only owner allowed!")]
    Unauthorized,

    #[error("peer {0} is already active")]
    AlreadyActive(Address),

    #[error("Peer not part of contract")]
    NotAPeer,

    #[error("no peers to split between")]
    NoPeers,

    #[error("Balance overflow!")]
    BalanceOverflow,

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferRejected),

    #[error("peer registry full (capacity {capacity})")]
    RegistryFull { capacity: usize },

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("invalid config: {0}")]
    Config(String),
}
