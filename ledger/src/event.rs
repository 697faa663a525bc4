//! Events recorded by successful ledger operations.

use serde::{Deserialize, Serialize};
use splitter_types::{Address, Amount};

/// One entry in the ledger's event log.
///
/// Operations that fail are fully unwound and leave no event behind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    PeerAdded {
        peer: Address,
        index: u64,
    },
    PeerRemoved {
        peer: Address,
        position: u64,
    },
    Split {
        sender: Address,
        share: Amount,
        recipients: usize,
        remainder: Amount,
    },
    Claimed {
        peer: Address,
        amount: Amount,
    },
}
