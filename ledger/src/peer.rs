//! Per-identity ledger record.

use serde::{Deserialize, Serialize};
use splitter_types::Amount;

/// Balance and registry position of one identity.
///
/// `index` is 1-based; 0 means "not currently an active peer". A record is
/// created the first time an identity is added and is never deleted, so a
/// removed peer keeps its balance and can still claim it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    /// Withdrawable balance. Only the split/claim paths write this.
    pub balance: Amount,
    /// 1-based position in the active sequence, or 0. Only the registry writes this.
    pub index: u64,
}

impl PeerRecord {
    /// The record reported for identities that were never added.
    pub const EMPTY: Self = Self {
        balance: Amount::ZERO,
        index: 0,
    };

    pub fn is_active(&self) -> bool {
        self.index != 0
    }
}
