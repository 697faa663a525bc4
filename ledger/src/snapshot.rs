//! Ledger snapshots: the registry and every balance at a point in time.
//!
//! A snapshot can be persisted and later restored into a fresh [`Splitter`].
//! Records are stored sorted by identity so the hash is deterministic, and
//! restoring re-checks both the hash and the index invariant.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use splitter_types::Address;

use crate::error::LedgerError;
use crate::peer::PeerRecord;
use crate::registry::PeerRegistry;
use crate::splitter::Splitter;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A serializable image of a [`Splitter`]'s state. The event log is not included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Blake2b-256 of the remaining fields.
    pub hash: [u8; 32],
    pub version: u32,
    pub owner: Address,
    pub capacity: Option<usize>,
    /// Active peers in positional order.
    pub peers: Vec<Address>,
    /// Every record ever created, sorted by identity.
    pub records: Vec<(Address, PeerRecord)>,
}

impl LedgerSnapshot {
    fn compute_hash(&self) -> [u8; 32] {
        use blake2::digest::consts::U32;
        use blake2::{Blake2b, Digest};

        let mut hasher = Blake2b::<U32>::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.owner.as_bytes());
        match self.capacity {
            Some(capacity) => {
                hasher.update([1u8]);
                hasher.update((capacity as u64).to_le_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update((self.peers.len() as u64).to_le_bytes());
        for peer in &self.peers {
            hasher.update(peer.as_bytes());
        }
        hasher.update((self.records.len() as u64).to_le_bytes());
        for (peer, record) in &self.records {
            hasher.update(peer.as_bytes());
            hasher.update(record.balance.raw().to_le_bytes());
            hasher.update(record.index.to_le_bytes());
        }

        let result = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    }

    /// Whether the stored hash matches the contents.
    pub fn verify(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Serialize the snapshot to bytes (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::CorruptSnapshot(e.to_string()))
    }

    /// Deserialize a snapshot from bytes. Does not verify it; see [`Splitter::restore`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::CorruptSnapshot(e.to_string()))
    }
}

impl Splitter {
    /// Capture the current registry and balances.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let registry = self.registry();
        let mut records: Vec<(Address, PeerRecord)> =
            registry.records().map(|(peer, record)| (*peer, *record)).collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));

        let mut snapshot = LedgerSnapshot {
            hash: [0u8; 32],
            version: SNAPSHOT_VERSION,
            owner: self.owner(),
            capacity: registry.capacity(),
            peers: registry.peers().to_vec(),
            records,
        };
        snapshot.hash = snapshot.compute_hash();
        snapshot
    }

    /// Rebuild a ledger from a snapshot, rejecting tampered or inconsistent input.
    pub fn restore(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LedgerError::CorruptSnapshot(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }
        if !snapshot.verify() {
            return Err(LedgerError::CorruptSnapshot("hash mismatch".into()));
        }
        if snapshot.capacity == Some(0) {
            return Err(LedgerError::CorruptSnapshot("zero capacity".into()));
        }
        let count = snapshot.records.len();
        let records: HashMap<Address, PeerRecord> = snapshot.records.into_iter().collect();
        if records.len() != count {
            return Err(LedgerError::CorruptSnapshot("duplicate record".into()));
        }
        let registry = PeerRegistry::from_parts(snapshot.peers, records, snapshot.capacity)?;
        tracing::debug!(peers = registry.len(), "ledger restored from snapshot");
        Ok(Splitter::from_parts(snapshot.owner, registry))
    }
}
