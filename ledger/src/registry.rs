//! Peer registry: ordered active set with O(1) add, lookup and removal.
//!
//! The active set is a dense `Vec<Address>`; each identity's record carries a
//! back-pointer (`index`, 1-based) into it. Removal swaps the last peer into
//! the freed slot and rewrites that peer's back-pointer, so every operation is
//! O(1) and positions stay contiguous `1..=len`.
//!
//! While a mark is open, every record write first saves the previous record
//! to an undo log, so rolling back costs the records touched since the mark
//! plus one copy of the active list.

use std::collections::HashMap;

use splitter_types::{Address, Amount};

use crate::error::LedgerError;
use crate::peer::PeerRecord;

/// Registry of peers and their ledger records.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    /// Active peers in positional order (`peers[i]` has index `i + 1`).
    peers: Vec<Address>,
    /// Every identity ever added, active or not.
    records: HashMap<Address, PeerRecord>,
    /// Maximum number of simultaneously active peers, if bounded.
    capacity: Option<usize>,
    /// Previous record of every identity written while a mark is open.
    undo: Vec<(Address, Option<PeerRecord>)>,
    open_marks: usize,
}

/// Registry state at a point an operation may roll back to.
#[derive(Debug)]
pub(crate) struct RegistryMark {
    peers: Vec<Address>,
    undo_len: usize,
}

impl PeerRegistry {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            peers: Vec::new(),
            records: HashMap::new(),
            capacity,
            undo: Vec::new(),
            open_marks: 0,
        }
    }

    /// Append `peer` to the active set and return its 1-based index.
    ///
    /// A previously removed peer is re-activated with its balance intact.
    pub fn add(&mut self, peer: Address) -> Result<u64, LedgerError> {
        if self.is_active(&peer) {
            return Err(LedgerError::AlreadyActive(peer));
        }
        if let Some(capacity) = self.capacity {
            if self.peers.len() >= capacity {
                return Err(LedgerError::RegistryFull { capacity });
            }
        }
        self.save(&peer);
        self.peers.push(peer);
        let index = self.peers.len() as u64;
        self.records.entry(peer).or_default().index = index;
        Ok(index)
    }

    /// Remove the peer at 1-based `position` by swap-and-pop.
    ///
    /// The last active peer moves into the vacated slot. The removed peer's
    /// index becomes 0; its balance is left alone.
    pub fn remove_at(&mut self, position: u64) -> Result<Address, LedgerError> {
        let len = self.peers.len() as u64;
        if position == 0 || position > len {
            return Err(LedgerError::NotAPeer);
        }
        let slot = (position - 1) as usize;
        let removed = self.peers.swap_remove(slot);
        // swap_remove moved the former last element into `slot`, unless `slot` was last.
        if let Some(moved) = self.peers.get(slot).copied() {
            self.save(&moved);
            if let Some(record) = self.records.get_mut(&moved) {
                record.index = position;
            }
        }
        self.save(&removed);
        if let Some(record) = self.records.get_mut(&removed) {
            record.index = 0;
        }
        Ok(removed)
    }

    /// 1-based position of an active peer.
    pub fn position_of(&self, peer: &Address) -> Option<u64> {
        self.records
            .get(peer)
            .map(|r| r.index)
            .filter(|index| *index != 0)
    }

    /// Active peer at 1-based `position`.
    pub fn peer_at(&self, position: u64) -> Option<Address> {
        position
            .checked_sub(1)
            .and_then(|slot| self.peers.get(slot as usize))
            .copied()
    }

    pub fn is_active(&self, peer: &Address) -> bool {
        self.position_of(peer).is_some()
    }

    /// Whether `peer` was ever added (it may have been removed since).
    pub fn is_known(&self, peer: &Address) -> bool {
        self.records.contains_key(peer)
    }

    /// Record for `peer`; the zero record if it was never added.
    pub fn record(&self, peer: &Address) -> PeerRecord {
        self.records.get(peer).copied().unwrap_or(PeerRecord::EMPTY)
    }

    pub fn balance(&self, peer: &Address) -> Amount {
        self.record(peer).balance
    }

    /// Active peers in current positional order.
    pub fn peers(&self) -> &[Address] {
        &self.peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// All records, active and removed, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = (&Address, &PeerRecord)> {
        self.records.iter()
    }

    /// Sum of every balance owed (saturating).
    pub fn total_owed(&self) -> Amount {
        self.records.values().map(|r| r.balance).sum()
    }

    /// Overwrite the balance of a known identity.
    pub(crate) fn set_balance(&mut self, peer: &Address, balance: Amount) {
        self.save(peer);
        if let Some(record) = self.records.get_mut(peer) {
            record.balance = balance;
        }
    }

    /// Rebuild a registry from raw parts, rejecting inconsistent input.
    pub(crate) fn from_parts(
        peers: Vec<Address>,
        records: HashMap<Address, PeerRecord>,
        capacity: Option<usize>,
    ) -> Result<Self, LedgerError> {
        let registry = Self {
            peers,
            records,
            capacity,
            undo: Vec::new(),
            open_marks: 0,
        };
        registry
            .check_invariants()
            .map_err(LedgerError::CorruptSnapshot)?;
        Ok(registry)
    }

    /// Open a mark. Marks nest; each must be closed by exactly one
    /// [`commit`](Self::commit) or [`rollback`](Self::rollback).
    pub(crate) fn mark(&mut self) -> RegistryMark {
        self.open_marks += 1;
        RegistryMark {
            peers: self.peers.clone(),
            undo_len: self.undo.len(),
        }
    }

    /// Keep every change made since `mark`.
    pub(crate) fn commit(&mut self, _mark: RegistryMark) {
        self.close_mark();
    }

    /// Undo every change made since `mark`, newest first.
    pub(crate) fn rollback(&mut self, mark: RegistryMark) {
        while self.undo.len() > mark.undo_len {
            let Some((peer, previous)) = self.undo.pop() else {
                break;
            };
            match previous {
                Some(record) => {
                    self.records.insert(peer, record);
                }
                None => {
                    self.records.remove(&peer);
                }
            }
        }
        self.peers = mark.peers;
        self.close_mark();
    }

    fn close_mark(&mut self) {
        self.open_marks = self.open_marks.saturating_sub(1);
        if self.open_marks == 0 {
            self.undo.clear();
        }
    }

    fn save(&mut self, peer: &Address) {
        if self.open_marks > 0 {
            self.undo.push((*peer, self.records.get(peer).copied()));
        }
    }

    /// Verify the index invariant.
    ///
    /// Every active peer at slot `i` has `index == i + 1`, every active peer
    /// has a record, no identity appears twice, and every other record has
    /// index 0.
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(capacity) = self.capacity {
            if self.peers.len() > capacity {
                return Err(format!(
                    "{} active peers exceed capacity {capacity}",
                    self.peers.len()
                ));
            }
        }
        for (slot, peer) in self.peers.iter().enumerate() {
            let expected = slot as u64 + 1;
            match self.records.get(peer) {
                Some(record) if record.index == expected => {}
                Some(record) => {
                    return Err(format!(
                        "peer {peer} at position {expected} has index {}",
                        record.index
                    ))
                }
                None => return Err(format!("peer {peer} at position {expected} has no record")),
            }
        }
        let active = self.records.values().filter(|r| r.is_active()).count();
        if active != self.peers.len() {
            return Err(format!(
                "{active} records claim an index but {} peers are active",
                self.peers.len()
            ));
        }
        Ok(())
    }
}
