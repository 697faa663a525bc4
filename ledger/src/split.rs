//! Even-split planning.
//!
//! A split is computed in full before the ledger is touched: target
//! resolution, the floor share, the remainder and every resulting balance
//! (each checked against overflow). Only a plan that succeeded end to end is
//! ever committed, so a failing split credits nobody.

use std::collections::HashMap;

use serde::Serialize;
use splitter_types::{Address, Amount};

use crate::error::LedgerError;
use crate::registry::PeerRegistry;

/// A fully validated split, ready to commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitPlan {
    /// Resolved targets, one entry per credit (duplicates credit twice).
    pub targets: Vec<Address>,
    /// `floor(amount / targets.len())`.
    pub share: Amount,
    /// `share * targets.len()`.
    pub distributed: Amount,
    /// `amount - distributed`, returned to the depositor.
    pub remainder: Amount,
    /// Post-split balance of every credited identity.
    pub balances: Vec<(Address, Amount)>,
}

/// Outcome of a committed split, returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitReceipt {
    pub share: Amount,
    pub recipients: usize,
    pub remainder: Amount,
}

impl SplitPlan {
    pub fn receipt(&self) -> SplitReceipt {
        SplitReceipt {
            share: self.share,
            recipients: self.targets.len(),
            remainder: self.remainder,
        }
    }
}

/// Plan a split of `amount` across `selected`, or across every active peer
/// when `selected` is empty.
///
/// Fails with `NotAPeer` if a named identity is not active, `NoPeers` if no
/// target remains, and `BalanceOverflow` if any credited balance would exceed
/// the representable range.
pub fn plan(
    registry: &PeerRegistry,
    selected: &[Address],
    amount: Amount,
) -> Result<SplitPlan, LedgerError> {
    let targets: Vec<Address> = if selected.is_empty() {
        registry.peers().to_vec()
    } else {
        if selected.iter().any(|peer| !registry.is_active(peer)) {
            return Err(LedgerError::NotAPeer);
        }
        selected.to_vec()
    };

    let (share, remainder) = amount
        .split_even(targets.len() as u128)
        .ok_or(LedgerError::NoPeers)?;
    let distributed = share
        .checked_mul(targets.len() as u128)
        .ok_or(LedgerError::BalanceOverflow)?;

    let mut staged: HashMap<Address, Amount> = HashMap::with_capacity(targets.len());
    let mut order = Vec::with_capacity(targets.len());
    for peer in &targets {
        let current = match staged.get(peer) {
            Some(balance) => *balance,
            None => {
                order.push(*peer);
                registry.balance(peer)
            }
        };
        let credited = current
            .checked_add(share)
            .ok_or(LedgerError::BalanceOverflow)?;
        staged.insert(*peer, credited);
    }

    let balances = order
        .into_iter()
        .map(|peer| (peer, staged[&peer]))
        .collect();

    Ok(SplitPlan {
        targets,
        share,
        distributed,
        remainder,
        balances,
    })
}
