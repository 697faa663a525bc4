//! Nullable value transfer. Records payouts without sending them.

use std::collections::HashSet;

use splitter_ledger::{Splitter, TransferRejected, ValueTransfer};
use splitter_types::{Address, Amount};

/// A transfer host that records payouts instead of sending them.
#[derive(Debug, Default)]
pub struct NullTransfer {
    /// Every accepted payout, in order.
    payments: Vec<(Address, Amount)>,
    /// Recipients whose payouts are refused.
    rejecting: HashSet<Address>,
    /// Refuse every payout.
    reject_all: bool,
}

impl NullTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse all future payouts to `recipient`.
    pub fn reject(&mut self, recipient: Address) {
        self.rejecting.insert(recipient);
    }

    /// Accept payouts to `recipient` again.
    pub fn accept(&mut self, recipient: &Address) {
        self.rejecting.remove(recipient);
    }

    /// Refuse (or stop refusing) every payout.
    pub fn set_reject_all(&mut self, reject_all: bool) {
        self.reject_all = reject_all;
    }

    /// All accepted payouts (for assertions).
    pub fn payments(&self) -> &[(Address, Amount)] {
        &self.payments
    }

    /// Total paid to `recipient` across all payouts.
    pub fn paid_to(&self, recipient: &Address) -> Amount {
        self.payments
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, amount)| *amount)
            .sum()
    }

    /// Total paid to anyone.
    pub fn total_paid(&self) -> Amount {
        self.payments.iter().map(|(_, amount)| *amount).sum()
    }

    /// Clear all recorded payouts.
    pub fn reset(&mut self) {
        self.payments.clear();
    }
}

impl ValueTransfer for NullTransfer {
    fn transfer(
        &mut self,
        _ledger: &mut Splitter,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferRejected> {
        if self.reject_all || self.rejecting.contains(&to) {
            return Err(TransferRejected::new(to, amount, "recipient refused payment"));
        }
        self.payments.push((to, amount));
        Ok(())
    }
}
