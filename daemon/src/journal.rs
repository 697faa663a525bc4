//! Payout journal, the daemon's value-transfer host.

use serde::Serialize;
use splitter_ledger::{Splitter, TransferRejected, ValueTransfer};
use splitter_types::{Address, Amount};

/// One outbound payment made by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub to: Address,
    pub amount: Amount,
}

/// Accepts every outbound transfer and keeps a record of it.
///
/// Recipients listed in `refusing` reject their payouts, which lets a script
/// exercise the rollback paths.
#[derive(Debug, Default)]
pub struct PaymentJournal {
    payouts: Vec<Payout>,
    refusing: Vec<Address>,
}

impl PaymentJournal {
    pub fn new(refusing: Vec<Address>) -> Self {
        Self {
            payouts: Vec::new(),
            refusing,
        }
    }

    pub fn payouts(&self) -> &[Payout] {
        &self.payouts
    }
}

impl ValueTransfer for PaymentJournal {
    fn transfer(
        &mut self,
        _ledger: &mut Splitter,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferRejected> {
        if self.refusing.contains(&to) {
            tracing::info!(%to, %amount, "payout refused by recipient");
            return Err(TransferRejected::new(to, amount, "recipient refuses payments"));
        }
        tracing::info!(%to, %amount, "payout");
        self.payouts.push(Payout { to, amount });
        Ok(())
    }
}
