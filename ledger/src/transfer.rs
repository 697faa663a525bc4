//! Outbound value transfer, supplied by the host environment.

use splitter_types::{Address, Amount};
use thiserror::Error;

use crate::splitter::Splitter;

/// The recipient (or the host on its behalf) refused an outbound payment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transfer of {amount} to {to} rejected: {reason}")]
pub struct TransferRejected {
    pub to: Address,
    pub amount: Amount,
    pub reason: String,
}

impl TransferRejected {
    pub fn new(to: Address, amount: Amount, reason: impl Into<String>) -> Self {
        Self {
            to,
            amount,
            reason: reason.into(),
        }
    }
}

/// Moves value out of the ledger to an identity.
///
/// The ledger calls this as the last step of `claim` (the payout) and of
/// `split` (the undistributed remainder going back to the depositor). The
/// implementation is handed the ledger itself: a receiving identity may
/// re-enter any entry point before the transfer returns, exactly as a
/// contract receiving value can.
///
/// Returning `Err` aborts the calling operation and unwinds every change it
/// made, including changes made by re-entrant calls.
pub trait ValueTransfer {
    fn transfer(
        &mut self,
        ledger: &mut Splitter,
        to: Address,
        amount: Amount,
    ) -> Result<(), TransferRejected>;
}
