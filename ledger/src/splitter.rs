//! The ledger service: access control, split and claim.

use splitter_types::{Address, Amount};

use crate::config::SplitterConfig;
use crate::error::LedgerError;
use crate::event::LedgerEvent;
use crate::peer::PeerRecord;
use crate::registry::{PeerRegistry, RegistryMark};
use crate::split::{self, SplitReceipt};
use crate::transfer::ValueTransfer;

/// State captured before an operation that calls out to a [`ValueTransfer`].
///
/// Restoring it undoes the operation together with anything a re-entrant
/// call did in the meantime.
struct Checkpoint {
    registry: RegistryMark,
    events: usize,
    drained: usize,
}

/// Owner-administered split/claim ledger.
///
/// Each public operation either completes or leaves the ledger exactly as it
/// found it.
#[derive(Clone, Debug)]
pub struct Splitter {
    owner: Address,
    registry: PeerRegistry,
    events: Vec<LedgerEvent>,
    /// Logs emptied by `drain_events` while a checkpoint is open, oldest first.
    drained: Vec<Vec<LedgerEvent>>,
    open_checkpoints: usize,
}

impl Splitter {
    pub fn new(config: SplitterConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            owner: config.owner,
            registry: PeerRegistry::new(config.max_peers),
            events: Vec::new(),
            drained: Vec::new(),
            open_checkpoints: 0,
        })
    }

    /// Ledger owned by `owner` with the default peer cap.
    pub fn with_owner(owner: Address) -> Self {
        Self {
            owner,
            registry: PeerRegistry::new(SplitterConfig::new(owner).max_peers),
            events: Vec::new(),
            drained: Vec::new(),
            open_checkpoints: 0,
        }
    }

    pub(crate) fn from_parts(owner: Address, registry: PeerRegistry) -> Self {
        Self {
            owner,
            registry,
            events: Vec::new(),
            drained: Vec::new(),
            open_checkpoints: 0,
        }
    }

    // ── Access control ──────────────────────────────────────────────────

    pub fn owner(&self) -> Address {
        self.owner
    }

    fn require_owner(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller != self.owner {
            tracing::warn!(%caller, "privileged call rejected");
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }

    // ── Registry ────────────────────────────────────────────────────────

    /// Add `peer` to the active set. Owner only.
    ///
    /// Returns the peer's 1-based index. A removed peer may be added again and
    /// keeps the balance it had.
    pub fn add_peer(&mut self, caller: &Address, peer: Address) -> Result<u64, LedgerError> {
        self.require_owner(caller)?;
        let index = self.registry.add(peer)?;
        tracing::debug!(%peer, index, "peer added");
        self.events.push(LedgerEvent::PeerAdded { peer, index });
        Ok(index)
    }

    /// Remove the peer at 1-based `position`. Owner only.
    ///
    /// The last peer is swapped into the freed position. The removed peer's
    /// balance stays claimable.
    pub fn remove_peer_at(
        &mut self,
        caller: &Address,
        position: u64,
    ) -> Result<Address, LedgerError> {
        self.require_owner(caller)?;
        let peer = self.registry.remove_at(position)?;
        tracing::debug!(%peer, position, "peer removed");
        self.events.push(LedgerEvent::PeerRemoved { peer, position });
        Ok(peer)
    }

    /// Remove an active peer by identity. Owner only.
    pub fn remove_peer(&mut self, caller: &Address, peer: &Address) -> Result<u64, LedgerError> {
        self.require_owner(caller)?;
        let position = self
            .registry
            .position_of(peer)
            .ok_or(LedgerError::NotAPeer)?;
        self.remove_peer_at(caller, position)?;
        Ok(position)
    }

    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }

    /// Active peers in current positional order.
    pub fn peers(&self) -> Vec<Address> {
        self.registry.peers().to_vec()
    }

    /// `{ balance, index }` for `peer`; the zero record if never added.
    pub fn peer_record(&self, peer: &Address) -> PeerRecord {
        self.registry.record(peer)
    }

    pub fn balance_of(&self, peer: &Address) -> Amount {
        self.registry.balance(peer)
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Everything currently owed to peers, active or removed.
    pub fn total_owed(&self) -> Amount {
        self.registry.total_owed()
    }

    // ── Split ───────────────────────────────────────────────────────────

    /// Split an attached `amount` evenly across `selected`, or across every
    /// active peer when `selected` is empty.
    ///
    /// Each target is credited `floor(amount / k)`. The undistributed
    /// remainder goes back to `caller` through `transfer`; if that transfer
    /// is rejected the whole split is undone.
    pub fn split<T: ValueTransfer + ?Sized>(
        &mut self,
        caller: &Address,
        selected: &[Address],
        amount: Amount,
        transfer: &mut T,
    ) -> Result<SplitReceipt, LedgerError> {
        let plan = split::plan(&self.registry, selected, amount)?;
        let receipt = plan.receipt();
        let checkpoint = self.checkpoint();

        for (peer, balance) in &plan.balances {
            self.registry.set_balance(peer, *balance);
        }

        if !plan.remainder.is_zero() {
            if let Err(rejected) = transfer.transfer(self, *caller, plan.remainder) {
                self.rollback(checkpoint);
                tracing::warn!(%caller, remainder = %plan.remainder, "split refund rejected, split undone");
                return Err(rejected.into());
            }
        }

        self.commit(checkpoint);
        tracing::debug!(
            %caller,
            %amount,
            share = %receipt.share,
            recipients = receipt.recipients,
            remainder = %receipt.remainder,
            "split credited"
        );
        self.events.push(LedgerEvent::Split {
            sender: *caller,
            share: receipt.share,
            recipients: receipt.recipients,
            remainder: receipt.remainder,
        });
        Ok(receipt)
    }

    /// Split an attached `amount` evenly across every active peer.
    ///
    /// Same arithmetic and remainder refund as [`Splitter::split`] with an
    /// empty selection.
    pub fn split_all<T: ValueTransfer + ?Sized>(
        &mut self,
        caller: &Address,
        amount: Amount,
        transfer: &mut T,
    ) -> Result<SplitReceipt, LedgerError> {
        self.split(caller, &[], amount, transfer)
    }

    // ── Claim ───────────────────────────────────────────────────────────

    /// Withdraw `amount` of the caller's balance.
    ///
    /// The balance is debited before value leaves, so a re-entrant claim made
    /// from inside the transfer already sees the reduced balance. A rejected
    /// transfer restores the balance.
    pub fn claim<T: ValueTransfer + ?Sized>(
        &mut self,
        caller: &Address,
        amount: Amount,
        transfer: &mut T,
    ) -> Result<(), LedgerError> {
        if !self.registry.is_known(caller) {
            return Err(LedgerError::NotAPeer);
        }
        let available = self.registry.balance(caller);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            })?;

        let checkpoint = self.checkpoint();
        self.registry.set_balance(caller, remaining);

        if let Err(rejected) = transfer.transfer(self, *caller, amount) {
            self.rollback(checkpoint);
            tracing::warn!(%caller, %amount, "claim payout rejected, balance restored");
            return Err(rejected.into());
        }

        self.commit(checkpoint);
        tracing::debug!(%caller, %amount, "claimed");
        self.events.push(LedgerEvent::Claimed {
            peer: *caller,
            amount,
        });
        Ok(())
    }

    // ── Events ──────────────────────────────────────────────────────────

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Take every event logged so far.
    ///
    /// Called from inside a transfer, the drained events come back if the
    /// enclosing operation is rolled back.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        let events = std::mem::take(&mut self.events);
        if self.open_checkpoints > 0 {
            self.drained.push(events.clone());
        }
        events
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint {
            registry: self.registry.mark(),
            events: self.events.len(),
            drained: self.drained.len(),
        }
    }

    fn commit(&mut self, checkpoint: Checkpoint) {
        self.registry.commit(checkpoint.registry);
        self.close_checkpoint();
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.registry.rollback(checkpoint.registry);
        // The first drain since the checkpoint holds the log as it was then.
        let mut since = self.drained.split_off(checkpoint.drained);
        if since.is_empty() {
            self.events.truncate(checkpoint.events);
        } else {
            let mut log = since.swap_remove(0);
            log.truncate(checkpoint.events);
            self.events = log;
        }
        self.close_checkpoint();
    }

    fn close_checkpoint(&mut self) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.drained.clear();
        }
    }
}
