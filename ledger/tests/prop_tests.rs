use proptest::prelude::*;

use splitter_ledger::{LedgerError, PeerRecord, Splitter};
use splitter_nullables::NullTransfer;
use splitter_types::{Address, Amount};

const OWNER: u8 = 0xff;

fn owner() -> Address {
    Address::from_low_u8(OWNER)
}

fn peer(n: u8) -> Address {
    Address::from_low_u8(n)
}

#[derive(Clone, Debug)]
enum Op {
    Add(u8),
    RemoveAt(u64),
    Split(Vec<u8>, u64),
    SplitAll(u64),
    Claim(u8, u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u8..8).prop_map(Op::Add),
        (0u64..9).prop_map(Op::RemoveAt),
        (prop::collection::vec(1u8..8, 0..4), 0u64..1_000).prop_map(|(s, a)| Op::Split(s, a)),
        (0u64..1_000).prop_map(Op::SplitAll),
        (1u8..8, 0u64..400).prop_map(|(p, a)| Op::Claim(p, a)),
    ]
}

/// Apply `op`; returns the amount deposited if it was a successful split.
fn apply(splitter: &mut Splitter, host: &mut NullTransfer, op: &Op) -> u128 {
    match op {
        Op::Add(p) => {
            let _ = splitter.add_peer(&owner(), peer(*p));
            0
        }
        Op::RemoveAt(pos) => {
            let _ = splitter.remove_peer_at(&owner(), *pos);
            0
        }
        Op::Split(selected, amount) => {
            let selected: Vec<Address> = selected.iter().map(|p| peer(*p)).collect();
            match splitter.split(&owner(), &selected, Amount::from(*amount), host) {
                Ok(_) => *amount as u128,
                Err(_) => 0,
            }
        }
        Op::SplitAll(amount) => match splitter.split_all(&owner(), Amount::from(*amount), host) {
            Ok(_) => *amount as u128,
            Err(_) => 0,
        },
        Op::Claim(p, amount) => {
            let _ = splitter.claim(&peer(*p), Amount::from(*amount), host);
            0
        }
    }
}

proptest! {
    /// The index invariant holds after any sequence of operations.
    #[test]
    fn index_invariant_holds(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut splitter = Splitter::with_owner(owner());
        let mut host = NullTransfer::new();
        for op in &ops {
            apply(&mut splitter, &mut host, op);
            prop_assert!(splitter.registry().check_invariants().is_ok(), "after {:?}", op);
            for (slot, p) in splitter.peers().iter().enumerate() {
                prop_assert_eq!(splitter.peer_record(p).index, slot as u64 + 1);
            }
            for n in 1u8..8 {
                let record = splitter.peer_record(&peer(n));
                if !splitter.peers().contains(&peer(n)) {
                    prop_assert_eq!(record.index, 0);
                }
            }
        }
    }

    /// Everything deposited is either still owed or has been paid out.
    #[test]
    fn value_is_conserved(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut splitter = Splitter::with_owner(owner());
        let mut host = NullTransfer::new();
        let mut deposited = 0u128;
        for op in &ops {
            deposited += apply(&mut splitter, &mut host, op);
            prop_assert_eq!(
                splitter.total_owed().raw() + host.total_paid().raw(),
                deposited
            );
        }
    }

    /// Each target gains exactly floor(A/k) and the refund is A - k*floor(A/k).
    #[test]
    fn split_credits_floor_share(peers in 1u8..10, amount in any::<u64>()) {
        let mut splitter = Splitter::with_owner(owner());
        let mut host = NullTransfer::new();
        for n in 1..=peers {
            splitter.add_peer(&owner(), peer(n)).unwrap();
        }
        let receipt = splitter.split_all(&owner(), Amount::from(amount), &mut host).unwrap();
        let k = peers as u128;
        let share = amount as u128 / k;
        prop_assert_eq!(receipt.share.raw(), share);
        for n in 1..=peers {
            prop_assert_eq!(splitter.balance_of(&peer(n)).raw(), share);
        }
        prop_assert_eq!(host.paid_to(&owner()).raw(), amount as u128 - share * k);
    }

    /// Removing a peer never alters its balance; re-adding resumes from it.
    #[test]
    fn removal_preserves_balance(peers in 1u8..8, amount in 0u64..1_000_000, seed in any::<u8>()) {
        let victim = 1 + seed % peers;
        let mut splitter = Splitter::with_owner(owner());
        let mut host = NullTransfer::new();
        for n in 1..=peers {
            splitter.add_peer(&owner(), peer(n)).unwrap();
        }
        splitter.split_all(&owner(), Amount::from(amount), &mut host).unwrap();
        let before = splitter.balance_of(&peer(victim));

        splitter.remove_peer(&owner(), &peer(victim)).unwrap();
        prop_assert_eq!(
            splitter.peer_record(&peer(victim)),
            PeerRecord { balance: before, index: 0 }
        );

        splitter.add_peer(&owner(), peer(victim)).unwrap();
        prop_assert_eq!(splitter.balance_of(&peer(victim)), before);
    }

    /// A split that would overflow any target changes nothing.
    #[test]
    fn overflowing_split_is_all_or_nothing(
        peers in 2u8..6,
        headroom in 0u128..1_000,
        amount in 1_000u128..1_000_000,
    ) {
        let mut splitter = Splitter::with_owner(owner());
        let mut host = NullTransfer::new();
        for n in 1..=peers {
            splitter.add_peer(&owner(), peer(n)).unwrap();
        }
        // Only the last peer is pushed near the limit.
        let last = peer(peers);
        splitter
            .split(&owner(), &[last], Amount::new(u128::MAX - headroom), &mut host)
            .unwrap();
        let before: Vec<PeerRecord> = (1..=peers).map(|n| splitter.peer_record(&peer(n))).collect();
        let share = amount / peers as u128;
        prop_assume!(share > headroom);

        let result = splitter.split_all(&owner(), Amount::new(amount), &mut host);
        prop_assert_eq!(result, Err(LedgerError::BalanceOverflow));
        let after: Vec<PeerRecord> = (1..=peers).map(|n| splitter.peer_record(&peer(n))).collect();
        prop_assert_eq!(before, after);
    }

    /// claim(x) with x <= balance debits and pays exactly x; otherwise nothing moves.
    #[test]
    fn claim_is_exact(deposit in 0u64..1_000_000, request in 0u64..2_000_000) {
        let mut splitter = Splitter::with_owner(owner());
        let mut host = NullTransfer::new();
        splitter.add_peer(&owner(), peer(1)).unwrap();
        splitter.split_all(&owner(), Amount::from(deposit), &mut host).unwrap();

        let result = splitter.claim(&peer(1), Amount::from(request), &mut host);
        if request <= deposit {
            prop_assert!(result.is_ok());
            prop_assert_eq!(splitter.balance_of(&peer(1)).raw(), (deposit - request) as u128);
            prop_assert_eq!(host.paid_to(&peer(1)).raw(), request as u128);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(splitter.balance_of(&peer(1)).raw(), deposit as u128);
            prop_assert_eq!(host.paid_to(&peer(1)).raw(), 0);
        }
    }
}
