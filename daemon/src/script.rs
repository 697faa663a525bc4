//! Replay scripts: a TOML list of ledger calls and the report they produce.
//!
//! ```toml
//! refusing = ["0x00000000000000000000000000000000000000bb"]
//!
//! [[call]]
//! op = "add_peer"
//! from = "0x00000000000000000000000000000000000000aa"
//! peer = "0x0000000000000000000000000000000000000001"
//!
//! [[call]]
//! op = "split_all"
//! from = "0x00000000000000000000000000000000000000aa"
//! amount = 5
//! ```

use serde::{Deserialize, Serialize};
use splitter_ledger::{LedgerEvent, SplitReceipt, Splitter};
use splitter_types::{Address, Amount};

use crate::journal::{PaymentJournal, Payout};

/// A parsed replay script.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Script {
    /// Recipients whose payouts are refused.
    #[serde(default)]
    pub refusing: Vec<Address>,
    #[serde(default, rename = "call")]
    pub calls: Vec<Call>,
}

/// One ledger call, made by `from`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Call {
    AddPeer {
        from: Address,
        peer: Address,
    },
    RemovePeer {
        from: Address,
        peer: Address,
    },
    RemovePeerAt {
        from: Address,
        position: u64,
    },
    Split {
        from: Address,
        #[serde(default)]
        peers: Vec<Address>,
        amount: Amount,
    },
    SplitAll {
        from: Address,
        amount: Amount,
    },
    Claim {
        from: Address,
        amount: Amount,
    },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::AddPeer { .. } => "add_peer",
            Call::RemovePeer { .. } => "remove_peer",
            Call::RemovePeerAt { .. } => "remove_peer_at",
            Call::Split { .. } => "split",
            Call::SplitAll { .. } => "split_all",
            Call::Claim { .. } => "claim",
        }
    }
}

impl Script {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Result of one replayed call.
#[derive(Clone, Debug, Serialize)]
pub struct CallOutcome {
    pub step: usize,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A peer's record as reported.
#[derive(Clone, Debug, Serialize)]
pub struct RecordReport {
    pub peer: Address,
    pub balance: Amount,
    pub index: u64,
}

/// Final report printed after a replay.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub owner: Address,
    pub peers: Vec<Address>,
    pub records: Vec<RecordReport>,
    pub total_owed: Amount,
    pub payouts: Vec<Payout>,
    pub calls: Vec<CallOutcome>,
    pub events: Vec<LedgerEvent>,
}

/// Run every call in order. A failing call is reported and skipped; the
/// ledger is unchanged by it.
pub fn replay(
    splitter: &mut Splitter,
    journal: &mut PaymentJournal,
    calls: &[Call],
) -> Vec<CallOutcome> {
    calls
        .iter()
        .enumerate()
        .map(|(i, call)| {
            let step = i + 1;
            let result = match call {
                Call::AddPeer { from, peer } => splitter
                    .add_peer(from, *peer)
                    .map(|index| serde_json::json!({ "index": index })),
                Call::RemovePeer { from, peer } => splitter
                    .remove_peer(from, peer)
                    .map(|position| serde_json::json!({ "position": position })),
                Call::RemovePeerAt { from, position } => splitter
                    .remove_peer_at(from, *position)
                    .map(|peer| serde_json::json!({ "peer": peer })),
                Call::Split {
                    from,
                    peers,
                    amount,
                } => splitter
                    .split(from, peers, *amount, journal)
                    .map(receipt_value),
                Call::SplitAll { from, amount } => splitter
                    .split_all(from, *amount, journal)
                    .map(receipt_value),
                Call::Claim { from, amount } => splitter
                    .claim(from, *amount, journal)
                    .map(|()| serde_json::Value::Null),
            };
            match result {
                Ok(value) => CallOutcome {
                    step,
                    op: call.name(),
                    ok: true,
                    result: (!value.is_null()).then_some(value),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(step, op = call.name(), error = %e, "call failed");
                    CallOutcome {
                        step,
                        op: call.name(),
                        ok: false,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect()
}

fn receipt_value(receipt: SplitReceipt) -> serde_json::Value {
    serde_json::json!({
        "share": receipt.share,
        "recipients": receipt.recipients,
        "remainder": receipt.remainder,
    })
}

/// Build the report for the ledger's current state.
pub fn report(splitter: &Splitter, journal: &PaymentJournal, calls: Vec<CallOutcome>) -> Report {
    let mut records: Vec<RecordReport> = splitter
        .registry()
        .records()
        .map(|(peer, record)| RecordReport {
            peer: *peer,
            balance: record.balance,
            index: record.index,
        })
        .collect();
    records.sort_by(|a, b| a.peer.cmp(&b.peer));

    Report {
        owner: splitter.owner(),
        peers: splitter.peers(),
        records,
        total_owed: splitter.total_owed(),
        payouts: journal.payouts().to_vec(),
        calls,
        events: splitter.events().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "0x00000000000000000000000000000000000000aa";
    const P1: &str = "0x0000000000000000000000000000000000000001";
    const P2: &str = "0x0000000000000000000000000000000000000002";
    const P3: &str = "0x0000000000000000000000000000000000000003";

    fn script() -> String {
        format!(
            r#"
[[call]]
op = "add_peer"
from = "{OWNER}"
peer = "{P1}"

[[call]]
op = "add_peer"
from = "{OWNER}"
peer = "{P2}"

[[call]]
op = "add_peer"
from = "{OWNER}"
peer = "{P3}"

[[call]]
op = "split_all"
from = "{OWNER}"
amount = 5

[[call]]
op = "add_peer"
from = "{P1}"
peer = "{P2}"

[[call]]
op = "remove_peer_at"
from = "{OWNER}"
position = 1

[[call]]
op = "claim"
from = "{P1}"
amount = "1"
"#
        )
    }

    #[test]
    fn test_parse_script() {
        let script = Script::from_toml_str(&script()).unwrap();
        assert_eq!(script.calls.len(), 7);
        assert_eq!(script.calls[3].name(), "split_all");
        assert_eq!(
            script.calls[3],
            Call::SplitAll {
                from: OWNER.parse().unwrap(),
                amount: Amount::new(5),
            }
        );
        assert!(script.refusing.is_empty());
    }

    #[test]
    fn test_split_peers_default_to_empty() {
        let text = format!("[[call]]\nop = \"split\"\nfrom = \"{OWNER}\"\namount = \"340282366920938463463374607431768211455\"\n");
        let script = Script::from_toml_str(&text).unwrap();
        assert_eq!(
            script.calls[0],
            Call::Split {
                from: OWNER.parse().unwrap(),
                peers: vec![],
                amount: Amount::MAX,
            }
        );
    }

    #[test]
    fn test_unknown_op_rejected() {
        let text = format!("[[call]]\nop = \"mint\"\nfrom = \"{OWNER}\"\n");
        assert!(Script::from_toml_str(&text).is_err());
    }

    #[test]
    fn test_replay_reports_each_call() {
        let script = Script::from_toml_str(&script()).unwrap();
        let mut splitter = Splitter::with_owner(OWNER.parse().unwrap());
        let mut journal = PaymentJournal::new(script.refusing.clone());

        let outcomes = replay(&mut splitter, &mut journal, &script.calls);
        assert_eq!(outcomes.len(), 7);
        assert!(outcomes[3].ok);
        assert!(!outcomes[4].ok);
        assert_eq!(outcomes[4].error.as_deref(), Some("Only owner allowed!"));
        assert!(outcomes[6].ok);

        let p1: Address = P1.parse().unwrap();
        let p3: Address = P3.parse().unwrap();
        assert_eq!(splitter.peers(), vec![p3, P2.parse().unwrap()]);
        assert_eq!(splitter.balance_of(&p1), Amount::ZERO);

        let report = report(&splitter, &journal, outcomes);
        assert_eq!(report.total_owed, Amount::new(2));
        assert_eq!(
            report.payouts,
            vec![
                Payout { to: OWNER.parse().unwrap(), amount: Amount::new(2) },
                Payout { to: p1, amount: Amount::new(1) },
            ]
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_owed"], "2");
        assert_eq!(json["calls"][4]["ok"], false);
    }

    #[test]
    fn test_refusing_recipient_rolls_back() {
        let text = format!(
            "refusing = [\"{P1}\"]\n\n[[call]]\nop = \"add_peer\"\nfrom = \"{OWNER}\"\npeer = \"{P1}\"\n\n[[call]]\nop = \"split_all\"\nfrom = \"{OWNER}\"\namount = 4\n\n[[call]]\nop = \"claim\"\nfrom = \"{P1}\"\namount = 4\n"
        );
        let script = Script::from_toml_str(&text).unwrap();
        let mut splitter = Splitter::with_owner(OWNER.parse().unwrap());
        let mut journal = PaymentJournal::new(script.refusing.clone());

        let outcomes = replay(&mut splitter, &mut journal, &script.calls);
        assert!(outcomes[1].ok);
        assert!(!outcomes[2].ok);
        assert_eq!(splitter.balance_of(&P1.parse().unwrap()), Amount::new(4));
        assert!(journal.payouts().is_empty());
    }
}
