//! Ledger construction parameters.

use serde::{Deserialize, Serialize};
use splitter_types::Address;

use crate::error::LedgerError;

/// Default bound on the number of simultaneously active peers.
pub const DEFAULT_MAX_PEERS: usize = 100;

fn default_max_peers() -> Option<usize> {
    Some(DEFAULT_MAX_PEERS)
}

/// Configuration fixed when a [`Splitter`](crate::Splitter) is created.
///
/// ```toml
/// owner = "0x00000000000000000000000000000000000000aa"
/// max_peers = 100
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// The only identity allowed to add and remove peers.
    pub owner: Address,
    /// Cap on active peers; `None` leaves the registry unbounded.
    #[serde(default = "default_max_peers")]
    pub max_peers: Option<usize>,
}

impl SplitterConfig {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            max_peers: default_max_peers(),
        }
    }

    pub fn with_max_peers(mut self, max_peers: Option<usize>) -> Self {
        self.max_peers = max_peers;
        self
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, LedgerError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_peers == Some(0) {
            return Err(LedgerError::Config("max_peers must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_defaults_cap() {
        let config = SplitterConfig::from_toml_str(
            r#"owner = "0x00000000000000000000000000000000000000aa""#,
        )
        .unwrap();
        assert_eq!(config.owner, Address::from_low_u8(0xaa));
        assert_eq!(config.max_peers, Some(DEFAULT_MAX_PEERS));
    }

    #[test]
    fn test_from_toml_explicit_cap() {
        let config = SplitterConfig::from_toml_str(
            "owner = \"0x0000000000000000000000000000000000000001\"\nmax_peers = 3\n",
        )
        .unwrap();
        assert_eq!(config.max_peers, Some(3));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let err = SplitterConfig::from_toml_str(
            "owner = \"0x0000000000000000000000000000000000000001\"\nmax_peers = 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn test_bad_owner_rejected() {
        let err = SplitterConfig::from_toml_str(r#"owner = "alice""#).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
