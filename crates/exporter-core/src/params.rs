//! Chain parameters

use serde::{Deserialize, Serialize};

/// Parent hash recorded for the first exported block of a chain
pub const GENESIS_PARENT_HASH: &str = "genesis";

/// Default divisor from base-denom tokens to consensus power
pub const DEFAULT_POWER_REDUCTION: u128 = 1_000_000;

/// Bech32 human-readable prefixes derived from the account prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bech32Prefixes {
    /// Account address prefix (e.g. `core`)
    pub account: String,
    /// Validator operator prefix (e.g. `corevaloper`)
    pub validator: String,
    /// Consensus public key prefix (e.g. `corevalconspub`)
    pub consensus_pub: String,
}

impl Bech32Prefixes {
    /// Build the standard Cosmos prefix family for an account prefix
    pub fn from_account_prefix(prefix: &str) -> Self {
        Self {
            account: prefix.to_string(),
            validator: format!("{prefix}valoper"),
            consensus_pub: format!("{prefix}valconspub"),
        }
    }
}

/// Network parameters the transformers depend on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Chain id; resolved from the node when empty
    pub chain_id: String,
    /// Bech32 account prefix
    pub account_prefix: String,
    /// Divisor converting base-denom amounts to voting power
    pub power_reduction: u128,
    /// First height of the chain when it did not start at 1
    pub initial_height: i64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            account_prefix: "core".to_string(),
            power_reduction: DEFAULT_POWER_REDUCTION,
            initial_height: 0,
        }
    }
}

impl ChainParams {
    /// Prefix family for this chain
    pub fn prefixes(&self) -> Bech32Prefixes {
        Bech32Prefixes::from_account_prefix(&self.account_prefix)
    }

    /// Whether a block at `height` is the first block of the chain
    pub fn is_first_height(&self, height: i64) -> bool {
        height == 1 || (self.initial_height != 0 && height == self.initial_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_family() {
        let p = Bech32Prefixes::from_account_prefix("cosmos");
        assert_eq!(p.validator, "cosmosvaloper");
        assert_eq!(p.consensus_pub, "cosmosvalconspub");
    }

    #[test]
    fn test_first_height() {
        let mut params = ChainParams::default();
        assert!(params.is_first_height(1));
        assert!(!params.is_first_height(500));
        params.initial_height = 500;
        assert!(params.is_first_height(500));
        assert!(params.is_first_height(1));
        assert!(!params.is_first_height(501));
    }
}
