//! Node access
//!
//! The engine only sees [`NodeClient`]. [`HttpNodeClient`] talks to a
//! Tendermint RPC endpoint for blocks and validator sets and to the Cosmos
//! REST gateway for everything else.

mod http;

pub use http::{HttpNodeClient, NodeClientConfig};

use crate::Result;
use async_trait::async_trait;
use exporter_core::{
    AccountInfo, BlockData, BondStatus, Coin, DecCoin, GovVersion, ProposalData,
    StakingValidator, TallyResult, TxResponse, UnbondingDelegation, ValidatorSetEntry,
};

/// Read access to a Cosmos node
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Latest block height known to the node
    async fn latest_height(&self) -> Result<i64>;

    /// Network chain id
    async fn chain_id(&self) -> Result<String>;

    /// Block at `height`
    async fn block(&self, height: i64) -> Result<BlockData>;

    /// Transaction result by upper hex hash
    async fn tx(&self, hash: &str) -> Result<TxResponse>;

    /// Full validator set at `height`, in proposer-priority order
    async fn validator_set(&self, height: i64) -> Result<Vec<ValidatorSetEntry>>;

    /// Staking bond denomination
    async fn bond_denom(&self) -> Result<String>;

    /// Account by address
    async fn account(&self, address: &str) -> Result<AccountInfo>;

    /// Spendable balance of `denom`
    async fn balance(&self, address: &str, denom: &str) -> Result<u128>;

    /// Balance of each delegation of a delegator
    async fn delegations(&self, address: &str) -> Result<Vec<Coin>>;

    /// Unbonding delegations of a delegator
    async fn unbonding_delegations(&self, address: &str) -> Result<Vec<UnbondingDelegation>>;

    /// Total unclaimed rewards of a delegator
    async fn total_rewards(&self, address: &str) -> Result<Vec<DecCoin>>;

    /// Unclaimed commission of a validator
    async fn validator_commission(&self, operator_address: &str) -> Result<Vec<DecCoin>>;

    /// All validators with `status`, in the node's order
    async fn validators_by_status(&self, status: BondStatus) -> Result<Vec<StakingValidator>>;

    /// All proposals
    async fn proposals(&self, version: GovVersion) -> Result<Vec<ProposalData>>;

    /// Proposal by id
    async fn proposal(&self, version: GovVersion, id: u64) -> Result<ProposalData>;

    /// Current tally of a proposal
    async fn tally(&self, version: GovVersion, id: u64) -> Result<TallyResult>;
}
