//! Chain exporter core
//!
//! Domain entities, chain parameters, address and coin arithmetic, the decoded
//! message model and the store capabilities consumed by the sync engine.
//! Nothing in this crate performs I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod chain;
pub mod codec;
pub mod coin;
pub mod error;
pub mod message;
pub mod model;
pub mod params;
pub mod store;
pub mod vesting;

pub use address::{
    acc_from_valoper, consensus_address_from_pubkey, valconspub_from_pubkey, valoper_from_acc,
};
pub use chain::{
    AbciEvent, AbciMessageLog, AccountInfo, AccountKind, BlockData, BondStatus, CommitSig,
    EvidenceItem, GovVersion, ProposalData, StakingValidator, TallyResult, TxResponse,
    UnbondingDelegation, ValidatorSetEntry, VestingPeriod, VestingSchedule,
};
pub use coin::{Coin, DecCoin};
pub use error::{Error, Result};
pub use message::{ChainMsg, SubmitProposalMsg, WeightedVoteOption};
pub use model::*;
pub use params::{Bech32Prefixes, ChainParams, GENESIS_PARENT_HASH, DEFAULT_POWER_REDUCTION};
pub use store::{ChainStore, RawStore};
pub use vesting::{clamp_vesting, VestingAmounts};
