//! Exported entities
//!
//! Rows written to the refined and raw stores. Amounts that may exceed `i64`
//! are carried as `u128` and persisted as integer strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::coin::Coin;

// ============================================================================
// Blocks and transactions
// ============================================================================

/// Block row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Chain id
    pub chain_id: String,
    /// Height
    pub height: i64,
    /// Block hash
    pub hash: String,
    /// Previous block hash, or `"genesis"` for the first block
    pub parent_hash: String,
    /// Hex consensus address of the proposer
    pub proposer: String,
    /// Non-empty signatures in the last commit
    pub num_signatures: i64,
    /// Number of transactions
    pub num_txs: i64,
    /// Header time
    pub timestamp: DateTime<Utc>,
}

/// Transaction row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Chain id
    pub chain_id: String,
    /// Height
    pub height: i64,
    /// Result code
    pub code: u32,
    /// Upper hex hash
    pub hash: String,
    /// Gas wanted
    pub gas_wanted: i64,
    /// Gas used
    pub gas_used: i64,
    /// Verbatim tx response JSON
    pub chunk: String,
    /// Block time
    pub timestamp: DateTime<Utc>,
}

/// Transaction-message-account link
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tma {
    /// Transaction hash
    pub tx_hash: String,
    /// Message type tag
    pub msg_type: String,
    /// Participating account
    pub account_address: String,
    /// Height
    pub height: i64,
}

/// Stored transaction reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRef {
    /// Row id
    pub id: i64,
    /// Height
    pub height: i64,
    /// Hash
    pub hash: String,
}

/// Stored transaction with its payload, as read back by the fee aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTransaction {
    /// Row id
    pub id: i64,
    /// Height
    pub height: i64,
    /// Hash
    pub hash: String,
    /// Verbatim tx response JSON
    pub chunk: String,
    /// Block time
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Accounts
// ============================================================================

/// Per-denomination account balance breakdown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCoin {
    /// Bech32 address
    pub address: String,
    /// Denomination
    pub denom: String,
    /// Sum of all components
    pub total: u128,
    /// Spendable balance
    pub available: u128,
    /// Delegated
    pub delegated: u128,
    /// Unbonding
    pub undelegated: u128,
    /// Unclaimed rewards, truncated
    pub rewards: u128,
    /// Unclaimed commission of the address's own validator, truncated
    pub commission: u128,
    /// Locked vesting amount
    pub vesting: u128,
    /// Released vesting amount
    pub vested: u128,
    /// Hash of the transaction that triggered the refresh
    pub last_tx: String,
    /// Time of that transaction
    pub last_tx_time: Option<DateTime<Utc>>,
}

// ============================================================================
// Validators
// ============================================================================

/// Validator row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    /// Operator address (key)
    pub operator_address: String,
    /// Account address of the operator key
    pub address: String,
    /// Bech32 consensus public key
    pub consensus_pubkey: String,
    /// Hex consensus address
    pub proposer: String,
    /// Rank within the status ordering
    pub rank: i64,
    /// Bond status code
    pub status: i32,
    /// Jailed flag
    pub jailed: bool,
    /// Bonded tokens
    pub tokens: String,
    /// Delegator shares
    pub delegator_shares: String,
    /// Moniker
    pub moniker: String,
    /// Keybase identity
    pub identity: String,
    /// Website
    pub website: String,
    /// Details
    pub details: String,
    /// Unbonding height
    pub unbonding_height: i64,
    /// Unbonding completion time
    pub unbonding_time: Option<DateTime<Utc>>,
    /// Commission rate
    pub commission_rate: String,
    /// Max commission rate
    pub commission_max_rate: String,
    /// Max commission change rate
    pub commission_change_rate: String,
    /// Last commission change
    pub commission_update_time: Option<DateTime<Utc>>,
    /// Minimum self delegation
    pub min_self_delegation: String,
    /// Keybase picture URL
    pub keybase_url: String,
}

/// Voting power change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerEvent {
    /// Height
    pub height: i64,
    /// Transaction hash (empty for genesis entries)
    pub tx_hash: String,
    /// Index of the message in the transaction
    pub msg_index: i64,
    /// Depth-first position inside an `authz/exec` wrapper, 0 for the message itself
    pub inner_index: i64,
    /// Operator address (empty for genesis entries)
    pub operator_address: String,
    /// Hex consensus address (genesis entries only)
    pub proposer: String,
    /// Message type tag
    pub msg_type: String,
    /// Signed change in consensus power
    pub voting_power_delta: f64,
    /// Denomination
    pub denom: String,
    /// Block time
    pub timestamp: DateTime<Utc>,
}

/// Single missed signature
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissDetail {
    /// Hex consensus address of the validator
    pub address: String,
    /// Height of the block that went unsigned
    pub height: i64,
    /// Proposer of that block
    pub proposer: String,
    /// Time of that block
    pub timestamp: DateTime<Utc>,
}

/// Contiguous range of missed signatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Miss {
    /// Hex consensus address
    pub address: String,
    /// First missed height
    pub start_height: i64,
    /// Last missed height
    pub end_height: i64,
    /// Heights in the range
    pub missing_count: i64,
    /// Time of the first miss
    pub start_time: DateTime<Utc>,
    /// Time of the last miss
    pub end_time: DateTime<Utc>,
}

/// Fold miss details into ranges
///
/// A detail at `h` extends the address's range ending at `h - 1`; otherwise it
/// opens a new range. Input order does not matter and duplicates are ignored.
pub fn coalesce_misses(details: &[MissDetail]) -> Vec<Miss> {
    let mut sorted: Vec<&MissDetail> = details.iter().collect();
    sorted.sort_by(|a, b| (&a.address, a.height).cmp(&(&b.address, b.height)));
    sorted.dedup_by(|a, b| a.address == b.address && a.height == b.height);

    let mut ranges: Vec<Miss> = Vec::new();
    for detail in sorted {
        match ranges.last_mut() {
            Some(last) if last.address == detail.address && last.end_height + 1 == detail.height => {
                last.end_height = detail.height;
                last.missing_count += 1;
                last.end_time = detail.timestamp;
            }
            _ => ranges.push(Miss {
                address: detail.address.clone(),
                start_height: detail.height,
                end_height: detail.height,
                missing_count: 1,
                start_time: detail.timestamp,
                end_time: detail.timestamp,
            }),
        }
    }
    ranges
}

/// Misbehaviour evidence row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Proposer (unset)
    pub proposer: String,
    /// Misbehaviour height
    pub height: i64,
    /// Evidence hash of the including block
    pub hash: String,
    /// Time of the including block
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Governance
// ============================================================================

/// Proposal row
///
/// Rows built from a submit message only carry the submission fields; the
/// background updater fills in the rest from the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal id
    pub id: u64,
    /// Submitting transaction
    pub tx_hash: String,
    /// Proposer
    pub proposer: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Content type url
    pub proposal_type: String,
    /// Status enum name
    pub proposal_status: String,
    /// Yes tally
    pub yes: String,
    /// Abstain tally
    pub abstain: String,
    /// No tally
    pub no: String,
    /// No-with-veto tally
    pub no_with_veto: String,
    /// Initial deposit amount
    pub initial_deposit_amount: String,
    /// Initial deposit denomination
    pub initial_deposit_denom: String,
    /// Total deposit amount
    pub total_deposit_amount: String,
    /// Total deposit denomination
    pub total_deposit_denom: String,
    /// Submit time
    pub submit_time: Option<DateTime<Utc>>,
    /// Deposit end time
    pub deposit_end_time: Option<DateTime<Utc>>,
    /// Voting start time
    pub voting_start_time: Option<DateTime<Utc>>,
    /// Voting end time
    pub voting_end_time: Option<DateTime<Utc>>,
    /// Metadata string
    pub metadata: String,
    /// Content fetched for the metadata pointer
    pub metadata_chunk: String,
    /// REST path segment the proposal was read from (`v1` or `v1beta1`)
    pub gov_rest_path: String,
    /// Verbatim proposal JSON
    pub chunk: String,
}

/// Amount and denomination of the first coin, or empty strings
pub fn first_coin_strings(coins: &[Coin]) -> (String, String) {
    coins
        .first()
        .map(|c| (c.amount.to_string(), c.denom.clone()))
        .unwrap_or_default()
}

/// Deposit row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Height
    pub height: i64,
    /// Proposal id
    pub proposal_id: u64,
    /// Depositor
    pub depositor: String,
    /// Amount
    pub amount: String,
    /// Denomination
    pub denom: String,
    /// Transaction hash
    pub tx_hash: String,
    /// Gas wanted
    pub gas_wanted: i64,
    /// Gas used
    pub gas_used: i64,
    /// Block time
    pub timestamp: DateTime<Utc>,
}

/// Vote row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Height
    pub height: i64,
    /// Proposal id
    pub proposal_id: u64,
    /// Voter
    pub voter: String,
    /// Option enum name
    pub option: String,
    /// Decimal weight
    pub weight: String,
    /// Transaction hash
    pub tx_hash: String,
    /// Gas wanted
    pub gas_wanted: i64,
    /// Gas used
    pub gas_used: i64,
    /// Block time
    pub timestamp: DateTime<Utc>,
}

/// Weight of a plain (non-weighted) vote
pub const FULL_VOTE_WEIGHT: &str = "1.000000000000000000";

/// Alert progress of a proposal, as a bit set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationStatus(pub u8);

impl NotificationStatus {
    /// Submission alert sent
    pub const SUBMIT_NOTIFIED: Self = Self(0b01);
    /// Voting alert sent (or no longer needed)
    pub const VOTING_NOTIFIED: Self = Self(0b10);

    /// Whether every bit of `other` is set
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the bits of `other`
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

// ============================================================================
// Fees
// ============================================================================

/// Fee paid by one transaction in one denomination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Transaction row id
    pub tx_id: i64,
    /// Height
    pub height: i64,
    /// Transaction hash
    pub tx_hash: String,
    /// Denomination
    pub denom: String,
    /// Amount
    pub amount: u128,
    /// Block time
    pub timestamp: DateTime<Utc>,
}

/// Fee total of one UTC day in one denomination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFee {
    /// UTC day
    pub day: NaiveDate,
    /// Denomination
    pub denom: String,
    /// Amount
    pub amount: u128,
}

/// Name of the fee aggregator's cursor
pub const TX_FEE_POINTER: &str = "tx_fee_pointer";

// ============================================================================
// Commit bundles
// ============================================================================

/// Everything derived from one height, committed atomically
#[derive(Debug, Clone, Default)]
pub struct HeightBundle {
    /// Block row
    pub block: Option<Block>,
    /// Transactions
    pub transactions: Vec<Transaction>,
    /// Message-account links
    pub tmas: Vec<Tma>,
    /// Refreshed account balances
    pub accounts: Vec<AccountCoin>,
    /// Submitted proposals
    pub proposals: Vec<Proposal>,
    /// Deposits
    pub deposits: Vec<Deposit>,
    /// Votes
    pub votes: Vec<Vote>,
    /// Voting power changes
    pub power_events: Vec<PowerEvent>,
    /// Missed signatures
    pub miss_details: Vec<MissDetail>,
    /// Evidence
    pub evidence: Vec<Evidence>,
}

/// Blocks and transactions rebuilt from staged raw data
#[derive(Debug, Clone, Default)]
pub struct RefineBundle {
    /// Blocks
    pub blocks: Vec<Block>,
    /// Transactions
    pub transactions: Vec<Transaction>,
    /// Message-account links
    pub tmas: Vec<Tma>,
}

/// Staged block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Row id (0 before insertion)
    pub id: i64,
    /// Chain id
    pub chain_id: String,
    /// Height
    pub height: i64,
    /// Block hash
    pub block_hash: String,
    /// Number of transactions
    pub num_txs: i64,
    /// Verbatim `/block` result JSON
    pub chunk: String,
}

/// Staged transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    /// Row id (0 before insertion)
    pub id: i64,
    /// Chain id
    pub chain_id: String,
    /// Height
    pub height: i64,
    /// Transaction hash
    pub tx_hash: String,
    /// Verbatim tx response JSON
    pub chunk: String,
}

/// One height of staged data
#[derive(Debug, Clone)]
pub struct RawBundle {
    /// Block
    pub block: RawBlock,
    /// Transactions
    pub transactions: Vec<RawTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detail(address: &str, height: i64) -> MissDetail {
        MissDetail {
            address: address.to_string(),
            height,
            proposer: "P".to_string(),
            timestamp: Utc.timestamp_opt(height, 0).unwrap(),
        }
    }

    #[test]
    fn test_coalesce_ranges() {
        let details: Vec<_> = [100, 101, 102, 105].iter().map(|h| detail("V", *h)).collect();
        let ranges = coalesce_misses(&details);
        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].start_height, ranges[0].end_height), (100, 102));
        assert_eq!(ranges[0].missing_count, 3);
        assert_eq!((ranges[1].start_height, ranges[1].end_height), (105, 105));
        assert_eq!(ranges[1].missing_count, 1);
    }

    #[test]
    fn test_coalesce_order_and_duplicates() {
        let details = vec![
            detail("V", 102),
            detail("W", 101),
            detail("V", 100),
            detail("V", 101),
            detail("V", 101),
        ];
        let ranges = coalesce_misses(&details);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].address, "V");
        assert_eq!(ranges[0].missing_count, 3);
        assert_eq!(ranges[1].address, "W");
    }

    #[test]
    fn test_notification_bits() {
        let mut status = NotificationStatus::default();
        assert!(!status.contains(NotificationStatus::SUBMIT_NOTIFIED));
        status.insert(NotificationStatus::SUBMIT_NOTIFIED);
        assert!(status.contains(NotificationStatus::SUBMIT_NOTIFIED));
        assert!(!status.contains(NotificationStatus::VOTING_NOTIFIED));
        status.insert(NotificationStatus::VOTING_NOTIFIED);
        assert_eq!(status.0, 0b11);
    }

    #[test]
    fn test_first_coin_strings() {
        assert_eq!(
            first_coin_strings(&[Coin::new("ucore", 5), Coin::new("uatom", 1)]),
            ("5".to_string(), "ucore".to_string())
        );
        assert_eq!(first_coin_strings(&[]), (String::new(), String::new()));
    }
}
