//! Decoded node data
//!
//! Typed views over the Tendermint RPC and Cosmos REST JSON the node returns.
//! Each view keeps the verbatim JSON so it can be staged and replayed later.

use crate::codec::{i64_from_str, null_as_default, u64_from_str};
use crate::coin::Coin;
use crate::message::ChainMsg;
use crate::{Error, Result};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

// ============================================================================
// Blocks
// ============================================================================

/// One entry of a block's last commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSig {
    /// Hex consensus address of the signer slot (may be empty for absent votes)
    pub validator_address: String,
    /// Whether a signature is present
    pub signed: bool,
}

/// Misbehaviour evidence carried in a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceItem {
    /// Height the misbehaviour happened at
    pub height: i64,
}

/// Block as returned by the Tendermint `/block` endpoint
#[derive(Debug, Clone)]
pub struct BlockData {
    /// Chain id from the header
    pub chain_id: String,
    /// Height
    pub height: i64,
    /// Block hash
    pub hash: String,
    /// Hash of the previous block
    pub last_block_hash: String,
    /// Hex consensus address of the proposer
    pub proposer_address: String,
    /// Header time
    pub time: DateTime<Utc>,
    /// Evidence hash from the header
    pub evidence_hash: String,
    /// Base64 encoded raw transactions
    pub txs: Vec<String>,
    /// Height the last commit refers to (0 for the first block)
    pub last_commit_height: i64,
    /// Last commit signatures, in validator set order
    pub signatures: Vec<CommitSig>,
    /// Evidence list
    pub evidence: Vec<EvidenceItem>,
    /// Verbatim `/block` result
    pub raw: Value,
}

#[derive(Deserialize)]
struct RpcBlockResult {
    block_id: RpcBlockId,
    block: RpcBlock,
}

#[derive(Deserialize, Default)]
struct RpcBlockId {
    #[serde(default)]
    hash: String,
}

#[derive(Deserialize)]
struct RpcBlock {
    header: RpcHeader,
    #[serde(default)]
    data: RpcData,
    #[serde(default)]
    evidence: RpcEvidenceList,
    last_commit: Option<RpcCommit>,
}

#[derive(Deserialize)]
struct RpcHeader {
    chain_id: String,
    #[serde(deserialize_with = "i64_from_str")]
    height: i64,
    time: DateTime<Utc>,
    #[serde(default)]
    last_block_id: RpcBlockId,
    #[serde(default)]
    proposer_address: String,
    #[serde(default)]
    evidence_hash: String,
}

#[derive(Deserialize, Default)]
struct RpcData {
    #[serde(default, deserialize_with = "null_as_default")]
    txs: Vec<String>,
}

#[derive(Deserialize, Default)]
struct RpcEvidenceList {
    #[serde(default, deserialize_with = "null_as_default")]
    evidence: Vec<Value>,
}

#[derive(Deserialize)]
struct RpcCommit {
    #[serde(deserialize_with = "i64_from_str")]
    height: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    signatures: Vec<RpcCommitSig>,
}

#[derive(Deserialize)]
struct RpcCommitSig {
    #[serde(default)]
    validator_address: String,
    signature: Option<String>,
}

fn evidence_height(item: &Value) -> i64 {
    let value = item.get("value").unwrap_or(item);
    let candidates = [
        value.pointer("/vote_a/height"),
        value.get("common_height"),
        value.get("height"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| match v {
            Value::String(s) => s.parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        })
        .unwrap_or_default()
}

impl BlockData {
    /// Decode the `result` object of a `/block` response
    pub fn from_rpc_result(raw: Value) -> Result<Self> {
        let parsed: RpcBlockResult = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Decode(format!("block: {e}")))?;
        let (last_commit_height, signatures) = match parsed.block.last_commit {
            Some(commit) => (
                commit.height,
                commit
                    .signatures
                    .into_iter()
                    .map(|s| CommitSig {
                        validator_address: s.validator_address,
                        signed: s.signature.map(|sig| !sig.is_empty()).unwrap_or(false),
                    })
                    .collect(),
            ),
            None => (0, Vec::new()),
        };
        Ok(Self {
            chain_id: parsed.block.header.chain_id,
            height: parsed.block.header.height,
            hash: parsed.block_id.hash,
            last_block_hash: parsed.block.header.last_block_id.hash,
            proposer_address: parsed.block.header.proposer_address,
            time: parsed.block.header.time,
            evidence_hash: parsed.block.header.evidence_hash,
            txs: parsed.block.data.txs,
            last_commit_height,
            signatures,
            evidence: parsed
                .block
                .evidence
                .evidence
                .iter()
                .map(|e| EvidenceItem {
                    height: evidence_height(e),
                })
                .collect(),
            raw,
        })
    }

    /// Number of transactions in the block
    pub fn num_txs(&self) -> i64 {
        self.txs.len() as i64
    }

    /// Number of non-empty signatures in the last commit
    pub fn num_signatures(&self) -> i64 {
        self.signatures.iter().filter(|s| s.signed).count() as i64
    }

    /// Transaction hashes: upper hex SHA-256 of each raw transaction
    pub fn tx_hashes(&self) -> Result<Vec<String>> {
        self.txs
            .iter()
            .map(|encoded| {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| Error::Decode(format!("tx bytes: {e}")))?;
                Ok(hex::encode_upper(Sha256::digest(&bytes)))
            })
            .collect()
    }
}

/// Entry of the Tendermint `/validators` set
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorSetEntry {
    /// Hex consensus address
    pub address: String,
    /// Voting power
    #[serde(deserialize_with = "i64_from_str")]
    pub voting_power: i64,
}

// ============================================================================
// Transactions
// ============================================================================

/// Event attribute
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AbciAttribute {
    /// Key
    #[serde(default)]
    pub key: String,
    /// Value
    #[serde(default)]
    pub value: String,
}

/// ABCI event
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AbciEvent {
    /// Event type
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Attributes
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<AbciAttribute>,
}

/// Per-message log of a transaction
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AbciMessageLog {
    /// Message index
    #[serde(default)]
    pub msg_index: u32,
    /// Events emitted by the message
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<AbciEvent>,
}

#[derive(Deserialize)]
struct TxResponseFields {
    #[serde(deserialize_with = "i64_from_str")]
    height: i64,
    txhash: String,
    #[serde(default)]
    code: u32,
    #[serde(default, deserialize_with = "i64_from_str")]
    gas_wanted: i64,
    #[serde(default, deserialize_with = "i64_from_str")]
    gas_used: i64,
    #[serde(default)]
    timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    logs: Vec<AbciMessageLog>,
    #[serde(default, deserialize_with = "null_as_default")]
    events: Vec<AbciEvent>,
}

/// Transaction result as returned by the REST `txs/{hash}` endpoint
#[derive(Debug, Clone)]
pub struct TxResponse {
    /// Height
    pub height: i64,
    /// Upper hex hash
    pub txhash: String,
    /// Result code; 0 is success
    pub code: u32,
    /// Gas wanted
    pub gas_wanted: i64,
    /// Gas used
    pub gas_used: i64,
    /// RFC 3339 timestamp (may be empty on very old chains)
    pub timestamp: String,
    /// Per-message logs
    pub logs: Vec<AbciMessageLog>,
    /// Flat event list used by chains that no longer fill `logs`
    pub events: Vec<AbciEvent>,
    /// Verbatim `tx_response` object
    pub raw: Value,
}

impl TxResponse {
    /// Decode a `tx_response` object
    pub fn from_value(raw: Value) -> Result<Self> {
        let fields: TxResponseFields = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Decode(format!("tx response: {e}")))?;
        Ok(Self {
            height: fields.height,
            txhash: fields.txhash,
            code: fields.code,
            gas_wanted: fields.gas_wanted,
            gas_used: fields.gas_used,
            timestamp: fields.timestamp,
            logs: fields.logs,
            events: fields.events,
            raw,
        })
    }

    /// Whether the transaction executed successfully
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Parsed timestamp
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Raw message objects from `tx.body.messages` (or the legacy `tx.value.msg`)
    pub fn raw_messages(&self) -> &[Value] {
        let tx = self.raw.get("tx");
        tx.and_then(|t| t.pointer("/body/messages"))
            .or_else(|| tx.and_then(|t| t.pointer("/value/msg")))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Decode all messages into the tagged union
    pub fn messages(&self) -> Result<Vec<ChainMsg>> {
        self.raw_messages().iter().map(ChainMsg::decode).collect()
    }

    /// Every value of an event attribute emitted by message `msg_index`, in emission order
    ///
    /// Messages wrapped in `authz/exec` emit under the wrapper's index, so the
    /// n-th value belongs to the n-th wrapped message that emits the event.
    pub fn event_attributes(&self, msg_index: usize, event_type: &str, key: &str) -> Vec<String> {
        if let Some(log) = self.logs.get(msg_index) {
            let found: Vec<String> = log
                .events
                .iter()
                .filter(|e| e.kind == event_type)
                .flat_map(|e| e.attributes.iter())
                .filter(|a| a.key == key)
                .map(|a| a.value.clone())
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        let index = msg_index.to_string();
        self.events
            .iter()
            .filter(|e| e.kind == event_type)
            .filter(|e| {
                match e.attributes.iter().find(|a| a.key == "msg_index") {
                    Some(a) => a.value == index,
                    None => true,
                }
            })
            .flat_map(|e| e.attributes.iter())
            .filter(|a| a.key == key)
            .map(|a| a.value.clone())
            .collect()
    }
}

// ============================================================================
// Staking
// ============================================================================

/// Validator bond status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondStatus {
    /// Unspecified
    Unspecified,
    /// Unbonded
    Unbonded,
    /// Unbonding
    Unbonding,
    /// Bonded
    Bonded,
}

impl BondStatus {
    /// REST query value
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Unspecified => "BOND_STATUS_UNSPECIFIED",
            Self::Unbonded => "BOND_STATUS_UNBONDED",
            Self::Unbonding => "BOND_STATUS_UNBONDING",
            Self::Bonded => "BOND_STATUS_BONDED",
        }
    }

    /// Numeric code as stored
    pub fn code(&self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::Unbonded => 1,
            Self::Unbonding => 2,
            Self::Bonded => 3,
        }
    }

    /// Parse the REST enum name
    pub fn parse(s: &str) -> Self {
        match s {
            "BOND_STATUS_UNBONDED" => Self::Unbonded,
            "BOND_STATUS_UNBONDING" => Self::Unbonding,
            "BOND_STATUS_BONDED" => Self::Bonded,
            _ => Self::Unspecified,
        }
    }
}

/// Validator description
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidatorDescription {
    /// Moniker
    #[serde(default)]
    pub moniker: String,
    /// Keybase identity
    #[serde(default)]
    pub identity: String,
    /// Website
    #[serde(default)]
    pub website: String,
    /// Details
    #[serde(default)]
    pub details: String,
}

/// Commission rates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommissionRates {
    /// Current rate
    #[serde(default)]
    pub rate: String,
    /// Max rate
    #[serde(default)]
    pub max_rate: String,
    /// Max daily change
    #[serde(default)]
    pub max_change_rate: String,
}

/// Commission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commission {
    /// Rates
    #[serde(default)]
    pub commission_rates: CommissionRates,
    /// Last change
    pub update_time: Option<DateTime<Utc>>,
}

/// Consensus public key as an `Any`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsensusPubkey {
    /// Type url
    #[serde(rename = "@type", default)]
    pub type_url: String,
    /// Base64 key bytes
    #[serde(default)]
    pub key: String,
}

/// Validator as returned by the staking module
#[derive(Debug, Clone, Deserialize)]
pub struct StakingValidator {
    /// Operator address
    pub operator_address: String,
    /// Consensus key
    #[serde(default)]
    pub consensus_pubkey: ConsensusPubkey,
    /// Jailed flag
    #[serde(default)]
    pub jailed: bool,
    /// Bond status name
    #[serde(default)]
    pub status: String,
    /// Bonded tokens
    #[serde(default)]
    pub tokens: String,
    /// Delegator shares
    #[serde(default)]
    pub delegator_shares: String,
    /// Description
    #[serde(default)]
    pub description: ValidatorDescription,
    /// Unbonding height
    #[serde(default, deserialize_with = "i64_from_str")]
    pub unbonding_height: i64,
    /// Unbonding completion time
    pub unbonding_time: Option<DateTime<Utc>>,
    /// Commission
    #[serde(default)]
    pub commission: Commission,
    /// Minimum self delegation
    #[serde(default)]
    pub min_self_delegation: String,
}

/// Unbonding delegation with its entry balances
#[derive(Debug, Clone, Default)]
pub struct UnbondingDelegation {
    /// Validator operator address
    pub validator_address: String,
    /// Remaining balance of each entry
    pub balances: Vec<u128>,
}

// ============================================================================
// Accounts
// ============================================================================

/// One period of a periodic vesting schedule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VestingPeriod {
    /// Length in seconds
    pub length: i64,
    /// Coins released at the end of the period
    pub amount: Vec<Coin>,
}

/// Vesting parameters shared by all vesting account kinds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VestingSchedule {
    /// Coins locked at creation
    pub original_vesting: Vec<Coin>,
    /// Vesting coins that are currently delegated
    pub delegated_vesting: Vec<Coin>,
    /// Unix start time (0 for delayed accounts)
    pub start_time: i64,
    /// Unix end time
    pub end_time: i64,
    /// Periods (periodic accounts only)
    pub periods: Vec<VestingPeriod>,
}

/// Account kind from the auth module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountKind {
    /// Plain account
    Base,
    /// Module account
    Module,
    /// Linear vesting between start and end
    ContinuousVesting(VestingSchedule),
    /// Everything vests at end time
    DelayedVesting(VestingSchedule),
    /// Vesting in discrete periods
    PeriodicVesting(VestingSchedule),
    /// Any other type url
    Other(String),
}

/// Account as returned by `auth/accounts/{address}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Bech32 address
    pub address: String,
    /// Kind
    pub kind: AccountKind,
}

#[derive(Deserialize, Default)]
struct RawBaseAccount {
    #[serde(default)]
    address: String,
}

#[derive(Deserialize, Default)]
struct RawBaseVesting {
    #[serde(default)]
    base_account: RawBaseAccount,
    #[serde(default, deserialize_with = "null_as_default")]
    original_vesting: Vec<Coin>,
    #[serde(default, deserialize_with = "null_as_default")]
    delegated_vesting: Vec<Coin>,
    #[serde(default, deserialize_with = "i64_from_str")]
    end_time: i64,
}

#[derive(Deserialize)]
struct RawPeriod {
    #[serde(deserialize_with = "i64_from_str")]
    length: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    amount: Vec<Coin>,
}

#[derive(Deserialize)]
struct RawVestingAccount {
    #[serde(default)]
    base_vesting_account: RawBaseVesting,
    #[serde(default, deserialize_with = "i64_from_str")]
    start_time: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    vesting_periods: Vec<RawPeriod>,
}

impl AccountInfo {
    /// Decode an `Any`-encoded account object
    pub fn from_value(value: &Value) -> Result<Self> {
        let type_url = value
            .get("@type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let short = type_url.rsplit('.').next().unwrap_or_default();

        let (address, kind) = match short {
            "BaseAccount" => {
                let base: RawBaseAccount = serde_json::from_value(value.clone())?;
                (base.address, AccountKind::Base)
            }
            "ModuleAccount" => {
                let base: RawBaseAccount = value
                    .get("base_account")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()?
                    .unwrap_or_default();
                (base.address, AccountKind::Module)
            }
            "ContinuousVestingAccount" | "DelayedVestingAccount" | "PeriodicVestingAccount" => {
                let raw: RawVestingAccount = serde_json::from_value(value.clone())?;
                let schedule = VestingSchedule {
                    original_vesting: raw.base_vesting_account.original_vesting,
                    delegated_vesting: raw.base_vesting_account.delegated_vesting,
                    start_time: raw.start_time,
                    end_time: raw.base_vesting_account.end_time,
                    periods: raw
                        .vesting_periods
                        .into_iter()
                        .map(|p| VestingPeriod {
                            length: p.length,
                            amount: p.amount,
                        })
                        .collect(),
                };
                let address = raw.base_vesting_account.base_account.address;
                let kind = match short {
                    "ContinuousVestingAccount" => AccountKind::ContinuousVesting(schedule),
                    "DelayedVestingAccount" => AccountKind::DelayedVesting(schedule),
                    _ => AccountKind::PeriodicVesting(schedule),
                };
                (address, kind)
            }
            _ => {
                let address = value
                    .get("address")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (address, AccountKind::Other(type_url))
            }
        };
        Ok(Self { address, kind })
    }
}

// ============================================================================
// Governance
// ============================================================================

/// Governance REST API version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovVersion {
    /// `cosmos.gov.v1`
    V1,
    /// `cosmos.gov.v1beta1`
    V1Beta1,
}

impl GovVersion {
    /// Path segment used by the REST gateway
    pub fn path(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V1Beta1 => "v1beta1",
        }
    }
}

/// Tally counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TallyResult {
    /// Yes
    #[serde(default, alias = "yes_count")]
    pub yes: String,
    /// Abstain
    #[serde(default, alias = "abstain_count")]
    pub abstain: String,
    /// No
    #[serde(default, alias = "no_count")]
    pub no: String,
    /// No with veto
    #[serde(default, alias = "no_with_veto_count")]
    pub no_with_veto: String,
}

/// Proposal in the canonical shape shared by both API versions
#[derive(Debug, Clone)]
pub struct ProposalData {
    /// Source API version
    pub version: GovVersion,
    /// Proposal id
    pub id: u64,
    /// Status enum name (e.g. `PROPOSAL_STATUS_VOTING_PERIOD`)
    pub status: String,
    /// Title from the proposal or its content
    pub title: String,
    /// Description or summary
    pub description: String,
    /// Type url of the content or first message
    pub proposal_type: String,
    /// Proposer (v1 only)
    pub proposer: String,
    /// Metadata string (v1 only)
    pub metadata: String,
    /// Submit time
    pub submit_time: Option<DateTime<Utc>>,
    /// Deposit end time
    pub deposit_end_time: Option<DateTime<Utc>>,
    /// Voting start time
    pub voting_start_time: Option<DateTime<Utc>>,
    /// Voting end time
    pub voting_end_time: Option<DateTime<Utc>>,
    /// Total deposit
    pub total_deposit: Vec<Coin>,
    /// Verbatim proposal object
    pub raw: Value,
}

#[derive(Deserialize)]
struct RawProposalV1 {
    #[serde(deserialize_with = "u64_from_str")]
    id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    messages: Vec<Value>,
    #[serde(default)]
    status: String,
    submit_time: Option<DateTime<Utc>>,
    deposit_end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    total_deposit: Vec<Coin>,
    voting_start_time: Option<DateTime<Utc>>,
    voting_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    proposer: String,
}

#[derive(Deserialize)]
struct RawProposalV1Beta1 {
    #[serde(deserialize_with = "u64_from_str")]
    proposal_id: u64,
    #[serde(default)]
    content: Value,
    #[serde(default)]
    status: String,
    submit_time: Option<DateTime<Utc>>,
    deposit_end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    total_deposit: Vec<Coin>,
    voting_start_time: Option<DateTime<Utc>>,
    voting_end_time: Option<DateTime<Utc>>,
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

fn non_empty(first: &str, fallback: &str) -> String {
    if first.is_empty() {
        fallback.to_string()
    } else {
        first.to_string()
    }
}

impl ProposalData {
    /// Decode a `cosmos.gov.v1` proposal
    pub fn from_v1(raw: Value) -> Result<Self> {
        let p: RawProposalV1 = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Decode(format!("v1 proposal: {e}")))?;
        let first = p.messages.first().cloned().unwrap_or(Value::Null);
        // Legacy content wrapped in MsgExecLegacyContent carries its own title
        let content = first.get("content").cloned().unwrap_or(Value::Null);
        let proposal_type = non_empty(str_at(&content, "/@type"), str_at(&first, "/@type"));
        let title = non_empty(&p.title, str_at(&content, "/title"));
        let description = non_empty(&p.summary, str_at(&content, "/description"));
        Ok(Self {
            version: GovVersion::V1,
            id: p.id,
            status: p.status,
            title,
            description,
            proposal_type,
            proposer: p.proposer,
            metadata: p.metadata,
            submit_time: p.submit_time,
            deposit_end_time: p.deposit_end_time,
            voting_start_time: p.voting_start_time,
            voting_end_time: p.voting_end_time,
            total_deposit: p.total_deposit,
            raw,
        })
    }

    /// Decode a legacy `cosmos.gov.v1beta1` proposal
    pub fn from_v1beta1(raw: Value) -> Result<Self> {
        let p: RawProposalV1Beta1 = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Decode(format!("v1beta1 proposal: {e}")))?;
        Ok(Self {
            version: GovVersion::V1Beta1,
            id: p.proposal_id,
            status: p.status,
            title: str_at(&p.content, "/title").to_string(),
            description: str_at(&p.content, "/description").to_string(),
            proposal_type: str_at(&p.content, "/@type").to_string(),
            proposer: String::new(),
            metadata: String::new(),
            submit_time: p.submit_time,
            deposit_end_time: p.deposit_end_time,
            voting_start_time: p.voting_start_time,
            voting_end_time: p.voting_end_time,
            total_deposit: p.total_deposit,
            raw,
        })
    }
}
