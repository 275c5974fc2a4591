//! Transaction message tagged union
//!
//! Known Cosmos SDK messages decode into typed variants keyed by their
//! `@type` url. Anything else is kept as [`ChainMsg::Other`] so that the
//! recognizer chain downstream can still classify it.

use crate::codec::{null_as_default, u64_from_str};
use crate::coin::Coin;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Field names probed, in order, to find the signer of an unknown message
pub const GENERIC_SIGNER_FIELDS: &[&str] = &[
    "signer",
    "sender",
    "from_address",
    "delegator_address",
    "authority",
    "creator",
    "owner",
    "admin",
];

/// Single option of a weighted vote
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeightedVoteOption {
    /// Option enum name (e.g. `VOTE_OPTION_YES`)
    #[serde(default)]
    pub option: String,
    /// Decimal weight
    #[serde(default)]
    pub weight: String,
}

/// Governance submission, normalised across gov v1 and v1beta1
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitProposalMsg {
    /// Proposer address
    pub proposer: String,
    /// Deposit attached at submission
    pub initial_deposit: Vec<Coin>,
    /// Content type url (v1beta1) or first message type url (v1)
    pub proposal_type: String,
    /// Title
    pub title: String,
    /// Description or summary
    pub description: String,
    /// Metadata (v1 only)
    pub metadata: String,
}

#[derive(Deserialize)]
struct RawSubmitProposal {
    #[serde(default)]
    proposer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    initial_deposit: Vec<Coin>,
    #[serde(default)]
    content: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    messages: Vec<Value>,
    #[serde(default)]
    metadata: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
}

impl From<RawSubmitProposal> for SubmitProposalMsg {
    fn from(raw: RawSubmitProposal) -> Self {
        let content_str = |key: &str| {
            raw.content
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let proposal_type = if raw.content.is_object() {
            content_str("@type")
        } else {
            raw.messages
                .first()
                .and_then(|m| m.get("@type"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let title = if raw.title.is_empty() {
            content_str("title")
        } else {
            raw.title.clone()
        };
        let description = if raw.summary.is_empty() {
            content_str("description")
        } else {
            raw.summary.clone()
        };
        Self {
            proposer: raw.proposer,
            initial_deposit: raw.initial_deposit,
            proposal_type,
            title,
            description,
            metadata: raw.metadata,
        }
    }
}

#[derive(Deserialize)]
struct Addressed {
    #[serde(default)]
    address: String,
}

/// Decoded transaction message
#[derive(Debug, Clone, PartialEq)]
pub enum ChainMsg {
    /// `bank/send`
    Send {
        /// Sender
        from_address: String,
        /// Recipient
        to_address: String,
        /// Amount
        amount: Vec<Coin>,
    },
    /// `bank/multisend`
    MultiSend {
        /// Input addresses
        inputs: Vec<String>,
        /// Output addresses
        outputs: Vec<String>,
    },
    /// `staking/create_validator`
    CreateValidator {
        /// Self delegator
        delegator_address: String,
        /// Operator
        validator_address: String,
        /// Self delegation
        value: Coin,
    },
    /// `staking/edit_validator`
    EditValidator {
        /// Operator
        validator_address: String,
    },
    /// `staking/delegate`
    Delegate {
        /// Delegator
        delegator_address: String,
        /// Operator
        validator_address: String,
        /// Amount
        amount: Coin,
    },
    /// `staking/undelegate`
    Undelegate {
        /// Delegator
        delegator_address: String,
        /// Operator
        validator_address: String,
        /// Amount
        amount: Coin,
    },
    /// `staking/begin_redelegate`
    BeginRedelegate {
        /// Delegator
        delegator_address: String,
        /// Source operator
        validator_src_address: String,
        /// Destination operator
        validator_dst_address: String,
        /// Amount
        amount: Coin,
    },
    /// `distribution/withdraw_delegator_reward`
    WithdrawDelegatorReward {
        /// Delegator
        delegator_address: String,
        /// Operator
        validator_address: String,
    },
    /// `distribution/withdraw_validator_commission`
    WithdrawValidatorCommission {
        /// Operator
        validator_address: String,
    },
    /// `distribution/set_withdraw_address`
    SetWithdrawAddress {
        /// Delegator
        delegator_address: String,
        /// New withdraw address
        withdraw_address: String,
    },
    /// `distribution/fund_community_pool`
    FundCommunityPool {
        /// Depositor
        depositor: String,
    },
    /// `slashing/unjail`
    Unjail {
        /// Operator
        validator_addr: String,
    },
    /// `gov/submit_proposal`
    SubmitProposal(SubmitProposalMsg),
    /// `gov/deposit`
    Deposit {
        /// Proposal id
        proposal_id: u64,
        /// Depositor
        depositor: String,
        /// Amount
        amount: Vec<Coin>,
    },
    /// `gov/vote`
    Vote {
        /// Proposal id
        proposal_id: u64,
        /// Voter
        voter: String,
        /// Option enum name
        option: String,
    },
    /// `gov/vote_weighted`
    VoteWeighted {
        /// Proposal id
        proposal_id: u64,
        /// Voter
        voter: String,
        /// Options
        options: Vec<WeightedVoteOption>,
    },
    /// `authz/exec`
    Exec {
        /// Grantee executing on behalf of the granters
        grantee: String,
        /// Wrapped messages
        msgs: Vec<ChainMsg>,
    },
    /// `authz/grant`
    Grant {
        /// Granter
        granter: String,
        /// Grantee
        grantee: String,
    },
    /// `authz/revoke`
    Revoke {
        /// Granter
        granter: String,
        /// Grantee
        grantee: String,
    },
    /// `feegrant/grant_allowance`
    GrantAllowance {
        /// Granter
        granter: String,
        /// Grantee
        grantee: String,
    },
    /// `feegrant/revoke_allowance`
    RevokeAllowance {
        /// Granter
        granter: String,
        /// Grantee
        grantee: String,
    },
    /// Anything not listed above
    Other {
        /// `@type` url
        type_url: String,
        /// Verbatim message object
        value: Value,
    },
}

fn field<T: DeserializeOwned + Default>(value: &Value, key: &str) -> Result<T> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| Error::Decode(format!("field {key}: {e}"))),
    }
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn coin(value: &Value, key: &str) -> Result<Coin> {
    match value.get(key) {
        Some(v) if !v.is_null() => serde_json::from_value(v.clone())
            .map_err(|e| Error::Decode(format!("field {key}: {e}"))),
        _ => Ok(Coin::new("", 0)),
    }
}

fn proposal_id(value: &Value) -> Result<u64> {
    #[derive(Deserialize)]
    struct Id {
        #[serde(deserialize_with = "u64_from_str")]
        proposal_id: u64,
    }
    serde_json::from_value::<Id>(value.clone())
        .map(|id| id.proposal_id)
        .map_err(|e| Error::Decode(format!("proposal_id: {e}")))
}

fn addresses(value: &Value, key: &str) -> Result<Vec<String>> {
    let entries: Vec<Addressed> = field(value, key)?;
    Ok(entries.into_iter().map(|e| e.address).collect())
}

/// Legacy amino names for the messages old chains still return in `tx.value.msg`
fn amino_type_url(name: &str) -> Option<&'static str> {
    Some(match name {
        "cosmos-sdk/MsgSend" => "/cosmos.bank.v1beta1.MsgSend",
        "cosmos-sdk/MsgMultiSend" => "/cosmos.bank.v1beta1.MsgMultiSend",
        "cosmos-sdk/MsgCreateValidator" => "/cosmos.staking.v1beta1.MsgCreateValidator",
        "cosmos-sdk/MsgEditValidator" => "/cosmos.staking.v1beta1.MsgEditValidator",
        "cosmos-sdk/MsgDelegate" => "/cosmos.staking.v1beta1.MsgDelegate",
        "cosmos-sdk/MsgUndelegate" => "/cosmos.staking.v1beta1.MsgUndelegate",
        "cosmos-sdk/MsgBeginRedelegate" => "/cosmos.staking.v1beta1.MsgBeginRedelegate",
        "cosmos-sdk/MsgWithdrawDelegationReward" => {
            "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward"
        }
        "cosmos-sdk/MsgWithdrawValidatorCommission" => {
            "/cosmos.distribution.v1beta1.MsgWithdrawValidatorCommission"
        }
        "cosmos-sdk/MsgModifyWithdrawAddress" => {
            "/cosmos.distribution.v1beta1.MsgSetWithdrawAddress"
        }
        "cosmos-sdk/MsgUnjail" => "/cosmos.slashing.v1beta1.MsgUnjail",
        "cosmos-sdk/MsgSubmitProposal" => "/cosmos.gov.v1beta1.MsgSubmitProposal",
        "cosmos-sdk/MsgDeposit" => "/cosmos.gov.v1beta1.MsgDeposit",
        "cosmos-sdk/MsgVote" => "/cosmos.gov.v1beta1.MsgVote",
        _ => return None,
    })
}

impl ChainMsg {
    /// Decode a message object carrying an `@type` url (or a legacy amino `type`/`value` pair)
    pub fn decode(raw: &Value) -> Result<Self> {
        let (type_url, v) = match raw.get("@type").and_then(Value::as_str) {
            Some(t) => (t.to_string(), raw),
            None => {
                let name = raw.get("type").and_then(Value::as_str).ok_or_else(|| {
                    Error::Decode("message without @type".to_string())
                })?;
                let inner = raw.get("value").unwrap_or(raw);
                match amino_type_url(name) {
                    Some(url) => (url.to_string(), inner),
                    None => (name.to_string(), inner),
                }
            }
        };

        let msg = match type_url.as_str() {
            "/cosmos.bank.v1beta1.MsgSend" => Self::Send {
                from_address: text(v, "from_address"),
                to_address: text(v, "to_address"),
                amount: field(v, "amount")?,
            },
            "/cosmos.bank.v1beta1.MsgMultiSend" => Self::MultiSend {
                inputs: addresses(v, "inputs")?,
                outputs: addresses(v, "outputs")?,
            },
            "/cosmos.staking.v1beta1.MsgCreateValidator" => Self::CreateValidator {
                delegator_address: text(v, "delegator_address"),
                validator_address: text(v, "validator_address"),
                value: coin(v, "value")?,
            },
            "/cosmos.staking.v1beta1.MsgEditValidator" => Self::EditValidator {
                validator_address: text(v, "validator_address"),
            },
            "/cosmos.staking.v1beta1.MsgDelegate" => Self::Delegate {
                delegator_address: text(v, "delegator_address"),
                validator_address: text(v, "validator_address"),
                amount: coin(v, "amount")?,
            },
            "/cosmos.staking.v1beta1.MsgUndelegate" => Self::Undelegate {
                delegator_address: text(v, "delegator_address"),
                validator_address: text(v, "validator_address"),
                amount: coin(v, "amount")?,
            },
            "/cosmos.staking.v1beta1.MsgBeginRedelegate" => Self::BeginRedelegate {
                delegator_address: text(v, "delegator_address"),
                validator_src_address: text(v, "validator_src_address"),
                validator_dst_address: text(v, "validator_dst_address"),
                amount: coin(v, "amount")?,
            },
            "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward" => {
                Self::WithdrawDelegatorReward {
                    delegator_address: text(v, "delegator_address"),
                    validator_address: text(v, "validator_address"),
                }
            }
            "/cosmos.distribution.v1beta1.MsgWithdrawValidatorCommission" => {
                Self::WithdrawValidatorCommission {
                    validator_address: text(v, "validator_address"),
                }
            }
            "/cosmos.distribution.v1beta1.MsgSetWithdrawAddress" => Self::SetWithdrawAddress {
                delegator_address: text(v, "delegator_address"),
                withdraw_address: text(v, "withdraw_address"),
            },
            "/cosmos.distribution.v1beta1.MsgFundCommunityPool" => Self::FundCommunityPool {
                depositor: text(v, "depositor"),
            },
            "/cosmos.slashing.v1beta1.MsgUnjail" => Self::Unjail {
                validator_addr: text(v, "validator_addr"),
            },
            "/cosmos.gov.v1beta1.MsgSubmitProposal" | "/cosmos.gov.v1.MsgSubmitProposal" => {
                let raw: RawSubmitProposal = serde_json::from_value(v.clone())
                    .map_err(|e| Error::Decode(format!("submit proposal: {e}")))?;
                Self::SubmitProposal(raw.into())
            }
            "/cosmos.gov.v1beta1.MsgDeposit" | "/cosmos.gov.v1.MsgDeposit" => Self::Deposit {
                proposal_id: proposal_id(v)?,
                depositor: text(v, "depositor"),
                amount: field(v, "amount")?,
            },
            "/cosmos.gov.v1beta1.MsgVote" | "/cosmos.gov.v1.MsgVote" => Self::Vote {
                proposal_id: proposal_id(v)?,
                voter: text(v, "voter"),
                option: text(v, "option"),
            },
            "/cosmos.gov.v1beta1.MsgVoteWeighted" | "/cosmos.gov.v1.MsgVoteWeighted" => {
                Self::VoteWeighted {
                    proposal_id: proposal_id(v)?,
                    voter: text(v, "voter"),
                    options: field(v, "options")?,
                }
            }
            "/cosmos.authz.v1beta1.MsgExec" => {
                let inner: Vec<Value> = field(v, "msgs")?;
                Self::Exec {
                    grantee: text(v, "grantee"),
                    msgs: inner.iter().map(Self::decode).collect::<Result<_>>()?,
                }
            }
            "/cosmos.authz.v1beta1.MsgGrant" => Self::Grant {
                granter: text(v, "granter"),
                grantee: text(v, "grantee"),
            },
            "/cosmos.authz.v1beta1.MsgRevoke" => Self::Revoke {
                granter: text(v, "granter"),
                grantee: text(v, "grantee"),
            },
            "/cosmos.feegrant.v1beta1.MsgGrantAllowance" => Self::GrantAllowance {
                granter: text(v, "granter"),
                grantee: text(v, "grantee"),
            },
            "/cosmos.feegrant.v1beta1.MsgRevokeAllowance" => Self::RevokeAllowance {
                granter: text(v, "granter"),
                grantee: text(v, "grantee"),
            },
            _ => Self::Other {
                type_url,
                value: v.clone(),
            },
        };
        Ok(msg)
    }

    /// Fixed `module/action` tag of a built-in message; `None` for [`ChainMsg::Other`]
    pub fn tag(&self) -> Option<&'static str> {
        Some(match self {
            Self::Send { .. } => "bank/send",
            Self::MultiSend { .. } => "bank/multisend",
            Self::CreateValidator { .. } => "staking/create_validator",
            Self::EditValidator { .. } => "staking/edit_validator",
            Self::Delegate { .. } => "staking/delegate",
            Self::Undelegate { .. } => "staking/undelegate",
            Self::BeginRedelegate { .. } => "staking/begin_redelegate",
            Self::WithdrawDelegatorReward { .. } => "distribution/withdraw_delegator_reward",
            Self::WithdrawValidatorCommission { .. } => {
                "distribution/withdraw_validator_commission"
            }
            Self::SetWithdrawAddress { .. } => "distribution/set_withdraw_address",
            Self::FundCommunityPool { .. } => "distribution/fund_community_pool",
            Self::Unjail { .. } => "slashing/unjail",
            Self::SubmitProposal(_) => "gov/submit_proposal",
            Self::Deposit { .. } => "gov/deposit",
            Self::Vote { .. } => "gov/vote",
            Self::VoteWeighted { .. } => "gov/vote_weighted",
            Self::Exec { .. } => "authz/exec",
            Self::Grant { .. } => "authz/grant",
            Self::Revoke { .. } => "authz/revoke",
            Self::GrantAllowance { .. } => "feegrant/grant_allowance",
            Self::RevokeAllowance { .. } => "feegrant/revoke_allowance",
            Self::Other { .. } => return None,
        })
    }

    /// Addresses that signed the message
    pub fn signers(&self) -> Vec<String> {
        let one = |s: &String| vec![s.clone()];
        let signers = match self {
            Self::Send { from_address, .. } => one(from_address),
            Self::MultiSend { inputs, .. } => inputs.clone(),
            Self::CreateValidator {
                delegator_address, ..
            } => one(delegator_address),
            Self::EditValidator { validator_address }
            | Self::WithdrawValidatorCommission { validator_address } => one(validator_address),
            Self::Delegate {
                delegator_address, ..
            }
            | Self::Undelegate {
                delegator_address, ..
            }
            | Self::BeginRedelegate {
                delegator_address, ..
            }
            | Self::WithdrawDelegatorReward {
                delegator_address, ..
            }
            | Self::SetWithdrawAddress {
                delegator_address, ..
            } => one(delegator_address),
            Self::FundCommunityPool { depositor } => one(depositor),
            Self::Unjail { validator_addr } => one(validator_addr),
            Self::SubmitProposal(p) => one(&p.proposer),
            Self::Deposit { depositor, .. } => one(depositor),
            Self::Vote { voter, .. } | Self::VoteWeighted { voter, .. } => one(voter),
            Self::Exec { grantee, .. } => one(grantee),
            Self::Grant { granter, .. }
            | Self::Revoke { granter, .. }
            | Self::GrantAllowance { granter, .. }
            | Self::RevokeAllowance { granter, .. } => one(granter),
            Self::Other { value, .. } => GENERIC_SIGNER_FIELDS
                .iter()
                .find_map(|k| value.get(*k).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(|s| vec![s.to_string()])
                .unwrap_or_default(),
        };
        signers.into_iter().filter(|s| !s.is_empty()).collect()
    }

    /// Visit this message and, for `authz/exec`, every wrapped message depth-first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ChainMsg)) {
        visit(self);
        if let Self::Exec { msgs, .. } = self {
            for inner in msgs {
                inner.walk(visit);
            }
        }
    }
}
