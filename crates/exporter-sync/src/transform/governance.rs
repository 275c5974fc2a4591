//! Proposals, deposits and votes

use crate::content::ContentStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use exporter_core::{
    first_coin_strings, ChainMsg, Deposit, Proposal, ProposalData, TallyResult, TxResponse, Vote,
    FULL_VOTE_WEIGHT,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Governance rows of one block
#[derive(Debug, Clone, Default)]
pub struct GovernanceRows {
    /// Proposals submitted in the block
    pub proposals: Vec<Proposal>,
    /// Deposits, initial deposits included
    pub deposits: Vec<Deposit>,
    /// Surviving votes
    pub votes: Vec<Vote>,
    /// Ids of submitted proposals
    pub submitted: BTreeSet<u64>,
    /// Ids receiving a deposit
    pub deposited: BTreeSet<u64>,
}

impl GovernanceRows {
    /// Ids that should trigger a proposal alert
    pub fn alert_ids(&self) -> BTreeSet<u64> {
        self.submitted.union(&self.deposited).copied().collect()
    }
}

struct TxContext<'a> {
    tx: &'a TxResponse,
    timestamp: DateTime<Utc>,
    /// Proposal ids announced by the message, in emission order
    submitted_ids: Vec<String>,
    submits_seen: usize,
}

impl TxContext<'_> {
    fn deposit(&self, proposal_id: u64, depositor: &str, amount: (String, String)) -> Deposit {
        Deposit {
            height: self.tx.height,
            proposal_id,
            depositor: depositor.to_string(),
            amount: amount.0,
            denom: amount.1,
            tx_hash: self.tx.txhash.clone(),
            gas_wanted: self.tx.gas_wanted,
            gas_used: self.tx.gas_used,
            timestamp: self.timestamp,
        }
    }

    fn vote(&self, proposal_id: u64, voter: &str, option: &str, weight: &str) -> Vote {
        Vote {
            height: self.tx.height,
            proposal_id,
            voter: voter.to_string(),
            option: option.to_string(),
            weight: weight.to_string(),
            tx_hash: self.tx.txhash.clone(),
            gas_wanted: self.tx.gas_wanted,
            gas_used: self.tx.gas_used,
            timestamp: self.timestamp,
        }
    }

    /// Id of the next submission inside the message
    fn next_submitted_id(&mut self) -> Result<u64> {
        let raw = self.submitted_ids.get(self.submits_seen).ok_or_else(|| {
            Error::Decode(format!(
                "tx {} has no submit_proposal event for submission {}",
                self.tx.txhash, self.submits_seen
            ))
        })?;
        self.submits_seen += 1;
        raw.parse()
            .map_err(|e| Error::Decode(format!("proposal id {}: {}", raw, e)))
    }
}

/// Governance rows of the successful transactions of a block
///
/// Within the block the last vote message per voter and proposal wins,
/// replacing every option the voter cast earlier.
pub fn governance_rows(txs: &[TxResponse], block_time: DateTime<Utc>) -> Result<GovernanceRows> {
    let mut rows = GovernanceRows::default();
    let mut votes: BTreeMap<(String, u64), Vec<Vote>> = BTreeMap::new();

    for tx in txs.iter().filter(|tx| tx.is_success()) {
        for (msg_index, msg) in tx.messages()?.iter().enumerate() {
            let mut submitted_ids =
                tx.event_attributes(msg_index, "submit_proposal", "proposal_id");
            submitted_ids.dedup();
            let mut ctx = TxContext {
                tx,
                timestamp: tx.time().unwrap_or(block_time),
                submitted_ids,
                submits_seen: 0,
            };
            let mut flat = Vec::new();
            msg.walk(&mut |m| flat.push(m));

            for inner in flat {
                match inner {
                    ChainMsg::SubmitProposal(submit) => {
                        let id = ctx.next_submitted_id()?;
                        let (amount, denom) = first_coin_strings(&submit.initial_deposit);
                        if !denom.is_empty() {
                            rows.deposits.push(ctx.deposit(
                                id,
                                &submit.proposer,
                                (amount.clone(), denom.clone()),
                            ));
                        }
                        rows.proposals.push(Proposal {
                            id,
                            tx_hash: tx.txhash.clone(),
                            proposer: submit.proposer.clone(),
                            title: submit.title.clone(),
                            description: submit.description.clone(),
                            proposal_type: submit.proposal_type.clone(),
                            initial_deposit_amount: amount,
                            initial_deposit_denom: denom,
                            submit_time: Some(ctx.timestamp),
                            metadata: submit.metadata.clone(),
                            ..Default::default()
                        });
                        rows.submitted.insert(id);
                    }
                    ChainMsg::Deposit {
                        proposal_id,
                        depositor,
                        amount,
                    } => {
                        rows.deposits
                            .push(ctx.deposit(*proposal_id, depositor, first_coin_strings(amount)));
                        rows.deposited.insert(*proposal_id);
                    }
                    ChainMsg::Vote {
                        proposal_id,
                        voter,
                        option,
                    } => {
                        votes.insert(
                            (voter.clone(), *proposal_id),
                            vec![ctx.vote(*proposal_id, voter, option, FULL_VOTE_WEIGHT)],
                        );
                    }
                    ChainMsg::VoteWeighted {
                        proposal_id,
                        voter,
                        options,
                    } => {
                        let cast = options
                            .iter()
                            .map(|o| ctx.vote(*proposal_id, voter, &o.option, &o.weight))
                            .collect();
                        votes.insert((voter.clone(), *proposal_id), cast);
                    }
                    _ => {}
                }
            }
        }
    }

    rows.votes = votes.into_values().flatten().collect();
    Ok(rows)
}

/// Title and description carried by proposal metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProposalMetadata {
    /// Title
    #[serde(default)]
    pub title: String,
    /// Summary, or the legacy description field
    #[serde(default, alias = "description")]
    pub summary: String,
}

impl ProposalMetadata {
    /// Parse an inline JSON metadata document
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }

    /// Content id the metadata points at, if it is a pointer
    pub fn content_id(metadata: &str) -> Option<&str> {
        let trimmed = metadata.trim();
        if trimmed.is_empty() || trimmed.starts_with('{') {
            return None;
        }
        let cid = trimmed.strip_prefix("ipfs://").unwrap_or(trimmed);
        let cid = cid.trim_end_matches('/');
        if cid.is_empty() || cid.contains(char::is_whitespace) || cid.contains("://") {
            return None;
        }
        Some(cid)
    }

    /// Resolve metadata, fetching pointed-to content
    ///
    /// Returns the parsed metadata and the fetched document body, if any.
    pub async fn resolve(
        metadata: &str,
        content: Option<&dyn ContentStore>,
    ) -> (Option<Self>, Option<String>) {
        if let Some(inline) = Self::parse(metadata) {
            return (Some(inline), None);
        }
        let (Some(cid), Some(store)) = (Self::content_id(metadata), content) else {
            return (None, None);
        };
        match store.fetch(cid).await {
            Ok(body) => (Self::parse(&body), Some(body)),
            Err(e) => {
                warn!("Failed to fetch proposal metadata {}: {}", cid, e);
                (None, None)
            }
        }
    }
}

fn override_non_empty(target: &mut String, value: &str) {
    if !value.trim().is_empty() {
        *target = value.to_string();
    }
}

/// Full proposal row from the node's view, its tally and resolved metadata
pub async fn proposal_from_node(
    data: ProposalData,
    tally: TallyResult,
    content: Option<&dyn ContentStore>,
) -> Proposal {
    let (metadata, metadata_chunk) = ProposalMetadata::resolve(&data.metadata, content).await;
    let mut title = data.title.clone();
    let mut description = data.description.clone();
    if let Some(meta) = metadata {
        override_non_empty(&mut title, &meta.title);
        override_non_empty(&mut description, &meta.summary);
    }

    let (total_deposit_amount, total_deposit_denom) = first_coin_strings(&data.total_deposit);
    debug!("Proposal {} is {}", data.id, data.status);
    Proposal {
        id: data.id,
        proposer: data.proposer.clone(),
        title,
        description,
        proposal_type: data.proposal_type.clone(),
        proposal_status: data.status.clone(),
        yes: tally.yes,
        abstain: tally.abstain,
        no: tally.no,
        no_with_veto: tally.no_with_veto,
        total_deposit_amount,
        total_deposit_denom,
        submit_time: data.submit_time,
        deposit_end_time: data.deposit_end_time,
        voting_start_time: data.voting_start_time,
        voting_end_time: data.voting_end_time,
        metadata: data.metadata.clone(),
        metadata_chunk: metadata_chunk.unwrap_or_default(),
        gov_rest_path: data.version.path().to_string(),
        chunk: data.raw.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use exporter_core::GovVersion;
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn tx(hash: &str, messages: Value, logs: Value) -> TxResponse {
        TxResponse::from_value(json!({
            "height": "20", "txhash": hash, "code": 0, "gas_wanted": "200", "gas_used": "100",
            "logs": logs,
            "tx": {"body": {"messages": messages}}
        }))
        .unwrap()
    }

    fn vote(voter: &str, option: &str) -> Value {
        json!({"@type": "/cosmos.gov.v1beta1.MsgVote", "proposal_id": "7", "voter": voter, "option": option})
    }

    #[test]
    fn test_last_vote_wins_within_block() {
        let weighted = json!({
            "@type": "/cosmos.gov.v1.MsgVoteWeighted", "proposal_id": "7", "voter": "core1v",
            "options": [
                {"option": "VOTE_OPTION_YES", "weight": "0.600000000000000000"},
                {"option": "VOTE_OPTION_NO", "weight": "0.400000000000000000"}
            ]
        });
        let txs = vec![
            tx("A", json!([weighted]), json!([])),
            tx("B", json!([vote("core1v", "VOTE_OPTION_ABSTAIN")]), json!([])),
            tx("C", json!([vote("core1w", "VOTE_OPTION_YES")]), json!([])),
        ];
        let rows = governance_rows(&txs, now()).unwrap();

        assert_eq!(rows.votes.len(), 2);
        let v = rows.votes.iter().find(|v| v.voter == "core1v").unwrap();
        assert_eq!(v.option, "VOTE_OPTION_ABSTAIN");
        assert_eq!(v.weight, FULL_VOTE_WEIGHT);
        assert_eq!(v.tx_hash, "B");
    }

    #[test]
    fn test_later_message_in_same_tx_wins() {
        let delegate = json!({
            "@type": "/cosmos.staking.v1beta1.MsgDelegate",
            "delegator_address": "core1v",
            "validator_address": "corevaloper1x",
            "amount": {"denom": "ucore", "amount": "1"}
        });
        let messages = json!([
            vote("core1v", "VOTE_OPTION_YES"),
            delegate,
            vote("core1v", "VOTE_OPTION_NO"),
        ]);
        let rows = governance_rows(&[tx("M", messages, json!([]))], now()).unwrap();

        assert_eq!(rows.votes.len(), 1);
        assert_eq!(rows.votes[0].option, "VOTE_OPTION_NO");
        assert_eq!(rows.votes[0].tx_hash, "M");
    }

    #[test]
    fn test_wrapped_submissions_take_their_own_ids() {
        let submit = |title: &str| {
            json!({
                "@type": "/cosmos.gov.v1beta1.MsgSubmitProposal",
                "proposer": "core1p",
                "initial_deposit": [],
                "content": {"@type": "/cosmos.gov.v1beta1.TextProposal", "title": title, "description": "D"}
            })
        };
        let exec = json!({
            "@type": "/cosmos.authz.v1beta1.MsgExec",
            "grantee": "core1g",
            "msgs": [submit("First"), submit("Second"), vote("core1p", "VOTE_OPTION_YES")]
        });
        let logs = json!([{"msg_index": 0, "events": [
            {"type": "submit_proposal", "attributes": [
                {"key": "proposal_id", "value": "12"},
                {"key": "proposal_id", "value": "13"}
            ]}
        ]}]);
        let rows = governance_rows(&[tx("X", json!([exec]), logs)], now()).unwrap();

        let ids: Vec<(u64, &str)> = rows
            .proposals
            .iter()
            .map(|p| (p.id, p.title.as_str()))
            .collect();
        assert_eq!(ids, vec![(12, "First"), (13, "Second")]);
        assert_eq!(rows.submitted, BTreeSet::from([12, 13]));
        assert!(rows.deposits.is_empty());
        assert_eq!(rows.votes.len(), 1);
        assert_eq!(rows.votes[0].voter, "core1p");
    }

    #[test]
    fn test_submit_creates_proposal_and_initial_deposit() {
        let submit = json!({
            "@type": "/cosmos.gov.v1beta1.MsgSubmitProposal",
            "proposer": "core1p",
            "initial_deposit": [{"denom": "ucore", "amount": "100"}],
            "content": {"@type": "/cosmos.gov.v1beta1.TextProposal", "title": "T", "description": "D"}
        });
        let logs = json!([{"msg_index": 0, "events": [
            {"type": "submit_proposal", "attributes": [{"key": "proposal_id", "value": "12"}]}
        ]}]);
        let rows = governance_rows(&[tx("S", json!([submit]), logs)], now()).unwrap();

        assert_eq!(rows.proposals.len(), 1);
        assert_eq!(rows.proposals[0].id, 12);
        assert_eq!(rows.proposals[0].title, "T");
        assert!(rows.proposals[0].proposal_status.is_empty());
        assert_eq!(rows.deposits.len(), 1);
        assert_eq!(rows.deposits[0].amount, "100");
        assert_eq!(rows.deposits[0].depositor, "core1p");
        assert!(rows.submitted.contains(&12));
    }

    #[test]
    fn test_metadata_pointer_forms() {
        assert_eq!(ProposalMetadata::content_id("ipfs://QmAbc"), Some("QmAbc"));
        assert_eq!(ProposalMetadata::content_id("QmAbc"), Some("QmAbc"));
        assert_eq!(ProposalMetadata::content_id(""), None);
        assert_eq!(ProposalMetadata::content_id("https://x/y"), None);
        assert_eq!(ProposalMetadata::content_id(r#"{"title":"x"}"#), None);
    }

    struct FixedContent(Option<String>);

    #[async_trait]
    impl ContentStore for FixedContent {
        async fn fetch(&self, _cid: &str) -> Result<String> {
            self.0
                .clone()
                .ok_or_else(|| Error::Network("gateway down".to_string()))
        }
    }

    fn data(metadata: &str) -> ProposalData {
        ProposalData::from_v1(json!({
            "id": "3", "status": "PROPOSAL_STATUS_VOTING_PERIOD",
            "title": "Node title", "summary": "Node summary",
            "metadata": metadata, "messages": [], "total_deposit": [{"denom": "ucore", "amount": "9"}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetched_metadata_overrides_only_when_non_empty() {
        let store = FixedContent(Some(r#"{"title":"IPFS title","summary":""}"#.to_string()));
        let p = proposal_from_node(data("ipfs://QmX"), TallyResult::default(), Some(&store)).await;
        assert_eq!(p.title, "IPFS title");
        assert_eq!(p.description, "Node summary");
        assert_eq!(p.gov_rest_path, GovVersion::V1.path());
        assert_eq!(p.total_deposit_amount, "9");
        assert!(p.metadata_chunk.contains("IPFS title"));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_node_text() {
        let store = FixedContent(None);
        let p = proposal_from_node(data("QmX"), TallyResult::default(), Some(&store)).await;
        assert_eq!(p.title, "Node title");
        assert!(p.metadata_chunk.is_empty());
    }

    #[tokio::test]
    async fn test_inline_metadata_uses_description_alias() {
        let p = proposal_from_node(
            data(r#"{"title":"Inline","description":"Inline body"}"#),
            TallyResult::default(),
            None,
        )
        .await;
        assert_eq!(p.title, "Inline");
        assert_eq!(p.description, "Inline body");
    }
}
