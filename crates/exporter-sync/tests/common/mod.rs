//! In-memory node and store helpers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use exporter_core::{
    valconspub_from_pubkey, AccountInfo, BlockData, BondStatus, ChainParams, Coin, DecCoin,
    GovVersion, ProposalData, StakingValidator, TallyResult, TxResponse, UnbondingDelegation,
    ValidatorSetEntry,
};
use exporter_storage_sqlite::{Database, RawDatabase};
use exporter_sync::{Error, NodeClient, Notifier, Result, RetrievalConfig, SyncConfig};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

pub const CHAIN: &str = "test-1";
pub const DENOM: &str = "ucore";

/// Bech32 address with the chain's account prefix
pub fn account(seed: u8) -> String {
    valconspub_from_pubkey(&[seed; 20], "core").unwrap()
}

/// Bech32 operator address of the same key as `account(seed)`
pub fn valoper(seed: u8) -> String {
    valconspub_from_pubkey(&[seed; 20], "corevaloper").unwrap()
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn params(initial_height: i64) -> ChainParams {
    ChainParams {
        chain_id: CHAIN.to_string(),
        initial_height,
        ..Default::default()
    }
}

pub fn sync_config(initial_height: i64) -> SyncConfig {
    SyncConfig {
        params: params(initial_height),
        retrieval: RetrievalConfig {
            tx_concurrency: 4,
            tx_retry_attempts: 2,
            tx_retry_delay: Duration::from_millis(1),
        },
        pass_delay: Duration::from_millis(1),
        ..Default::default()
    }
}

pub fn send_msg(from: &str, to: &str, amount: u128) -> Value {
    json!({
        "@type": "/cosmos.bank.v1beta1.MsgSend",
        "from_address": from,
        "to_address": to,
        "amount": [{"denom": DENOM, "amount": amount.to_string()}]
    })
}

pub fn base_account(address: &str) -> Value {
    json!({"@type": "/cosmos.auth.v1beta1.BaseAccount", "address": address})
}

#[derive(Default)]
struct NodeState {
    first: i64,
    latest: i64,
    blocks: HashMap<i64, Value>,
    txs: HashMap<String, Value>,
    failing: HashSet<String>,
    validator_sets: HashMap<i64, Vec<ValidatorSetEntry>>,
    accounts: HashMap<String, Value>,
    balances: HashMap<String, u128>,
    validators: HashMap<BondStatus, Vec<StakingValidator>>,
    proposals: HashMap<u64, Value>,
    tx_calls: usize,
}

/// Node double serving canned blocks, transactions and module queries
#[derive(Default)]
pub struct MockNode {
    state: Mutex<NodeState>,
}

impl MockNode {
    pub fn new() -> Arc<Self> {
        Self::starting_at(1)
    }

    /// Node of a chain whose first block is `first`
    pub fn starting_at(first: i64) -> Arc<Self> {
        let node = Self::default();
        node.state.lock().first = first;
        Arc::new(node)
    }

    /// Append a block at `height` holding one transaction per message list
    ///
    /// Returns the transaction hashes in block order.
    pub fn push_block(&self, height: i64, tx_messages: Vec<Vec<Value>>) -> Vec<String> {
        self.push_block_with(height, tx_messages, |_, _| {})
    }

    /// Like `push_block`, with a hook to edit each tx response before it is served
    pub fn push_block_with<F>(&self, height: i64, tx_messages: Vec<Vec<Value>>, mut edit: F) -> Vec<String>
    where
        F: FnMut(usize, &mut Value),
    {
        let time = base_time() + ChronoDuration::seconds(height * 5);
        let encoded: Vec<String> = (0..tx_messages.len())
            .map(|i| {
                base64::engine::general_purpose::STANDARD.encode(format!("tx-{}-{}", height, i))
            })
            .collect();
        let first = self.state.lock().first;
        let last_commit = if height > first {
            json!({"height": (height - 1).to_string(), "signatures": [
                {"validator_address": "VAL1", "signature": "c2ln"},
                {"validator_address": "", "signature": null}
            ]})
        } else {
            json!({"height": "0", "signatures": []})
        };
        let block = json!({
            "block_id": {"hash": format!("BLOCK{}", height)},
            "block": {
                "header": {
                    "chain_id": CHAIN,
                    "height": height.to_string(),
                    "time": time.to_rfc3339(),
                    "last_block_id": {"hash": format!("BLOCK{}", height - 1)},
                    "proposer_address": format!("PROPOSER{}", height),
                    "evidence_hash": ""
                },
                "data": {"txs": encoded},
                "evidence": {"evidence": []},
                "last_commit": last_commit
            }
        });
        let hashes = BlockData::from_rpc_result(block.clone())
            .unwrap()
            .tx_hashes()
            .unwrap();

        let mut state = self.state.lock();
        for (i, (hash, messages)) in hashes.iter().zip(tx_messages).enumerate() {
            let mut response = json!({
                "height": height.to_string(),
                "txhash": hash,
                "code": 0,
                "gas_wanted": "200000",
                "gas_used": "100000",
                "timestamp": time.to_rfc3339(),
                "logs": [],
                "tx": {
                    "body": {"messages": messages},
                    "auth_info": {"fee": {"amount": [{"denom": DENOM, "amount": "500"}]}}
                }
            });
            edit(i, &mut response);
            state.txs.insert(hash.clone(), response);
        }
        state.blocks.insert(height, block);
        state.latest = state.latest.max(height);
        hashes
    }

    pub fn fail_tx(&self, hash: &str) {
        self.state.lock().failing.insert(hash.to_string());
    }

    pub fn heal_tx(&self, hash: &str) {
        self.state.lock().failing.remove(hash);
    }

    pub fn set_validator_set(&self, height: i64, entries: &[(&str, i64)]) {
        let set = entries
            .iter()
            .map(|(address, power)| ValidatorSetEntry {
                address: address.to_string(),
                voting_power: *power,
            })
            .collect();
        self.state.lock().validator_sets.insert(height, set);
    }

    pub fn set_account(&self, address: &str, value: Value, balance: u128) {
        let mut state = self.state.lock();
        state.accounts.insert(address.to_string(), value);
        state.balances.insert(address.to_string(), balance);
    }

    pub fn set_validators(&self, status: BondStatus, validators: Vec<Value>) {
        let parsed = validators
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        self.state.lock().validators.insert(status, parsed);
    }

    pub fn set_proposal(&self, id: u64, value: Value) {
        self.state.lock().proposals.insert(id, value);
    }

    pub fn tx_calls(&self) -> usize {
        self.state.lock().tx_calls
    }
}

#[async_trait]
impl NodeClient for MockNode {
    async fn latest_height(&self) -> Result<i64> {
        Ok(self.state.lock().latest)
    }

    async fn chain_id(&self) -> Result<String> {
        Ok(CHAIN.to_string())
    }

    async fn block(&self, height: i64) -> Result<BlockData> {
        let raw = self.state.lock().blocks.get(&height).cloned();
        match raw {
            Some(raw) => Ok(BlockData::from_rpc_result(raw)?),
            None => Err(Error::Node(format!("no block {}", height))),
        }
    }

    async fn tx(&self, hash: &str) -> Result<TxResponse> {
        let mut state = self.state.lock();
        state.tx_calls += 1;
        if state.failing.contains(hash) {
            return Err(Error::Network(format!("tx {} unavailable", hash)));
        }
        match state.txs.get(hash).cloned() {
            Some(raw) => Ok(TxResponse::from_value(raw)?),
            None => Err(Error::Node(format!("no tx {}", hash))),
        }
    }

    async fn validator_set(&self, height: i64) -> Result<Vec<ValidatorSetEntry>> {
        Ok(self
            .state
            .lock()
            .validator_sets
            .get(&height)
            .cloned()
            .unwrap_or_default())
    }

    async fn bond_denom(&self) -> Result<String> {
        Ok(DENOM.to_string())
    }

    async fn account(&self, address: &str) -> Result<AccountInfo> {
        let raw = self
            .state
            .lock()
            .accounts
            .get(address)
            .cloned()
            .unwrap_or_else(|| base_account(address));
        Ok(AccountInfo::from_value(&raw)?)
    }

    async fn balance(&self, address: &str, _denom: &str) -> Result<u128> {
        Ok(self.state.lock().balances.get(address).copied().unwrap_or(0))
    }

    async fn delegations(&self, _address: &str) -> Result<Vec<Coin>> {
        Ok(Vec::new())
    }

    async fn unbonding_delegations(&self, _address: &str) -> Result<Vec<UnbondingDelegation>> {
        Ok(Vec::new())
    }

    async fn total_rewards(&self, _address: &str) -> Result<Vec<DecCoin>> {
        Ok(vec![DecCoin {
            denom: DENOM.to_string(),
            amount: "12.750000000000000000".to_string(),
        }])
    }

    async fn validator_commission(&self, _operator_address: &str) -> Result<Vec<DecCoin>> {
        Ok(Vec::new())
    }

    async fn validators_by_status(&self, status: BondStatus) -> Result<Vec<StakingValidator>> {
        Ok(self
            .state
            .lock()
            .validators
            .get(&status)
            .cloned()
            .unwrap_or_default())
    }

    async fn proposals(&self, version: GovVersion) -> Result<Vec<ProposalData>> {
        let raws: Vec<Value> = self.state.lock().proposals.values().cloned().collect();
        raws.into_iter()
            .map(|raw| decode(version, raw))
            .collect()
    }

    async fn proposal(&self, version: GovVersion, id: u64) -> Result<ProposalData> {
        let raw = self.state.lock().proposals.get(&id).cloned();
        match raw {
            Some(raw) => decode(version, raw),
            None => Err(Error::Node(format!("no proposal {}", id))),
        }
    }

    async fn tally(&self, _version: GovVersion, _id: u64) -> Result<TallyResult> {
        Ok(TallyResult {
            yes: "10".to_string(),
            abstain: "0".to_string(),
            no: "2".to_string(),
            no_with_veto: "0".to_string(),
        })
    }
}

fn decode(version: GovVersion, raw: Value) -> Result<ProposalData> {
    Ok(match version {
        GovVersion::V1 => ProposalData::from_v1(raw)?,
        GovVersion::V1Beta1 => ProposalData::from_v1beta1(raw)?,
    })
}

/// Notifier recording every message
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

/// File-backed refined and raw stores
pub struct Stores {
    _files: (NamedTempFile, NamedTempFile),
    pub db: Arc<Database>,
    pub raw: Arc<RawDatabase>,
}

pub fn open_stores() -> Stores {
    let refined = NamedTempFile::new().unwrap();
    let raw = NamedTempFile::new().unwrap();
    let db = Arc::new(Database::open(refined.path()).unwrap());
    let raw_db = Arc::new(RawDatabase::open(raw.path()).unwrap());
    Stores {
        _files: (refined, raw),
        db,
        raw: raw_db,
    }
}

/// Single text column of the first row returned by `sql`
pub fn query_text(db: &Database, sql: &str) -> String {
    db.conn().query_row(sql, [], |row| row.get(0)).unwrap()
}

/// Row count of a refined table
pub fn count_rows(db: &Database, table: &str) -> i64 {
    db.conn()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
