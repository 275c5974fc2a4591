//! End-to-end sync scenarios against an in-memory node

mod common;

use chrono::Duration as ChronoDuration;
use common::*;
use exporter_core::{BondStatus, ChainStore, RawStore};
use exporter_storage_sqlite::Database;
use exporter_sync::{
    resolve_chain, CancelToken, Disassembler, Error, FeeAggregator, FeeConfig, GovernanceConfig,
    MsgRecognizer, ProposalWatcher, Recognized, RefineConfig, RefineEngine, Retriever,
    SharedState, SyncEngine, SyncMode, SyncProgress, ValidatorRefresher,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;

fn engine(node: &Arc<MockNode>, stores: &Stores, initial_height: i64) -> SyncEngine {
    SyncEngine::new(
        node.clone(),
        stores.db.clone(),
        stores.raw.clone(),
        Arc::new(SharedState::new()),
        sync_config(initial_height),
    )
}

async fn register_chain(node: &Arc<MockNode>, db: &Database) {
    resolve_chain(node.as_ref(), db, params(0)).await.unwrap();
}

#[tokio::test]
async fn test_basic_sync_from_initial_height() {
    let node = MockNode::starting_at(500);
    let (alice, bob) = (account(1), account(2));
    node.push_block(500, vec![]);
    node.push_block(501, vec![vec![send_msg(&alice, &bob, 10)]]);
    node.push_block(502, vec![vec![send_msg(&bob, &alice, 5)]]);
    node.set_validator_set(500, &[("VAL1", 10), ("VAL2", 5)]);
    node.set_validator_set(501, &[("VAL1", 10), ("VAL2", 5)]);

    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    let engine = engine(&node, &stores, 500);

    assert_eq!(engine.sync_once(SyncMode::Basic).await.unwrap(), 3);
    let db = &stores.db;
    assert_eq!(db.latest_block_height(CHAIN).unwrap(), 502);
    assert_eq!(stores.raw.latest_block_height().unwrap(), 502);
    assert_eq!(
        query_text(db, "SELECT parent_hash FROM block WHERE height = 500"),
        "genesis"
    );
    assert_eq!(
        query_text(db, "SELECT parent_hash FROM block WHERE height = 502"),
        "BLOCK501"
    );
    assert_eq!(count_rows(db, "tx"), 2);
    assert_eq!(count_rows(db, "tx_message_account"), 4);
    let staged: i64 = stores
        .raw
        .conn()
        .query_row("SELECT COUNT(*) FROM raw_transaction", [], |row| row.get(0))
        .unwrap();
    assert_eq!(staged, 2);

    // Genesis power comes from the set at the first height
    assert_eq!(count_rows(db, "power_event_history"), 2);

    // VAL2 never signed, so heights 500 and 501 fold into one range
    let misses = db.misses("VAL2").unwrap();
    assert_eq!(misses.len(), 1);
    assert_eq!((misses[0].start_height, misses[0].end_height), (500, 501));
    assert_eq!(misses[0].missing_count, 2);
    assert!(db.misses("VAL1").unwrap().is_empty());

    // Both parties of the sends got a balance row
    assert!(db.account_coin(&alice, DENOM).unwrap().is_some());
    assert!(db.account_coin(&bob, DENOM).unwrap().is_some());

    // Nothing new on the node: the second pass is a no-op
    assert_eq!(engine.sync_once(SyncMode::Basic).await.unwrap(), 0);
    assert_eq!(count_rows(db, "block"), 3);
    assert_eq!(engine.progress().current_height(), 502);
}

#[tokio::test]
async fn test_raw_passes_resume_after_initial_height() {
    let node = MockNode::starting_at(500);
    for height in 500..=502 {
        node.push_block(height, vec![]);
    }

    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    let engine = engine(&node, &stores, 500);

    assert_eq!(engine.sync_once(SyncMode::Raw).await.unwrap(), 3);
    assert_eq!(stores.raw.latest_block_height().unwrap(), 502);
    assert_eq!(stores.db.latest_block_height(CHAIN).unwrap(), 0);

    assert_eq!(engine.sync_once(SyncMode::Raw).await.unwrap(), 0);

    node.push_block(503, vec![]);
    assert_eq!(engine.sync_once(SyncMode::Raw).await.unwrap(), 1);
    assert_eq!(stores.raw.latest_block_height().unwrap(), 503);
}

#[tokio::test]
async fn test_wrapped_delegations_each_move_power() {
    let node = MockNode::new();
    let (delegator, operator) = (account(1), valoper(2));
    let delegate = |amount: &str| {
        json!({
            "@type": "/cosmos.staking.v1beta1.MsgDelegate",
            "delegator_address": delegator,
            "validator_address": operator,
            "amount": {"denom": DENOM, "amount": amount}
        })
    };
    node.push_block(1, vec![]);
    node.push_block(
        2,
        vec![vec![json!({
            "@type": "/cosmos.authz.v1beta1.MsgExec",
            "grantee": account(3),
            "msgs": [delegate("1000000"), delegate("2000000")]
        })]],
    );

    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    let engine = engine(&node, &stores, 0);
    assert_eq!(engine.sync_once(SyncMode::Basic).await.unwrap(), 2);

    let total: f64 = stores
        .db
        .conn()
        .query_row(
            "SELECT SUM(voting_power_delta) FROM power_event_history WHERE operator_address = ?1",
            [&operator],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count_rows(&stores.db, "power_event_history"), 2);
    assert_eq!(total, 3.0);
}

struct AssetIssueRecognizer;

impl MsgRecognizer for AssetIssueRecognizer {
    fn recognize(&self, type_url: &str, value: &Value) -> Option<Recognized> {
        if type_url != "/coreum.asset.ft.v1.MsgIssue" {
            return None;
        }
        Some(Recognized {
            msg_type: "asset/issue".to_string(),
            accounts: value["issuer"].as_str().map(|s| vec![s.to_string()])?,
        })
    }
}

#[tokio::test]
async fn test_chain_specific_messages_use_registered_recognizer() {
    let node = MockNode::new();
    let issuer = account(4);
    node.push_block(1, vec![]);
    node.push_block(
        2,
        vec![vec![json!({"@type": "/coreum.asset.ft.v1.MsgIssue", "issuer": issuer})]],
    );

    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    let mut disassembler = Disassembler::default();
    disassembler.register(Box::new(AssetIssueRecognizer));
    let engine = engine(&node, &stores, 0).with_disassembler(Arc::new(disassembler));
    assert_eq!(engine.sync_once(SyncMode::Basic).await.unwrap(), 2);

    assert_eq!(
        query_text(
            &stores.db,
            "SELECT account_address FROM tx_message_account WHERE msg_type = 'asset/issue'"
        ),
        issuer
    );
}

#[tokio::test]
async fn test_failed_retrieval_commits_nothing_for_that_height() {
    let node = MockNode::new();
    let (alice, bob) = (account(1), account(2));
    node.push_block(1, vec![]);
    let hashes = node.push_block(2, vec![vec![send_msg(&alice, &bob, 1)]]);
    node.fail_tx(&hashes[0]);

    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    let engine = engine(&node, &stores, 0);

    let err = engine.sync_once(SyncMode::Basic).await.unwrap_err();
    assert!(matches!(err, Error::Retrieval { height: 2, .. }));
    assert_eq!(stores.db.latest_block_height(CHAIN).unwrap(), 1);
    assert_eq!(stores.raw.latest_block_height().unwrap(), 1);
    assert_eq!(count_rows(&stores.db, "tx"), 0);

    node.heal_tx(&hashes[0]);
    assert_eq!(engine.sync_once(SyncMode::Basic).await.unwrap(), 1);
    assert_eq!(stores.db.latest_block_height(CHAIN).unwrap(), 2);
    assert_eq!(count_rows(&stores.db, "tx"), 1);
}

#[tokio::test]
async fn test_vesting_account_balances_at_block_time() {
    let node = MockNode::new();
    let (alice, bob) = (account(1), account(2));
    node.push_block(1, vec![]);
    let hashes = node.push_block(2, vec![vec![send_msg(&alice, &bob, 100)]]);

    let block_time = base_time() + ChronoDuration::seconds(10);
    node.set_account(
        &alice,
        json!({
            "@type": "/cosmos.vesting.v1beta1.ContinuousVestingAccount",
            "base_vesting_account": {
                "base_account": {"address": alice},
                "original_vesting": [{"denom": DENOM, "amount": "1000"}],
                "delegated_vesting": [],
                "end_time": (block_time.timestamp() + 50).to_string()
            },
            "start_time": (block_time.timestamp() - 50).to_string()
        }),
        2000,
    );

    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    engine(&node, &stores, 0)
        .sync_once(SyncMode::Basic)
        .await
        .unwrap();

    let row = stores.db.account_coin(&alice, DENOM).unwrap().unwrap();
    assert_eq!(row.available, 2000);
    assert_eq!(row.vesting, 500);
    assert_eq!(row.vested, 500);
    // Fractional rewards are truncated
    assert_eq!(row.rewards, 12);
    assert_eq!(row.total, 2000 + 500 + 12);
    assert_eq!(row.last_tx, hashes[0]);

    let receiver = stores.db.account_coin(&bob, DENOM).unwrap().unwrap();
    assert_eq!(receiver.vesting, 0);
    assert_eq!(receiver.total, 12);
}

#[tokio::test]
async fn test_failed_tx_keeps_links_but_skips_accounts() {
    let node = MockNode::new();
    let (alice, bob) = (account(1), account(2));
    node.push_block_with(1, vec![vec![send_msg(&alice, &bob, 1)]], |_, tx| {
        tx["code"] = json!(5);
    });

    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    engine(&node, &stores, 0)
        .sync_once(SyncMode::Basic)
        .await
        .unwrap();

    assert_eq!(count_rows(&stores.db, "tx"), 1);
    assert_eq!(count_rows(&stores.db, "tx_message_account"), 2);
    assert_eq!(count_rows(&stores.db, "account_coin"), 0);
}

#[tokio::test]
async fn test_fee_aggregation_advances_cursor() {
    let node = MockNode::new();
    let (alice, bob) = (account(1), account(2));
    node.push_block(1, vec![vec![send_msg(&alice, &bob, 1)]]);
    node.push_block(
        2,
        vec![
            vec![send_msg(&bob, &alice, 1)],
            vec![send_msg(&alice, &bob, 2)],
        ],
    );

    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    engine(&node, &stores, 0)
        .sync_once(SyncMode::Basic)
        .await
        .unwrap();

    let fees = FeeAggregator::new(stores.db.clone(), FeeConfig::default());
    assert_eq!(fees.run_once().unwrap(), 3);
    assert_eq!(fees.run_once().unwrap(), 0);
    assert_eq!(count_rows(&stores.db, "fee"), 3);
    let day = base_time().date_naive();
    assert_eq!(stores.db.daily_fee(&day, DENOM).unwrap(), 1500);
}

#[tokio::test]
async fn test_validator_ranks_follow_status_order() {
    let node = MockNode::new();
    let validator = |seed: u8, status: &str| {
        json!({
            "operator_address": valoper(seed),
            "consensus_pubkey": {
                "@type": "/cosmos.crypto.ed25519.PubKey",
                "key": base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [seed; 32])
            },
            "status": status,
            "tokens": "1000000",
            "description": {"moniker": format!("val-{seed}")},
            "unbonding_height": "0"
        })
    };
    node.set_validators(
        BondStatus::Bonded,
        vec![validator(1, "BOND_STATUS_BONDED"), validator(2, "BOND_STATUS_BONDED")],
    );
    node.set_validators(BondStatus::Unbonded, vec![validator(3, "BOND_STATUS_UNBONDED")]);

    let stores = open_stores();
    let refresher = ValidatorRefresher::new(
        node.clone(),
        stores.db.clone(),
        Arc::new(SharedState::new()),
        params(0),
    );
    assert_eq!(refresher.save_validators().await.unwrap(), 3);

    let mut rows = stores.db.validators().unwrap();
    rows.sort_by_key(|v| v.rank);
    let ranks: Vec<_> = rows.iter().map(|v| (v.moniker.as_str(), v.rank)).collect();
    // No unbonding validators: unbonded ranks continue after bonded ones
    assert_eq!(ranks, vec![("val-1", 1), ("val-2", 2), ("val-3", 3)]);
    assert_eq!(rows[0].address, account(1));
    assert_eq!(rows[0].status, BondStatus::Bonded.code());
    assert_eq!(rows[0].proposer.len(), 40);
}

#[tokio::test]
async fn test_catching_up_skips_validator_refresh() {
    let node = MockNode::new();
    let state = Arc::new(SharedState::new());
    state.set_catching_up(true);
    let stores = open_stores();
    let refresher = ValidatorRefresher::new(node, stores.db.clone(), state, params(0));
    assert_eq!(refresher.save_validators().await.unwrap(), 0);
}

#[tokio::test]
async fn test_refine_replays_raw_staging() {
    let node = MockNode::new();
    let (alice, bob) = (account(1), account(2));
    node.push_block(1, vec![vec![send_msg(&alice, &bob, 1)]]);
    node.push_block(2, vec![]);
    node.push_block(3, vec![vec![send_msg(&bob, &alice, 1)]]);

    // Raw mode only fills staging
    let stores = open_stores();
    register_chain(&node, &stores.db).await;
    assert_eq!(
        engine(&node, &stores, 0).sync_once(SyncMode::Raw).await.unwrap(),
        3
    );
    assert_eq!(count_rows(&stores.db, "block"), 0);

    let refined_file = NamedTempFile::new().unwrap();
    let refined = Arc::new(Database::open(refined_file.path()).unwrap());
    register_chain(&node, &refined).await;
    let refine = RefineEngine::new(
        refined.clone(),
        stores.raw.clone(),
        Retriever::new(node.clone(), sync_config(0).retrieval),
        Arc::new(Disassembler::default()),
        params(0),
        RefineConfig::default(),
        SyncProgress::new(),
        CancelToken::new(),
    );

    assert_eq!(refine.replay_blocks().unwrap(), 3);
    assert_eq!(refine.replay_transactions().unwrap(), 2);
    assert_eq!(refined.latest_block_height(CHAIN).unwrap(), 3);
    assert_eq!(count_rows(&refined, "tx"), 2);
    assert_eq!(count_rows(&refined, "tx_message_account"), 4);
    // Replays resume after what is already refined
    assert_eq!(refine.replay_blocks().unwrap(), 0);
    assert_eq!(refine.replay_transactions().unwrap(), 0);

    node.push_block(4, vec![vec![send_msg(&alice, &bob, 3)]]);
    assert_eq!(refine.refine_sync().await.unwrap(), 1);
    assert_eq!(refined.latest_block_height(CHAIN).unwrap(), 4);
    assert_eq!(count_rows(&refined, "tx"), 3);
    // Realtime refine stores no balances
    assert_eq!(count_rows(&refined, "account_coin"), 0);
}

#[tokio::test]
async fn test_proposal_alerts_fire_once_per_stage() {
    let node = MockNode::new();
    let proposal = |status: &str| {
        json!({
            "id": "7",
            "status": status,
            "title": "Raise block size",
            "summary": "More room",
            "proposer": account(1),
            "metadata": "",
            "messages": [],
            "submit_time": "2024-03-01T00:00:00Z",
            "deposit_end_time": "2024-03-03T00:00:00Z",
            "voting_end_time": "2024-03-08T00:00:00Z",
            "total_deposit": [{"denom": DENOM, "amount": "100"}]
        })
    };
    node.set_proposal(7, proposal("PROPOSAL_STATUS_DEPOSIT_PERIOD"));

    let stores = open_stores();
    let notifier = Arc::new(RecordingNotifier::default());
    let config = GovernanceConfig {
        web_uri: "https://explorer.test".to_string(),
        ..Default::default()
    };
    let watcher = ProposalWatcher::new(
        node.clone(),
        stores.db.clone(),
        Arc::new(SharedState::new()),
        CHAIN,
        config,
    )
    .with_notifier(notifier.clone());

    assert_eq!(watcher.save_all_proposals().await.unwrap(), 1);
    assert_eq!(watcher.save_all_proposals().await.unwrap(), 0);

    watcher.notify(7).await.unwrap();
    watcher.notify(7).await.unwrap();
    node.set_proposal(7, proposal("PROPOSAL_STATUS_VOTING_PERIOD"));
    watcher.notify(7).await.unwrap();
    watcher.notify(7).await.unwrap();
    node.set_proposal(7, proposal("PROPOSAL_STATUS_PASSED"));
    watcher.notify(7).await.unwrap();

    let messages = notifier.messages.lock().clone();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("[test-1] A new proposal has been submitted."));
    assert!(messages[0].contains("Title : Raise block size"));
    assert!(messages[0].contains("[https://explorer.test/proposals/7]"));
    assert!(messages[1].contains("Voting is in progress."));
    assert!(messages[1].contains("Proposal Title : Raise block size"));
}

#[tokio::test]
async fn test_live_proposals_are_refreshed_and_dropped() {
    let node = MockNode::new();
    node.set_proposal(
        3,
        json!({"id": "3", "status": "PROPOSAL_STATUS_VOTING_PERIOD", "title": "Spend"}),
    );
    let stores = open_stores();
    let state = Arc::new(SharedState::new());
    let watcher = ProposalWatcher::new(
        node.clone(),
        stores.db.clone(),
        Arc::clone(&state),
        CHAIN,
        GovernanceConfig::default(),
    );
    watcher.save_all_proposals().await.unwrap();

    assert_eq!(watcher.watch_live_proposals().await.unwrap(), 1);
    // Unknown ids stay on the worklist until the node knows them
    state.live_proposals().write().await.insert(99);

    node.set_proposal(
        3,
        json!({"id": "3", "status": "PROPOSAL_STATUS_PASSED", "title": "Spend"}),
    );
    assert_eq!(watcher.update_proposals().await.unwrap(), 1);
    assert_eq!(
        state.live_proposals().read().await.iter().copied().collect::<Vec<_>>(),
        vec![99]
    );
    let stored = stores.db.proposal(3).unwrap().unwrap();
    assert_eq!(stored.proposal_status, "PROPOSAL_STATUS_PASSED");
    assert_eq!(stored.yes, "10");
    assert!(stores.db.live_proposal_ids().unwrap().is_empty());
}

#[test]
fn test_mode_names_round_trip() {
    for mode in [SyncMode::Basic, SyncMode::Raw, SyncMode::Refine, SyncMode::Genesis] {
        assert_eq!(mode.name().parse::<SyncMode>().unwrap(), mode);
    }
    assert!("archive".parse::<SyncMode>().is_err());
}
