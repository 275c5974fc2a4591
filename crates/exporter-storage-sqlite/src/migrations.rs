//! Database schema migrations
//!
//! The refined store and the raw staging store live in separate files and
//! carry independent version chains.

use crate::{Error, Result};
use rusqlite::Connection;

/// Current refined schema version
pub const SCHEMA_VERSION: i32 = 5;

/// Current raw staging schema version
pub const RAW_SCHEMA_VERSION: i32 = 1;

/// Run all refined-store migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::debug!(
        "Running migrations: current_version={}, target_version={}",
        current_version,
        SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < 3 {
        migrate_v3(conn)?;
    }

    if current_version < 4 {
        migrate_v4(conn)?;
    }

    if current_version < 5 {
        migrate_v5(conn)?;
    }

    if current_version != SCHEMA_VERSION {
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Run all raw staging migrations
pub fn run_raw_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::debug!(
        "Running raw migrations: current_version={}, target_version={}",
        current_version,
        RAW_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_raw_v1(conn)?;
    }

    if current_version != RAW_SCHEMA_VERSION {
        set_schema_version(conn, RAW_SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Highest applied version, 0 for a fresh file
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    match result {
        Ok(v) => Ok(v),
        Err(_) => Ok(0),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    if inserted > 0 {
        tracing::debug!("Inserted schema version {}", version);
    }
    Ok(())
}

/// v1: chain registry, blocks, transactions and message-account links
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS chain_info (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chain_id TEXT NOT NULL UNIQUE,
            number_of_txs INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS block (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chain_id TEXT NOT NULL,
            height INTEGER NOT NULL,
            hash TEXT NOT NULL,
            parent_hash TEXT NOT NULL,
            proposer TEXT NOT NULL,
            num_signatures INTEGER NOT NULL,
            num_txs INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(chain_id, height)
        );

        CREATE TABLE IF NOT EXISTS tx (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chain_id TEXT NOT NULL,
            block_id INTEGER REFERENCES block(id),
            height INTEGER NOT NULL,
            code INTEGER NOT NULL,
            hash TEXT NOT NULL,
            gas_wanted INTEGER NOT NULL,
            gas_used INTEGER NOT NULL,
            chunk TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(chain_id, hash)
        );

        CREATE INDEX IF NOT EXISTS idx_tx_height ON tx(chain_id, height);

        CREATE TABLE IF NOT EXISTS tx_message_account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_hash TEXT NOT NULL,
            msg_type TEXT NOT NULL,
            account_address TEXT NOT NULL,
            height INTEGER NOT NULL,
            UNIQUE(tx_hash, msg_type, account_address)
        );

        CREATE INDEX IF NOT EXISTS idx_tma_account ON tx_message_account(account_address);
        "#,
    )
    .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}

/// v2: accounts, validators, voting power, uptime and evidence
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS account_coin (
            address TEXT NOT NULL,
            denom TEXT NOT NULL,
            total TEXT NOT NULL,
            available TEXT NOT NULL,
            delegated TEXT NOT NULL,
            undelegated TEXT NOT NULL,
            rewards TEXT NOT NULL,
            commission TEXT NOT NULL,
            vesting TEXT NOT NULL,
            vested TEXT NOT NULL,
            last_tx TEXT NOT NULL DEFAULT '',
            last_tx_time TEXT,
            PRIMARY KEY (address, denom)
        );

        CREATE TABLE IF NOT EXISTS validator (
            operator_address TEXT PRIMARY KEY,
            address TEXT NOT NULL,
            consensus_pubkey TEXT NOT NULL,
            proposer TEXT NOT NULL,
            rank INTEGER NOT NULL,
            status INTEGER NOT NULL,
            jailed INTEGER NOT NULL,
            tokens TEXT NOT NULL,
            delegator_shares TEXT NOT NULL,
            moniker TEXT NOT NULL,
            identity TEXT NOT NULL,
            website TEXT NOT NULL,
            details TEXT NOT NULL,
            unbonding_height INTEGER NOT NULL,
            unbonding_time TEXT,
            commission_rate TEXT NOT NULL,
            commission_max_rate TEXT NOT NULL,
            commission_change_rate TEXT NOT NULL,
            commission_update_time TEXT,
            min_self_delegation TEXT NOT NULL,
            keybase_url TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_validator_status_rank ON validator(status, rank);

        CREATE TABLE IF NOT EXISTS power_event_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            height INTEGER NOT NULL,
            tx_hash TEXT NOT NULL,
            msg_index INTEGER NOT NULL,
            operator_address TEXT NOT NULL,
            proposer TEXT NOT NULL,
            msg_type TEXT NOT NULL,
            voting_power_delta REAL NOT NULL,
            denom TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(height, tx_hash, msg_index, operator_address, proposer)
        );

        CREATE TABLE IF NOT EXISTS miss_detail (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL,
            height INTEGER NOT NULL,
            proposer TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(address, height)
        );

        CREATE TABLE IF NOT EXISTS miss (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL,
            start_height INTEGER NOT NULL,
            end_height INTEGER NOT NULL,
            missing_count INTEGER NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_miss_address_end ON miss(address, end_height);

        CREATE TABLE IF NOT EXISTS evidence (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            proposer TEXT NOT NULL,
            height INTEGER NOT NULL,
            hash TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(hash, height)
        );
        "#,
    )
    .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}

/// v3: governance
fn migrate_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS proposal (
            id INTEGER PRIMARY KEY,
            tx_hash TEXT NOT NULL DEFAULT '',
            proposer TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            proposal_type TEXT NOT NULL DEFAULT '',
            proposal_status TEXT NOT NULL DEFAULT '',
            tally_yes TEXT NOT NULL DEFAULT '',
            tally_abstain TEXT NOT NULL DEFAULT '',
            tally_no TEXT NOT NULL DEFAULT '',
            tally_no_with_veto TEXT NOT NULL DEFAULT '',
            initial_deposit_amount TEXT NOT NULL DEFAULT '',
            initial_deposit_denom TEXT NOT NULL DEFAULT '',
            total_deposit_amount TEXT NOT NULL DEFAULT '',
            total_deposit_denom TEXT NOT NULL DEFAULT '',
            submit_time TEXT,
            deposit_end_time TEXT,
            voting_start_time TEXT,
            voting_end_time TEXT,
            metadata TEXT NOT NULL DEFAULT '',
            metadata_chunk TEXT NOT NULL DEFAULT '',
            gov_rest_path TEXT NOT NULL DEFAULT '',
            chunk TEXT NOT NULL DEFAULT '',
            notification_status INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_proposal_status ON proposal(proposal_status);

        CREATE TABLE IF NOT EXISTS deposit (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            height INTEGER NOT NULL,
            proposal_id INTEGER NOT NULL,
            depositor TEXT NOT NULL,
            amount TEXT NOT NULL,
            denom TEXT NOT NULL,
            tx_hash TEXT NOT NULL,
            gas_wanted INTEGER NOT NULL,
            gas_used INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(proposal_id, depositor, tx_hash)
        );

        CREATE TABLE IF NOT EXISTS vote (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            height INTEGER NOT NULL,
            proposal_id INTEGER NOT NULL,
            voter TEXT NOT NULL,
            option TEXT NOT NULL,
            weight TEXT NOT NULL,
            tx_hash TEXT NOT NULL,
            gas_wanted INTEGER NOT NULL,
            gas_used INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(proposal_id, voter, tx_hash, option)
        );
        "#,
    )
    .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}

/// v4: fee aggregation and cursors
fn migrate_v4(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS index_pointer (
            name TEXT PRIMARY KEY,
            pointer INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS fee (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tx_id INTEGER NOT NULL,
            height INTEGER NOT NULL,
            tx_hash TEXT NOT NULL,
            denom TEXT NOT NULL,
            amount TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(tx_id, denom)
        );

        CREATE TABLE IF NOT EXISTS daily_fee (
            day TEXT NOT NULL,
            denom TEXT NOT NULL,
            amount TEXT NOT NULL,
            PRIMARY KEY (day, denom)
        );
        "#,
    )
    .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}

/// v5: power events keyed by their position inside `authz/exec`
fn migrate_v5(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE power_event_history_v5 (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            height INTEGER NOT NULL,
            tx_hash TEXT NOT NULL,
            msg_index INTEGER NOT NULL,
            inner_index INTEGER NOT NULL DEFAULT 0,
            operator_address TEXT NOT NULL,
            proposer TEXT NOT NULL,
            msg_type TEXT NOT NULL,
            voting_power_delta REAL NOT NULL,
            denom TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            UNIQUE(height, tx_hash, msg_index, inner_index, operator_address, proposer)
        );

        INSERT INTO power_event_history_v5 (
            id, height, tx_hash, msg_index, operator_address, proposer,
            msg_type, voting_power_delta, denom, timestamp
        )
        SELECT id, height, tx_hash, msg_index, operator_address, proposer,
            msg_type, voting_power_delta, denom, timestamp
        FROM power_event_history;

        DROP TABLE power_event_history;
        ALTER TABLE power_event_history_v5 RENAME TO power_event_history;
        "#,
    )
    .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}

/// Raw v1: staged blocks and transactions
fn migrate_raw_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS raw_block (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chain_id TEXT NOT NULL,
            height INTEGER NOT NULL UNIQUE,
            block_hash TEXT NOT NULL,
            num_txs INTEGER NOT NULL,
            chunk TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS raw_transaction (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chain_id TEXT NOT NULL,
            height INTEGER NOT NULL,
            tx_hash TEXT NOT NULL UNIQUE,
            chunk TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_raw_transaction_height ON raw_transaction(height);
        "#,
    )
    .map_err(|e| Error::Migration(e.to_string()))?;

    Ok(())
}
