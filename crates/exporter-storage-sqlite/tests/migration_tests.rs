//! Migration tests
//!
//! Fresh creation, idempotent re-runs and version tracking for both stores.

use exporter_storage_sqlite::migrations;
use rusqlite::Connection;
use tempfile::NamedTempFile;

fn tables(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

#[test]
fn test_fresh_migration() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();

    let names = tables(&conn);
    for expected in [
        "account_coin",
        "block",
        "chain_info",
        "daily_fee",
        "deposit",
        "evidence",
        "fee",
        "index_pointer",
        "miss",
        "miss_detail",
        "power_event_history",
        "proposal",
        "schema_version",
        "tx",
        "tx_message_account",
        "validator",
        "vote",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing table {expected}");
    }
}

#[test]
fn test_migration_idempotency() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();
    migrations::run_migrations(&conn).unwrap();

    assert_eq!(
        migrations::get_schema_version(&conn).unwrap(),
        migrations::SCHEMA_VERSION
    );
}

#[test]
fn test_raw_schema_is_separate() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_raw_migrations(&conn).unwrap();

    let names = tables(&conn);
    assert!(names.iter().any(|n| n == "raw_block"));
    assert!(names.iter().any(|n| n == "raw_transaction"));
    assert!(!names.iter().any(|n| n == "block"));
    assert_eq!(
        migrations::get_schema_version(&conn).unwrap(),
        migrations::RAW_SCHEMA_VERSION
    );
}

#[test]
fn test_partial_upgrade_from_v2() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    // A store created before governance and fees existed
    migrations::run_migrations(&conn).unwrap();
    conn.execute_batch(
        "DROP TABLE proposal; DROP TABLE deposit; DROP TABLE vote; \
         DROP TABLE fee; DROP TABLE daily_fee; DROP TABLE index_pointer; \
         DELETE FROM schema_version; INSERT INTO schema_version (version) VALUES (2);",
    )
    .unwrap();

    migrations::run_migrations(&conn).unwrap();

    let names = tables(&conn);
    assert!(names.iter().any(|n| n == "proposal"));
    assert!(names.iter().any(|n| n == "daily_fee"));
}

#[test]
fn test_upgrade_from_v4_keys_power_events_by_position() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    // A v4 store whose power history has no inner position
    migrations::run_migrations(&conn).unwrap();
    conn.execute_batch(
        "DROP TABLE power_event_history; \
         CREATE TABLE power_event_history ( \
            id INTEGER PRIMARY KEY AUTOINCREMENT, height INTEGER NOT NULL, \
            tx_hash TEXT NOT NULL, msg_index INTEGER NOT NULL, \
            operator_address TEXT NOT NULL, proposer TEXT NOT NULL, \
            msg_type TEXT NOT NULL, voting_power_delta REAL NOT NULL, \
            denom TEXT NOT NULL, timestamp TEXT NOT NULL, \
            UNIQUE(height, tx_hash, msg_index, operator_address, proposer)); \
         INSERT INTO power_event_history (height, tx_hash, msg_index, operator_address, \
            proposer, msg_type, voting_power_delta, denom, timestamp) \
         VALUES (5, 'H', 0, 'corevaloper1v', '', 'staking/delegate', 1.0, 'ucore', 't'); \
         DELETE FROM schema_version; INSERT INTO schema_version (version) VALUES (4);",
    )
    .unwrap();

    migrations::run_migrations(&conn).unwrap();

    assert_eq!(
        migrations::get_schema_version(&conn).unwrap(),
        migrations::SCHEMA_VERSION
    );
    let kept: i64 = conn
        .query_row("SELECT COUNT(*) FROM power_event_history WHERE inner_index = 0", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(kept, 1);
    conn.execute(
        "INSERT INTO power_event_history (height, tx_hash, msg_index, inner_index, \
            operator_address, proposer, msg_type, voting_power_delta, denom, timestamp) \
         VALUES (5, 'H', 0, 1, 'corevaloper1v', '', 'staking/delegate', 2.0, 'ucore', 't')",
        [],
    )
    .unwrap();
}
