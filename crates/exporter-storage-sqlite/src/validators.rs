//! Validator rows

use crate::sql::{opt_ts_from_sql, opt_ts_to_sql};
use crate::Result;
use exporter_core::Validator;
use rusqlite::{params, Connection, Row};

pub(crate) fn upsert_validators(conn: &Connection, validators: &[Validator]) -> Result<()> {
    // keybase_url is owned by the identity refresh and left untouched here
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO validator (
            operator_address, address, consensus_pubkey, proposer, rank, status, jailed,
            tokens, delegator_shares, moniker, identity, website, details,
            unbonding_height, unbonding_time, commission_rate, commission_max_rate,
            commission_change_rate, commission_update_time, min_self_delegation
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
        ON CONFLICT(operator_address) DO UPDATE SET
            address = excluded.address,
            consensus_pubkey = excluded.consensus_pubkey,
            proposer = excluded.proposer,
            rank = excluded.rank,
            status = excluded.status,
            jailed = excluded.jailed,
            tokens = excluded.tokens,
            delegator_shares = excluded.delegator_shares,
            moniker = excluded.moniker,
            identity = excluded.identity,
            website = excluded.website,
            details = excluded.details,
            unbonding_height = excluded.unbonding_height,
            unbonding_time = excluded.unbonding_time,
            commission_rate = excluded.commission_rate,
            commission_max_rate = excluded.commission_max_rate,
            commission_change_rate = excluded.commission_change_rate,
            commission_update_time = excluded.commission_update_time,
            min_self_delegation = excluded.min_self_delegation
        "#,
    )?;
    for v in validators {
        stmt.execute(params![
            v.operator_address,
            v.address,
            v.consensus_pubkey,
            v.proposer,
            v.rank,
            v.status,
            v.jailed,
            v.tokens,
            v.delegator_shares,
            v.moniker,
            v.identity,
            v.website,
            v.details,
            v.unbonding_height,
            opt_ts_to_sql(&v.unbonding_time),
            v.commission_rate,
            v.commission_max_rate,
            v.commission_change_rate,
            opt_ts_to_sql(&v.commission_update_time),
            v.min_self_delegation,
        ])?;
    }
    Ok(())
}

pub(crate) fn highest_rank_by_status(conn: &Connection, status: i32) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(rank), 0) FROM validator WHERE status = ?1",
        params![status],
        |row| row.get(0),
    )?)
}

type ValidatorRow = (Validator, Option<String>, Option<String>);

fn read_validator(row: &Row<'_>) -> rusqlite::Result<ValidatorRow> {
    let validator = Validator {
        operator_address: row.get(0)?,
        address: row.get(1)?,
        consensus_pubkey: row.get(2)?,
        proposer: row.get(3)?,
        rank: row.get(4)?,
        status: row.get(5)?,
        jailed: row.get(6)?,
        tokens: row.get(7)?,
        delegator_shares: row.get(8)?,
        moniker: row.get(9)?,
        identity: row.get(10)?,
        website: row.get(11)?,
        details: row.get(12)?,
        unbonding_height: row.get(13)?,
        unbonding_time: None,
        commission_rate: row.get(15)?,
        commission_max_rate: row.get(16)?,
        commission_change_rate: row.get(17)?,
        commission_update_time: None,
        min_self_delegation: row.get(19)?,
        keybase_url: row.get(20)?,
    };
    Ok((validator, row.get(14)?, row.get(18)?))
}

pub(crate) fn validators(conn: &Connection) -> Result<Vec<Validator>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT operator_address, address, consensus_pubkey, proposer, rank, status, jailed,
               tokens, delegator_shares, moniker, identity, website, details,
               unbonding_height, unbonding_time, commission_rate, commission_max_rate,
               commission_change_rate, commission_update_time, min_self_delegation, keybase_url
        FROM validator
        ORDER BY status DESC, rank ASC
        "#,
    )?;
    let rows = stmt.query_map([], read_validator)?;

    let mut result = Vec::new();
    for row in rows {
        let (mut validator, unbonding_time, update_time) = row?;
        validator.unbonding_time = opt_ts_from_sql(unbonding_time)?;
        validator.commission_update_time = opt_ts_from_sql(update_time)?;
        result.push(validator);
    }
    Ok(result)
}

pub(crate) fn update_keybase_urls(conn: &Connection, urls: &[(String, String)]) -> Result<()> {
    let mut stmt = conn
        .prepare_cached("UPDATE validator SET keybase_url = ?2 WHERE operator_address = ?1")?;
    for (operator, url) in urls {
        stmt.execute(params![operator, url])?;
    }
    Ok(())
}
