//! Voting power history, missed signatures and evidence

use crate::sql::{ts_from_sql, ts_to_sql};
use crate::Result;
use exporter_core::{Evidence, Miss, MissDetail, PowerEvent};
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) fn insert_power_events(conn: &Connection, events: &[PowerEvent]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT OR IGNORE INTO power_event_history (
            height, tx_hash, msg_index, inner_index, operator_address, proposer,
            msg_type, voting_power_delta, denom, timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )?;
    for e in events {
        stmt.execute(params![
            e.height,
            e.tx_hash,
            e.msg_index,
            e.inner_index,
            e.operator_address,
            e.proposer,
            e.msg_type,
            e.voting_power_delta,
            e.denom,
            ts_to_sql(&e.timestamp),
        ])?;
    }
    Ok(())
}

pub(crate) fn insert_evidence(conn: &Connection, evidence: &[Evidence]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO evidence (proposer, height, hash, timestamp) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for e in evidence {
        stmt.execute(params![e.proposer, e.height, e.hash, ts_to_sql(&e.timestamp)])?;
    }
    Ok(())
}

struct RangeRow {
    id: i64,
    start_height: i64,
    end_height: i64,
    missing_count: i64,
    start_time: String,
    end_time: String,
}

fn range_where(conn: &Connection, sql: &str, address: &str, height: i64) -> Result<Option<RangeRow>> {
    Ok(conn
        .query_row(sql, params![address, height], |row| {
            Ok(RangeRow {
                id: row.get(0)?,
                start_height: row.get(1)?,
                end_height: row.get(2)?,
                missing_count: row.get(3)?,
                start_time: row.get(4)?,
                end_time: row.get(5)?,
            })
        })
        .optional()?)
}

const RANGE_ENDING_AT: &str = r#"
    SELECT id, start_height, end_height, missing_count, start_time, end_time
    FROM miss WHERE address = ?1 AND end_height = ?2
"#;

const RANGE_STARTING_AT: &str = r#"
    SELECT id, start_height, end_height, missing_count, start_time, end_time
    FROM miss WHERE address = ?1 AND start_height = ?2
"#;

/// Record missed signatures and fold each new one into the address's ranges
///
/// A replayed detail is a no-op. A new detail at `h` joins the range ending at
/// `h - 1` and the range starting at `h + 1` when they exist.
pub(crate) fn insert_miss_details(conn: &Connection, details: &[MissDetail]) -> Result<()> {
    let mut sorted: Vec<&MissDetail> = details.iter().collect();
    sorted.sort();

    for d in sorted {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO miss_detail (address, height, proposer, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![d.address, d.height, d.proposer, ts_to_sql(&d.timestamp)],
        )?;
        if inserted == 0 {
            continue;
        }

        let ts = ts_to_sql(&d.timestamp);
        let before = range_where(conn, RANGE_ENDING_AT, &d.address, d.height - 1)?;
        let after = range_where(conn, RANGE_STARTING_AT, &d.address, d.height + 1)?;

        match (before, after) {
            (Some(b), Some(a)) => {
                conn.execute(
                    "UPDATE miss SET end_height = ?2, missing_count = ?3, end_time = ?4 WHERE id = ?1",
                    params![b.id, a.end_height, b.missing_count + 1 + a.missing_count, a.end_time],
                )?;
                conn.execute("DELETE FROM miss WHERE id = ?1", params![a.id])?;
            }
            (Some(b), None) => {
                conn.execute(
                    "UPDATE miss SET end_height = ?2, missing_count = ?3, end_time = ?4 WHERE id = ?1",
                    params![b.id, d.height, b.missing_count + 1, ts],
                )?;
            }
            (None, Some(a)) => {
                conn.execute(
                    "UPDATE miss SET start_height = ?2, missing_count = ?3, start_time = ?4 WHERE id = ?1",
                    params![a.id, d.height, a.missing_count + 1, ts],
                )?;
            }
            (None, None) => {
                conn.execute(
                    r#"
                    INSERT INTO miss (address, start_height, end_height, missing_count, start_time, end_time)
                    VALUES (?1, ?2, ?2, 1, ?3, ?3)
                    "#,
                    params![d.address, d.height, ts],
                )?;
            }
        }
    }
    Ok(())
}

pub(crate) fn misses(conn: &Connection, address: &str) -> Result<Vec<Miss>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT id, start_height, end_height, missing_count, start_time, end_time
        FROM miss WHERE address = ?1 ORDER BY start_height ASC
        "#,
    )?;
    let rows = stmt.query_map(params![address], |row| {
        Ok(RangeRow {
            id: row.get(0)?,
            start_height: row.get(1)?,
            end_height: row.get(2)?,
            missing_count: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
        })
    })?;

    let mut result = Vec::new();
    for row in rows {
        let r = row?;
        result.push(Miss {
            address: address.to_string(),
            start_height: r.start_height,
            end_height: r.end_height,
            missing_count: r.missing_count,
            start_time: ts_from_sql(&r.start_time)?,
            end_time: ts_from_sql(&r.end_time)?,
        });
    }
    Ok(result)
}
