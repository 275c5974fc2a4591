//! Fee rows, daily totals and cursors

use crate::sql::{amount_from_sql, amount_to_sql, day_to_sql, ts_to_sql};
use crate::Result;
use exporter_core::{DailyFee, Fee};
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) fn index_pointer(conn: &Connection, name: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT pointer FROM index_pointer WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?)
}

pub(crate) fn init_index_pointer(conn: &Connection, name: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO index_pointer (name, pointer) VALUES (?1, 0)",
        params![name],
    )?;
    Ok(())
}

/// Apply one fee batch; returns `false` when the cursor was already at or past `to`
pub(crate) fn save_fees(
    conn: &Connection,
    fees: &[Fee],
    daily: &[DailyFee],
    pointer: &str,
    to: i64,
) -> Result<bool> {
    init_index_pointer(conn, pointer)?;
    let current = index_pointer(conn, pointer)?.unwrap_or(0);
    if current >= to {
        return Ok(false);
    }

    let mut insert_fee = conn.prepare_cached(
        r#"
        INSERT OR IGNORE INTO fee (tx_id, height, tx_hash, denom, amount, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )?;
    for f in fees {
        insert_fee.execute(params![
            f.tx_id,
            f.height,
            f.tx_hash,
            f.denom,
            amount_to_sql(f.amount),
            ts_to_sql(&f.timestamp),
        ])?;
    }

    for d in daily {
        let day = day_to_sql(&d.day);
        let stored: Option<String> = conn
            .query_row(
                "SELECT amount FROM daily_fee WHERE day = ?1 AND denom = ?2",
                params![day, d.denom],
                |row| row.get(0),
            )
            .optional()?;
        let previous = match stored {
            Some(s) => amount_from_sql(&s)?,
            None => 0,
        };
        conn.execute(
            r#"
            INSERT INTO daily_fee (day, denom, amount) VALUES (?1, ?2, ?3)
            ON CONFLICT(day, denom) DO UPDATE SET amount = excluded.amount
            "#,
            params![day, d.denom, amount_to_sql(previous.saturating_add(d.amount))],
        )?;
    }

    conn.execute(
        "UPDATE index_pointer SET pointer = ?2 WHERE name = ?1",
        params![pointer, to],
    )?;
    Ok(true)
}

pub(crate) fn daily_fee(conn: &Connection, day: &chrono::NaiveDate, denom: &str) -> Result<u128> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT amount FROM daily_fee WHERE day = ?1 AND denom = ?2",
            params![day_to_sql(day), denom],
            |row| row.get(0),
        )
        .optional()?;
    match stored {
        Some(s) => amount_from_sql(&s),
        None => Ok(0),
    }
}
