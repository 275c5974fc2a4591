//! Account balance rows

use crate::sql::{amount_from_sql, amount_to_sql, opt_ts_from_sql, opt_ts_to_sql};
use crate::Result;
use exporter_core::AccountCoin;
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) fn upsert_account_coins(conn: &Connection, accounts: &[AccountCoin]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO account_coin (
            address, denom, total, available, delegated, undelegated,
            rewards, commission, vesting, vested, last_tx, last_tx_time
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(address, denom) DO UPDATE SET
            total = excluded.total,
            available = excluded.available,
            delegated = excluded.delegated,
            undelegated = excluded.undelegated,
            rewards = excluded.rewards,
            commission = excluded.commission,
            vesting = excluded.vesting,
            vested = excluded.vested,
            last_tx = CASE WHEN excluded.last_tx = '' THEN account_coin.last_tx ELSE excluded.last_tx END,
            last_tx_time = COALESCE(excluded.last_tx_time, account_coin.last_tx_time)
        "#,
    )?;
    for a in accounts {
        stmt.execute(params![
            a.address,
            a.denom,
            amount_to_sql(a.total),
            amount_to_sql(a.available),
            amount_to_sql(a.delegated),
            amount_to_sql(a.undelegated),
            amount_to_sql(a.rewards),
            amount_to_sql(a.commission),
            amount_to_sql(a.vesting),
            amount_to_sql(a.vested),
            a.last_tx,
            opt_ts_to_sql(&a.last_tx_time),
        ])?;
    }
    Ok(())
}

pub(crate) fn account_coin(
    conn: &Connection,
    address: &str,
    denom: &str,
) -> Result<Option<AccountCoin>> {
    let row = conn
        .query_row(
            r#"
            SELECT total, available, delegated, undelegated, rewards, commission,
                   vesting, vested, last_tx, last_tx_time
            FROM account_coin WHERE address = ?1 AND denom = ?2
            "#,
            params![address, denom],
            |row| {
                let amounts: [String; 8] = [
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ];
                Ok((amounts, row.get::<_, String>(8)?, row.get::<_, Option<String>>(9)?))
            },
        )
        .optional()?;

    let Some((amounts, last_tx, last_tx_time)) = row else {
        return Ok(None);
    };
    let [total, available, delegated, undelegated, rewards, commission, vesting, vested] = amounts;
    Ok(Some(AccountCoin {
        address: address.to_string(),
        denom: denom.to_string(),
        total: amount_from_sql(&total)?,
        available: amount_from_sql(&available)?,
        delegated: amount_from_sql(&delegated)?,
        undelegated: amount_from_sql(&undelegated)?,
        rewards: amount_from_sql(&rewards)?,
        commission: amount_from_sql(&commission)?,
        vesting: amount_from_sql(&vesting)?,
        vested: amount_from_sql(&vested)?,
        last_tx,
        last_tx_time: opt_ts_from_sql(last_tx_time)?,
    }))
}
