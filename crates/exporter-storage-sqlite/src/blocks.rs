//! Chain registry, blocks, transactions and message-account links

use crate::sql::{ts_from_sql, ts_to_sql};
use crate::Result;
use exporter_core::{Block, StoredTransaction, Tma, Transaction, TransactionRef};
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) fn ensure_chain(conn: &Connection, chain_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO chain_info (chain_id, number_of_txs) VALUES (?1, 0)",
        params![chain_id],
    )?;
    Ok(())
}

pub(crate) fn add_tx_count(conn: &Connection, chain_id: &str, delta: i64) -> Result<()> {
    if delta == 0 {
        return Ok(());
    }
    ensure_chain(conn, chain_id)?;
    conn.execute(
        "UPDATE chain_info SET number_of_txs = number_of_txs + ?2 WHERE chain_id = ?1",
        params![chain_id, delta],
    )?;
    Ok(())
}

pub(crate) fn number_of_txs(conn: &Connection, chain_id: &str) -> Result<i64> {
    let count = conn
        .query_row(
            "SELECT number_of_txs FROM chain_info WHERE chain_id = ?1",
            params![chain_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(count.unwrap_or(0))
}

pub(crate) fn latest_block_height(conn: &Connection, chain_id: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(height), 0) FROM block WHERE chain_id = ?1",
        params![chain_id],
        |row| row.get(0),
    )?)
}

/// Insert a block and attach any transactions stored ahead of it
pub(crate) fn insert_block(conn: &Connection, block: &Block) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR IGNORE INTO block
            (chain_id, height, hash, parent_hash, proposer, num_signatures, num_txs, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            block.chain_id,
            block.height,
            block.hash,
            block.parent_hash,
            block.proposer,
            block.num_signatures,
            block.num_txs,
            ts_to_sql(&block.timestamp),
        ],
    )?;
    conn.execute(
        r#"
        UPDATE tx SET block_id = (SELECT id FROM block WHERE chain_id = ?1 AND height = ?2)
        WHERE chain_id = ?1 AND height = ?2 AND block_id IS NULL
        "#,
        params![block.chain_id, block.height],
    )?;
    Ok(())
}

/// Insert transactions; returns how many were new
pub(crate) fn insert_transactions(conn: &Connection, txs: &[Transaction]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT OR IGNORE INTO tx
            (chain_id, block_id, height, code, hash, gas_wanted, gas_used, chunk, timestamp)
        VALUES (
            ?1,
            (SELECT id FROM block WHERE chain_id = ?1 AND height = ?2),
            ?2, ?3, ?4, ?5, ?6, ?7, ?8
        )
        "#,
    )?;
    let mut inserted = 0;
    for tx in txs {
        inserted += stmt.execute(params![
            tx.chain_id,
            tx.height,
            tx.code,
            tx.hash,
            tx.gas_wanted,
            tx.gas_used,
            tx.chunk,
            ts_to_sql(&tx.timestamp),
        ])?;
    }
    Ok(inserted)
}

pub(crate) fn insert_tmas(conn: &Connection, tmas: &[Tma]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT OR IGNORE INTO tx_message_account (tx_hash, msg_type, account_address, height)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )?;
    for tma in tmas {
        stmt.execute(params![
            tma.tx_hash,
            tma.msg_type,
            tma.account_address,
            tma.height
        ])?;
    }
    Ok(())
}

pub(crate) fn latest_transaction(conn: &Connection, chain_id: &str) -> Result<Option<TransactionRef>> {
    Ok(conn
        .query_row(
            r#"
            SELECT id, height, hash FROM tx
            WHERE chain_id = ?1
            ORDER BY height DESC, id DESC
            LIMIT 1
            "#,
            params![chain_id],
            |row| {
                Ok(TransactionRef {
                    id: row.get(0)?,
                    height: row.get(1)?,
                    hash: row.get(2)?,
                })
            },
        )
        .optional()?)
}

pub(crate) fn transactions_after(
    conn: &Connection,
    after: i64,
    limit: usize,
) -> Result<Vec<StoredTransaction>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, height, hash, chunk, timestamp FROM tx WHERE id > ?1 ORDER BY id ASC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![after, limit as i64], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (id, height, hash, chunk, timestamp) = row?;
        result.push(StoredTransaction {
            id,
            height,
            hash,
            chunk,
            timestamp: ts_from_sql(&timestamp)?,
        });
    }
    Ok(result)
}

/// Blocks, transactions and links as one unit; shared by every commit path
pub(crate) fn insert_chain_data(
    conn: &Connection,
    blocks: &[&Block],
    txs: &[Transaction],
    tmas: &[Tma],
) -> Result<()> {
    for block in blocks {
        ensure_chain(conn, &block.chain_id)?;
        insert_block(conn, block)?;
    }
    let inserted = insert_transactions(conn, txs)?;
    if let Some(first) = txs.first() {
        add_tx_count(conn, &first.chain_id, inserted as i64)?;
    }
    insert_tmas(conn, tmas)?;
    Ok(())
}
