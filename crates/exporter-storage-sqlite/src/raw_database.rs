//! Raw staging store
//!
//! Holds the verbatim node responses per height so that the refined store can
//! be rebuilt without talking to the node again.

use crate::busy::with_busy_retry;
use crate::database::open_connection;
use crate::{migrations, Result};
use exporter_core::{RawBlock, RawBundle, RawStore, RawTransaction};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Raw staging database
pub struct RawDatabase {
    conn: Mutex<Connection>,
}

impl RawDatabase {
    /// Open (or create) the staging store and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = open_connection(path)?;
        migrations::run_raw_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_raw_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get connection
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    fn insert_bundle(&self, bundle: &RawBundle) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let b = &bundle.block;
        tx.execute(
            r#"
            INSERT OR IGNORE INTO raw_block (chain_id, height, block_hash, num_txs, chunk)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![b.chain_id, b.height, b.block_hash, b.num_txs, b.chunk],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT OR IGNORE INTO raw_transaction (chain_id, height, tx_hash, chunk)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            for t in &bundle.transactions {
                stmt.execute(params![t.chain_id, t.height, t.tx_hash, t.chunk])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn read_block(row: &Row<'_>) -> rusqlite::Result<RawBlock> {
    Ok(RawBlock {
        id: row.get(0)?,
        chain_id: row.get(1)?,
        height: row.get(2)?,
        block_hash: row.get(3)?,
        num_txs: row.get(4)?,
        chunk: row.get(5)?,
    })
}

fn read_transaction(row: &Row<'_>) -> rusqlite::Result<RawTransaction> {
    Ok(RawTransaction {
        id: row.get(0)?,
        chain_id: row.get(1)?,
        height: row.get(2)?,
        tx_hash: row.get(3)?,
        chunk: row.get(4)?,
    })
}

impl RawStore for RawDatabase {
    fn latest_block_height(&self) -> exporter_core::Result<i64> {
        Ok(with_busy_retry(|| {
            Ok(self.conn().query_row(
                "SELECT COALESCE(MAX(height), 0) FROM raw_block",
                [],
                |row| row.get(0),
            )?)
        })?)
    }

    fn insert_raw_data(&self, bundle: &RawBundle) -> exporter_core::Result<()> {
        Ok(with_busy_retry(|| self.insert_bundle(bundle))?)
    }

    fn block_by_height(&self, height: i64) -> exporter_core::Result<Option<RawBlock>> {
        Ok(with_busy_retry(|| {
            Ok(self
                .conn()
                .query_row(
                    "SELECT id, chain_id, height, block_hash, num_txs, chunk FROM raw_block WHERE height = ?1",
                    params![height],
                    read_block,
                )
                .optional()?)
        })?)
    }

    fn blocks_from_id(
        &self,
        from_id: i64,
        max_height: i64,
        limit: usize,
    ) -> exporter_core::Result<Vec<RawBlock>> {
        Ok(with_busy_retry(|| {
            let conn = self.conn();
            let mut stmt = conn.prepare_cached(
                r#"
                SELECT id, chain_id, height, block_hash, num_txs, chunk FROM raw_block
                WHERE id >= ?1 AND height <= ?2
                ORDER BY id ASC LIMIT ?3
                "#,
            )?;
            let rows = stmt.query_map(params![from_id, max_height, limit as i64], read_block)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?)
    }

    fn transaction_by_hash(&self, hash: &str) -> exporter_core::Result<Option<RawTransaction>> {
        Ok(with_busy_retry(|| {
            Ok(self
                .conn()
                .query_row(
                    "SELECT id, chain_id, height, tx_hash, chunk FROM raw_transaction WHERE tx_hash = ?1",
                    params![hash],
                    read_transaction,
                )
                .optional()?)
        })?)
    }

    fn transactions_from_id(
        &self,
        from_id: i64,
        max_height: i64,
        limit: usize,
    ) -> exporter_core::Result<Vec<RawTransaction>> {
        Ok(with_busy_retry(|| {
            let conn = self.conn();
            let mut stmt = conn.prepare_cached(
                r#"
                SELECT id, chain_id, height, tx_hash, chunk FROM raw_transaction
                WHERE id >= ?1 AND height <= ?2
                ORDER BY id ASC LIMIT ?3
                "#,
            )?;
            let rows =
                stmt.query_map(params![from_id, max_height, limit as i64], read_transaction)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(height: i64, hashes: &[&str]) -> RawBundle {
        RawBundle {
            block: RawBlock {
                id: 0,
                chain_id: "test-1".to_string(),
                height,
                block_hash: format!("B{height}"),
                num_txs: hashes.len() as i64,
                chunk: "{}".to_string(),
            },
            transactions: hashes
                .iter()
                .map(|h| RawTransaction {
                    id: 0,
                    chain_id: "test-1".to_string(),
                    height,
                    tx_hash: h.to_string(),
                    chunk: "{}".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let db = RawDatabase::open_in_memory().unwrap();
        db.insert_raw_data(&bundle(10, &["A", "B"])).unwrap();
        db.insert_raw_data(&bundle(10, &["A", "B"])).unwrap();
        assert_eq!(db.latest_block_height().unwrap(), 10);
        let txs = db.transactions_from_id(1, 10, 100).unwrap();
        assert_eq!(txs.len(), 2);
    }

    #[test]
    fn test_id_driven_reads_respect_max_height() {
        let db = RawDatabase::open_in_memory().unwrap();
        for h in 1..=5 {
            db.insert_raw_data(&bundle(h, &[&format!("T{h}")])).unwrap();
        }
        let blocks = db.blocks_from_id(2, 4, 100).unwrap();
        assert_eq!(blocks.iter().map(|b| b.height).collect::<Vec<_>>(), vec![2, 3, 4]);
        let limited = db.blocks_from_id(1, 5, 2).unwrap();
        assert_eq!(limited.len(), 2);
        let tx = db.transaction_by_hash("T3").unwrap().unwrap();
        assert_eq!(tx.height, 3);
        assert!(db.block_by_height(9).unwrap().is_none());
    }
}
