//! Transaction rows

use crate::Result;
use chrono::{DateTime, Utc};
use exporter_core::{RawTransaction, Transaction, TxResponse};

/// Refined transaction rows; the block time stands in for a missing timestamp
pub fn transaction_rows(
    chain_id: &str,
    txs: &[TxResponse],
    block_time: DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    txs.iter()
        .map(|tx| {
            Ok(Transaction {
                chain_id: chain_id.to_string(),
                height: tx.height,
                code: tx.code,
                hash: tx.txhash.clone(),
                gas_wanted: tx.gas_wanted,
                gas_used: tx.gas_used,
                chunk: serde_json::to_string(&tx.raw)?,
                timestamp: tx.time().unwrap_or(block_time),
            })
        })
        .collect()
}

/// Staged form of a block's transactions
pub fn raw_transactions(chain_id: &str, txs: &[TxResponse]) -> Result<Vec<RawTransaction>> {
    txs.iter()
        .map(|tx| {
            Ok(RawTransaction {
                id: 0,
                chain_id: chain_id.to_string(),
                height: tx.height,
                tx_hash: tx.txhash.clone(),
                chunk: serde_json::to_string(&tx.raw)?,
            })
        })
        .collect()
}

/// Decode a staged transaction
pub fn tx_from_raw(raw: &RawTransaction) -> Result<TxResponse> {
    Ok(TxResponse::from_value(serde_json::from_str(&raw.chunk)?)?)
}
