//! Fee extraction and daily totals

use crate::{Error, Result};
use exporter_core::coin::sum_by_denom;
use exporter_core::{Coin, DailyFee, Fee, StoredTransaction};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fee coins of a stored transaction payload
///
/// Protobuf-era payloads carry them under `tx.auth_info.fee.amount`, amino
/// payloads under `tx.value.fee.amount`.
pub fn fee_coins(chunk: &Value) -> Result<Vec<Coin>> {
    let amount = chunk
        .pointer("/tx/auth_info/fee/amount")
        .or_else(|| chunk.pointer("/tx/value/fee/amount"))
        .ok_or_else(|| Error::Decode("transaction has no fee".to_string()))?;
    match amount {
        Value::Null => Ok(Vec::new()),
        other => Ok(serde_json::from_value(other.clone())?),
    }
}

/// Fee rows and same-batch daily totals
pub fn fee_rows(txs: &[StoredTransaction]) -> Result<(Vec<Fee>, Vec<DailyFee>)> {
    let mut fees = Vec::new();
    let mut daily: BTreeMap<(chrono::NaiveDate, String), u128> = BTreeMap::new();
    for tx in txs {
        let chunk: Value = serde_json::from_str(&tx.chunk)?;
        for (denom, amount) in sum_by_denom(&fee_coins(&chunk)?) {
            let total = daily
                .entry((tx.timestamp.date_naive(), denom.clone()))
                .or_insert(0);
            *total = total.saturating_add(amount);
            fees.push(Fee {
                tx_id: tx.id,
                height: tx.height,
                tx_hash: tx.hash.clone(),
                denom,
                amount,
                timestamp: tx.timestamp,
            });
        }
    }
    let daily = daily
        .into_iter()
        .map(|((day, denom), amount)| DailyFee { day, denom, amount })
        .collect();
    Ok((fees, daily))
}
