//! Accounts of a genesis document

use crate::{Error, Result};
use exporter_core::coin::amount_of;
use exporter_core::{AccountCoin, AccountInfo, Coin};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Deserialize)]
struct GenesisBalance {
    address: String,
    #[serde(default)]
    coins: Vec<Coin>,
}

/// One row per genesis account with its bond-denom balance as both total and available
pub fn genesis_accounts(genesis: &Value) -> Result<Vec<AccountCoin>> {
    let bond_denom = genesis
        .pointer("/app_state/staking/params/bond_denom")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Decode("genesis has no staking bond_denom".to_string()))?;

    let balances: Vec<GenesisBalance> = match genesis.pointer("/app_state/bank/balances") {
        Some(v) if !v.is_null() => serde_json::from_value(v.clone())?,
        _ => Vec::new(),
    };
    let by_address: HashMap<&str, u128> = balances
        .iter()
        .map(|b| (b.address.as_str(), amount_of(&b.coins, bond_denom)))
        .collect();

    let accounts = genesis
        .pointer("/app_state/auth/accounts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut rows = Vec::with_capacity(accounts.len());
    for raw in accounts {
        let info = AccountInfo::from_value(raw)?;
        if info.address.is_empty() {
            continue;
        }
        let balance = by_address.get(info.address.as_str()).copied().unwrap_or(0);
        rows.push(AccountCoin {
            address: info.address,
            denom: bond_denom.to_string(),
            total: balance,
            available: balance,
            ..Default::default()
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_genesis_accounts_take_bond_balance() {
        let genesis = json!({
            "app_state": {
                "staking": {"params": {"bond_denom": "ucore"}},
                "bank": {"balances": [
                    {"address": "core1a", "coins": [
                        {"denom": "ucore", "amount": "100"}, {"denom": "uother", "amount": "9"}
                    ]}
                ]},
                "auth": {"accounts": [
                    {"@type": "/cosmos.auth.v1beta1.BaseAccount", "address": "core1a"},
                    {"@type": "/cosmos.auth.v1beta1.ModuleAccount",
                     "base_account": {"address": "core1mod"}, "name": "distribution"}
                ]}
            }
        });
        let rows = genesis_accounts(&genesis).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].total, rows[0].available), (100, 100));
        assert_eq!(rows[1].address, "core1mod");
        assert_eq!(rows[1].total, 0);
        assert!(rows.iter().all(|r| r.denom == "ucore" && r.delegated == 0));
    }
}
