//! Integer and decimal coin amounts

use crate::codec::u128_from_str;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integer coin in a base denomination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination
    pub denom: String,
    /// Amount in base units
    #[serde(deserialize_with = "u128_from_str")]
    pub amount: u128,
}

impl Coin {
    /// Create a coin
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// Sum of all coins of `denom`
pub fn amount_of(coins: &[Coin], denom: &str) -> u128 {
    coins
        .iter()
        .filter(|c| c.denom == denom)
        .fold(0u128, |acc, c| acc.saturating_add(c.amount))
}

/// Per-denom totals
pub fn sum_by_denom(coins: &[Coin]) -> BTreeMap<String, u128> {
    let mut totals = BTreeMap::new();
    for coin in coins {
        let entry = totals.entry(coin.denom.clone()).or_insert(0u128);
        *entry = entry.saturating_add(coin.amount);
    }
    totals
}

/// Decimal coin as returned by the distribution module (e.g. `"12.500000000000000000"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecCoin {
    /// Denomination
    pub denom: String,
    /// Decimal amount string
    pub amount: String,
}

impl DecCoin {
    /// Integer part of the amount, discarding the fraction
    pub fn truncate(&self) -> Result<u128> {
        truncate_decimal(&self.amount)
    }
}

/// Integer part of a non-negative decimal string
pub fn truncate_decimal(value: &str) -> Result<u128> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidAmount(value.to_string()));
    }
    if int_part.is_empty() {
        return Ok(0);
    }
    int_part
        .parse::<u128>()
        .map_err(|_| Error::InvalidAmount(value.to_string()))
}

/// Truncated sum of all decimal coins of `denom`
pub fn truncated_amount_of(coins: &[DecCoin], denom: &str) -> Result<u128> {
    let mut total = 0u128;
    for coin in coins.iter().filter(|c| c.denom == denom) {
        total = total.saturating_add(coin.truncate()?);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_truncate_decimal() {
        assert_eq!(truncate_decimal("12.999999").unwrap(), 12);
        assert_eq!(truncate_decimal("7").unwrap(), 7);
        assert_eq!(truncate_decimal(".5").unwrap(), 0);
        assert_eq!(truncate_decimal("").unwrap(), 0);
        assert!(truncate_decimal("-1.0").is_err());
        assert!(truncate_decimal("1.x").is_err());
    }

    #[test]
    fn test_amount_of_filters_denom() {
        let coins = vec![
            Coin::new("ucore", 10),
            Coin::new("uatom", 3),
            Coin::new("ucore", 5),
        ];
        assert_eq!(amount_of(&coins, "ucore"), 15);
        assert_eq!(amount_of(&coins, "uosmo"), 0);
        let totals = sum_by_denom(&coins);
        assert_eq!(totals["ucore"], 15);
        assert_eq!(totals["uatom"], 3);
    }

    #[test]
    fn test_coin_from_json_string_amount() {
        let coin: Coin = serde_json::from_str(r#"{"denom":"ucore","amount":"1000"}"#).unwrap();
        assert_eq!(coin, Coin::new("ucore", 1000));
    }

    proptest! {
        #[test]
        fn prop_truncate_keeps_integer_part(int in 0u64..u64::MAX, frac in 0u32..1_000_000u32) {
            let s = format!("{int}.{frac:06}");
            prop_assert_eq!(truncate_decimal(&s).unwrap(), int as u128);
        }
    }
}
