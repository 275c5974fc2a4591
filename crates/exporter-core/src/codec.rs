//! Serde helpers for the node's JSON encoding
//!
//! Tendermint and the Cosmos REST gateway encode 64-bit integers as strings.
//! These helpers accept either strings or bare numbers.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Signed(i64),
    Unsigned(u64),
}

fn parse_i128<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) if s.is_empty() => Ok(0),
        StringOrNumber::String(s) => s.parse::<i128>().map_err(de::Error::custom),
        StringOrNumber::Signed(v) => Ok(v as i128),
        StringOrNumber::Unsigned(v) => Ok(v as i128),
    }
}

/// `i64` from a string or number
pub fn i64_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let v = parse_i128(deserializer)?;
    i64::try_from(v).map_err(de::Error::custom)
}

/// `u64` from a string or number
pub fn u64_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let v = parse_i128(deserializer)?;
    u64::try_from(v).map_err(de::Error::custom)
}

/// `u128` from an integer string
pub fn u128_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) if s.is_empty() => Ok(0),
        StringOrNumber::String(s) => s.parse::<u128>().map_err(de::Error::custom),
        StringOrNumber::Signed(v) => u128::try_from(v).map_err(de::Error::custom),
        StringOrNumber::Unsigned(v) => Ok(v as u128),
    }
}

/// Treat JSON `null` as the type's default
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
