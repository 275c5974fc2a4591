//! Column encodings shared by the repositories
//!
//! Times are stored as RFC 3339 text in UTC and big amounts as decimal text.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

pub(crate) fn ts_to_sql(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn opt_ts_to_sql(t: &Option<DateTime<Utc>>) -> Option<String> {
    t.as_ref().map(ts_to_sql)
}

pub(crate) fn ts_from_sql(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("timestamp {s}: {e}")))
}

pub(crate) fn opt_ts_from_sql(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(ts_from_sql).transpose()
}

pub(crate) fn amount_to_sql(v: u128) -> String {
    v.to_string()
}

pub(crate) fn amount_from_sql(s: &str) -> Result<u128> {
    if s.is_empty() {
        return Ok(0);
    }
    s.parse::<u128>()
        .map_err(|e| Error::Corrupt(format!("amount {s}: {e}")))
}

pub(crate) fn day_to_sql(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}
