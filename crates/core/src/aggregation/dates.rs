//! Date interpretation for time-series charts
//!
//! Source timestamps arrive in mixed formats, so day bucketing tries an
//! ordered chain of strategies and keeps the first one that yields at least
//! one day key. Rows the winning strategy cannot parse are left out of the
//! series.
//!
//! Order: ISO-8601 with `T`, ISO-8601 with a space, Unix epoch seconds, and
//! finally the raw value's first 10 characters as an opaque key.

use chrono::{DateTime, NaiveDateTime};
use dashsync_domain::constants::RAW_DATE_PREFIX_LEN;
use dashsync_domain::{DateFormat, DocValue};

const ISO_PREFIX_LEN: usize = 19;

/// A named date parser producing a `YYYY-MM-DD` (or raw prefix) day key.
#[derive(Clone, Copy)]
pub struct DateStrategy {
    pub format: DateFormat,
    parse: fn(&DocValue) -> Option<String>,
}

impl DateStrategy {
    pub fn day_key(&self, value: &DocValue) -> Option<String> {
        (self.parse)(value)
    }
}

impl std::fmt::Debug for DateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateStrategy").field("format", &self.format).finish()
    }
}

pub const FALLBACK_CHAIN: [DateStrategy; 4] = [
    DateStrategy { format: DateFormat::IsoT, parse: parse_iso_t },
    DateStrategy { format: DateFormat::IsoSpace, parse: parse_iso_space },
    DateStrategy { format: DateFormat::EpochSeconds, parse: parse_epoch_seconds },
    DateStrategy { format: DateFormat::RawPrefix, parse: raw_prefix },
];

/// Day keys for `values` under the first strategy that parses at least one
/// of them. Entries the strategy rejects are `None`. Returns `None` when no
/// strategy yields a key.
pub fn bucket_days<'a, I>(values: I) -> Option<(DateFormat, Vec<Option<String>>)>
where
    I: IntoIterator<Item = Option<&'a DocValue>>,
    I::IntoIter: Clone,
{
    let values = values.into_iter();
    FALLBACK_CHAIN.iter().find_map(|strategy| {
        let keys: Vec<Option<String>> =
            values.clone().map(|value| value.and_then(|v| strategy.day_key(v))).collect();
        keys.iter().any(Option::is_some).then_some((strategy.format, keys))
    })
}

fn parse_iso_t(value: &DocValue) -> Option<String> {
    parse_iso(value, "%Y-%m-%dT%H:%M:%S")
}

fn parse_iso_space(value: &DocValue) -> Option<String> {
    parse_iso(value, "%Y-%m-%d %H:%M:%S")
}

fn parse_iso(value: &DocValue, format: &str) -> Option<String> {
    let DocValue::Text(text) = value else {
        return None;
    };
    let prefix = text.trim().get(..ISO_PREFIX_LEN)?;
    NaiveDateTime::parse_from_str(prefix, format)
        .ok()
        .map(|parsed| parsed.date().format("%Y-%m-%d").to_string())
}

fn parse_epoch_seconds(value: &DocValue) -> Option<String> {
    let seconds = match value {
        DocValue::Integer(seconds) if *seconds >= 0 => *seconds,
        DocValue::Text(text) if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => {
            text.parse::<i64>().ok()?
        }
        _ => return None,
    };
    DateTime::from_timestamp(seconds, 0).map(|parsed| parsed.format("%Y-%m-%d").to_string())
}

fn raw_prefix(value: &DocValue) -> Option<String> {
    value.as_text().map(|text| text.chars().take(RAW_DATE_PREFIX_LEN).collect())
}
