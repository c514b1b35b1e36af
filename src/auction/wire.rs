//! Lenient decoders for the loosely typed fields the auction server sends.
//!
//! Identifiers arrive as either strings or numbers, and timestamps as either
//! epoch milliseconds or RFC 3339 strings. Everything is normalised to `String`
//! ids and `i64` epoch milliseconds.

use crate::types::MAX_TIMESTAMP_MS;
use chrono::DateTime;
use serde::{Deserialize, Deserializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

/// Parses a timestamp string (RFC 3339 or a decimal millisecond count)
pub fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(ms) = text.trim().parse::<i64>() {
        return Some(ms);
    }
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn resolve_timestamp<E: de::Error>(raw: RawTimestamp) -> Result<i64, E> {
    let ms = match raw {
        RawTimestamp::Int(ms) => ms,
        RawTimestamp::Float(ms) if ms.is_finite() => ms.round() as i64,
        RawTimestamp::Float(ms) => return Err(E::custom(format!("invalid timestamp: {ms}"))),
        RawTimestamp::Text(text) => parse_timestamp(&text)
            .ok_or_else(|| E::custom(format!("invalid timestamp: {text}")))?,
    };
    // Offset and deadline arithmetic relies on this range
    if !(0..=MAX_TIMESTAMP_MS).contains(&ms) {
        return Err(E::custom(format!("timestamp out of range: {ms}")));
    }
    Ok(ms)
}

pub fn timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    resolve_timestamp(RawTimestamp::deserialize(deserializer)?)
}

pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawTimestamp>::deserialize(deserializer)?
        .map(resolve_timestamp)
        .transpose()
}

pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Int(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Int(n) => n.to_string(),
        RawId::Text(s) => s,
    }))
}
