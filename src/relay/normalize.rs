// src/relay/normalize.rs
//! Envelope unpacking and field mapping into `NormalizedItem`.
//!
//! Field resolution uses short-circuit "or" semantics over ordered alternates:
//! the first truthy value wins, otherwise the value of the last alternate is
//! kept (null when absent). A legitimate `hot: 0` therefore falls through to
//! `heat`/`rank`.

use anyhow::{anyhow, bail, Result};
use serde_json::Value;

use crate::relay::types::{NormalizedItem, RawItem};

pub const TITLE_KEYS: &[&str] = &["title", "text"];
pub const URL_KEYS: &[&str] = &["url", "link"];
pub const SCORE_KEYS: &[&str] = &["hot", "heat", "rank"];
pub const TS_KEYS: &[&str] = &["timestamp", "time"];

/// null, false, 0, "", [] and {} are falsy.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// `raw[k0] or raw[k1] or ...`
pub fn or_chain(raw: &RawItem, keys: &[&str]) -> Option<Value> {
    let mut last = None;
    for k in keys {
        last = raw.get(*k);
        if let Some(v) = last {
            if is_truthy(v) {
                return Some(v.clone());
            }
        }
    }
    last.filter(|v| !v.is_null()).cloned()
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Unpack the upstream envelope into its records.
///
/// Accepts a bare array or an object with an `items` array. An empty object
/// yields no records. Any other shape is rejected instead of being iterated.
pub fn items_from_envelope(envelope: Value) -> Result<Vec<RawItem>> {
    let records = match envelope {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => items,
            Some(other) => bail!("envelope `items` is {}, expected an array", kind(&other)),
            None if obj.is_empty() => Vec::new(),
            None => {
                let keys: Vec<&str> = obj.keys().map(String::as_str).take(8).collect();
                bail!("envelope object has no `items` key (keys: {})", keys.join(", "))
            }
        },
        other => bail!("envelope is {}, expected an array or an object", kind(&other)),
    };

    records
        .into_iter()
        .enumerate()
        .map(|(i, rec)| match rec {
            Value::Object(map) => Ok(map),
            other => Err(anyhow!("record #{i} is {}, expected an object", kind(&other))),
        })
        .collect()
}

pub fn normalize_item(source: &str, raw: RawItem, now: i64) -> NormalizedItem {
    let ts = TS_KEYS
        .iter()
        .filter_map(|k| raw.get(*k))
        .find(|v| is_truthy(v))
        .cloned()
        .unwrap_or_else(|| Value::from(now));

    NormalizedItem {
        source: source.to_string(),
        title: or_chain(&raw, TITLE_KEYS),
        url: or_chain(&raw, URL_KEYS),
        score: or_chain(&raw, SCORE_KEYS),
        ts,
        raw,
    }
}

/// One `NormalizedItem` per record, input order kept.
pub fn normalize_batch(source: &str, envelope: Value, now: i64) -> Result<Vec<NormalizedItem>> {
    let records = items_from_envelope(envelope)?;
    Ok(records
        .into_iter()
        .map(|raw| normalize_item(source, raw, now))
        .collect())
}
