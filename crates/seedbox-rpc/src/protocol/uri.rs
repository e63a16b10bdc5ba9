//! Query-string requests (`GET /transmission/rpc?method=torrent-get&ids=1-3`).
//!
//! `method` and `tag` stay top-level; every other key becomes an argument.
//! Values that look like numbers or number ranges become integers or
//! integer lists, everything else stays a string.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Largest list a range expression may expand to; longer ones stay strings.
const MAX_LIST_LEN: usize = 65_536;

/// Build a legacy request object from a raw query string.
pub fn query_to_request(query: &str) -> Value {
    let mut request = Map::new();
    let mut arguments = Map::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode(key);
        let text = decode(raw);
        match key.as_str() {
            "method" => {
                request.insert(key, Value::String(text));
            }
            "tag" => {
                let tag = text
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or(Value::String(text));
                request.insert(key, tag);
            }
            _ => {
                arguments.insert(key, typed_value(&text));
            }
        }
    }

    request.insert("arguments".into(), Value::Object(arguments));
    Value::Object(request)
}

fn decode(text: &str) -> String {
    let text = text.replace('+', " ");
    urlencoding::decode(&text)
        .map(|s| s.into_owned())
        .unwrap_or(text)
}

fn typed_value(text: &str) -> Value {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = text.parse::<i64>() {
            return Value::from(n);
        }
    }
    match number_list(text) {
        Some(list) => Value::from(list),
        None => Value::String(text.to_string()),
    }
}

/// Parse "9,1,4-6,5" into the sorted, deduplicated [1,4,5,6,9].
fn number_list(text: &str) -> Option<Vec<i64>> {
    if !text.contains([',', '-']) {
        return None;
    }
    let mut out = BTreeSet::new();
    for part in text.split(',') {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: i64 = parse_digits(lo)?;
                let hi: i64 = parse_digits(hi)?;
                let span = usize::try_from(hi.checked_sub(lo)?).ok()?;
                if span >= MAX_LIST_LEN {
                    return None;
                }
                out.extend(lo..=hi);
            }
            None => {
                out.insert(parse_digits(part)?);
            }
        }
        if out.len() > MAX_LIST_LEN {
            return None;
        }
    }
    Some(out.into_iter().collect())
}

fn parse_digits(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
