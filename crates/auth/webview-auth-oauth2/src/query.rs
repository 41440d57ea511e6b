//! Query-string codec for redirect parameters and form-encoded bodies.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Joins `key=value` pairs with `&`.
///
/// Percent-escaping is the URL layer's job; values are emitted verbatim.
/// Pair order follows the map's iteration order and is not guaranteed to be
/// stable across calls.
pub fn encode_query(params: &HashMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Splits a `key=value&key=value` string into a parameter map.
///
/// Each part is split on the first `=` only, so values containing a literal
/// `=` (base64url-encoded tokens) survive intact. Parts without any `=` are
/// discarded.
pub fn decode_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for part in query.split('&') {
        let mut halves = part.splitn(2, '=');
        if let (Some(key), Some(value)) = (halves.next(), halves.next()) {
            if !key.is_empty() {
                params.insert(key.to_string(), value.to_string());
            }
        }
    }
    params
}

/// Lifts a decoded parameter map into the JSON-shaped mapping the callback
/// surface and the error interpreter work with.
pub(crate) fn to_param_map(params: HashMap<String, String>) -> Map<String, Value> {
    params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}
