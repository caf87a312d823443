//! Parameter encoding.
//!
//! URL encoding flattens a JSON object into `key=value` pairs: keys sorted,
//! nested objects as `key[sub]`, arrays as `key[]`, booleans as `1`/`0`,
//! null as an empty value. Keys and values are percent-encoded so only
//! unreserved characters stay literal.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request parameters: a string-keyed map of arbitrary JSON values.
pub type Parameters = Map<String, Value>;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Where and how parameters are written into a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterEncoding {
    /// Query string for GET, HEAD and DELETE; form body otherwise.
    #[default]
    Url,
    /// Always the query string.
    UrlQuery,
    /// Always a form body.
    UrlBody,
    /// A JSON object body.
    Json,
}

/// Flatten `parameters` into a percent-encoded `a=1&b=2` string.
pub fn query_string(parameters: &Parameters) -> String {
    let mut pairs = Vec::new();
    for (key, value) in sorted(parameters) {
        components(key, value, &mut pairs);
    }
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append an encoded query to `url`, respecting an existing query string.
pub(crate) fn append_query(url: &mut String, query: &str) {
    if query.is_empty() {
        return;
    }
    if url.contains('?') {
        if !url.ends_with('?') && !url.ends_with('&') {
            url.push('&');
        }
    } else {
        url.push('?');
    }
    url.push_str(query);
}

fn sorted(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn components(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (nested, value) in sorted(map) {
                components(&format!("{key}[{nested}]"), value, out);
            }
        }
        Value::Array(items) => {
            for value in items {
                components(&format!("{key}[]"), value, out);
            }
        }
        Value::Bool(flag) => out.push((key.to_string(), if *flag { "1" } else { "0" }.to_string())),
        Value::Null => out.push((key.to_string(), String::new())),
        Value::Number(number) => out.push((key.to_string(), number.to_string())),
        Value::String(text) => out.push((key.to_string(), text.clone())),
    }
}
