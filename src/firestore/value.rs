//! Typed Firestore field values and their REST wire representation.
//!
//! The REST API tags every value with its type, e.g.
//! `{"stringValue": "x"}` or `{"arrayValue": {"values": [...]}}`; integers
//! travel as strings. Decoding is lenient: unknown tags decode to `Null`
//! rather than failing the whole document.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum FirestoreValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    Reference(String),
    Array(Vec<FirestoreValue>),
    Map(BTreeMap<String, FirestoreValue>),
}

impl FirestoreValue {
    pub fn to_wire(&self) -> Value {
        match self {
            FirestoreValue::Null => json!({ "nullValue": null }),
            FirestoreValue::Boolean(b) => json!({ "booleanValue": b }),
            FirestoreValue::Integer(i) => json!({ "integerValue": i.to_string() }),
            FirestoreValue::Double(d) => json!({ "doubleValue": d }),
            FirestoreValue::Timestamp(ts) => {
                json!({ "timestampValue": ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true) })
            }
            FirestoreValue::String(s) => json!({ "stringValue": s }),
            FirestoreValue::Reference(r) => json!({ "referenceValue": r }),
            FirestoreValue::Array(items) => json!({
                "arrayValue": { "values": items.iter().map(Self::to_wire).collect::<Vec<_>>() }
            }),
            FirestoreValue::Map(fields) => json!({ "mapValue": { "fields": fields_to_wire(fields) } }),
        }
    }

    pub fn from_wire(raw: &Value) -> FirestoreValue {
        let Some(obj) = raw.as_object() else {
            return FirestoreValue::Null;
        };
        if let Some(s) = obj.get("stringValue").and_then(Value::as_str) {
            FirestoreValue::String(s.to_string())
        } else if let Some(i) = obj.get("integerValue") {
            // integers arrive as strings, the emulator sometimes sends numbers
            let parsed = i
                .as_str()
                .and_then(|s| s.parse::<i64>().ok())
                .or_else(|| i.as_i64());
            parsed.map(FirestoreValue::Integer).unwrap_or(FirestoreValue::Null)
        } else if let Some(d) = obj.get("doubleValue") {
            d.as_f64().map(FirestoreValue::Double).unwrap_or(FirestoreValue::Null)
        } else if let Some(b) = obj.get("booleanValue").and_then(Value::as_bool) {
            FirestoreValue::Boolean(b)
        } else if let Some(r) = obj.get("referenceValue").and_then(Value::as_str) {
            FirestoreValue::Reference(r.to_string())
        } else if let Some(ts) = obj.get("timestampValue").and_then(Value::as_str) {
            DateTime::parse_from_rfc3339(ts)
                .map(|dt| FirestoreValue::Timestamp(dt.with_timezone(&Utc)))
                .unwrap_or(FirestoreValue::Null)
        } else if let Some(map) = obj.get("mapValue") {
            let fields = map
                .get("fields")
                .and_then(Value::as_object)
                .map(fields_from_wire_map)
                .unwrap_or_default();
            FirestoreValue::Map(fields)
        } else if let Some(arr) = obj.get("arrayValue") {
            let items = arr
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(Self::from_wire).collect())
                .unwrap_or_default();
            FirestoreValue::Array(items)
        } else {
            FirestoreValue::Null
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FirestoreValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FirestoreValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FirestoreValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FirestoreValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FirestoreValue]> {
        match self {
            FirestoreValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FirestoreValue>> {
        match self {
            FirestoreValue::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Convenience for string sets stored as arrays (member lists, domains).
    pub fn contains_str(&self, needle: &str) -> bool {
        self.as_array()
            .map(|items| items.iter().any(|v| v.as_str() == Some(needle)))
            .unwrap_or(false)
    }

    pub fn string_array(items: impl IntoIterator<Item = impl Into<String>>) -> FirestoreValue {
        FirestoreValue::Array(
            items
                .into_iter()
                .map(|s| FirestoreValue::String(s.into()))
                .collect(),
        )
    }
}

impl From<&str> for FirestoreValue {
    fn from(s: &str) -> Self {
        FirestoreValue::String(s.to_string())
    }
}

impl From<String> for FirestoreValue {
    fn from(s: String) -> Self {
        FirestoreValue::String(s)
    }
}

impl From<i64> for FirestoreValue {
    fn from(i: i64) -> Self {
        FirestoreValue::Integer(i)
    }
}

impl From<bool> for FirestoreValue {
    fn from(b: bool) -> Self {
        FirestoreValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FirestoreValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FirestoreValue::Timestamp(ts)
    }
}

pub fn fields_to_wire(fields: &BTreeMap<String, FirestoreValue>) -> Value {
    let mut obj = Map::new();
    for (k, v) in fields {
        obj.insert(k.clone(), v.to_wire());
    }
    Value::Object(obj)
}

pub fn fields_from_wire(raw: &Value) -> BTreeMap<String, FirestoreValue> {
    raw.as_object().map(fields_from_wire_map).unwrap_or_default()
}

fn fields_from_wire_map(obj: &Map<String, Value>) -> BTreeMap<String, FirestoreValue> {
    obj.iter()
        .map(|(k, v)| (k.clone(), FirestoreValue::from_wire(v)))
        .collect()
}
