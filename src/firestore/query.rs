//! Structured query builder.
//!
//! Covers the filter shapes the API uses: equality, range bounds, prefix
//! scans over a lexicographic index (a range pair with a high-sentinel
//! suffix), and `array-contains` membership tests.

use serde_json::{json, Value};

use crate::firestore::value::FirestoreValue;

/// Highest code point Firestore orders after any printable string; closing
/// bound for prefix scans.
const PREFIX_SENTINEL: char = '\u{f8ff}';

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equal(String, FirestoreValue),
    GreaterThanOrEqual(String, FirestoreValue),
    LessThanOrEqual(String, FirestoreValue),
    ArrayContains(String, FirestoreValue),
    And(Vec<Filter>),
}

impl Filter {
    pub fn equal(field: impl Into<String>, value: impl Into<FirestoreValue>) -> Self {
        Filter::Equal(field.into(), value.into())
    }

    pub fn less_than_or_equal(
        field: impl Into<String>,
        value: impl Into<FirestoreValue>,
    ) -> Self {
        Filter::LessThanOrEqual(field.into(), value.into())
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<FirestoreValue>) -> Self {
        Filter::ArrayContains(field.into(), value.into())
    }

    /// Prefix scan: `field >= prefix AND field <= prefix + U+F8FF`.
    pub fn prefix(field: impl Into<String>, prefix: &str) -> Self {
        let field = field.into();
        let mut upper = prefix.to_string();
        upper.push(PREFIX_SENTINEL);
        Filter::And(vec![
            Filter::GreaterThanOrEqual(field.clone(), prefix.into()),
            Filter::LessThanOrEqual(field, upper.into()),
        ])
    }

    fn field_filter(field: &str, op: &str, value: &FirestoreValue) -> Value {
        json!({
            "fieldFilter": {
                "field": { "fieldPath": field },
                "op": op,
                "value": value.to_wire()
            }
        })
    }

    pub fn to_wire(&self) -> Value {
        match self {
            Filter::Equal(field, value) => Self::field_filter(field, "EQUAL", value),
            Filter::GreaterThanOrEqual(field, value) => {
                Self::field_filter(field, "GREATER_THAN_OR_EQUAL", value)
            }
            Filter::LessThanOrEqual(field, value) => {
                Self::field_filter(field, "LESS_THAN_OR_EQUAL", value)
            }
            Filter::ArrayContains(field, value) => {
                Self::field_filter(field, "ARRAY_CONTAINS", value)
            }
            Filter::And(filters) => json!({
                "compositeFilter": {
                    "op": "AND",
                    "filters": filters.iter().map(Filter::to_wire).collect::<Vec<_>>()
                }
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredQuery {
    pub collection: String,
    pub select: Option<Vec<String>>,
    pub filter: Option<Filter>,
    pub limit: Option<i64>,
}

impl StructuredQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            select: None,
            filter: None,
            limit: None,
        }
    }

    pub fn select(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_wire(&self) -> Value {
        let mut query = json!({
            "from": [{ "collectionId": self.collection }]
        });
        if let Some(select) = &self.select {
            let fields: Vec<Value> = select
                .iter()
                .map(|f| json!({ "fieldPath": f }))
                .collect();
            query["select"] = json!({ "fields": fields });
        }
        if let Some(filter) = &self.filter {
            query["where"] = filter.to_wire();
        }
        if let Some(limit) = self.limit {
            query["limit"] = json!(limit);
        }
        query
    }

    /// Wrap as a count aggregation, optionally capped at `up_to`.
    pub fn to_count_wire(&self, up_to: Option<i64>) -> Value {
        let count = match up_to {
            Some(cap) => json!({ "upTo": cap.to_string() }),
            None => json!({}),
        };
        json!({
            "structuredAggregationQuery": {
                "structuredQuery": self.to_wire(),
                "aggregations": [{ "alias": "count", "count": count }]
            }
        })
    }
}
