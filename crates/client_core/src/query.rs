//! Query-string encoding for list and search filters.
//!
//! Keys keep the order in which the filter declares them. Null and empty-string
//! values are dropped, arrays repeat their key once per element, and nested
//! objects are JSON-encoded into a single value.

use serde::Serialize;
use serde_json::Value;

use crate::error::RequestError;

pub type QueryPairs = Vec<(String, String)>;

/// Flattens a serializable filter into ordered `(key, value)` pairs.
pub fn query_pairs<T: Serialize + ?Sized>(filters: &T) -> Result<QueryPairs, RequestError> {
    let value = serde_json::to_value(filters)
        .map_err(|e| RequestError::encode(format!("failed to encode query filters: {e}")))?;
    Ok(pairs_from_value(&value))
}

pub fn pairs_from_value(value: &Value) -> QueryPairs {
    let Value::Object(map) = value else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(encoded) = scalar(item) {
                        pairs.push((key.clone(), encoded));
                    }
                }
            }
            other => {
                if let Some(encoded) = scalar(other) {
                    pairs.push((key.clone(), encoded));
                }
            }
        }
    }
    pairs
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(_) | Value::Array(_) => Some(value.to_string()),
    }
}

/// Percent-encodes pairs as `k=v&k=v`, without a leading `?`.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

/// Encodes a JSON filter object into a query string.
pub fn build_query_params(filters: &Value) -> String {
    encode_pairs(&pairs_from_value(filters))
}

/// Appends `?query` to `path` when there is anything to append.
pub fn with_query(path: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", encode_pairs(pairs))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::{
        domain::{Priority, TaskStatus},
        protocol::{Sort, TaskFilters},
    };

    use super::*;

    #[test]
    fn drops_null_and_empty_values() {
        assert_eq!(
            build_query_params(&json!({ "a": null, "b": "", "c": null, "d": 1 })),
            "d=1"
        );
    }

    #[test]
    fn repeats_array_values() {
        assert_eq!(build_query_params(&json!({ "tags": ["x", "y"] })), "tags=x&tags=y");
    }

    #[test]
    fn keeps_insertion_order() {
        assert_eq!(
            build_query_params(&json!({ "z": 1, "a": true, "m": "q" })),
            "z=1&a=true&m=q"
        );
    }

    #[test]
    fn json_encodes_nested_objects() {
        let pairs = pairs_from_value(&json!({ "sort": { "field": "due_date", "order": "asc" } }));
        assert_eq!(
            pairs,
            vec![(
                "sort".to_string(),
                r#"{"field":"due_date","order":"asc"}"#.to_string()
            )]
        );
    }

    #[test]
    fn typed_filters_follow_the_same_rules() {
        let filters = TaskFilters {
            status: vec![TaskStatus::Todo, TaskStatus::InProgress],
            priority: Some(Priority::High),
            search: Some(String::new()),
            sort: Some(Sort::desc("updated_at")),
            limit: Some(20),
            ..TaskFilters::default()
        };
        let pairs = query_pairs(&filters).expect("pairs");
        let keys: Vec<_> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["status", "status", "priority", "sort", "limit"]);
        assert_eq!(pairs[1].1, "in_progress");
        assert_eq!(pairs[3].1, r#"{"field":"updated_at","order":"desc"}"#);
    }

    #[test]
    fn percent_encodes_values() {
        assert_eq!(
            build_query_params(&json!({ "search": "a&b c" })),
            "search=a%26b+c"
        );
    }

    #[test]
    fn with_query_skips_empty_pairs() {
        assert_eq!(with_query("/tasks", &[]), "/tasks");
        assert_eq!(
            with_query("/tasks", &[("q".into(), "x".into())]),
            "/tasks?q=x"
        );
    }
}
