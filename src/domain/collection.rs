//! Record helpers: duplicate ids, numeric sort, empty-field pruning.

use std::cmp::Ordering;
use std::hash::Hash;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Each value that occurs more than once, reported once, in order of its second occurrence.
pub fn duplicates<T: Eq + Hash + Clone>(items: &[T]) -> Vec<T> {
    items.iter().duplicates().cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Stable sort of JSON objects by a numeric field.
///
/// Records where the field is missing or not a number keep their relative
/// order and go last regardless of direction.
pub fn sort_by_field(records: &mut [Value], field: &str, order: SortOrder) {
    records.sort_by(|a, b| {
        let lhs = a.get(field).and_then(Value::as_f64);
        let rhs = b.get(field).and_then(Value::as_f64);
        match (lhs, rhs) {
            (Some(x), Some(y)) => {
                let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Copy of `object` without null or empty-string fields.
pub fn non_null_fields(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .filter(|(_, value)| !matches!(value, Value::Null) && value.as_str() != Some(""))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
