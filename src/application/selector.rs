//! Field selection between JSON documents and typed records.
//!
//! Input records are JSON objects; which fields carry the id and the parent
//! reference is configurable. The selector converts them into `FlatRecord`s
//! for the domain layer and renders node forests back into nested JSON,
//! writing the children (and optional key) field into the output copy only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::collection::non_null_fields;
use crate::domain::{fold_forest, DomainError, DomainResult, FlatRecord, Node, RecordKey};

/// Names of the fields that carry tree structure in a JSON record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelector {
    pub id_field: String,
    pub parent_field: String,
    pub children_field: String,
    /// Extra field set to the record id on every emitted node
    pub key_field: Option<String>,
    /// Leave null and empty-string fields out of emitted records
    pub drop_empty: bool,
}

impl Default for FieldSelector {
    fn default() -> Self {
        Self {
            id_field: "id".into(),
            parent_field: "parentId".into(),
            children_field: "children".into(),
            key_field: None,
            drop_empty: false,
        }
    }
}

impl FieldSelector {
    pub fn validate(&self) -> DomainResult<()> {
        for (name, value) in [
            ("id field", &self.id_field),
            ("parent field", &self.parent_field),
            ("children field", &self.children_field),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidArgument(format!(
                    "{} name must not be empty",
                    name
                )));
            }
        }
        if self.children_field == self.id_field || self.children_field == self.parent_field {
            return Err(DomainError::InvalidArgument(format!(
                "children field '{}' collides with id/parent field",
                self.children_field
            )));
        }
        if let Some(key) = &self.key_field {
            if key.trim().is_empty() || *key == self.children_field {
                return Err(DomainError::InvalidArgument(format!(
                    "invalid key field '{}'",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Convert a JSON array of objects into records.
    pub fn parse(&self, document: &Value) -> DomainResult<Vec<FlatRecord>> {
        match document {
            Value::Array(items) => self.extract(items),
            other => Err(DomainError::InvalidArgument(format!(
                "expected an array of records, got {}",
                json_kind(other)
            ))),
        }
    }

    /// Convert JSON objects into records.
    ///
    /// Every object needs a scalar id field. A missing parent field reads
    /// as `null`.
    pub fn extract(&self, items: &[Value]) -> DomainResult<Vec<FlatRecord>> {
        self.validate()?;
        items
            .iter()
            .enumerate()
            .map(|(pos, item)| self.extract_one(pos, item))
            .collect()
    }

    fn extract_one(&self, pos: usize, item: &Value) -> DomainResult<FlatRecord> {
        let object = item.as_object().ok_or_else(|| {
            DomainError::InvalidArgument(format!("record {} is {}, not an object", pos, json_kind(item)))
        })?;

        let id = object.get(&self.id_field).ok_or_else(|| {
            DomainError::InvalidArgument(format!("record {} has no '{}' field", pos, self.id_field))
        })?;
        let key = scalar_key(pos, &self.id_field, id)?;

        let parent = match object.get(&self.parent_field) {
            Some(value) => scalar_key(pos, &self.parent_field, value)?,
            None => RecordKey::Null,
        };

        Ok(FlatRecord {
            key,
            parent,
            payload: item.clone(),
        })
    }

    /// Nested JSON array: each node's payload with its children attached.
    pub fn render_forest(&self, forest: &[Node<FlatRecord>]) -> Value {
        Value::Array(fold_forest(forest, |record, children| {
            self.annotate(record, Some(children))
        }))
    }

    /// Flat JSON array of payloads, optionally carrying the key field.
    pub fn render_records(&self, records: &[FlatRecord]) -> Value {
        Value::Array(records.iter().map(|r| self.annotate(r, None)).collect())
    }

    fn annotate(&self, record: &FlatRecord, children: Option<Vec<Value>>) -> Value {
        let mut value = record.payload.clone();
        if let Value::Object(map) = &mut value {
            if self.drop_empty {
                *map = non_null_fields(map);
            }
            if let Some(children) = children {
                map.insert(self.children_field.clone(), Value::Array(children));
            }
            if let Some(key_field) = &self.key_field {
                let id = map.get(&self.id_field).cloned().unwrap_or(Value::Null);
                map.insert(key_field.clone(), id);
            }
        }
        value
    }
}

fn scalar_key(pos: usize, field: &str, value: &Value) -> DomainResult<RecordKey> {
    RecordKey::from_json(value).ok_or_else(|| {
        DomainError::InvalidArgument(format!(
            "record {}: field '{}' is {}, expected a scalar",
            pos,
            field,
            json_kind(value)
        ))
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_default_selector_when_validating_then_ok() {
        assert!(FieldSelector::default().validate().is_ok());
    }

    #[test]
    fn given_empty_field_name_when_validating_then_invalid_argument() {
        let selector = FieldSelector {
            id_field: " ".into(),
            ..FieldSelector::default()
        };
        assert!(matches!(
            selector.validate(),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn given_missing_parent_field_when_extracting_then_parent_is_null() {
        let records = FieldSelector::default()
            .parse(&json!([{"id": 1, "name": "a"}]))
            .unwrap();
        assert_eq!(records[0].key, RecordKey::Int(1));
        assert_eq!(records[0].parent, RecordKey::Null);
    }

    #[test]
    fn given_object_instead_of_array_when_parsing_then_invalid_argument() {
        let err = FieldSelector::default().parse(&json!({"id": 1})).unwrap_err();
        assert!(err.to_string().contains("expected an array"));
    }

    #[test]
    fn given_key_field_when_rendering_records_then_copies_id() {
        let selector = FieldSelector {
            key_field: Some("key".into()),
            ..FieldSelector::default()
        };
        let records = selector.parse(&json!([{"id": "a", "parentId": null}])).unwrap();
        let rendered = selector.render_records(&records);
        assert_eq!(rendered, json!([{"id": "a", "parentId": null, "key": "a"}]));
        assert!(records[0].payload.get("key").is_none(), "input copy untouched");
    }

    #[test]
    fn given_drop_empty_when_rendering_forest_then_null_fields_removed_children_kept() {
        let selector = FieldSelector {
            drop_empty: true,
            ..FieldSelector::default()
        };
        let records = selector
            .parse(&json!([{"id": 1, "parentId": null, "note": "", "tag": "x"}]))
            .unwrap();
        let forest = vec![Node::new(records[0].clone())];

        let rendered = selector.render_forest(&forest);

        assert_eq!(rendered, json!([{"id": 1, "tag": "x", "children": []}]));
    }
}
