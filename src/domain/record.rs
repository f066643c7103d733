//! Record capability and key types.
//!
//! A record is anything that can name itself and its parent. The tree
//! operations only ever ask a record for these two keys; the payload stays
//! opaque and is cloned into the output, never annotated in place.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde_json::Value;

/// Capability required by the tree operations: an identifier and a parent reference.
pub trait Record {
    type Key: Eq + Hash + Clone + fmt::Debug + fmt::Display;

    /// Unique identifier of this record.
    fn id(&self) -> Self::Key;

    /// Identifier of the parent record, or the sentinel root value.
    fn parent_id(&self) -> Self::Key;
}

impl<K> Record for (K, K)
where
    K: Eq + Hash + Clone + fmt::Debug + fmt::Display,
{
    type Key = K;

    fn id(&self) -> K {
        self.0.clone()
    }

    fn parent_id(&self) -> K {
        self.1.clone()
    }
}

/// Scalar key extracted from loosely-typed input.
///
/// Integers and numeric strings compare equal (`1 == "1"`), so a parent
/// reference written as a string still finds a numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Null,
    Int(i64),
    Str(String),
}

impl RecordKey {
    /// Normalise a string: integral text becomes `Int`, everything else stays `Str`.
    pub fn from_text(s: &str) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) => RecordKey::Int(n),
            Err(_) => RecordKey::Str(s.to_string()),
        }
    }

    /// Extract a key from a JSON scalar. Arrays, objects and booleans are not keys.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(RecordKey::Null),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(RecordKey::Int(i))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Some(RecordKey::Int(f as i64))
                        }
                        _ => Some(RecordKey::Str(n.to_string())),
                    }
                }
            }
            Value::String(s) => Some(RecordKey::from_text(s)),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Null => write!(f, "null"),
            RecordKey::Int(i) => write!(f, "{}", i),
            RecordKey::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Command-line form: `null` is the null sentinel, integers are `Int`.
impl FromStr for RecordKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "null" {
            Ok(RecordKey::Null)
        } else {
            Ok(RecordKey::from_text(s))
        }
    }
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        RecordKey::Int(value)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        RecordKey::from_text(value)
    }
}

/// A flat input item: its key, its parent key and the untouched JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub key: RecordKey,
    pub parent: RecordKey,
    pub payload: Value,
}

impl Record for FlatRecord {
    type Key = RecordKey;

    fn id(&self) -> RecordKey {
        self.key.clone()
    }

    fn parent_id(&self) -> RecordKey {
        self.parent.clone()
    }
}
