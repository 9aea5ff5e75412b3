//! Identified item contracts shared by every ordered collection.
//!
//! # Responsibility
//! - Define the identifier shape (`ItemId`) used for lookup and de-duplication.
//! - Define field lookup (`SortKey`) used by the sort operation.
//! - Provide `Record`, a JSON-object-backed item with arbitrary fields.
//!
//! # Invariants
//! - `ItemId::Int(1)` and `ItemId::Text("1")` are distinct identifiers.
//! - `SortKey` ordering is total: `Bool < Int/Float < Text`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Identifier carried by every collection item.
///
/// Serialized untagged so wire values `3` and `"abc"` both decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Text(String),
}

impl ItemId {
    /// Reads an id from a JSON value.
    ///
    /// Only integers and strings are ids; everything else is `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_i64().map(Self::Int),
            Value::String(text) => Some(Self::Text(text.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(value) => Value::from(*value),
            Self::Text(value) => Value::from(value.as_str()),
        }
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ItemId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Comparable field value extracted from an item for sorting.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) | Self::Float(_) => 1,
            Self::Text(_) => 2,
        }
    }

    /// Total ordering across all key shapes.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (left, right) => left.rank().cmp(&right.rank()),
        }
    }

    /// Reads a sort key from a scalar JSON value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_f64().map(Self::Float)),
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<bool> for SortKey {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SortKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for SortKey {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for SortKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&ItemId> for SortKey {
    fn from(value: &ItemId) -> Self {
        match value {
            ItemId::Int(id) => Self::Int(*id),
            ItemId::Text(id) => Self::Text(id.clone()),
        }
    }
}

/// Contract every element of an ordered collection satisfies.
pub trait CollectionItem {
    /// Stable identifier; `None` marks an item as invalid input.
    fn item_id(&self) -> Option<ItemId>;

    /// Field value used by sort; `None` when the field is absent.
    fn sort_key(&self, field: &str) -> Option<SortKey>;
}

/// Item with arbitrary JSON fields.
///
/// The `id` field carries identity. Any scalar field can drive sorting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record with only an `id` field.
    pub fn with_id(id: impl Into<ItemId>) -> Self {
        Self::new().set("id", id.into().to_json())
    }

    /// Wraps a JSON value; returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Builder-style field setter.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl CollectionItem for Record {
    fn item_id(&self) -> Option<ItemId> {
        self.fields.get("id").and_then(ItemId::from_json)
    }

    fn sort_key(&self, field: &str) -> Option<SortKey> {
        self.fields.get(field).and_then(SortKey::from_json)
    }
}
