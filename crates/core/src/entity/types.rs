use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the partition key system property.
pub const PARTITION_KEY: &str = "PartitionKey";
/// Name of the row key system property.
pub const ROW_KEY: &str = "RowKey";
/// Name of the timestamp system property maintained by the store.
pub const TIMESTAMP: &str = "Timestamp";
/// Field used to tag a batch item for deletion.
pub const DELETE_FLAG: &str = "delete";
/// Etag that forces an unconditional write or delete.
pub const WILDCARD_ETAG: &str = "*";

const RESERVED_FIELDS: [&str; 5] = [PARTITION_KEY, ROW_KEY, TIMESTAMP, "odata.etag", DELETE_FLAG];

/// A scalar field value.
///
/// Incoming records are restricted to this closed set; nested arrays and
/// objects fail deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Returns the value as a key candidate.
    ///
    /// Empty strings, booleans and nulls are not usable as keys.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }

    /// True for boolean `true` and for the string `true` in any case.
    pub fn is_truthy_flag(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A loosely typed incoming item: field name to scalar value.
pub type Record = BTreeMap<String, Value>;

/// The unit of storage, addressed by partition key and row key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "PartitionKey")]
    pub partition_key: String,
    #[serde(rename = "RowKey")]
    pub row_key: String,
    #[serde(rename = "odata.etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with no fields.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            etag: None,
            fields: BTreeMap::new(),
        }
    }

    /// Builds an entity from a record, dropping reserved system properties.
    pub fn from_record(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        record: &Record,
    ) -> Self {
        let fields = record
            .iter()
            .filter(|(name, _)| !is_reserved_field(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            etag: None,
            fields,
        }
    }

    /// Sets a field value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Marks the entity for an unconditional write or delete.
    pub fn with_wildcard_etag(mut self) -> Self {
        self.etag = Some(WILDCARD_ETAG.to_string());
        self
    }

    /// Keeps only the named fields. System properties are always kept.
    pub fn project(mut self, fields: &[String]) -> Self {
        self.fields.retain(|name, _| fields.iter().any(|f| f == name));
        self
    }
}

/// True for system properties and control fields that never become entity fields.
pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}
