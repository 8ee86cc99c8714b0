use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Role of a configured account within the account set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    Primary,
    Secondary,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRole::Primary => write!(f, "primary"),
            AccountRole::Secondary => write!(f, "secondary"),
        }
    }
}

/// Outcome of an idempotent table creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCreation {
    Created,
    AlreadyExists,
}

/// A staged write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    /// Insert if absent, merge fields if present. Never a full overwrite.
    UpsertMerge(Entity),
    /// Unconditional delete.
    Delete(Entity),
}

impl BatchOperation {
    pub fn entity(&self) -> &Entity {
        match self {
            BatchOperation::UpsertMerge(entity) | BatchOperation::Delete(entity) => entity,
        }
    }
}

/// A batch context for one table.
///
/// Operations are queued in order and nothing is sent until the batch is
/// committed through [`TableStore::commit_batch`](super::TableStore::commit_batch).
#[derive(Debug, Clone, PartialEq)]
pub struct TableBatch {
    table: String,
    operations: Vec<BatchOperation>,
}

impl TableBatch {
    /// Starts an empty batch against a physical table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            operations: Vec::new(),
        }
    }

    /// Queues an insert-or-merge.
    pub fn upsert_merge(&mut self, entity: Entity) {
        self.operations.push(BatchOperation::UpsertMerge(entity));
    }

    /// Queues an unconditional delete.
    pub fn delete(&mut self, entity: Entity) {
        self.operations
            .push(BatchOperation::Delete(entity.with_wildcard_etag()));
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn operations(&self) -> &[BatchOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Opaque cursor where a paginated query resumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    #[serde(rename = "nextpk")]
    pub next_partition_key: String,
    #[serde(rename = "nextrk")]
    pub next_row_key: String,
}

impl ContinuationToken {
    /// Builds a token only when both halves are present and non-empty.
    pub fn from_parts(partition_key: Option<&str>, row_key: Option<&str>) -> Option<Self> {
        match (partition_key, row_key) {
            (Some(pk), Some(rk)) if !pk.is_empty() && !rk.is_empty() => Some(Self {
                next_partition_key: pk.to_string(),
                next_row_key: rk.to_string(),
            }),
            _ => None,
        }
    }
}

/// A filtered, projected, paginated entity query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityQuery {
    /// Predicate passed verbatim to the store.
    pub filter: Option<String>,
    /// Maximum number of entities in one page. `None` uses the store default.
    pub top: Option<u32>,
    /// Fields to return. `None` returns every field.
    pub select: Option<Vec<String>>,
    pub continuation: Option<ContinuationToken>,
}

impl EntityQuery {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    /// Sets the projection from a comma-separated field list.
    pub fn with_select(mut self, select: &str) -> Self {
        let fields: Vec<String> = select
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self.select = (!fields.is_empty()).then_some(fields);
        self
    }

    pub fn with_continuation(mut self, continuation: Option<ContinuationToken>) -> Self {
        self.continuation = continuation;
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<Entity>,
    pub continuation: Option<ContinuationToken>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_preserves_staging_order() {
        let mut batch = TableBatch::new("aPRDt1");
        batch.upsert_merge(Entity::new("p", "r1"));
        batch.delete(Entity::new("p", "r2"));
        batch.upsert_merge(Entity::new("p", "r3"));

        let keys: Vec<&str> = batch
            .operations()
            .iter()
            .map(|op| op.entity().row_key.as_str())
            .collect();

        assert_eq!(batch.table(), "aPRDt1");
        assert_eq!(keys, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_batch_delete_forces_wildcard_etag() {
        let mut batch = TableBatch::new("aPRDt1");
        batch.delete(Entity::new("p", "r1"));

        assert_eq!(batch.operations()[0].entity().etag.as_deref(), Some("*"));
    }

    #[test]
    fn test_continuation_requires_both_parts() {
        assert!(ContinuationToken::from_parts(Some("p"), Some("r")).is_some());
        assert!(ContinuationToken::from_parts(Some("p"), None).is_none());
        assert!(ContinuationToken::from_parts(None, Some("r")).is_none());
        assert!(ContinuationToken::from_parts(Some(""), Some("r")).is_none());
    }

    #[test]
    fn test_with_select_splits_and_trims() {
        let query = EntityQuery::default().with_select("Id, v2 ,,");
        assert_eq!(
            query.select,
            Some(vec!["Id".to_string(), "v2".to_string()])
        );

        let query = EntityQuery::default().with_select(" , ");
        assert_eq!(query.select, None);
    }

    #[test]
    fn test_continuation_serializes_as_nextpk_nextrk() {
        let token = ContinuationToken::from_parts(Some("p"), Some("r")).unwrap();
        let json = serde_json::to_value(&token).unwrap();

        assert_eq!(json, serde_json::json!({"nextpk": "p", "nextrk": "r"}));
    }
}
