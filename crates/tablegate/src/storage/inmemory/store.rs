//! In-memory table store implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use tablegate_core::entity::Entity;
use tablegate_core::store::{
    BatchOperation, ContinuationToken, EntityQuery, QueryPage, Result, StoreError, TableBatch,
    TableCreation, TableStore,
};

use super::filter::Filter;

/// Page size used when a query does not set `top`.
pub const DEFAULT_PAGE_SIZE: usize = 1_000;

type EntityKey = (String, String);
type Table = BTreeMap<EntityKey, Entity>;

/// In-memory storage backend.
///
/// Tables live in a `HashMap` behind an `Arc<RwLock<_>>`; entities are kept
/// ordered by `(PartitionKey, RowKey)`. Data is lost when the store is
/// dropped.
#[derive(Debug, Clone)]
pub struct InMemoryTableStore {
    account_name: String,
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl InMemoryTableStore {
    /// Creates an empty store for the named account.
    pub fn new(account_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            tables: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns a stored entity, if present.
    pub async fn get(&self, table: &str, partition_key: &str, row_key: &str) -> Option<Entity> {
        let tables = self.tables.read().await;
        tables
            .get(table)?
            .get(&(partition_key.to_string(), row_key.to_string()))
            .cloned()
    }

    /// True when the table exists.
    pub async fn has_table(&self, table: &str) -> bool {
        self.tables.read().await.contains_key(table)
    }
}

fn key_of(entity: &Entity) -> EntityKey {
    (entity.partition_key.clone(), entity.row_key.clone())
}

fn new_etag() -> String {
    format!("W/\"{}\"", Uuid::new_v4())
}

fn entity_not_found(table: &str, entity: &Entity) -> StoreError {
    StoreError::EntityNotFound {
        table: table.to_string(),
        partition_key: entity.partition_key.clone(),
        row_key: entity.row_key.clone(),
    }
}

/// Insert-or-merge against one table. Returns the new etag.
fn merge_into(table: &mut Table, entity: &Entity) -> String {
    let etag = new_etag();
    let stored = table
        .entry(key_of(entity))
        .or_insert_with(|| Entity::new(&entity.partition_key, &entity.row_key));

    stored.fields.extend(
        entity
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.clone())),
    );
    stored.etag = Some(etag.clone());
    etag
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    fn account_name(&self) -> &str {
        &self.account_name
    }

    async fn create_table(&self, table: &str) -> Result<TableCreation> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(table) {
            return Ok(TableCreation::AlreadyExists);
        }
        tables.insert(table.to_string(), Table::new());
        Ok(TableCreation::Created)
    }

    async fn upsert_merge(&self, table: &str, entity: &Entity) -> Result<Option<String>> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        Ok(Some(merge_into(rows, entity)))
    }

    async fn delete_entity(&self, table: &str, entity: &Entity) -> Result<()> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        rows.remove(&key_of(entity))
            .map(|_| ())
            .ok_or_else(|| entity_not_found(table, entity))
    }

    async fn commit_batch(&self, batch: &TableBatch) -> Result<Vec<Option<String>>> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(batch.table())
            .ok_or_else(|| StoreError::TableNotFound(batch.table().to_string()))?;

        // Apply to a copy so a failing operation leaves the table untouched.
        let mut staged = rows.clone();
        let mut tokens = Vec::with_capacity(batch.len());

        for operation in batch.operations() {
            match operation {
                BatchOperation::UpsertMerge(entity) => {
                    tokens.push(Some(merge_into(&mut staged, entity)));
                }
                BatchOperation::Delete(entity) => {
                    staged
                        .remove(&key_of(entity))
                        .ok_or_else(|| entity_not_found(batch.table(), entity))?;
                    tokens.push(None);
                }
            }
        }

        *rows = staged;
        Ok(tokens)
    }

    async fn query_entities(&self, table: &str, query: &EntityQuery) -> Result<QueryPage> {
        let filter = Filter::parse(query.filter.as_deref())?;
        let tables = self.tables.read().await;
        let rows = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let limit = query
            .top
            .map(|top| top as usize)
            .filter(|top| *top > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let start = query
            .continuation
            .as_ref()
            .map(|c| (c.next_partition_key.clone(), c.next_row_key.clone()));

        let mut matching = rows
            .range(start.unwrap_or_default()..)
            .map(|(_, entity)| entity)
            .filter(|entity| filter.matches(entity));

        let items: Vec<Entity> = matching
            .by_ref()
            .take(limit)
            .map(|entity| match &query.select {
                Some(fields) => entity.clone().project(fields),
                None => entity.clone(),
            })
            .collect();

        let continuation = matching.next().map(|next| ContinuationToken {
            next_partition_key: next.partition_key.clone(),
            next_row_key: next.row_key.clone(),
        });

        Ok(QueryPage {
            items,
            continuation,
        })
    }
}
