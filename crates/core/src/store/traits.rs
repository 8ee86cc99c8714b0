use async_trait::async_trait;

use crate::entity::Entity;

use super::{EntityQuery, QueryPage, Result, TableBatch, TableCreation};

/// A backing table store account.
///
/// Implementations are long-lived, hold no per-call state and are safe for
/// concurrent use.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Name of the account this handle talks to.
    fn account_name(&self) -> &str;

    /// Creates a table. An existing table is reported, not failed.
    async fn create_table(&self, table: &str) -> Result<TableCreation>;

    /// Inserts the entity, or merges its fields into the existing one.
    /// Returns the new etag when the store reports one.
    async fn upsert_merge(&self, table: &str, entity: &Entity) -> Result<Option<String>>;

    /// Deletes the entity unconditionally.
    async fn delete_entity(&self, table: &str, entity: &Entity) -> Result<()>;

    /// Commits a staged batch atomically.
    ///
    /// Returns one commit token per staged operation, in staging order;
    /// deletes have no token.
    async fn commit_batch(&self, batch: &TableBatch) -> Result<Vec<Option<String>>>;

    /// Runs one page of a query.
    async fn query_entities(&self, table: &str, query: &EntityQuery) -> Result<QueryPage>;
}
