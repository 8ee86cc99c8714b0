//! Fault-injecting store for exercising recovery and replication paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use tablegate_core::entity::Entity;
use tablegate_core::store::{
    EntityQuery, QueryPage, Result, StoreError, TableBatch, TableCreation, TableStore,
};

use super::inmemory::InMemoryTableStore;

/// Wraps an [`InMemoryTableStore`] and counts calls, optionally failing them.
#[derive(Debug)]
pub struct FaultyTableStore {
    inner: InMemoryTableStore,
    /// Upcoming data operations that report `TableNotFound` regardless of state.
    table_missing_failures: AtomicUsize,
    /// `create_table` reports success without creating anything.
    create_is_noop: AtomicBool,
    /// `create_table` fails with a connection error.
    create_fails: AtomicBool,
    /// Every call fails with a connection error.
    unreachable: AtomicBool,
    pub creates: AtomicUsize,
    pub commits: AtomicUsize,
    pub upserts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub queries: AtomicUsize,
}

impl FaultyTableStore {
    pub fn new(account_name: &str) -> Self {
        Self {
            inner: InMemoryTableStore::new(account_name),
            table_missing_failures: AtomicUsize::new(0),
            create_is_noop: AtomicBool::new(false),
            create_fails: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
            creates: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            upserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryTableStore {
        &self.inner
    }

    pub fn fail_with_table_missing(self, times: usize) -> Self {
        self.table_missing_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn with_noop_create(self) -> Self {
        self.create_is_noop.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_failing_create(self) -> Self {
        self.create_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn unreachable(self) -> Self {
        self.unreachable.store(true, Ordering::SeqCst);
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self, table: &str) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed(format!(
                "{} is unreachable",
                self.inner.account_name()
            )));
        }

        let pending = self.table_missing_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.table_missing_failures
                .store(pending - 1, Ordering::SeqCst);
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl TableStore for FaultyTableStore {
    fn account_name(&self) -> &str {
        self.inner.account_name()
    }

    async fn create_table(&self, table: &str) -> Result<TableCreation> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) || self.create_fails.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed("create refused".to_string()));
        }
        if self.create_is_noop.load(Ordering::SeqCst) {
            return Ok(TableCreation::Created);
        }
        self.inner.create_table(table).await
    }

    async fn upsert_merge(&self, table: &str, entity: &Entity) -> Result<Option<String>> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.check(table)?;
        self.inner.upsert_merge(table, entity).await
    }

    async fn delete_entity(&self, table: &str, entity: &Entity) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check(table)?;
        self.inner.delete_entity(table, entity).await
    }

    async fn commit_batch(&self, batch: &TableBatch) -> Result<Vec<Option<String>>> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.check(batch.table())?;
        self.inner.commit_batch(batch).await
    }

    async fn query_entities(&self, table: &str, query: &EntityQuery) -> Result<QueryPage> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check(table)?;
        self.inner.query_entities(table, query).await
    }
}
