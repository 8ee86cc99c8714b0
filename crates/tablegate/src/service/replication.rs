//! Fan-out of writes to every configured account.

use futures_util::future::{join_all, BoxFuture};

use tablegate_core::replication::{aggregate, AccountOutcome, ReplicationResult};
use tablegate_core::result::OperationError;
use tablegate_core::store::{AccountRole, Result, TableBatch, TableStore};

use super::recovery::with_table_recovery;
use crate::accounts::AccountSet;

/// Commits the same staged batch to every account concurrently.
pub async fn commit_all(
    accounts: &AccountSet,
    batch: &TableBatch,
) -> Vec<AccountOutcome<Vec<Option<String>>>> {
    join_all(accounts.iter().map(|(role, store)| async move {
        let result = store.commit_batch(batch).await;
        AccountOutcome::new(role, store.account_name(), result)
    }))
    .await
}

/// Commits a batch and applies the primary-required policy.
///
/// Tokens from best-effort accounts are only logged.
pub async fn replicate_batch(
    accounts: &AccountSet,
    batch: &TableBatch,
) -> ReplicationResult<Vec<Option<String>>> {
    let outcomes = commit_all(accounts, batch).await;

    for outcome in &outcomes {
        match (&outcome.role, &outcome.result) {
            (AccountRole::Secondary, Ok(tokens)) => {
                tracing::debug!(account = %outcome.account, table = batch.table(), ?tokens, "Replica batch committed");
            }
            (role, Err(err)) => {
                tracing::warn!(account = %outcome.account, %role, table = batch.table(), error = %err, "Batch commit failed");
            }
            _ => {}
        }
    }

    aggregate(outcomes)
}

/// Runs a single-entity operation on every account concurrently, each under
/// table recovery, and applies the primary-required policy.
pub async fn replicate<'a, T, F>(
    accounts: &'a AccountSet,
    table: &'a str,
    operation: F,
) -> ReplicationResult<T>
where
    T: Send,
    F: Fn(&'a dyn TableStore) -> BoxFuture<'a, Result<T>>,
{
    let operation = &operation;
    let runs = join_all(accounts.iter().map(|(role, store)| async move {
        let store: &'a dyn TableStore = store.as_ref();
        let recovered = with_table_recovery(accounts, table, role, || operation(store)).await;
        if let Err(err) = &recovered.result {
            tracing::warn!(account = store.account_name(), %role, table, error = %err, "Operation failed");
        }
        (
            AccountOutcome::new(role, store.account_name(), recovered.result),
            recovered.warnings,
        )
    }))
    .await;

    let mut outcomes = Vec::with_capacity(runs.len());
    let mut warnings: Vec<OperationError> = Vec::new();
    for (outcome, run_warnings) in runs {
        outcomes.push(outcome);
        warnings.extend(run_warnings);
    }

    let mut result = aggregate(outcomes);
    for warning in warnings {
        if !result.errors.contains(&warning) {
            result.errors.push(warning);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tablegate_core::entity::Entity;
    use tablegate_core::result::{ErrorKind, Severity};

    use super::*;
    use crate::storage::testing::FaultyTableStore;

    const TABLE: &str = "aPRDt1";

    async fn ready(store: FaultyTableStore) -> Arc<FaultyTableStore> {
        store.inner().create_table(TABLE).await.unwrap();
        Arc::new(store)
    }

    fn batch() -> TableBatch {
        let mut batch = TableBatch::new(TABLE);
        batch.upsert_merge(Entity::new("_default", "x1"));
        batch.upsert_merge(Entity::new("_default", "x2"));
        batch
    }

    #[tokio::test]
    async fn test_commit_reaches_every_account() {
        let primary = ready(FaultyTableStore::new("p")).await;
        let secondary = ready(FaultyTableStore::new("s")).await;
        let accounts = AccountSet::new(primary.clone(), Some(secondary.clone()));

        let result = replicate_batch(&accounts, &batch()).await;

        assert!(result.is_success());
        assert!(result.errors.is_empty());
        assert_eq!(result.value.unwrap().len(), 2);
        assert!(secondary.inner().get(TABLE, "_default", "x2").await.is_some());
    }

    #[tokio::test]
    async fn test_secondary_commit_failure_is_a_warning() {
        let primary = ready(FaultyTableStore::new("p")).await;
        let secondary = ready(FaultyTableStore::new("s").unreachable()).await;
        let accounts = AccountSet::new(primary.clone(), Some(secondary));

        let result = replicate_batch(&accounts, &batch()).await;

        assert!(result.is_success());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::Warning);
        assert!(primary.inner().get(TABLE, "_default", "x1").await.is_some());
    }

    #[tokio::test]
    async fn test_primary_commit_failure_is_fatal_but_secondary_still_commits() {
        let primary = ready(FaultyTableStore::new("p").unreachable()).await;
        let secondary = ready(FaultyTableStore::new("s")).await;
        let accounts = AccountSet::new(primary, Some(secondary.clone()));

        let result = replicate_batch(&accounts, &batch()).await;

        assert!(!result.is_success());
        assert_eq!(result.errors[0].kind, ErrorKind::Store);
        assert_eq!(result.errors[0].account, Some(AccountRole::Primary));
        assert_eq!(FaultyTableStore::count(&secondary.commits), 1);
        assert!(secondary.inner().get(TABLE, "_default", "x1").await.is_some());
    }

    #[tokio::test]
    async fn test_replicate_recovers_each_account() {
        let primary = Arc::new(FaultyTableStore::new("p"));
        let secondary = Arc::new(FaultyTableStore::new("s"));
        let accounts = AccountSet::new(primary.clone(), Some(secondary.clone()));
        let entity = Entity::new("_default", "x1");

        let result = replicate(&accounts, TABLE, |store| store.upsert_merge(TABLE, &entity)).await;

        assert!(result.is_success());
        assert!(result.errors.is_empty());
        assert!(primary.inner().get(TABLE, "_default", "x1").await.is_some());
        assert!(secondary.inner().get(TABLE, "_default", "x1").await.is_some());
    }
}
