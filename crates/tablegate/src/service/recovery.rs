//! Table autocreation and the retry-after-create state machine.

use std::future::Future;

use futures_util::future::join_all;

use tablegate_core::replication::{AccountOutcome, Requirement};
use tablegate_core::result::OperationError;
use tablegate_core::store::{AccountRole, Result, StoreError, TableCreation};

use crate::accounts::AccountSet;

/// Outcome of creating a table across accounts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableProvisioning {
    /// Best-effort accounts whose creation failed.
    pub warnings: Vec<OperationError>,
}

/// Creates `table` on every account, with the primary required.
pub async fn ensure_table(accounts: &AccountSet, table: &str) -> Result<TableProvisioning> {
    provision(accounts, table, AccountRole::Primary).await
}

/// Creates `table` on every account concurrently.
///
/// A failure on `owner` is returned as the error; failures elsewhere are
/// logged, and reported as warnings for best-effort accounts.
async fn provision(
    accounts: &AccountSet,
    table: &str,
    owner: AccountRole,
) -> Result<TableProvisioning> {
    let outcomes = join_all(accounts.iter().map(|(role, store)| async move {
        AccountOutcome::new(role, store.account_name(), store.create_table(table).await)
    }))
    .await;

    let mut provisioning = TableProvisioning::default();
    let mut owner_error = None;

    for outcome in outcomes {
        match outcome.result {
            Ok(TableCreation::Created) => {
                tracing::info!(account = %outcome.account, table, "Table created");
            }
            Ok(TableCreation::AlreadyExists) => {
                tracing::trace!(account = %outcome.account, table, "Table already exists");
            }
            Err(err) if outcome.role == owner => owner_error = Some(err),
            Err(err) => {
                tracing::warn!(account = %outcome.account, table, error = %err, "Table creation failed");
                if outcome.role.requirement() == Requirement::BestEffort {
                    provisioning
                        .warnings
                        .push(OperationError::partial_replication(&err, outcome.role));
                }
            }
        }
    }

    match owner_error {
        Some(err) => {
            tracing::error!(table, role = %owner, error = %err, "Table creation failed");
            Err(err)
        }
        None => Ok(provisioning),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryState {
    Attempt,
    Recovering,
    FinalAttempt,
}

/// Result of an operation run under table recovery.
#[derive(Debug)]
pub struct Recovered<T> {
    pub result: Result<T>,
    pub warnings: Vec<OperationError>,
}

/// Runs `operation` against the `owner` account, creating the table and
/// retrying once if the store reports it missing.
///
/// A second table-missing failure is returned as-is.
pub async fn with_table_recovery<T, F, Fut>(
    accounts: &AccountSet,
    table: &str,
    owner: AccountRole,
    mut operation: F,
) -> Recovered<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut state = RecoveryState::Attempt;
    let mut warnings = Vec::new();

    loop {
        match state {
            RecoveryState::Attempt => match operation().await {
                Err(StoreError::TableNotFound(_)) => {
                    tracing::debug!(table, role = %owner, "Table missing, creating");
                    state = RecoveryState::Recovering;
                }
                result => return Recovered { result, warnings },
            },
            RecoveryState::Recovering => match provision(accounts, table, owner).await {
                Ok(provisioning) => {
                    warnings.extend(provisioning.warnings);
                    state = RecoveryState::FinalAttempt;
                }
                Err(err) => {
                    return Recovered {
                        result: Err(err),
                        warnings,
                    }
                }
            },
            RecoveryState::FinalAttempt => {
                let result = operation().await;
                if let Err(err) = &result {
                    if err.is_table_missing() {
                        tracing::error!(table, role = %owner, "Table still missing after creation");
                    }
                }
                return Recovered { result, warnings };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use tablegate_core::entity::Entity;
    use tablegate_core::result::ErrorKind;
    use tablegate_core::store::TableStore;

    use super::*;
    use crate::storage::testing::FaultyTableStore;

    const TABLE: &str = "aPRDt1";

    fn accounts(
        primary: FaultyTableStore,
        secondary: Option<FaultyTableStore>,
    ) -> (AccountSet, Arc<FaultyTableStore>, Option<Arc<FaultyTableStore>>) {
        let primary = Arc::new(primary);
        let secondary = secondary.map(Arc::new);
        let set = AccountSet::new(
            primary.clone(),
            secondary.clone().map(|s| s as Arc<dyn TableStore>),
        );
        (set, primary, secondary)
    }

    #[tokio::test]
    async fn test_ensure_table_creates_on_every_account() {
        let (set, primary, secondary) = accounts(
            FaultyTableStore::new("p"),
            Some(FaultyTableStore::new("s")),
        );

        let provisioning = ensure_table(&set, TABLE).await.unwrap();

        assert!(provisioning.warnings.is_empty());
        assert!(primary.inner().has_table(TABLE).await);
        assert!(secondary.unwrap().inner().has_table(TABLE).await);
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let (set, _, _) = accounts(FaultyTableStore::new("p"), None);

        ensure_table(&set, TABLE).await.unwrap();
        assert!(ensure_table(&set, TABLE).await.is_ok());
    }

    #[tokio::test]
    async fn test_primary_creation_failure_is_the_error() {
        let (set, _, _) = accounts(FaultyTableStore::new("p").with_failing_create(), None);

        let result = ensure_table(&set, TABLE).await;

        assert!(matches!(result, Err(StoreError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_secondary_creation_failure_is_a_warning() {
        let (set, _, _) = accounts(
            FaultyTableStore::new("p"),
            Some(FaultyTableStore::new("s").with_failing_create()),
        );

        let provisioning = ensure_table(&set, TABLE).await.unwrap();

        assert_eq!(provisioning.warnings.len(), 1);
        assert_eq!(provisioning.warnings[0].kind, ErrorKind::PartialReplication);
        assert_eq!(provisioning.warnings[0].account, Some(AccountRole::Secondary));
    }

    #[tokio::test]
    async fn test_recovery_creates_table_and_retries_once() {
        let (set, primary, _) = accounts(FaultyTableStore::new("p"), None);
        let entity = Entity::new("_default", "x1");

        let recovered = with_table_recovery(&set, TABLE, AccountRole::Primary, || {
            primary.upsert_merge(TABLE, &entity)
        })
        .await;

        assert!(recovered.result.is_ok());
        assert_eq!(FaultyTableStore::count(&primary.upserts), 2);
        assert_eq!(FaultyTableStore::count(&primary.creates), 1);
        assert!(primary.inner().get(TABLE, "_default", "x1").await.is_some());
    }

    #[tokio::test]
    async fn test_recovery_never_retries_twice() {
        let (set, primary, _) = accounts(FaultyTableStore::new("p").with_noop_create(), None);
        let entity = Entity::new("_default", "x1");

        let recovered = with_table_recovery(&set, TABLE, AccountRole::Primary, || {
            primary.upsert_merge(TABLE, &entity)
        })
        .await;

        assert!(recovered.result.unwrap_err().is_table_missing());
        assert_eq!(primary.upserts.load(Ordering::SeqCst), 2);
        assert_eq!(primary.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_creation_failure_is_not_retried() {
        let (set, primary, _) = accounts(FaultyTableStore::new("p").with_failing_create(), None);
        let entity = Entity::new("_default", "x1");

        let recovered = with_table_recovery(&set, TABLE, AccountRole::Primary, || {
            primary.upsert_merge(TABLE, &entity)
        })
        .await;

        assert!(matches!(
            recovered.result,
            Err(StoreError::ConnectionFailed(_))
        ));
        assert_eq!(FaultyTableStore::count(&primary.upserts), 1);
        assert_eq!(FaultyTableStore::count(&primary.creates), 1);
    }

    #[tokio::test]
    async fn test_other_errors_pass_through_without_recovery() {
        let (set, primary, _) = accounts(FaultyTableStore::new("p").unreachable(), None);
        let entity = Entity::new("_default", "x1");

        let recovered = with_table_recovery(&set, TABLE, AccountRole::Primary, || {
            primary.upsert_merge(TABLE, &entity)
        })
        .await;

        assert!(matches!(
            recovered.result,
            Err(StoreError::ConnectionFailed(_))
        ));
        assert_eq!(FaultyTableStore::count(&primary.creates), 0);
    }
}
