//! Paginated queries over one or two tables.

use tablegate_core::result::{OperationError, QueryResult};
use tablegate_core::store::{AccountRole, EntityQuery, TableStore};

use super::recovery::with_table_recovery;
use crate::accounts::AccountSet;

/// Runs one page of `query` against `table` on the given account.
pub async fn query_one(
    accounts: &AccountSet,
    role: AccountRole,
    store: &dyn TableStore,
    table: &str,
    query: &EntityQuery,
) -> QueryResult {
    let recovered = with_table_recovery(accounts, table, role, || {
        store.query_entities(table, query)
    })
    .await;

    let mut result = match recovered.result {
        Ok(page) => QueryResult {
            count: Some(page.items.len()),
            items: Some(page.items),
            continuation: page.continuation,
            ..QueryResult::default()
        },
        Err(err) => {
            tracing::warn!(account = store.account_name(), table, error = %err, "Query failed");
            QueryResult::failed(vec![OperationError::from_store(&err, role)])
        }
    };
    result.errors.extend(recovered.warnings);
    result
}

/// Queries the primary table and, when named, the second table concurrently.
///
/// The second table is read from the secondary account when one is
/// configured, else from the primary. Its result is nested, never merged.
pub async fn query_tables(
    accounts: &AccountSet,
    table: &str,
    second_table: Option<&str>,
    query: &EntityQuery,
) -> QueryResult {
    let primary = query_one(
        accounts,
        AccountRole::Primary,
        accounts.primary().as_ref(),
        table,
        query,
    );

    let Some(second_table) = second_table else {
        return primary.await;
    };

    let (role, store) = accounts.for_second_table();
    let secondary = query_one(accounts, role, store.as_ref(), second_table, query);

    let (mut result, secondary) = tokio::join!(primary, secondary);
    result.secondary_result = Some(Box::new(secondary));
    result
}
