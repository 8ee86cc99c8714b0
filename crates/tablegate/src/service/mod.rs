//! Tenant-scoped table operations.
//!
//! Every operation resolves parameters once, runs against the configured
//! accounts and returns a result object; store failures never escape as
//! `Err`.

mod query;
mod recovery;
mod replication;

use futures_util::FutureExt;

use tablegate_core::batch::{derive_row_key, BatchEnvelope};
use tablegate_core::entity::{Entity, Record};
use tablegate_core::request::{RequestOptions, RequestParams, ScopeDefaults};
use tablegate_core::result::{BatchResult, ItemResult, OperationError, QueryResult};
use tablegate_core::store::{AccountRole, EntityQuery};
use tablegate_core::validation::{is_valid_key, is_valid_table_name};

use crate::accounts::AccountSet;
use crate::delimited::parse_records;

use recovery::ensure_table;

const NOT_FOUND_MESSAGE: &str = "not found";
const FAILED_MESSAGE: &str = "failed";

/// Whether a delete removed an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deletion {
    Removed,
    NotFound,
}

/// Operations over the account set.
#[derive(Debug, Clone)]
pub struct TableService {
    accounts: AccountSet,
    defaults: ScopeDefaults,
}

impl TableService {
    pub fn new(accounts: AccountSet, defaults: ScopeDefaults) -> Self {
        Self { accounts, defaults }
    }

    pub fn accounts(&self) -> &AccountSet {
        &self.accounts
    }

    fn params(&self, table_spec: &str, options: &RequestOptions) -> RequestParams {
        RequestParams::resolve(table_spec, options, &self.defaults)
    }

    // ========================================================================
    // Batch writes
    // ========================================================================

    /// Validates, then writes a batch to every account.
    ///
    /// An invalid batch is rejected wholesale before any store call.
    pub async fn batch_write(
        &self,
        table_spec: &str,
        options: &RequestOptions,
        records: &[Record],
        id_field: Option<&str>,
    ) -> BatchResult {
        let params = self.params(table_spec, options).with_id_field(id_field);
        let mut envelope = BatchEnvelope::normalize(&params, records);

        let Some(batch) = envelope.to_table_batch(params.table_name()) else {
            tracing::debug!(
                table = params.table_name(),
                errors = envelope.errors.len(),
                "Batch rejected"
            );
            return envelope.into_result(&params);
        };

        match ensure_table(&self.accounts, params.table_name()).await {
            Ok(provisioning) => envelope.errors.extend(provisioning.warnings),
            Err(err) => {
                envelope
                    .errors
                    .push(OperationError::from_store(&err, AccountRole::Primary));
                return envelope.into_result(&params);
            }
        }

        let replicated = replication::replicate_batch(&self.accounts, &batch).await;
        envelope.commit_tokens = replicated.value;
        for error in replicated.errors {
            if !envelope.errors.contains(&error) {
                envelope.errors.push(error);
            }
        }

        tracing::info!(
            table = params.table_name(),
            partition_key = %params.partition_key,
            items = batch.len(),
            errors = envelope.errors.len(),
            "Batch written"
        );
        envelope.into_result(&params)
    }

    /// Parses delimited text into records and writes them as a batch.
    pub async fn batch_write_from_delimited_text(
        &self,
        table_spec: &str,
        options: &RequestOptions,
        text: &str,
        delimiter: Option<&str>,
        headers: Option<&str>,
    ) -> BatchResult {
        match parse_records(text, delimiter, headers) {
            Ok(records) => self.batch_write(table_spec, options, &records, None).await,
            Err(err) => {
                let params = self.params(table_spec, options);
                BatchEnvelope {
                    errors: vec![OperationError::validation(err.to_string())],
                    ..BatchEnvelope::default()
                }
                .into_result(&params)
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Runs one page of a query against the table spec's table(s).
    pub async fn query(
        &self,
        table_spec: &str,
        options: &RequestOptions,
        query: &EntityQuery,
    ) -> QueryResult {
        let params = self.params(table_spec, options);

        let mut invalid: Vec<OperationError> = std::iter::once(params.table_name())
            .chain(params.tables.secondary.as_deref())
            .filter(|name| !is_valid_table_name(name))
            .map(|name| OperationError::validation(format!("invalid tableName {name} value")))
            .collect();
        if !invalid.is_empty() {
            invalid.dedup();
            return QueryResult::failed(invalid);
        }

        query::query_tables(
            &self.accounts,
            params.table_name(),
            params.tables.secondary.as_deref(),
            query,
        )
        .await
    }

    // ========================================================================
    // Single-item writes
    // ========================================================================

    /// Inserts or merges one record on every account.
    ///
    /// The row key is `id` when given, else derived from the record.
    pub async fn upsert_item(
        &self,
        table_spec: &str,
        options: &RequestOptions,
        id: Option<&str>,
        record: &Record,
    ) -> ItemResult {
        let params = self.params(table_spec, options).with_row_key(id);
        let row_key = params
            .row_key
            .clone()
            .or_else(|| derive_row_key(record, &params.id_field));

        let row_key = match validate_item(&params, row_key) {
            Ok(row_key) => row_key,
            Err(errors) => {
                return ItemResult {
                    errors,
                    ..ItemResult::default()
                }
            }
        };

        let entity = Entity::from_record(&params.partition_key, row_key, record);
        let table = params.table_name();
        let replicated = replication::replicate(&self.accounts, table, |store| {
            store.upsert_merge(table, &entity)
        })
        .await;

        ItemResult {
            errors: replicated.errors,
            message: None,
            etag: replicated.value.flatten(),
        }
    }

    /// Deletes one entity on every account, unconditionally.
    ///
    /// A missing entity is not an error.
    pub async fn delete_item(
        &self,
        table_spec: &str,
        options: &RequestOptions,
        id: &str,
    ) -> ItemResult {
        let params = self.params(table_spec, options).with_row_key(Some(id));

        let row_key = match validate_item(&params, params.row_key.clone()) {
            Ok(row_key) => row_key,
            Err(errors) => {
                return ItemResult {
                    errors,
                    message: Some(FAILED_MESSAGE.to_string()),
                    etag: None,
                }
            }
        };

        let entity = Entity::new(&params.partition_key, row_key).with_wildcard_etag();
        let table = params.table_name();
        let replicated = replication::replicate(&self.accounts, table, |store| {
            store
                .delete_entity(table, &entity)
                .map(|result| match result {
                    Ok(()) => Ok(Deletion::Removed),
                    Err(err) if err.is_entity_missing() => Ok(Deletion::NotFound),
                    Err(err) => Err(err),
                })
                .boxed()
        })
        .await;

        let message = match replicated.value {
            Some(Deletion::Removed) => None,
            Some(Deletion::NotFound) => Some(NOT_FOUND_MESSAGE.to_string()),
            None => Some(FAILED_MESSAGE.to_string()),
        };

        ItemResult {
            errors: replicated.errors,
            message,
            etag: None,
        }
    }
}

/// Checks the table name and row key of a single-item call.
fn validate_item(
    params: &RequestParams,
    row_key: Option<String>,
) -> Result<String, Vec<OperationError>> {
    let mut errors = Vec::new();

    if !is_valid_table_name(params.table_name()) {
        errors.push(OperationError::validation(format!(
            "invalid tableName {} value",
            params.table_name()
        )));
    }
    if !is_valid_key(&params.partition_key) {
        errors.push(OperationError::validation(format!(
            "invalid PartitionKey {} value",
            params.partition_key
        )));
    }

    match row_key {
        Some(key) if is_valid_key(&key) && errors.is_empty() => Ok(key),
        Some(key) if is_valid_key(&key) => Err(errors),
        other => {
            errors.push(OperationError::validation(format!(
                "invalid RowKey/Id {}",
                other.as_deref().unwrap_or("null")
            )));
            Err(errors)
        }
    }
}
