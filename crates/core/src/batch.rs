//! Batch normalization and validation.
//!
//! Turns a list of loosely typed records into partition-key/row-key addressed
//! entities. All checks run in one pass and every failure is accumulated; a
//! batch with any error is rejected wholesale.

use std::collections::HashSet;

use crate::entity::{Entity, Record, DELETE_FLAG, ROW_KEY};
use crate::request::RequestParams;
use crate::result::{BatchResult, OperationError};
use crate::store::TableBatch;
use crate::validation::{is_valid_key, is_valid_table_name, MAX_BATCH_ITEMS};

/// Fields tried, after the configured id field, when an item has no row key.
pub const FALLBACK_ID_FIELDS: [&str; 2] = ["GTIN14", "UPC"];

/// A normalized batch item.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    /// Position of the originating record.
    pub index: usize,
    pub entity: Entity,
    pub delete: bool,
}

/// Transient accumulator for one batch call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchEnvelope {
    pub items: Vec<BatchItem>,
    pub errors: Vec<OperationError>,
    /// Primary-account commit tokens, set after a successful commit.
    pub commit_tokens: Option<Vec<Option<String>>>,
}

impl BatchEnvelope {
    /// Validates and normalizes the records of a batch.
    ///
    /// Checks, in order: table name, partition key, item count, then each
    /// item's row key. The partition key of the request is written onto every
    /// surviving entity.
    pub fn normalize(params: &RequestParams, records: &[Record]) -> Self {
        let mut envelope = Self::default();
        let table_name = params.table_name();

        if !is_valid_table_name(table_name) {
            envelope.errors.push(OperationError::validation(format!(
                "invalid tableName {table_name} value"
            )));
        }

        if !is_valid_key(&params.partition_key) {
            envelope.errors.push(OperationError::validation(format!(
                "invalid PartitionKey {} value",
                params.partition_key
            )));
        }

        if records.is_empty() {
            envelope
                .errors
                .push(OperationError::validation("items array is required"));
        }

        if records.len() > MAX_BATCH_ITEMS {
            envelope.errors.push(OperationError::validation(format!(
                "expected items count to be less than {MAX_BATCH_ITEMS} but got {}",
                records.len()
            )));
        }

        let mut seen = HashSet::new();
        for (index, record) in records.iter().enumerate() {
            let row_key = derive_row_key(record, &params.id_field);

            let row_key = match row_key {
                Some(key) if is_valid_key(&key) => key,
                other => {
                    envelope.errors.push(OperationError::item(
                        index,
                        format!(
                            "{index} has invalid RowKey/Id {}",
                            other.as_deref().unwrap_or("null")
                        ),
                    ));
                    continue;
                }
            };

            if !seen.insert(row_key.clone()) {
                envelope.errors.push(OperationError::item(
                    index,
                    format!("{index} has duplicate RowKey {row_key}"),
                ));
                continue;
            }

            let delete = record
                .get(DELETE_FLAG)
                .is_some_and(|value| value.is_truthy_flag());
            let mut entity = Entity::from_record(&params.partition_key, row_key, record);
            if delete {
                entity = entity.with_wildcard_etag();
            }

            envelope.items.push(BatchItem {
                index,
                entity,
                delete,
            });
        }

        envelope
    }

    /// True when no error was recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Stages the surviving items in input order.
    ///
    /// Returns `None` for a rejected batch so it can never reach a store.
    pub fn to_table_batch(&self, table: &str) -> Option<TableBatch> {
        if !self.is_valid() {
            return None;
        }

        let mut batch = TableBatch::new(table);
        for item in &self.items {
            if item.delete {
                batch.delete(item.entity.clone());
            } else {
                batch.upsert_merge(item.entity.clone());
            }
        }
        Some(batch)
    }

    /// Produces the client-facing result.
    pub fn into_result(self, params: &RequestParams) -> BatchResult {
        BatchResult {
            table_name: params.table_name().to_string(),
            partition_key: params.partition_key.clone(),
            errors: self.errors,
            etags: self.commit_tokens,
        }
    }
}

/// Finds the row key of a record.
///
/// An explicit `RowKey` wins; otherwise the id field, `GTIN14` and `UPC` are
/// tried in that order and the first usable value is taken.
pub fn derive_row_key(record: &Record, id_field: &str) -> Option<String> {
    std::iter::once(ROW_KEY)
        .chain(std::iter::once(id_field))
        .chain(FALLBACK_ID_FIELDS)
        .find_map(|field| record.get(field).and_then(|value| value.as_key()))
}
