//! Client-facing operation results.
//!
//! Every operation resolves to one of these objects. An empty `errors` list
//! means full success; warnings report secondary-account failures while the
//! primary result stays authoritative.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::store::{AccountRole, ContinuationToken, StoreError};

/// Category of a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed table name, key or batch size. Never retried.
    Validation,
    /// The table was still missing after the single recovery attempt.
    TableMissing,
    /// Any other store failure, passed through verbatim.
    Store,
    /// A secondary account failed while the primary succeeded.
    PartialReplication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One entry of a result's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    /// Index of the originating batch item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountRole>,
    /// Store error code, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl OperationError {
    /// A request-level validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            severity: Severity::Error,
            message: message.into(),
            index: None,
            account: None,
            code: None,
        }
    }

    /// A validation error attributed to one batch item.
    pub fn item(index: usize, message: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            ..Self::validation(message)
        }
    }

    /// Reports a store failure on an account as a fatal error.
    pub fn from_store(error: &StoreError, role: AccountRole) -> Self {
        let kind = if error.is_table_missing() {
            ErrorKind::TableMissing
        } else {
            ErrorKind::Store
        };

        Self {
            kind,
            severity: Severity::Error,
            message: error.to_string(),
            index: None,
            account: Some(role),
            code: error.code().map(str::to_string),
        }
    }

    /// Reports a replica failure as a warning; the primary result stands.
    pub fn partial_replication(error: &StoreError, role: AccountRole) -> Self {
        Self {
            kind: ErrorKind::PartialReplication,
            severity: Severity::Warning,
            ..Self::from_store(error, role)
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True when no error in the list is fatal.
pub fn is_success(errors: &[OperationError]) -> bool {
    !errors.iter().any(OperationError::is_fatal)
}

/// Outcome of a batch write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub table_name: String,
    pub partition_key: String,
    pub errors: Vec<OperationError>,
    /// Primary-account commit tokens, one per written item in input order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etags: Option<Vec<Option<String>>>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        is_success(&self.errors)
    }
}

/// Outcome of a single-item upsert or delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub errors: Vec<OperationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl ItemResult {
    pub fn is_success(&self) -> bool {
        is_success(&self.errors)
    }
}

/// Outcome of a query, optionally carrying the second table's result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Entity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub continuation: Option<ContinuationToken>,
    pub errors: Vec<OperationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_result: Option<Box<QueryResult>>,
}

impl QueryResult {
    /// A result carrying only errors.
    pub fn failed(errors: Vec<OperationError>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        is_success(&self.errors)
    }
}
