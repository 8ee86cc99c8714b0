use thiserror::Error;

/// Store error code reported when a table does not exist.
pub const TABLE_NOT_FOUND_CODE: &str = "TableNotFound";
/// Store error code reported when an entity does not exist.
pub const RESOURCE_NOT_FOUND_CODE: &str = "ResourceNotFound";
/// Store error code reported when creating a table that already exists.
pub const TABLE_ALREADY_EXISTS_CODE: &str = "TableAlreadyExists";

/// Errors reported by a backing table store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Entity not found: {table}({partition_key}, {row_key})")]
    EntityNotFound {
        table: String,
        partition_key: String,
        row_key: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Store request failed ({status} {code}): {message}")]
    Request {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// True for the distinguished table-missing failure.
    pub fn is_table_missing(&self) -> bool {
        matches!(self, StoreError::TableNotFound(_))
    }

    /// True when the addressed entity does not exist.
    pub fn is_entity_missing(&self) -> bool {
        matches!(self, StoreError::EntityNotFound { .. })
    }

    /// The store error code, when one applies.
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::TableNotFound(_) => Some(TABLE_NOT_FOUND_CODE),
            StoreError::EntityNotFound { .. } => Some(RESOURCE_NOT_FOUND_CODE),
            StoreError::Request { code, .. } => Some(code),
            StoreError::ConnectionFailed(_) | StoreError::Serialization(_) => None,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_not_found_display() {
        let error = StoreError::TableNotFound("aPRDt1".to_string());
        assert_eq!(error.to_string(), "Table not found: aPRDt1");
        assert!(error.is_table_missing());
        assert_eq!(error.code(), Some("TableNotFound"));
    }

    #[test]
    fn test_entity_not_found_display() {
        let error = StoreError::EntityNotFound {
            table: "aPRDt1".to_string(),
            partition_key: "_default".to_string(),
            row_key: "x1".to_string(),
        };
        assert_eq!(error.to_string(), "Entity not found: aPRDt1(_default, x1)");
        assert!(error.is_entity_missing());
        assert!(!error.is_table_missing());
    }

    #[test]
    fn test_request_display() {
        let error = StoreError::Request {
            status: 400,
            code: "InvalidInput".to_string(),
            message: "bad filter".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Store request failed (400 InvalidInput): bad filter"
        );
        assert_eq!(error.code(), Some("InvalidInput"));
    }

    #[test]
    fn test_connection_failed_has_no_code() {
        let error = StoreError::ConnectionFailed("timeout".to_string());
        assert_eq!(error.to_string(), "Connection failed: timeout");
        assert_eq!(error.code(), None);
    }
}
