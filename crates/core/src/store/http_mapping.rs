//! Pure functions for mapping store errors and operation results to HTTP status codes.

use crate::result::{ErrorKind, OperationError};

use super::StoreError;

/// Maps a [`StoreError`] to an HTTP status code.
///
/// - `TableNotFound` -> 404 (Not Found)
/// - `EntityNotFound` -> 404 (Not Found)
/// - `ConnectionFailed` -> 503 (Service Unavailable)
/// - `Request` -> the store's own status when it is an error status, else 502
/// - `Serialization` -> 500 (Internal Server Error)
///
/// # Examples
///
/// ```
/// use tablegate_core::store::{store_error_to_status_code, StoreError};
///
/// let error = StoreError::TableNotFound("aPRDt1".to_string());
/// assert_eq!(store_error_to_status_code(&error), 404);
/// ```
pub fn store_error_to_status_code(error: &StoreError) -> u16 {
    match error {
        StoreError::TableNotFound(_) => 404,
        StoreError::EntityNotFound { .. } => 404,
        StoreError::ConnectionFailed(_) => 503,
        StoreError::Request { status, .. } if (400..600).contains(status) => *status,
        StoreError::Request { .. } => 502,
        StoreError::Serialization(_) => 500,
    }
}

/// Maps the errors of an operation result to an HTTP status code.
///
/// Warnings do not affect the status. The first fatal error decides:
/// validation -> 400, table missing -> 404, store -> 502.
pub fn errors_to_status_code(errors: &[OperationError]) -> u16 {
    match errors.iter().find(|e| e.is_fatal()).map(|e| e.kind) {
        None => 200,
        Some(ErrorKind::Validation) => 400,
        Some(ErrorKind::TableMissing) => 404,
        Some(ErrorKind::Store) | Some(ErrorKind::PartialReplication) => 502,
    }
}
