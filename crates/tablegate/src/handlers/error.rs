use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tablegate_core::result::{ErrorKind, OperationError};
use tablegate_core::store::{store_error_to_status_code, StoreError};

/// Errors raised outside an operation result: bad request input or an
/// unreachable store.
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status_code(&self) -> StatusCode {
        if let Some(store_error) = self.0.downcast_ref::<StoreError>() {
            let code = store_error_to_status_code(store_error);
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        } else if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            rejection.status()
        } else if let Some(rejection) = self.0.downcast_ref::<QueryRejection>() {
            rejection.status()
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let kind = if self.0.is::<StoreError>() || status_code.is_server_error() {
            ErrorKind::Store
        } else {
            ErrorKind::Validation
        };
        let error = OperationError {
            kind,
            ..OperationError::validation(self.0.to_string())
        };

        tracing::warn!(status = %status_code, error = %error.message, "Request failed");
        (status_code, Json(json!({ "errors": [error] }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
