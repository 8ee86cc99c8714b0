//! Table service error mapping.
//!
//! Maps HTTP failures and OData error bodies to `StoreError` from
//! `tablegate_core::store`.

use serde::Deserialize;

use tablegate_core::store::{StoreError, RESOURCE_NOT_FOUND_CODE, TABLE_NOT_FOUND_CODE};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "odata.error")]
    error: ODataError,
}

#[derive(Debug, Deserialize)]
struct ODataError {
    code: String,
    #[serde(default)]
    message: Option<ODataMessage>,
}

#[derive(Debug, Deserialize)]
struct ODataMessage {
    value: String,
}

/// Extracts `(code, message)` from an OData error body.
pub fn parse_error_body(body: &str) -> Option<(String, String)> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = parsed
        .error
        .message
        .map(|m| m.value)
        .unwrap_or_default();
    Some((parsed.error.code, message))
}

/// Where a failed request was aimed, used to build not-found errors.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Table(&'a str),
    Entity {
        table: &'a str,
        partition_key: &'a str,
        row_key: &'a str,
    },
}

impl Target<'_> {
    fn table(&self) -> &str {
        match self {
            Target::Table(table) | Target::Entity { table, .. } => table,
        }
    }
}

/// Map a failed response to StoreError.
pub fn map_response_error(status: u16, body: &str, target: Target<'_>) -> StoreError {
    let (code, message) = parse_error_body(body)
        .or_else(|| parse_batch_error(body))
        .unwrap_or_else(|| (status_code_name(status).to_string(), body.trim().to_string()));

    if code == TABLE_NOT_FOUND_CODE {
        return StoreError::TableNotFound(target.table().to_string());
    }

    if let (
        RESOURCE_NOT_FOUND_CODE,
        Target::Entity {
            table,
            partition_key,
            row_key,
        },
    ) = (code.as_str(), target)
    {
        return StoreError::EntityNotFound {
            table: table.to_string(),
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
        };
    }

    StoreError::Request {
        status,
        code,
        message,
    }
}

/// Map a transport error to StoreError.
pub fn map_transport_error(err: reqwest::Error) -> StoreError {
    StoreError::ConnectionFailed(err.to_string())
}

/// Batch sub-responses carry the error body after the part headers.
fn parse_batch_error(body: &str) -> Option<(String, String)> {
    body.find('{')
        .and_then(|start| parse_error_body(body[start..].lines().next().unwrap_or_default()))
}

fn status_code_name(status: u16) -> &'static str {
    match status {
        400 => "BadRequest",
        403 => "AuthenticationFailed",
        404 => RESOURCE_NOT_FOUND_CODE,
        409 => "Conflict",
        412 => "UpdateConditionNotSatisfied",
        413 => "RequestBodyTooLarge",
        500 => "InternalError",
        503 => "ServerBusy",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: &str) -> String {
        format!(r#"{{"odata.error":{{"code":"{code}","message":{{"lang":"en-US","value":"details"}}}}}}"#)
    }

    #[test]
    fn test_table_not_found_maps_to_distinguished_error() {
        let error = map_response_error(404, &body("TableNotFound"), Target::Table("aPRDt1"));
        assert_eq!(error, StoreError::TableNotFound("aPRDt1".to_string()));
    }

    #[test]
    fn test_resource_not_found_on_entity() {
        let target = Target::Entity {
            table: "aPRDt1",
            partition_key: "_default",
            row_key: "x1",
        };
        let error = map_response_error(404, &body("ResourceNotFound"), target);
        assert!(error.is_entity_missing());
    }

    #[test]
    fn test_other_codes_keep_status_and_message() {
        let error = map_response_error(400, &body("InvalidInput"), Target::Table("aPRDt1"));
        assert_eq!(
            error,
            StoreError::Request {
                status: 400,
                code: "InvalidInput".to_string(),
                message: "details".to_string(),
            }
        );
    }

    #[test]
    fn test_unparseable_body_falls_back_to_status() {
        let error = map_response_error(503, "busy", Target::Table("aPRDt1"));
        assert_eq!(error.code(), Some("ServerBusy"));
    }

    #[test]
    fn test_batch_part_error_body() {
        let part = format!("HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\n\r\n{}\r\n", body("TableNotFound"));
        let error = map_response_error(404, &part, Target::Table("aPRDt1"));
        assert!(error.is_table_missing());
    }
}
