//! Entity group transaction encoding.
//!
//! A batch is sent as a `multipart/mixed` body holding one changeset; the
//! response carries one HTTP sub-response per operation, or a single failed
//! sub-response naming the operation that aborted the transaction.

use tablegate_core::entity::WILDCARD_ETAG;
use tablegate_core::store::{BatchOperation, StoreError, TableBatch};

use super::conversions::{entity_resource, entity_to_json};
use super::error::{map_response_error, parse_error_body, Target};

/// Boundaries for one batch request.
#[derive(Debug, Clone)]
pub struct Boundaries {
    pub batch: String,
    pub changeset: String,
}

impl Boundaries {
    pub fn new(id: &str) -> Self {
        Self {
            batch: format!("batch_{id}"),
            changeset: format!("changeset_{id}"),
        }
    }

    /// Value of the outer `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.batch)
    }
}

/// Builds the multipart request body.
///
/// `base_url` is the account endpoint; sub-request lines use absolute URLs.
pub fn encode_batch(base_url: &str, batch: &TableBatch, boundaries: &Boundaries) -> String {
    let mut body = String::new();
    body.push_str(&format!("--{}\r\n", boundaries.batch));
    body.push_str(&format!(
        "Content-Type: multipart/mixed; boundary={}\r\n\r\n",
        boundaries.changeset
    ));

    for operation in batch.operations() {
        let entity = operation.entity();
        let url = format!(
            "{base_url}/{}",
            entity_resource(batch.table(), &entity.partition_key, &entity.row_key)
        );

        body.push_str(&format!("--{}\r\n", boundaries.changeset));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str("Content-Transfer-Encoding: binary\r\n\r\n");

        match operation {
            BatchOperation::UpsertMerge(entity) => {
                body.push_str(&format!("MERGE {url} HTTP/1.1\r\n"));
                body.push_str("Content-Type: application/json\r\n");
                body.push_str("Accept: application/json;odata=nometadata\r\n");
                body.push_str("DataServiceVersion: 3.0;\r\n\r\n");
                body.push_str(&entity_to_json(entity).to_string());
                body.push_str("\r\n");
            }
            BatchOperation::Delete(entity) => {
                body.push_str(&format!("DELETE {url} HTTP/1.1\r\n"));
                body.push_str("Accept: application/json;odata=nometadata\r\n");
                body.push_str("DataServiceVersion: 3.0;\r\n");
                body.push_str(&format!(
                    "If-Match: {}\r\n\r\n",
                    entity.etag.as_deref().unwrap_or(WILDCARD_ETAG)
                ));
            }
        }
    }

    body.push_str(&format!("--{}--\r\n", boundaries.changeset));
    body.push_str(&format!("--{}--\r\n", boundaries.batch));
    body
}

/// One HTTP sub-response from a batch response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub body: String,
}

impl PartResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Splits a batch response body into its sub-responses.
pub fn parse_batch_response(body: &str) -> Vec<PartResponse> {
    let mut parts = Vec::new();
    let mut lines = body.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(status_line) = line.strip_prefix("HTTP/1.1 ") else {
            continue;
        };
        let status = status_line
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let mut etag = None;
        for header in lines.by_ref() {
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.trim().eq_ignore_ascii_case("etag") {
                    etag = Some(value.trim().to_string());
                }
            }
        }

        let mut content = String::new();
        while let Some(next) = lines.next_if(|l| !l.starts_with("--")) {
            content.push_str(next.trim_end());
        }

        parts.push(PartResponse {
            status,
            etag,
            body: content,
        });
    }

    parts
}

/// Turns sub-responses into commit tokens aligned with the staged operations.
pub fn decode_batch_response(
    batch: &TableBatch,
    parts: &[PartResponse],
) -> Result<Vec<Option<String>>, StoreError> {
    if let Some(failed) = parts.iter().find(|p| !p.is_success()) {
        return Err(map_response_error(
            failed.status,
            &failed.body,
            failed_target(batch, &failed.body),
        ));
    }

    if parts.len() != batch.len() {
        return Err(StoreError::Serialization(format!(
            "expected {} batch responses but got {}",
            batch.len(),
            parts.len()
        )));
    }

    Ok(batch
        .operations()
        .iter()
        .zip(parts)
        .map(|(operation, part)| match operation {
            BatchOperation::UpsertMerge(_) => part.etag.clone(),
            BatchOperation::Delete(_) => None,
        })
        .collect())
}

/// The failing operation's index prefixes the error message as `<index>:`.
fn failed_target<'a>(batch: &'a TableBatch, body: &str) -> Target<'a> {
    parse_error_body(body)
        .and_then(|(_, message)| {
            message
                .split_once(':')
                .and_then(|(index, _)| index.trim().parse::<usize>().ok())
        })
        .and_then(|index| batch.operations().get(index))
        .map(|operation| {
            let entity = operation.entity();
            Target::Entity {
                table: batch.table(),
                partition_key: &entity.partition_key,
                row_key: &entity.row_key,
            }
        })
        .unwrap_or(Target::Table(batch.table()))
}
