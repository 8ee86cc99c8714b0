//! Delimited text to batch records.

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use tablegate_core::entity::{Record, Value};

const DEFAULT_DELIMITER: u8 = b',';

#[derive(Debug, Error)]
pub enum DelimitedError {
    #[error("invalid delimited text: {0}")]
    Parse(#[from] csv::Error),
    #[error("delimited text has no header row")]
    MissingHeaders,
}

/// Parses `text` into records of string values.
///
/// The delimiter is the first byte of `delimiter`, or `,`. When `headers`
/// (comma separated) is given every line is data; otherwise the first line
/// names the columns.
pub fn parse_records(
    text: &str,
    delimiter: Option<&str>,
    headers: Option<&str>,
) -> Result<Vec<Record>, DelimitedError> {
    let delimiter = delimiter
        .and_then(|d| d.as_bytes().first().copied())
        .unwrap_or(DEFAULT_DELIMITER);

    let explicit_headers = headers
        .filter(|h| !h.trim().is_empty())
        .map(|h| StringRecord::from(h.split(',').map(str::trim).collect::<Vec<_>>()));

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(explicit_headers.is_none())
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = match explicit_headers {
        Some(headers) => headers,
        None => {
            let headers = reader.headers()?.clone();
            if headers.is_empty() {
                return Err(DelimitedError::MissingHeaders);
            }
            headers
        }
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();
        records.push(record);
    }

    Ok(records)
}
