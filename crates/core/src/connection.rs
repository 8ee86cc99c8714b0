//! Store connection descriptors.
//!
//! A descriptor is either an Azure style connection string
//! (`AccountName=...;AccountKey=...;TableEndpoint=...`) or the legacy
//! `account:key` pair. Both resolve to an endpoint, an account name and an
//! account key.

use std::fmt;

use thiserror::Error;

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Errors that can occur when parsing a connection descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Connection descriptor is empty")]
    Empty,
    #[error("Connection descriptor is missing {0}")]
    MissingField(&'static str),
    #[error("Malformed connection descriptor segment: {0}")]
    Malformed(String),
}

/// Endpoint and credentials for one backing store account.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub endpoint: String,
    pub account_name: String,
    pub account_key: String,
}

impl ConnectionDescriptor {
    /// Parses a connection descriptor.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablegate_core::connection::ConnectionDescriptor;
    ///
    /// let descriptor = ConnectionDescriptor::parse("myaccount:c2VjcmV0").unwrap();
    /// assert_eq!(descriptor.account_name, "myaccount");
    /// assert_eq!(descriptor.endpoint, "https://myaccount.table.core.windows.net");
    /// ```
    pub fn parse(text: &str) -> Result<Self, ConnectionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConnectionError::Empty);
        }

        if text.contains('=') {
            Self::parse_key_values(text)
        } else {
            Self::parse_legacy(text)
        }
    }

    fn parse_legacy(text: &str) -> Result<Self, ConnectionError> {
        let (name, key) = text
            .split_once(':')
            .ok_or(ConnectionError::MissingField("AccountKey"))?;
        let name = name.trim();
        let key = key.trim();

        if name.is_empty() {
            return Err(ConnectionError::MissingField("AccountName"));
        }
        if key.is_empty() {
            return Err(ConnectionError::MissingField("AccountKey"));
        }

        Ok(Self {
            endpoint: default_endpoint(DEFAULT_PROTOCOL, name, DEFAULT_ENDPOINT_SUFFIX),
            account_name: name.to_string(),
            account_key: key.to_string(),
        })
    }

    fn parse_key_values(text: &str) -> Result<Self, ConnectionError> {
        let mut protocol = DEFAULT_PROTOCOL;
        let mut suffix = DEFAULT_ENDPOINT_SUFFIX;
        let mut account_name = None;
        let mut account_key = None;
        let mut table_endpoint = None;

        for segment in text.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Account keys are base64 and may end in '=', so split on the first one only.
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionError::Malformed(segment.to_string()))?;

            match key.trim() {
                "DefaultEndpointsProtocol" => protocol = value.trim(),
                "EndpointSuffix" => suffix = value.trim(),
                "AccountName" => account_name = Some(value.trim()),
                "AccountKey" => account_key = Some(value.trim()),
                "TableEndpoint" => table_endpoint = Some(value.trim()),
                _ => {}
            }
        }

        let account_name = account_name
            .filter(|s| !s.is_empty())
            .ok_or(ConnectionError::MissingField("AccountName"))?;
        let account_key = account_key
            .filter(|s| !s.is_empty())
            .ok_or(ConnectionError::MissingField("AccountKey"))?;

        let endpoint = match table_endpoint.filter(|s| !s.is_empty()) {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => default_endpoint(protocol, account_name, suffix),
        };

        Ok(Self {
            endpoint,
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        })
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("endpoint", &self.endpoint)
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .finish()
    }
}

fn default_endpoint(protocol: &str, account_name: &str, suffix: &str) -> String {
    format!("{protocol}://{account_name}.table.{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_pair() {
        let descriptor = ConnectionDescriptor::parse("acct:a2V5").unwrap();

        assert_eq!(descriptor.account_name, "acct");
        assert_eq!(descriptor.account_key, "a2V5");
        assert_eq!(descriptor.endpoint, "https://acct.table.core.windows.net");
    }

    #[test]
    fn test_parse_connection_string() {
        let descriptor = ConnectionDescriptor::parse(
            "DefaultEndpointsProtocol=http;AccountName=acct;AccountKey=a2V5==;EndpointSuffix=example.net",
        )
        .unwrap();

        assert_eq!(descriptor.account_name, "acct");
        assert_eq!(descriptor.account_key, "a2V5==");
        assert_eq!(descriptor.endpoint, "http://acct.table.example.net");
    }

    #[test]
    fn test_parse_explicit_table_endpoint() {
        let descriptor = ConnectionDescriptor::parse(
            "AccountName=devstoreaccount1;AccountKey=a2V5;TableEndpoint=http://127.0.0.1:10002/devstoreaccount1/;",
        )
        .unwrap();

        assert_eq!(descriptor.endpoint, "http://127.0.0.1:10002/devstoreaccount1");
    }

    #[test]
    fn test_parse_empty_fails() {
        assert_eq!(
            ConnectionDescriptor::parse("   "),
            Err(ConnectionError::Empty)
        );
    }

    #[test]
    fn test_parse_missing_key_fails() {
        assert_eq!(
            ConnectionDescriptor::parse("AccountName=acct"),
            Err(ConnectionError::MissingField("AccountKey"))
        );
        assert_eq!(
            ConnectionDescriptor::parse("acct"),
            Err(ConnectionError::MissingField("AccountKey"))
        );
        assert_eq!(
            ConnectionDescriptor::parse(":a2V5"),
            Err(ConnectionError::MissingField("AccountName"))
        );
    }

    #[test]
    fn test_parse_malformed_segment_fails() {
        assert_eq!(
            ConnectionDescriptor::parse("AccountName=acct;garbage"),
            Err(ConnectionError::Malformed("garbage".to_string()))
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let descriptor = ConnectionDescriptor::parse("acct:supersecret").unwrap();
        let debug = format!("{descriptor:?}");

        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("<redacted>"));
    }
}
