//! SharedKeyLite request signing.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use tablegate_core::store::StoreError;

type HmacSha256 = Hmac<Sha256>;

/// Signs table service requests with an account key.
#[derive(Clone)]
pub struct SharedKeyLite {
    account_name: String,
    key: Vec<u8>,
}

impl std::fmt::Debug for SharedKeyLite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeyLite")
            .field("account_name", &self.account_name)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SharedKeyLite {
    /// Decodes the base64 account key.
    pub fn new(account_name: &str, account_key: &str) -> Result<Self, StoreError> {
        let key = STANDARD.decode(account_key.trim()).map_err(|e| {
            StoreError::ConnectionFailed(format!("account key for {account_name} is not base64: {e}"))
        })?;

        Ok(Self {
            account_name: account_name.to_string(),
            key,
        })
    }

    /// Builds the `Authorization` header value for a request.
    ///
    /// `path` is the URL path of the request; the query string is not signed.
    pub fn authorization(&self, date: &str, path: &str) -> Result<String, StoreError> {
        let string_to_sign = format!("{date}\n/{}{path}", self.account_name);

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StoreError::ConnectionFailed(format!("invalid account key: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKeyLite {}:{signature}", self.account_name))
    }
}

/// Formats a timestamp for the `x-ms-date` header.
pub fn request_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_request_date_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(request_date(now), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn test_authorization_is_deterministic() {
        let signer = SharedKeyLite::new("acct", "c2VjcmV0").unwrap();
        let date = "Tue, 05 Mar 2024 07:08:09 GMT";

        let first = signer.authorization(date, "/Tables").unwrap();
        let second = signer.authorization(date, "/Tables").unwrap();

        assert!(first.starts_with("SharedKeyLite acct:"));
        assert_eq!(first, second);
        assert_ne!(first, signer.authorization(date, "/other").unwrap());
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let result = SharedKeyLite::new("acct", "not base64!!");
        assert!(matches!(result, Err(StoreError::ConnectionFailed(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = SharedKeyLite::new("acct", "c2VjcmV0").unwrap();
        assert!(!format!("{signer:?}").contains("secret"));
    }
}
