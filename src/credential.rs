//! Bearer credential for the model endpoint.
//!
//! Loaded once at process start and handed to
//! [`crate::pipeline::client::ApiClient::new`]; never mutated afterwards.
//! `Debug` and `Display` are redacted so the key cannot end up in logs.

use crate::error::PdfAskError;
use std::fmt;
use std::sync::Arc;

/// Environment variable the binary reads the key from.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// An immutable, cheaply clonable API key.
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    /// Wrap a key, rejecting empty or whitespace-only values.
    pub fn new(key: impl AsRef<str>) -> Result<Self, PdfAskError> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(PdfAskError::InvalidConfig("API key must not be empty".into()));
        }
        Ok(Self(Arc::from(key)))
    }

    /// Read the key from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, PdfAskError> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| {
            PdfAskError::InvalidConfig(format!("{API_KEY_ENV} is not set"))
        })?;
        Self::new(key)
    }

    /// Value of the `Authorization` header.
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_key() {
        assert!(ApiKey::new("   ").is_err());
    }

    #[test]
    fn never_prints_secret() {
        let key = ApiKey::new("sk-test-123").unwrap();
        assert!(!format!("{key:?}").contains("sk-test"));
        assert!(!key.to_string().contains("sk-test"));
        assert_eq!(key.bearer(), "Bearer sk-test-123");
    }
}
