//! Access tokens for the Sheets API.

use std::path::Path;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use pressline_shared::{PresslineError, Result};
use tracing::debug;

/// OAuth scope for reading and writing spreadsheet values.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Something that can hand out a bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// Tokens minted from a service-account key file. Cached and refreshed by
/// `gcp_auth`.
pub struct ServiceAccountTokens {
    account: CustomServiceAccount,
}

impl ServiceAccountTokens {
    pub fn from_file(path: &Path) -> Result<Self> {
        let account = CustomServiceAccount::from_file(path).map_err(|e| {
            PresslineError::config(format!(
                "invalid service account key {}: {e}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), "loaded service account key");
        Ok(Self { account })
    }
}

impl std::fmt::Debug for ServiceAccountTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokens").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn token(&self) -> Result<String> {
        let token = self
            .account
            .token(&[SPREADSHEETS_SCOPE])
            .await
            .map_err(|e| PresslineError::queue_transient(format!("failed to get access token: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_key_file_is_config_error() {
        let path = std::env::temp_dir().join(format!("pl-key-{}.json", uuid::Uuid::now_v7()));
        std::fs::write(&path, "{\"type\": \"not a key\"}").unwrap();

        let err = ServiceAccountTokens::from_file(&path).unwrap_err();
        assert!(matches!(err, PresslineError::Config { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn static_token_returns_value() {
        let source = StaticToken("t0k3n".into());
        assert_eq!(source.token().await.unwrap(), "t0k3n");
    }
}
