//! HTTP adapter for the external identity directory
//!
//! The directory resolves an access token to the principal's group keys
//! and profile picture. Weld only consumes the lookup; group data is
//! owned entirely by the directory.

use async_trait::async_trait;
use tracing::{debug, instrument};

use weld_core::{IdentityData, IdentityDirectory, Result, WeldError};

/// Directory client over a single lookup endpoint. The caller's access
/// token is passed through as the bearer credential, so the directory
/// answers with exactly the groups that token can see.
pub struct HttpIdentityDirectory {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIdentityDirectory {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| WeldError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    #[instrument(skip(self, access_token))]
    async fn get_identity_data(&self, access_token: &str) -> Result<IdentityData> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| WeldError::internal(format!("Directory request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(WeldError::authentication(
                "directory rejected the access token",
            ));
        }
        if !status.is_success() {
            return Err(WeldError::internal(format!(
                "Directory returned HTTP {}",
                status
            )));
        }

        let data: IdentityData = response
            .json()
            .await
            .map_err(|e| WeldError::internal(format!("Failed to parse directory response: {}", e)))?;

        debug!(groups = data.group_keys.len(), "Directory lookup complete");
        Ok(data)
    }
}

impl std::fmt::Debug for HttpIdentityDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityDirectory")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
