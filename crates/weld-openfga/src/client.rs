//! OpenFGA gRPC client implementation

use std::sync::Arc;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{metadata::MetadataValue, Request, Status};
use tracing::{debug, info, instrument};

use weld_core::{Result, WeldError};

use crate::proto;

/// A relationship tuple in wire form: (user, relation, object).
pub type WireTuple = (String, String, String);

/// Configuration for the OpenFGA connection
#[derive(Debug, Clone)]
pub struct FgaConfig {
    /// OpenFGA gRPC endpoint URL (e.g., "http://localhost:8081")
    pub endpoint: String,
    /// Pre-shared key for authentication; empty when the server runs without auth
    pub token: String,
    /// Whether to use TLS
    pub use_tls: bool,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Store name used when bootstrapping a fresh store
    pub store_name: String,
    /// Existing store id; when set, bootstrap skips store creation
    pub store_id: Option<String>,
}

impl Default for FgaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8081".to_string(),
            token: String::new(),
            use_tls: false,
            connect_timeout_ms: 5000,
            request_timeout_ms: 30000,
            store_name: "weld".to_string(),
            store_id: None,
        }
    }
}

/// OpenFGA client wrapper providing typed access to the OpenFGA API
#[derive(Clone)]
pub struct FgaClient {
    channel: Channel,
    token: Arc<String>,
}

impl FgaClient {
    /// Create a new OpenFGA client
    #[instrument(skip(config), fields(endpoint = %config.endpoint))]
    pub async fn new(config: &FgaConfig) -> Result<Self> {
        info!("Connecting to OpenFGA at {}", config.endpoint);

        let mut endpoint = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| WeldError::authorization_store(format!("Invalid endpoint: {}", e)))?
            .connect_timeout(std::time::Duration::from_millis(config.connect_timeout_ms))
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms));

        if config.use_tls {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| {
                    WeldError::authorization_store(format!("Invalid TLS config: {}", e))
                })?;
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| WeldError::authorization_store(format!("Failed to connect: {}", e)))?;

        info!("Connected to OpenFGA successfully");

        Ok(Self {
            channel,
            token: Arc::new(config.token.clone()),
        })
    }

    /// Get the gRPC channel
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// Create an authenticated request
    pub fn create_request<T>(&self, inner: T) -> std::result::Result<Request<T>, Status> {
        let mut request = Request::new(inner);

        if !self.token.is_empty() {
            let bearer = format!("Bearer {}", self.token);
            let metadata_value = MetadataValue::try_from(&bearer)
                .map_err(|e| Status::internal(format!("Invalid token: {}", e)))?;
            request
                .metadata_mut()
                .insert("authorization", metadata_value);
        }

        Ok(request)
    }

    /// Get the service client
    pub fn service_client(&self) -> proto::open_fga_service_client::OpenFgaServiceClient<Channel> {
        proto::open_fga_service_client::OpenFgaServiceClient::new(self.channel.clone())
    }

    /// Create a store and return its id
    #[instrument(skip(self))]
    pub async fn create_store(&self, name: &str) -> Result<String> {
        info!("Creating OpenFGA store {:?}", name);
        let mut client = self.service_client();

        let request = self
            .create_request(proto::CreateStoreRequest {
                name: name.to_string(),
            })
            .map_err(|e| WeldError::authorization_store(e.to_string()))?;

        let response = client
            .create_store(request)
            .await
            .map_err(|e| WeldError::authorization_store(format!("Failed to create store: {}", e)))?;

        let id = response.into_inner().id;
        info!(store_id = %id, "Store created");
        Ok(id)
    }

    /// Publish an authorization model and return its id
    #[instrument(skip(self, type_definitions))]
    pub async fn write_authorization_model(
        &self,
        store_id: &str,
        type_definitions: Vec<proto::TypeDefinition>,
        schema_version: &str,
    ) -> Result<String> {
        info!("Writing authorization model to store {}", store_id);
        let mut client = self.service_client();

        let request = self
            .create_request(proto::WriteAuthorizationModelRequest {
                store_id: store_id.to_string(),
                type_definitions,
                schema_version: schema_version.to_string(),
            })
            .map_err(|e| WeldError::authorization_store(e.to_string()))?;

        let response = client.write_authorization_model(request).await.map_err(|e| {
            WeldError::authorization_store(format!("Failed to write authorization model: {}", e))
        })?;

        let model_id = response.into_inner().authorization_model_id;
        info!(model_id = %model_id, "Authorization model written");
        Ok(model_id)
    }

    /// List authorization model ids, newest first
    #[instrument(skip(self))]
    pub async fn read_authorization_models(&self, store_id: &str) -> Result<Vec<String>> {
        debug!("Reading authorization models from store {}", store_id);
        let mut client = self.service_client();

        let request = self
            .create_request(proto::ReadAuthorizationModelsRequest {
                store_id: store_id.to_string(),
            })
            .map_err(|e| WeldError::authorization_store(e.to_string()))?;

        let response = client.read_authorization_models(request).await.map_err(|e| {
            WeldError::authorization_store(format!("Failed to read authorization models: {}", e))
        })?;

        Ok(response
            .into_inner()
            .authorization_models
            .into_iter()
            .map(|m| m.id)
            .collect())
    }

    /// Write and delete relationship tuples in one transaction.
    /// Duplicate writes and missing deletes are ignored, so replays of
    /// the same tuple set are no-ops.
    #[instrument(skip(self, writes, deletes))]
    pub async fn write(
        &self,
        store_id: &str,
        authorization_model_id: &str,
        writes: &[WireTuple],
        deletes: &[WireTuple],
    ) -> Result<()> {
        debug!(
            "Writing {} and deleting {} tuples in store {}",
            writes.len(),
            deletes.len(),
            store_id
        );

        if writes.is_empty() && deletes.is_empty() {
            return Ok(());
        }

        let mut client = self.service_client();

        let writes = (!writes.is_empty()).then(|| proto::WriteRequestWrites {
            tuple_keys: writes
                .iter()
                .map(|(user, relation, object)| proto::TupleKey {
                    user: user.clone(),
                    relation: relation.clone(),
                    object: object.clone(),
                })
                .collect(),
            on_duplicate: proto::OnDuplicateWriteSemantics::Ignore as i32,
        });

        let deletes = (!deletes.is_empty()).then(|| proto::WriteRequestDeletes {
            tuple_keys: deletes
                .iter()
                .map(|(user, relation, object)| proto::TupleKeyWithoutCondition {
                    user: user.clone(),
                    relation: relation.clone(),
                    object: object.clone(),
                })
                .collect(),
            on_missing: proto::OnMissingDeleteSemantics::Ignore as i32,
        });

        let request = self
            .create_request(proto::WriteRequest {
                store_id: store_id.to_string(),
                writes,
                deletes,
                authorization_model_id: authorization_model_id.to_string(),
            })
            .map_err(|e| WeldError::authorization_store(e.to_string()))?;

        client
            .write(request)
            .await
            .map_err(|e| WeldError::authorization_store(format!("Failed to write tuples: {}", e)))?;

        debug!("Tuples written successfully");
        Ok(())
    }

    /// Check a single permission
    #[instrument(skip(self))]
    pub async fn check(
        &self,
        store_id: &str,
        authorization_model_id: &str,
        user: &str,
        relation: &str,
        object: &str,
    ) -> Result<bool> {
        debug!("Checking permission: ({}, {}, {})", user, relation, object);

        let mut client = self.service_client();

        let request = self
            .create_request(proto::CheckRequest {
                store_id: store_id.to_string(),
                tuple_key: Some(proto::CheckRequestTupleKey {
                    user: user.to_string(),
                    relation: relation.to_string(),
                    object: object.to_string(),
                }),
                authorization_model_id: authorization_model_id.to_string(),
                trace: false,
                context: None,
                consistency: proto::ConsistencyPreference::HigherConsistency as i32,
            })
            .map_err(|e| WeldError::authorization_store(e.to_string()))?;

        let response = client
            .check(request)
            .await
            .map_err(|e| WeldError::authorization_store(format!("Permission check failed: {}", e)))?;

        let allowed = response.into_inner().allowed;
        debug!("Permission check result: {}", allowed);

        Ok(allowed)
    }

    /// Check many permissions in one round trip. Results come back in
    /// the order the checks were given; a missing or errored entry in
    /// the response fails the whole call.
    #[instrument(skip(self, checks))]
    pub async fn batch_check(
        &self,
        store_id: &str,
        authorization_model_id: &str,
        checks: &[WireTuple],
    ) -> Result<Vec<bool>> {
        debug!("Batch checking {} permissions", checks.len());

        if checks.is_empty() {
            return Ok(Vec::new());
        }

        let mut client = self.service_client();

        // Correlation ids are positional so replies can be matched back
        // to the request order.
        let items = checks
            .iter()
            .enumerate()
            .map(|(index, (user, relation, object))| proto::BatchCheckItem {
                tuple_key: Some(proto::CheckRequestTupleKey {
                    user: user.clone(),
                    relation: relation.clone(),
                    object: object.clone(),
                }),
                context: None,
                correlation_id: index.to_string(),
            })
            .collect();

        let request = self
            .create_request(proto::BatchCheckRequest {
                store_id: store_id.to_string(),
                checks: items,
                authorization_model_id: authorization_model_id.to_string(),
                consistency: proto::ConsistencyPreference::HigherConsistency as i32,
            })
            .map_err(|e| WeldError::authorization_store(e.to_string()))?;

        let response = client
            .batch_check(request)
            .await
            .map_err(|e| WeldError::authorization_store(format!("Batch check failed: {}", e)))?;

        let mut result = response.into_inner().result;
        let mut allowed = Vec::with_capacity(checks.len());
        for index in 0..checks.len() {
            let single = result.remove(&index.to_string()).ok_or_else(|| {
                WeldError::authorization_store(format!(
                    "Batch check response missing entry for check {}",
                    index
                ))
            })?;
            match single.check_result {
                Some(proto::batch_check_single_result::CheckResult::Allowed(value)) => {
                    allowed.push(value)
                }
                Some(proto::batch_check_single_result::CheckResult::Error(error)) => {
                    return Err(WeldError::authorization_store(format!(
                        "Batch check entry {} failed: {}",
                        index, error.message
                    )))
                }
                None => {
                    return Err(WeldError::authorization_store(format!(
                        "Batch check entry {} carried no result",
                        index
                    )))
                }
            }
        }

        debug!("Batch check results: {:?}", allowed);
        Ok(allowed)
    }

    /// Check if the store is reachable by listing its models
    #[instrument(skip(self))]
    pub async fn health_check(&self, store_id: &str) -> Result<bool> {
        debug!("Performing OpenFGA health check");
        match self.read_authorization_models(store_id).await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("OpenFGA health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for FgaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FgaClient")
            .field("has_token", &!self.token.is_empty())
            .finish()
    }
}
