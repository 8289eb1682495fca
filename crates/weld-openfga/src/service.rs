//! High-level authorization store backed by OpenFGA

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use weld_core::{
    AuthObject, AuthRelation, AuthSubject, AuthorizationStore, RelationshipTuple, Result,
    WeldError,
};

use crate::client::{FgaClient, FgaConfig, WireTuple};
use crate::model;

/// OpenFGA-backed authorization store.
///
/// Holds the store and model ids resolved at bootstrap; every tuple
/// write and check is pinned to that model id so a model published
/// later cannot change the meaning of in-flight requests.
pub struct FgaAuthorizationStore {
    client: FgaClient,
    store_name: String,
    ids: RwLock<StoreIds>,
}

#[derive(Default)]
struct StoreIds {
    store_id: Option<String>,
    model_id: Option<String>,
}

impl FgaAuthorizationStore {
    pub fn new(client: FgaClient, store_name: impl Into<String>, store_id: Option<String>) -> Self {
        Self {
            client,
            store_name: store_name.into(),
            ids: RwLock::new(StoreIds {
                store_id,
                model_id: None,
            }),
        }
    }

    /// Connect to OpenFGA and bind to the configured store.
    pub async fn connect(config: &FgaConfig) -> Result<Self> {
        let client = FgaClient::new(config).await?;
        Ok(Self::new(
            client,
            config.store_name.clone(),
            config.store_id.clone(),
        ))
    }

    /// Get the underlying client for advanced operations
    pub fn client(&self) -> &FgaClient {
        &self.client
    }

    /// Ensure a store exists and publish the current authorization
    /// model. A pinned store id is reused; otherwise a store is created
    /// under the configured name. The model is always re-published so a
    /// restarted server runs against the model its code expects.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<()> {
        info!("Bootstrapping authorization store");

        let pinned = self.ids.read().await.store_id.clone();
        let store_id = match pinned {
            Some(id) => {
                debug!(store_id = %id, "Reusing configured store id");
                id
            }
            None => {
                let id = self.client.create_store(&self.store_name).await?;
                self.ids.write().await.store_id = Some(id.clone());
                id
            }
        };

        let model_id = self
            .client
            .write_authorization_model(
                &store_id,
                model::authorization_model(),
                model::SCHEMA_VERSION,
            )
            .await?;
        self.ids.write().await.model_id = Some(model_id.clone());

        info!(store_id = %store_id, model_id = %model_id, "Authorization store ready");
        Ok(())
    }

    /// Whether the bound store answers requests.
    pub async fn ping(&self) -> bool {
        match self.current_ids().await {
            Ok((store_id, _)) => self.client.health_check(&store_id).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn current_ids(&self) -> Result<(String, String)> {
        let ids = self.ids.read().await;
        match (&ids.store_id, &ids.model_id) {
            (Some(store_id), Some(model_id)) => Ok((store_id.clone(), model_id.clone())),
            _ => Err(WeldError::configuration(
                "authorization store has not been bootstrapped",
            )),
        }
    }

    pub(crate) fn wire(tuple: &RelationshipTuple) -> WireTuple {
        (
            tuple.subject.to_string(),
            tuple.relation.wire_name().to_string(),
            tuple.object.to_string(),
        )
    }
}

#[async_trait]
impl AuthorizationStore for FgaAuthorizationStore {
    #[instrument(skip(self))]
    async fn create_store(&self, name: &str) -> Result<String> {
        let id = self.client.create_store(name).await?;
        self.ids.write().await.store_id = Some(id.clone());
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn write_authorization_model(&self) -> Result<String> {
        let store_id = self.ids.read().await.store_id.clone().ok_or_else(|| {
            WeldError::configuration("cannot publish a model before a store exists")
        })?;

        let model_id = self
            .client
            .write_authorization_model(
                &store_id,
                model::authorization_model(),
                model::SCHEMA_VERSION,
            )
            .await?;
        self.ids.write().await.model_id = Some(model_id.clone());
        Ok(model_id)
    }

    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    async fn create_relationships(&self, tuples: &[RelationshipTuple]) -> Result<()> {
        if tuples.is_empty() {
            return Ok(());
        }
        let (store_id, model_id) = self.current_ids().await?;
        let writes: Vec<WireTuple> = tuples.iter().map(Self::wire).collect();
        self.client.write(&store_id, &model_id, &writes, &[]).await
    }

    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    async fn delete_relationships(&self, tuples: &[RelationshipTuple]) -> Result<()> {
        if tuples.is_empty() {
            return Ok(());
        }
        let (store_id, model_id) = self.current_ids().await?;
        let deletes: Vec<WireTuple> = tuples.iter().map(Self::wire).collect();
        self.client.write(&store_id, &model_id, &[], &deletes).await
    }

    #[instrument(skip(self, to_add, to_remove), fields(added = to_add.len(), removed = to_remove.len()))]
    async fn update_relationships(
        &self,
        to_add: &[RelationshipTuple],
        to_remove: &[RelationshipTuple],
    ) -> Result<()> {
        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(());
        }
        let (store_id, model_id) = self.current_ids().await?;
        let writes: Vec<WireTuple> = to_add.iter().map(Self::wire).collect();
        let deletes: Vec<WireTuple> = to_remove.iter().map(Self::wire).collect();
        // One Write RPC; OpenFGA applies writes and deletes in a single
        // transaction.
        self.client
            .write(&store_id, &model_id, &writes, &deletes)
            .await
    }

    #[instrument(skip(self))]
    async fn check_permission(
        &self,
        subject: &AuthSubject,
        relation: AuthRelation,
        object: &AuthObject,
    ) -> Result<bool> {
        let (store_id, model_id) = self.current_ids().await?;
        self.client
            .check(
                &store_id,
                &model_id,
                &subject.to_string(),
                relation.wire_name(),
                &object.to_string(),
            )
            .await
    }

    #[instrument(skip(self, relations), fields(count = relations.len()))]
    async fn batch_check_permission(
        &self,
        subject: &AuthSubject,
        relations: &[AuthRelation],
        object: &AuthObject,
    ) -> Result<HashMap<AuthRelation, bool>> {
        let (store_id, model_id) = self.current_ids().await?;
        let checks: Vec<WireTuple> = relations
            .iter()
            .map(|relation| {
                (
                    subject.to_string(),
                    relation.wire_name().to_string(),
                    object.to_string(),
                )
            })
            .collect();

        let allowed = self.client.batch_check(&store_id, &model_id, &checks).await?;
        Ok(relations.iter().copied().zip(allowed).collect())
    }
}

impl std::fmt::Debug for FgaAuthorizationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FgaAuthorizationStore")
            .field("store_name", &self.store_name)
            .finish()
    }
}
