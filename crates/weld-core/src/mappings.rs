//! Group-mapping administration
//!
//! Admin commands over OU-group-key to space mappings. Mapping rows are
//! never hard-deleted; deactivated rows stay behind as history. At most
//! one mapping per key is active at a time, and this service is the
//! write path that keeps it that way (storage deliberately carries no
//! uniqueness constraint on the key).

use std::sync::Arc;

use tracing::{info, instrument};

use crate::authz::{AuthObject, AuthRelation, AuthSubject};
use crate::error::{Result, WeldError};
use crate::ids::{GroupMappingId, OrganizationId, SpaceId, UserId};
use crate::models::GroupSpaceMapping;
use crate::traits::{AuthorizationStore, GroupMappingRepository};

pub struct MappingService<G, A>
where
    G: GroupMappingRepository,
    A: AuthorizationStore,
{
    mappings: Arc<G>,
    authz: Arc<A>,
    organization_id: OrganizationId,
}

impl<G, A> MappingService<G, A>
where
    G: GroupMappingRepository + 'static,
    A: AuthorizationStore + 'static,
{
    pub fn new(mappings: Arc<G>, authz: Arc<A>, organization_id: OrganizationId) -> Self {
        Self {
            mappings,
            authz,
            organization_id,
        }
    }

    /// All mapping rows, active and inactive.
    pub async fn list(&self, actor: UserId) -> Result<Vec<GroupSpaceMapping>> {
        self.require_org_admin(actor).await?;
        self.mappings.get_all().await
    }

    /// Point a group key at a space. Any previously active mapping for
    /// the key is deactivated first; pointing the key at its current
    /// target is a no-op.
    #[instrument(skip(self))]
    pub async fn add_mapping(
        &self,
        actor: UserId,
        group_key: &str,
        space_id: SpaceId,
    ) -> Result<GroupSpaceMapping> {
        let group_key = group_key.trim();
        if group_key.is_empty() {
            return Err(WeldError::invalid_operation("group key cannot be empty"));
        }
        self.require_org_admin(actor).await?;

        if let Some(existing) = self.mappings.get_active_by_group_key(group_key).await? {
            if existing.space_id == space_id {
                return Ok(existing);
            }
            self.mappings.deactivate(actor, existing.id).await?;
            info!(
                mapping_id = %existing.id,
                group_key = %group_key,
                "Previous mapping deactivated before re-pointing key"
            );
        }

        let mapping = self.mappings.add(actor, group_key, space_id).await?;
        info!(mapping_id = %mapping.id, group_key = %group_key, space_id = %space_id, "Mapping added");
        Ok(mapping)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_mapping(&self, actor: UserId, id: GroupMappingId) -> Result<()> {
        self.require_org_admin(actor).await?;
        self.mappings.deactivate(actor, id).await?;
        info!(mapping_id = %id, "Mapping deactivated");
        Ok(())
    }

    async fn require_org_admin(&self, actor: UserId) -> Result<()> {
        let object = AuthObject::Organization(self.organization_id);
        let allowed = self
            .authz
            .check_permission(
                &AuthSubject::User(actor),
                AuthRelation::OrganizationAdmin,
                &object,
            )
            .await?;
        if allowed {
            Ok(())
        } else {
            Err(WeldError::permission_denied(
                AuthRelation::OrganizationAdmin.wire_name(),
                object.to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{InMemoryGroupMappingRepository, RecordingAuthorizationStore};

    fn service() -> (
        MappingService<InMemoryGroupMappingRepository, RecordingAuthorizationStore>,
        Arc<InMemoryGroupMappingRepository>,
        Arc<RecordingAuthorizationStore>,
    ) {
        let mappings = Arc::new(InMemoryGroupMappingRepository::new());
        let authz = Arc::new(RecordingAuthorizationStore::new());
        authz.set_allow_all(true);
        let service = MappingService::new(mappings.clone(), authz.clone(), OrganizationId::new());
        (service, mappings, authz)
    }

    #[tokio::test]
    async fn add_mapping_requires_org_admin() {
        let (service, mappings, authz) = service();
        authz.set_allow_all(false);

        let err = service
            .add_mapping(UserId::new(), "ou:/Support", SpaceId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WeldError::PermissionDenied { .. }));
        assert!(mappings.all().is_empty());
    }

    #[tokio::test]
    async fn add_mapping_deactivates_previous_active_row() {
        let (service, mappings, _authz) = service();
        let actor = UserId::new();
        let first_space = SpaceId::new();
        let second_space = SpaceId::new();

        let first = service
            .add_mapping(actor, "ou:/Support", first_space)
            .await
            .unwrap();
        service
            .add_mapping(actor, "ou:/Support", second_space)
            .await
            .unwrap();

        let active = mappings.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].space_id, second_space);
        // The first row survives as inactive history.
        let all = mappings.all();
        assert_eq!(all.len(), 2);
        let retired = all.iter().find(|m| m.id == first.id).unwrap();
        assert!(!retired.is_active);
        assert_eq!(retired.updated_by, Some(actor));
    }

    #[tokio::test]
    async fn repointing_key_at_its_current_target_is_a_no_op() {
        let (service, mappings, _authz) = service();
        let actor = UserId::new();
        let space_id = SpaceId::new();

        let first = service
            .add_mapping(actor, "ou:/Support", space_id)
            .await
            .unwrap();
        let second = service
            .add_mapping(actor, "ou:/Support", space_id)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(mappings.all().len(), 1);
    }

    #[tokio::test]
    async fn add_mapping_trims_the_key() {
        let (service, mappings, _authz) = service();

        service
            .add_mapping(UserId::new(), "  ou:/Support  ", SpaceId::new())
            .await
            .unwrap();

        assert_eq!(mappings.all()[0].group_key, "ou:/Support");
    }

    #[tokio::test]
    async fn add_mapping_rejects_blank_keys() {
        let (service, _mappings, _authz) = service();

        let err = service
            .add_mapping(UserId::new(), "   ", SpaceId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WeldError::InvalidOperation { .. }));
    }

    #[tokio::test]
    async fn deactivate_mapping_keeps_the_row() {
        let (service, mappings, _authz) = service();
        let actor = UserId::new();
        let mapping = service
            .add_mapping(actor, "ou:/Support", SpaceId::new())
            .await
            .unwrap();

        service.deactivate_mapping(actor, mapping.id).await.unwrap();

        assert!(mappings.active().is_empty());
        assert_eq!(mappings.all().len(), 1);
    }
}
