//! Space administration
//!
//! Explicit admin actions over spaces: create, rename, soft-delete,
//! membership changes, and moderator handover. Every mutation consults
//! the authorization store first, applies the relational write, then
//! projects the matching tuple change. Moderator handover rides a single
//! atomic update so no observer sees a space with zero or two
//! moderators.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::authz::{AuthObject, AuthRelation, AuthSubject, RelationshipTuple, SPACE_PERMISSIONS};
use crate::error::{Result, WeldError};
use crate::ids::{OrganizationId, SpaceId, UserId};
use crate::models::Space;
use crate::traits::{AuthorizationStore, SpaceRepository};

pub struct SpaceService<S, A>
where
    S: SpaceRepository,
    A: AuthorizationStore,
{
    spaces: Arc<S>,
    authz: Arc<A>,
    organization_id: OrganizationId,
}

impl<S, A> SpaceService<S, A>
where
    S: SpaceRepository + 'static,
    A: AuthorizationStore + 'static,
{
    pub fn new(spaces: Arc<S>, authz: Arc<A>, organization_id: OrganizationId) -> Self {
        Self {
            spaces,
            authz,
            organization_id,
        }
    }

    /// Create a space and grant its moderator role.
    #[instrument(skip(self))]
    pub async fn create_space(
        &self,
        actor: UserId,
        name: &str,
        moderator_user_id: UserId,
    ) -> Result<Space> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WeldError::invalid_operation("space name cannot be empty"));
        }
        self.require(
            actor,
            AuthRelation::OrganizationAdmin,
            AuthObject::Organization(self.organization_id),
        )
        .await?;

        let space = self.spaces.add(&Space::new(name, moderator_user_id)).await?;

        let object = AuthObject::Space(space.id);
        self.authz
            .create_relationships(&[
                RelationshipTuple::new(
                    AuthSubject::Organization(self.organization_id),
                    AuthRelation::SpaceOrganization,
                    object,
                ),
                RelationshipTuple::user(moderator_user_id, AuthRelation::SpaceModerator, object),
            ])
            .await?;

        info!(space_id = %space.id, name = %space.name, "Space created");
        Ok(space)
    }

    #[instrument(skip(self))]
    pub async fn rename_space(
        &self,
        actor: UserId,
        space_id: SpaceId,
        new_name: &str,
    ) -> Result<Space> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(WeldError::invalid_operation("space name cannot be empty"));
        }
        self.require(actor, AuthRelation::SpaceRename, AuthObject::Space(space_id))
            .await?;

        let mut space = self.get_space(space_id).await?;
        if space.name == new_name {
            return Ok(space);
        }
        space.name = new_name.to_string();
        space.updated_at = Utc::now();
        self.spaces.update(&space).await
    }

    /// Soft-delete a space and retract its tuples. Folder/resource/app
    /// cascade is owned by their collaborators.
    #[instrument(skip(self))]
    pub async fn delete_space(&self, actor: UserId, space_id: SpaceId) -> Result<()> {
        self.require(actor, AuthRelation::SpaceDelete, AuthObject::Space(space_id))
            .await?;

        let space = self.get_space(space_id).await?;
        self.spaces.soft_delete(space_id).await?;

        let object = AuthObject::Space(space_id);
        let mut tuples = vec![
            RelationshipTuple::new(
                AuthSubject::Organization(self.organization_id),
                AuthRelation::SpaceOrganization,
                object,
            ),
            RelationshipTuple::user(
                space.moderator_user_id,
                AuthRelation::SpaceModerator,
                object,
            ),
        ];
        tuples.extend(
            space
                .member_ids
                .iter()
                .map(|id| RelationshipTuple::user(*id, AuthRelation::SpaceMember, object)),
        );
        self.authz.delete_relationships(&tuples).await?;

        info!(space_id = %space_id, "Space soft-deleted");
        Ok(())
    }

    /// Add an explicit member. Idempotent; adding the moderator as an
    /// explicit member is allowed but not required for access.
    #[instrument(skip(self))]
    pub async fn add_member(&self, actor: UserId, space_id: SpaceId, user_id: UserId) -> Result<()> {
        self.require(
            actor,
            AuthRelation::SpaceAddMember,
            AuthObject::Space(space_id),
        )
        .await?;

        let mut space = self.get_space(space_id).await?;
        if space.member_ids.contains(&user_id) {
            return Ok(());
        }
        space.member_ids.insert(user_id);
        space.updated_at = Utc::now();
        self.spaces.update(&space).await?;

        self.authz
            .create_relationships(&[RelationshipTuple::user(
                user_id,
                AuthRelation::SpaceMember,
                AuthObject::Space(space_id),
            )])
            .await
    }

    /// Remove an explicit member. The moderator cannot leave through
    /// this path; hand the space over first.
    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        actor: UserId,
        space_id: SpaceId,
        user_id: UserId,
    ) -> Result<()> {
        self.require(
            actor,
            AuthRelation::SpaceRemoveMember,
            AuthObject::Space(space_id),
        )
        .await?;

        let mut space = self.get_space(space_id).await?;
        if space.moderator_user_id == user_id {
            return Err(WeldError::invalid_operation(
                "the space moderator cannot be removed from the member list; change the moderator instead",
            ));
        }
        if !space.member_ids.remove(&user_id) {
            return Ok(());
        }
        space.updated_at = Utc::now();
        self.spaces.update(&space).await?;

        self.authz
            .delete_relationships(&[RelationshipTuple::user(
                user_id,
                AuthRelation::SpaceMember,
                AuthObject::Space(space_id),
            )])
            .await
    }

    /// Hand the space over to a new moderator. The previous moderator
    /// stays on as a plain member. Both role transitions are applied in
    /// one atomic store update.
    #[instrument(skip(self))]
    pub async fn change_moderator(
        &self,
        actor: UserId,
        space_id: SpaceId,
        new_moderator_id: UserId,
    ) -> Result<Space> {
        self.require(
            actor,
            AuthRelation::OrganizationAdmin,
            AuthObject::Organization(self.organization_id),
        )
        .await?;

        let mut space = self.get_space(space_id).await?;
        let previous = space.moderator_user_id;
        if previous == new_moderator_id {
            return Ok(space);
        }

        space.moderator_user_id = new_moderator_id;
        space.member_ids.remove(&new_moderator_id);
        space.member_ids.insert(previous);
        space.updated_at = Utc::now();
        let space = self.spaces.update(&space).await?;

        let object = AuthObject::Space(space_id);
        self.authz
            .update_relationships(
                &[
                    RelationshipTuple::user(new_moderator_id, AuthRelation::SpaceModerator, object),
                    RelationshipTuple::user(previous, AuthRelation::SpaceMember, object),
                ],
                &[
                    RelationshipTuple::user(previous, AuthRelation::SpaceModerator, object),
                    RelationshipTuple::user(new_moderator_id, AuthRelation::SpaceMember, object),
                ],
            )
            .await?;

        info!(space_id = %space_id, previous = %previous, new = %new_moderator_id, "Moderator changed");
        Ok(space)
    }

    /// Every space permission for one user, in a single store round
    /// trip. Feeds UI affordances; not a mutation gate.
    pub async fn permissions_for(
        &self,
        user_id: UserId,
        space_id: SpaceId,
    ) -> Result<HashMap<AuthRelation, bool>> {
        self.authz
            .batch_check_permission(
                &AuthSubject::User(user_id),
                SPACE_PERMISSIONS,
                &AuthObject::Space(space_id),
            )
            .await
    }

    async fn get_space(&self, space_id: SpaceId) -> Result<Space> {
        self.spaces
            .get_by_id(space_id)
            .await?
            .ok_or_else(|| WeldError::not_found("space", space_id.to_string()))
    }

    async fn require(
        &self,
        actor: UserId,
        relation: AuthRelation,
        object: AuthObject,
    ) -> Result<()> {
        let allowed = self
            .authz
            .check_permission(&AuthSubject::User(actor), relation, &object)
            .await?;
        if allowed {
            Ok(())
        } else {
            Err(WeldError::permission_denied(
                relation.wire_name(),
                object.to_string(),
            ))
        }
    }
}
