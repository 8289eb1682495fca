//! Core traits for the Weld access-control subsystem

use std::collections::HashMap;

use async_trait::async_trait;

use crate::authz::{AuthObject, AuthRelation, AuthSubject, RelationshipTuple};
use crate::error::Result;
use crate::ids::{GroupMappingId, SpaceId, UserId};
use crate::models::{GroupSpaceMapping, IdentityData, Space, User};

// =============================================================================
// Authorization Store
// =============================================================================

/// Client contract for the external relationship-tuple store.
///
/// The store evaluates permissions itself; this side only defines the
/// schema, writes tuples, and asks questions. Backend failures always
/// surface as errors so a caller can tell "denied" from "could not
/// determine"; no relation ever defaults to allowed or denied.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Provision an isolated tuple namespace. Distinct calls create
    /// distinct stores; there is no dedup by name.
    async fn create_store(&self, name: &str) -> Result<String>;

    /// Publish the authorization model derived from the relationship
    /// vocabulary. Idempotent; each call yields a fresh model id and
    /// subsequent operations target the latest.
    async fn write_authorization_model(&self) -> Result<String>;

    /// Additive write. Writing an already-present tuple is a no-op.
    async fn create_relationships(&self, tuples: &[RelationshipTuple]) -> Result<()>;

    /// Removing an absent tuple is a no-op.
    async fn delete_relationships(&self, tuples: &[RelationshipTuple]) -> Result<()>;

    /// Apply both sets in one atomic store operation. Used for
    /// promote/demote transitions so no observer sees neither or both
    /// roles.
    async fn update_relationships(
        &self,
        to_add: &[RelationshipTuple],
        to_remove: &[RelationshipTuple],
    ) -> Result<()>;

    /// Evaluate direct tuples plus the model's inheritance rules.
    async fn check_permission(
        &self,
        subject: &AuthSubject,
        relation: AuthRelation,
        object: &AuthObject,
    ) -> Result<bool>;

    /// Semantically one `check_permission` per relation. The returned
    /// map covers every requested relation; a partial backend failure
    /// fails the whole call rather than omitting entries.
    async fn batch_check_permission(
        &self,
        subject: &AuthSubject,
        relations: &[AuthRelation],
        object: &AuthObject,
    ) -> Result<HashMap<AuthRelation, bool>>;
}

// =============================================================================
// Repositories
// =============================================================================

/// Relational store for space aggregates.
#[async_trait]
pub trait SpaceRepository: Send + Sync {
    /// Insert a new space. A name collision among non-deleted spaces
    /// surfaces as `WeldError::Conflict`.
    async fn add(&self, space: &Space) -> Result<Space>;

    /// Full-object overwrite, including the member set. Callers
    /// read-modify-write.
    async fn update(&self, space: &Space) -> Result<Space>;

    async fn get_by_id(&self, id: SpaceId) -> Result<Option<Space>>;

    /// Exact, case-sensitive lookup among non-deleted spaces.
    async fn get_by_name(&self, name: &str) -> Result<Option<Space>>;

    async fn soft_delete(&self, id: SpaceId) -> Result<()>;
}

/// Relational store for OU-group-key → space mappings.
#[async_trait]
pub trait GroupMappingRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<GroupSpaceMapping>>;

    /// The reconciliation fast path: the active mapping for one key, if
    /// any.
    async fn get_active_by_group_key(&self, group_key: &str) -> Result<Option<GroupSpaceMapping>>;

    /// Distinct space ids of the active mappings matching the given
    /// keys. Keys are trimmed before matching; unmatched keys are
    /// silently dropped.
    async fn get_space_ids_by_group_keys(&self, group_keys: &[String]) -> Result<Vec<SpaceId>>;

    /// Insert a new active mapping. Does not check for an existing
    /// active mapping on the same key; that is the caller's contract.
    async fn add(
        &self,
        actor_user_id: UserId,
        group_key: &str,
        space_id: SpaceId,
    ) -> Result<GroupSpaceMapping>;

    /// Flip a mapping inactive, stamping the acting user. History rows
    /// are never hard-deleted.
    async fn deactivate(&self, actor_user_id: UserId, id: GroupMappingId) -> Result<()>;
}

/// User store, keyed by email for the login path.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn add(&self, user: &User) -> Result<User>;
    async fn update(&self, user: &User) -> Result<User>;
}

// =============================================================================
// Identity Directory
// =============================================================================

/// External directory that resolves an access token to the principal's
/// group keys and profile picture.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn get_identity_data(&self, access_token: &str) -> Result<IdentityData>;
}
