//! Core domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ids::{GroupMappingId, SpaceId, UserId};

// =============================================================================
// Space Models
// =============================================================================

/// A space groups the folders, resources, apps, and dashboards of one
/// team or organizational unit. Its name is unique among non-deleted
/// spaces, case-sensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub moderator_user_id: UserId,
    pub member_ids: HashSet<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Space {
    pub fn new(name: impl Into<String>, moderator_user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: SpaceId::new(),
            name: name.into(),
            moderator_user_id,
            member_ids: HashSet::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Moderator counts as belonging to the space even without a
    /// member entry.
    pub fn has_user(&self, user_id: UserId) -> bool {
        self.moderator_user_id == user_id || self.member_ids.contains(&user_id)
    }
}

// =============================================================================
// Group Mapping Models
// =============================================================================

/// Maps an organizational-unit group key (an OU path such as
/// `ou:/Support/Support Managers`) to a space. Inactive rows are history
/// kept for audit; at most one active row exists per group key, enforced
/// by the callers that write mappings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpaceMapping {
    pub id: GroupMappingId,
    pub group_key: String,
    pub space_id: SpaceId,
    pub is_active: bool,
    pub created_by: UserId,
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupSpaceMapping {
    pub fn new(created_by: UserId, group_key: impl Into<String>, space_id: SpaceId) -> Self {
        let now = Utc::now();
        Self {
            id: GroupMappingId::new(),
            group_key: group_key.into(),
            space_id,
            is_active: true,
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// User & Identity Models
// =============================================================================

/// A human user. `Invited` rows are placeholders created by an
/// invitation; the first login activates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Invited,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        display_name: Option<String>,
        picture_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email: email.into(),
            display_name,
            picture_url,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Placeholder row created by an invitation, before the invitee has
    /// ever logged in.
    pub fn invited(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email: email.into(),
            display_name: None,
            picture_url: None,
            status: UserStatus::Invited,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_invited(&self) -> bool {
        self.status == UserStatus::Invited
    }
}

// =============================================================================
// Provisioning Models
// =============================================================================

/// One login event, as handed to the reconciliation engine by the login
/// middleware. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    pub email: String,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
    pub group_keys: Vec<String>,
    /// Identity source that produced this event (e.g. "google").
    pub source: String,
}

/// What the identity directory knows about the authenticated principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityData {
    pub group_keys: Vec<String>,
    pub picture_url: Option<String>,
}
