//! Relationship vocabulary for the authorization model
//!
//! The closed sets of subjects, objects, and relations, plus the
//! inheritance tables the authorization store schema is generated from.
//! Tuples are write-once/delete-explicit facts; role transitions are
//! expressed as paired add/remove sets, never in-place updates.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{OrganizationId, SpaceId, TeamId, UserId};

/// Object types known to the authorization model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    User,
    Team,
    Organization,
    Space,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::User => "user",
            ObjectType::Team => "team",
            ObjectType::Organization => "organization",
            ObjectType::Space => "space",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of relations.
///
/// `SpaceOrganization` is structural ("this space belongs to this
/// organization"); everything else is a permission relation. Variants are
/// namespaced by the object type the relation is defined on, so the enum
/// stays a single flat set the way command handlers consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRelation {
    // Structural
    SpaceOrganization,

    // Organization roles
    OrganizationAdmin,
    OrganizationMember,

    // Team roles
    TeamMember,

    // Space roles
    SpaceModerator,
    SpaceMember,

    // Space administration
    SpaceCreate,
    SpaceDelete,
    SpaceRename,
    SpaceAddMember,
    SpaceRemoveMember,

    // Resources (HTTP/SQL connections)
    ResourceCreate,
    ResourceEdit,
    ResourceDelete,

    // Apps
    AppCreate,
    AppEdit,
    AppDelete,
    AppRun,

    // Folders
    FolderCreate,
    FolderEdit,
    FolderDelete,

    // Dashboards
    DashboardRun,
}

impl AuthRelation {
    /// Relation name as written in store tuples and the model document.
    /// Names are scoped by object type, so `member` on a team and
    /// `member` on a space are distinct relations.
    pub fn wire_name(&self) -> &'static str {
        match self {
            AuthRelation::SpaceOrganization => "organization",
            AuthRelation::OrganizationAdmin => "admin",
            AuthRelation::OrganizationMember => "member",
            AuthRelation::TeamMember => "member",
            AuthRelation::SpaceModerator => "moderator",
            AuthRelation::SpaceMember => "member",
            AuthRelation::SpaceCreate => "create_space",
            AuthRelation::SpaceDelete => "delete_space",
            AuthRelation::SpaceRename => "rename_space",
            AuthRelation::SpaceAddMember => "add_member",
            AuthRelation::SpaceRemoveMember => "remove_member",
            AuthRelation::ResourceCreate => "create_resource",
            AuthRelation::ResourceEdit => "edit_resource",
            AuthRelation::ResourceDelete => "delete_resource",
            AuthRelation::AppCreate => "create_app",
            AuthRelation::AppEdit => "edit_app",
            AuthRelation::AppDelete => "delete_app",
            AuthRelation::AppRun => "run_app",
            AuthRelation::FolderCreate => "create_folder",
            AuthRelation::FolderEdit => "edit_folder",
            AuthRelation::FolderDelete => "delete_folder",
            AuthRelation::DashboardRun => "run_dashboard",
        }
    }

    /// The object type this relation is defined on.
    pub fn object_type(&self) -> ObjectType {
        match self {
            AuthRelation::OrganizationAdmin | AuthRelation::OrganizationMember => {
                ObjectType::Organization
            }
            AuthRelation::TeamMember => ObjectType::Team,
            _ => ObjectType::Space,
        }
    }

    pub fn implied_by_moderator(&self) -> bool {
        MODERATOR_IMPLIED.contains(self)
    }

    pub fn implied_by_org_admin(&self) -> bool {
        ORG_ADMIN_IMPLIED.contains(self)
    }
}

impl fmt::Display for AuthRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Relations a space moderator holds implicitly on their own space.
/// Everything but deleting the space and creating sibling spaces.
pub const MODERATOR_IMPLIED: &[AuthRelation] = &[
    AuthRelation::SpaceRename,
    AuthRelation::SpaceAddMember,
    AuthRelation::SpaceRemoveMember,
    AuthRelation::ResourceCreate,
    AuthRelation::ResourceEdit,
    AuthRelation::ResourceDelete,
    AuthRelation::AppCreate,
    AuthRelation::AppEdit,
    AuthRelation::AppDelete,
    AuthRelation::AppRun,
    AuthRelation::FolderCreate,
    AuthRelation::FolderEdit,
    AuthRelation::FolderDelete,
    AuthRelation::DashboardRun,
];

/// Relations an organization admin holds implicitly on every space that
/// is `SpaceOrganization`-related to their organization: the full
/// moderator set plus space creation and deletion.
pub const ORG_ADMIN_IMPLIED: &[AuthRelation] = &[
    AuthRelation::SpaceCreate,
    AuthRelation::SpaceDelete,
    AuthRelation::SpaceRename,
    AuthRelation::SpaceAddMember,
    AuthRelation::SpaceRemoveMember,
    AuthRelation::ResourceCreate,
    AuthRelation::ResourceEdit,
    AuthRelation::ResourceDelete,
    AuthRelation::AppCreate,
    AuthRelation::AppEdit,
    AuthRelation::AppDelete,
    AuthRelation::AppRun,
    AuthRelation::FolderCreate,
    AuthRelation::FolderEdit,
    AuthRelation::FolderDelete,
    AuthRelation::DashboardRun,
];

/// Every permission relation defined on the space type. `SpaceMember`
/// grants nothing by itself but is still a checkable relation.
pub const SPACE_PERMISSIONS: &[AuthRelation] = &[
    AuthRelation::SpaceModerator,
    AuthRelation::SpaceMember,
    AuthRelation::SpaceCreate,
    AuthRelation::SpaceDelete,
    AuthRelation::SpaceRename,
    AuthRelation::SpaceAddMember,
    AuthRelation::SpaceRemoveMember,
    AuthRelation::ResourceCreate,
    AuthRelation::ResourceEdit,
    AuthRelation::ResourceDelete,
    AuthRelation::AppCreate,
    AuthRelation::AppEdit,
    AuthRelation::AppDelete,
    AuthRelation::AppRun,
    AuthRelation::FolderCreate,
    AuthRelation::FolderEdit,
    AuthRelation::FolderDelete,
    AuthRelation::DashboardRun,
];

/// An object a relation can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum AuthObject {
    Space(SpaceId),
    Organization(OrganizationId),
    Team(TeamId),
}

impl AuthObject {
    pub fn object_type(&self) -> ObjectType {
        match self {
            AuthObject::Space(_) => ObjectType::Space,
            AuthObject::Organization(_) => ObjectType::Organization,
            AuthObject::Team(_) => ObjectType::Team,
        }
    }

    pub fn id_string(&self) -> String {
        match self {
            AuthObject::Space(id) => id.to_string(),
            AuthObject::Organization(id) => id.to_string(),
            AuthObject::Team(id) => id.to_string(),
        }
    }
}

impl fmt::Display for AuthObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type(), self.id_string())
    }
}

/// A subject a tuple can grant a relation to.
///
/// `UserSet` is the indirect form: every subject holding `relation` on
/// `object` (for example everyone holding `member` on a team).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuthSubject {
    User(UserId),
    Organization(OrganizationId),
    Team(TeamId),
    UserSet {
        object: AuthObject,
        relation: AuthRelation,
    },
}

impl AuthSubject {
    pub fn user(id: UserId) -> Self {
        AuthSubject::User(id)
    }

    pub fn team_members(id: TeamId) -> Self {
        AuthSubject::UserSet {
            object: AuthObject::Team(id),
            relation: AuthRelation::TeamMember,
        }
    }

    pub fn organization_admins(id: OrganizationId) -> Self {
        AuthSubject::UserSet {
            object: AuthObject::Organization(id),
            relation: AuthRelation::OrganizationAdmin,
        }
    }
}

impl fmt::Display for AuthSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSubject::User(id) => write!(f, "user:{id}"),
            AuthSubject::Organization(id) => write!(f, "organization:{id}"),
            AuthSubject::Team(id) => write!(f, "team:{id}"),
            AuthSubject::UserSet { object, relation } => {
                write!(f, "{object}#{}", relation.wire_name())
            }
        }
    }
}

/// An atomic fact in the authorization store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipTuple {
    pub subject: AuthSubject,
    pub relation: AuthRelation,
    pub object: AuthObject,
}

impl RelationshipTuple {
    pub fn new(subject: AuthSubject, relation: AuthRelation, object: AuthObject) -> Self {
        Self {
            subject,
            relation,
            object,
        }
    }

    /// Shorthand for the most common tuple shape.
    pub fn user(user_id: UserId, relation: AuthRelation, object: AuthObject) -> Self {
        Self::new(AuthSubject::User(user_id), relation, object)
    }
}

impl fmt::Display for RelationshipTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.subject,
            self.relation.wire_name(),
            self.object
        )
    }
}
