//! Reconciliation engine tests
//!
//! The engine runs against in-memory fakes of the four stores. The
//! authorization store fake records writes rather than evaluating
//! inheritance; inheritance behavior belongs to the model tests in the
//! store client crate.

use std::sync::Arc;

use weld_core::testkit::{
    InMemoryGroupMappingRepository, InMemorySpaceRepository, InMemoryUserRepository,
    RecordingAuthorizationStore,
};
use weld_core::{
    AuthObject, AuthRelation, AuthSubject, GroupSpaceMapping, OrganizationId, ProvisioningRequest,
    RelationshipTuple, Space, User, UserId, UserStatus, WeldError,
};

use crate::provisioner::Provisioner;

type TestProvisioner = Provisioner<
    InMemoryUserRepository,
    InMemorySpaceRepository,
    InMemoryGroupMappingRepository,
    RecordingAuthorizationStore,
>;

struct Harness {
    users: Arc<InMemoryUserRepository>,
    spaces: Arc<InMemorySpaceRepository>,
    mappings: Arc<InMemoryGroupMappingRepository>,
    authz: Arc<RecordingAuthorizationStore>,
    organization_id: OrganizationId,
    engine: TestProvisioner,
}

fn harness() -> Harness {
    let users = Arc::new(InMemoryUserRepository::new());
    let spaces = Arc::new(InMemorySpaceRepository::new());
    let mappings = Arc::new(InMemoryGroupMappingRepository::new());
    let authz = Arc::new(RecordingAuthorizationStore::new());
    let organization_id = OrganizationId::new();
    let engine = Provisioner::new(
        users.clone(),
        spaces.clone(),
        mappings.clone(),
        authz.clone(),
        organization_id,
    );
    Harness {
        users,
        spaces,
        mappings,
        authz,
        organization_id,
        engine,
    }
}

fn request(email: &str, keys: &[&str]) -> ProvisioningRequest {
    ProvisioningRequest {
        email: email.to_string(),
        display_name: Some("Test User".to_string()),
        picture_url: None,
        group_keys: keys.iter().map(|k| k.to_string()).collect(),
        source: "google".to_string(),
    }
}

// =============================================================================
// User resolution
// =============================================================================

mod user_tests {
    use super::*;

    #[tokio::test]
    async fn first_login_creates_the_user() {
        let h = harness();

        let user_id = h
            .engine
            .ensure_user(&request("dev@example.com", &[]))
            .await
            .unwrap();

        let users = h.users.all();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, user_id);
        assert_eq!(users[0].email, "dev@example.com");
        assert_eq!(users[0].status, UserStatus::Active);
        assert!(h.authz.created_tuples().is_empty());
    }

    #[tokio::test]
    async fn login_activates_an_invited_placeholder() {
        let h = harness();
        let invited = User::invited("pending@example.com");
        let invited_id = invited.id;
        h.users.insert(invited);

        let user_id = h
            .engine
            .ensure_user(&request("pending@example.com", &[]))
            .await
            .unwrap();

        assert_eq!(user_id, invited_id);
        let users = h.users.all();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].status, UserStatus::Active);
        assert_eq!(users[0].display_name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn repeat_login_keeps_the_existing_profile() {
        let h = harness();
        let existing = User::new("dev@example.com", Some("Original Name".to_string()), None);
        let existing_id = existing.id;
        h.users.insert(existing);

        let user_id = h
            .engine
            .ensure_user(&request("dev@example.com", &[]))
            .await
            .unwrap();

        assert_eq!(user_id, existing_id);
        assert_eq!(
            h.users.all()[0].display_name.as_deref(),
            Some("Original Name")
        );
    }

    #[tokio::test]
    async fn malformed_email_fails_before_any_write() {
        let h = harness();

        let err = h
            .engine
            .ensure_user(&request("not-an-email", &["ou:/Engineering"]))
            .await
            .unwrap_err();

        assert!(matches!(err, WeldError::InvalidEmail { .. }));
        assert!(h.users.all().is_empty());
        assert!(h.spaces.all().is_empty());
        assert!(h.authz.created_tuples().is_empty());
    }

    #[tokio::test]
    async fn email_is_trimmed_before_use() {
        let h = harness();

        h.engine
            .ensure_user(&request("  dev@example.com  ", &[]))
            .await
            .unwrap();

        assert_eq!(h.users.all()[0].email, "dev@example.com");
    }
}

// =============================================================================
// Target resolution
// =============================================================================

mod target_resolution_tests {
    use super::*;

    #[tokio::test]
    async fn existing_mapping_attaches_member_and_one_tuple() {
        let h = harness();
        let moderator = UserId::new();
        let space = Space::new("Engineering", moderator);
        let space_id = space.id;
        h.spaces.insert(space);
        h.mappings
            .insert(GroupSpaceMapping::new(moderator, "ou:/Engineering", space_id));

        let user_id = h
            .engine
            .ensure_user(&request("dev2@example.com", &["ou:/Engineering"]))
            .await
            .unwrap();

        assert!(h.spaces.get(space_id).unwrap().member_ids.contains(&user_id));
        assert_eq!(
            h.authz.created_tuples(),
            vec![RelationshipTuple::user(
                user_id,
                AuthRelation::SpaceMember,
                AuthObject::Space(space_id),
            )]
        );
        assert_eq!(h.spaces.all().len(), 1);
        assert_eq!(h.mappings.all().len(), 1);
    }

    #[tokio::test]
    async fn fresh_key_creates_space_mapping_and_moderator_tuple() {
        let h = harness();

        let user_id = h
            .engine
            .ensure_user(&request(
                "new.manager@example.com",
                &["ou:/Support/Support Managers"],
            ))
            .await
            .unwrap();

        let spaces = h.spaces.all();
        assert_eq!(spaces.len(), 1);
        let space = &spaces[0];
        assert_eq!(space.name, "Support Managers");
        assert_eq!(space.moderator_user_id, user_id);
        assert!(space.member_ids.is_empty());

        let active = h.mappings.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].group_key, "ou:/Support/Support Managers");
        assert_eq!(active[0].space_id, space.id);
        assert_eq!(active[0].created_by, user_id);

        let created = h.authz.created_tuples();
        let object = AuthObject::Space(space.id);
        assert_eq!(created.len(), 2);
        assert!(created.contains(&RelationshipTuple::new(
            AuthSubject::Organization(h.organization_id),
            AuthRelation::SpaceOrganization,
            object,
        )));
        assert!(created.contains(&RelationshipTuple::user(
            user_id,
            AuthRelation::SpaceModerator,
            object,
        )));
        assert!(!created
            .iter()
            .any(|t| t.relation == AuthRelation::SpaceMember));
    }

    #[tokio::test]
    async fn first_collision_falls_back_to_the_full_path() {
        let h = harness();
        let other = UserId::new();
        h.spaces.insert(Space::new("Support Managers", other));

        let user_id = h
            .engine
            .ensure_user(&request(
                "new.manager@example.com",
                &["ou:/Support/Support Managers"],
            ))
            .await
            .unwrap();

        let created_space = h
            .spaces
            .all()
            .into_iter()
            .find(|s| s.name == "Support/Support Managers")
            .unwrap();
        assert_eq!(created_space.moderator_user_id, user_id);

        let active = h.mappings.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].space_id, created_space.id);

        // The occupied name keeps its owner and gains no members.
        let original = h
            .spaces
            .all()
            .into_iter()
            .find(|s| s.name == "Support Managers")
            .unwrap();
        assert_eq!(original.moderator_user_id, other);
        assert!(original.member_ids.is_empty());
    }

    #[tokio::test]
    async fn second_collision_attaches_member_only() {
        let h = harness();
        h.spaces.insert(Space::new("Support Managers", UserId::new()));
        let full = Space::new("Support/Support Managers", UserId::new());
        let full_id = full.id;
        h.spaces.insert(full);

        let user_id = h
            .engine
            .ensure_user(&request(
                "new.manager@example.com",
                &["ou:/Support/Support Managers"],
            ))
            .await
            .unwrap();

        assert!(h.spaces.get(full_id).unwrap().member_ids.contains(&user_id));
        assert_eq!(h.spaces.all().len(), 2);
        assert!(h.mappings.all().is_empty());
        assert_eq!(
            h.authz.created_tuples(),
            vec![RelationshipTuple::user(
                user_id,
                AuthRelation::SpaceMember,
                AuthObject::Space(full_id),
            )]
        );
    }

    #[tokio::test]
    async fn creation_race_resolves_to_member_attachment() {
        let h = harness();
        let rival_moderator = UserId::new();
        let rival = Space::new("Support Managers", rival_moderator);
        let rival_id = rival.id;
        h.spaces.inject_create_race(rival);

        let user_id = h
            .engine
            .ensure_user(&request(
                "new.manager@example.com",
                &["ou:/Support/Support Managers"],
            ))
            .await
            .unwrap();

        let space = h.spaces.get(rival_id).unwrap();
        assert_eq!(space.moderator_user_id, rival_moderator);
        assert!(space.member_ids.contains(&user_id));
        assert!(h.mappings.all().is_empty());
        assert_eq!(
            h.authz.created_tuples(),
            vec![RelationshipTuple::user(
                user_id,
                AuthRelation::SpaceMember,
                AuthObject::Space(rival_id),
            )]
        );
    }

    #[tokio::test]
    async fn moderator_login_writes_no_member_tuple() {
        let h = harness();
        let user = User::new("lead@example.com", None, None);
        let user_id = user.id;
        h.users.insert(user);
        let space = Space::new("Engineering", user_id);
        let space_id = space.id;
        h.spaces.insert(space);
        h.mappings
            .insert(GroupSpaceMapping::new(user_id, "ou:/Engineering", space_id));

        h.engine
            .ensure_user(&request("lead@example.com", &["ou:/Engineering"]))
            .await
            .unwrap();

        assert!(h.authz.created_tuples().is_empty());
        assert!(h.spaces.get(space_id).unwrap().member_ids.is_empty());
    }

    #[tokio::test]
    async fn mapping_to_deleted_space_is_skipped() {
        let h = harness();
        let moderator = UserId::new();
        let mut space = Space::new("Old Team", moderator);
        space.is_deleted = true;
        let space_id = space.id;
        h.spaces.insert(space);
        h.mappings
            .insert(GroupSpaceMapping::new(moderator, "ou:/Old Team", space_id));

        let user_id = h
            .engine
            .ensure_user(&request("dev@example.com", &["ou:/Old Team"]))
            .await
            .unwrap();

        assert!(h.authz.created_tuples().is_empty());
        assert!(!h.spaces.get(space_id).unwrap().member_ids.contains(&user_id));
    }
}

// =============================================================================
// Idempotence and key collapsing
// =============================================================================

mod idempotence_tests {
    use super::*;

    #[tokio::test]
    async fn rerunning_the_same_request_changes_nothing() {
        let h = harness();
        let req = request("new.manager@example.com", &["ou:/Support/Support Managers"]);

        let first = h.engine.ensure_user(&req).await.unwrap();
        let spaces_after_one = h.spaces.all().len();
        let mappings_after_one = h.mappings.all().len();
        let tuples_after_one = h.authz.tuple_set();

        let second = h.engine.ensure_user(&req).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.spaces.all().len(), spaces_after_one);
        assert_eq!(h.mappings.all().len(), mappings_after_one);
        assert_eq!(h.authz.tuple_set(), tuples_after_one);
        // The creator stays moderator-only; no member entry sneaks in.
        assert!(h.spaces.all()[0].member_ids.is_empty());
    }

    #[tokio::test]
    async fn rerunning_a_member_attachment_is_stable() {
        let h = harness();
        let moderator = UserId::new();
        let space = Space::new("Engineering", moderator);
        let space_id = space.id;
        h.spaces.insert(space);
        h.mappings
            .insert(GroupSpaceMapping::new(moderator, "ou:/Engineering", space_id));
        let req = request("dev2@example.com", &["ou:/Engineering"]);

        h.engine.ensure_user(&req).await.unwrap();
        h.engine.ensure_user(&req).await.unwrap();

        assert_eq!(h.spaces.get(space_id).unwrap().member_ids.len(), 1);
        assert_eq!(h.authz.tuple_set().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_and_blank_keys_collapse() {
        let h = harness();
        let moderator = UserId::new();
        let space = Space::new("Engineering", moderator);
        let space_id = space.id;
        h.spaces.insert(space);
        h.mappings
            .insert(GroupSpaceMapping::new(moderator, "ou:/Engineering", space_id));

        let user_id = h
            .engine
            .ensure_user(&request(
                "dev@example.com",
                &["ou:/Engineering", "  ou:/Engineering  ", "", "   "],
            ))
            .await
            .unwrap();

        assert_eq!(h.authz.created_tuples().len(), 1);
        assert!(h.spaces.get(space_id).unwrap().member_ids.contains(&user_id));
    }

    #[tokio::test]
    async fn two_keys_mapped_to_one_space_are_processed_once() {
        let h = harness();
        let moderator = UserId::new();
        let space = Space::new("Engineering", moderator);
        let space_id = space.id;
        h.spaces.insert(space);
        h.mappings
            .insert(GroupSpaceMapping::new(moderator, "ou:/Engineering", space_id));
        h.mappings
            .insert(GroupSpaceMapping::new(moderator, "ou:/Platform", space_id));

        h.engine
            .ensure_user(&request(
                "dev@example.com",
                &["ou:/Engineering", "ou:/Platform"],
            ))
            .await
            .unwrap();

        assert_eq!(h.authz.created_tuples().len(), 1);
        assert_eq!(h.spaces.get(space_id).unwrap().member_ids.len(), 1);
    }
}

// =============================================================================
// Failure semantics
// =============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn user_store_failure_aborts_everything() {
        let h = harness();
        h.users.set_failing(true);

        let err = h
            .engine
            .ensure_user(&request("dev@example.com", &["ou:/Engineering"]))
            .await
            .unwrap_err();

        assert!(matches!(err, WeldError::PersistenceFailure { .. }));
        assert!(h.spaces.all().is_empty());
        assert!(h.mappings.all().is_empty());
        assert!(h.authz.created_tuples().is_empty());
    }

    #[tokio::test]
    async fn space_store_failure_stops_before_tuples() {
        let h = harness();
        h.spaces.set_failing(true);

        let err = h
            .engine
            .ensure_user(&request("dev@example.com", &["ou:/Engineering"]))
            .await
            .unwrap_err();

        assert!(matches!(err, WeldError::PersistenceFailure { .. }));
        // The user row survives; the failed run is safe to retry.
        assert_eq!(h.users.all().len(), 1);
        assert!(h.authz.created_tuples().is_empty());
    }

    #[tokio::test]
    async fn tuple_write_failure_surfaces_after_relational_writes() {
        let h = harness();
        h.authz.set_failing_writes(true);

        let err = h
            .engine
            .ensure_user(&request(
                "new.manager@example.com",
                &["ou:/Support/Support Managers"],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, WeldError::AuthorizationStoreFailure { .. }));
        // Relational writes stay; the database is the canonical truth
        // and the next login re-projects the tuples.
        assert_eq!(h.spaces.all().len(), 1);
        assert_eq!(h.mappings.active().len(), 1);
        assert!(h.authz.created_tuples().is_empty());
    }
}
