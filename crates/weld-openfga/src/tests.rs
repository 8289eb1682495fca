//! Unit and integration tests for weld-openfga

use super::*;

// =============================================================================
// Authorization Model Tests
// =============================================================================

#[cfg(test)]
mod model_tests {
    use super::*;
    use weld_core::{AuthRelation, MODERATOR_IMPLIED, ORG_ADMIN_IMPLIED, SPACE_PERMISSIONS};

    fn type_definition(name: &str) -> proto::TypeDefinition {
        authorization_model()
            .into_iter()
            .find(|t| t.r#type == name)
            .unwrap_or_else(|| panic!("model has no type {name:?}"))
    }

    fn union_children(userset: &proto::Userset) -> Vec<proto::Userset> {
        match &userset.userset {
            Some(proto::userset::Userset::Union(usersets)) => usersets.child.clone(),
            other => panic!("expected a union, got {other:?}"),
        }
    }

    fn contains_this(children: &[proto::Userset]) -> bool {
        children
            .iter()
            .any(|c| matches!(&c.userset, Some(proto::userset::Userset::This(_))))
    }

    fn contains_computed(children: &[proto::Userset], relation: &str) -> bool {
        children.iter().any(|c| {
            matches!(
                &c.userset,
                Some(proto::userset::Userset::ComputedUserset(or)) if or.relation == relation
            )
        })
    }

    fn contains_via_organization(children: &[proto::Userset], relation: &str) -> bool {
        children.iter().any(|c| {
            matches!(
                &c.userset,
                Some(proto::userset::Userset::TupleToUserset(ttu))
                    if ttu.tupleset.as_ref().map(|t| t.relation.as_str()) == Some("organization")
                        && ttu.computed_userset.as_ref().map(|u| u.relation.as_str())
                            == Some(relation)
            )
        })
    }

    fn directly_related(definition: &proto::TypeDefinition, relation: &str) -> Vec<String> {
        definition
            .metadata
            .as_ref()
            .and_then(|m| m.relations.get(relation))
            .map(|m| {
                m.directly_related_user_types
                    .iter()
                    .map(|r| match &r.relation_or_wildcard {
                        Some(proto::relation_reference::RelationOrWildcard::Relation(rel)) => {
                            format!("{}#{}", r.r#type, rel)
                        }
                        None => r.r#type.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn model_defines_the_four_object_types() {
        let types: Vec<String> = authorization_model()
            .into_iter()
            .map(|t| t.r#type)
            .collect();
        assert_eq!(types, vec!["user", "team", "organization", "space"]);
    }

    #[test]
    fn space_defines_every_checkable_relation() {
        let space = type_definition("space");
        assert!(space.relations.contains_key("organization"));
        for relation in SPACE_PERMISSIONS {
            assert!(
                space.relations.contains_key(relation.wire_name()),
                "space is missing relation {:?}",
                relation.wire_name()
            );
        }
    }

    #[test]
    fn moderator_holds_every_implied_relation() {
        let space = type_definition("space");
        for relation in MODERATOR_IMPLIED {
            let children = union_children(&space.relations[relation.wire_name()]);
            assert!(
                contains_computed(&children, "moderator"),
                "{:?} should be held by the moderator",
                relation.wire_name()
            );
        }
    }

    #[test]
    fn moderator_cannot_create_or_delete_spaces() {
        let space = type_definition("space");
        for relation in [AuthRelation::SpaceCreate, AuthRelation::SpaceDelete] {
            let children = union_children(&space.relations[relation.wire_name()]);
            assert!(
                !contains_computed(&children, "moderator"),
                "{:?} must not be held by the moderator",
                relation.wire_name()
            );
            assert!(contains_via_organization(&children, "admin"));
        }
    }

    #[test]
    fn organization_admin_reaches_every_command_relation() {
        let space = type_definition("space");
        for relation in ORG_ADMIN_IMPLIED {
            let children = union_children(&space.relations[relation.wire_name()]);
            assert!(
                contains_via_organization(&children, "admin"),
                "{:?} should flow from the organization admin",
                relation.wire_name()
            );
        }
    }

    #[test]
    fn every_command_relation_allows_direct_grants() {
        let space = type_definition("space");
        for relation in ORG_ADMIN_IMPLIED {
            let children = union_children(&space.relations[relation.wire_name()]);
            assert!(contains_this(&children));
            assert_eq!(directly_related(&space, relation.wire_name()), vec!["user"]);
        }
    }

    #[test]
    fn role_relations_are_direct_only() {
        let space = type_definition("space");
        for relation in ["organization", "moderator", "member"] {
            assert!(
                matches!(
                    &space.relations[relation].userset,
                    Some(proto::userset::Userset::This(_))
                ),
                "{relation:?} must not imply anything"
            );
        }
    }

    #[test]
    fn members_can_come_from_teams() {
        let space = type_definition("space");
        assert_eq!(
            directly_related(&space, "member"),
            vec!["user", "team#member"]
        );

        let organization = type_definition("organization");
        assert_eq!(
            directly_related(&organization, "member"),
            vec!["user", "team#member"]
        );
        assert_eq!(directly_related(&organization, "admin"), vec!["user"]);
    }

    #[test]
    fn user_type_carries_no_relations() {
        let user = type_definition("user");
        assert!(user.relations.is_empty());
    }

    #[test]
    fn schema_version_is_current() {
        assert_eq!(SCHEMA_VERSION, "1.1");
    }
}

// =============================================================================
// Wire Conversion Tests
// =============================================================================

#[cfg(test)]
mod conversion_tests {
    use super::*;
    use weld_core::{
        AuthObject, AuthRelation, AuthSubject, RelationshipTuple, SpaceId, TeamId, UserId,
    };

    #[test]
    fn tuples_render_in_wire_form() {
        let user_id = UserId::new();
        let space_id = SpaceId::new();
        let tuple =
            RelationshipTuple::user(user_id, AuthRelation::SpaceMember, AuthObject::Space(space_id));

        let (user, relation, object) = FgaAuthorizationStore::wire(&tuple);
        assert_eq!(user, format!("user:{user_id}"));
        assert_eq!(relation, "member");
        assert_eq!(object, format!("space:{space_id}"));
    }

    #[test]
    fn userset_subjects_render_with_their_relation() {
        let team_id = TeamId::new();
        let space_id = SpaceId::new();
        let tuple = RelationshipTuple::new(
            AuthSubject::team_members(team_id),
            AuthRelation::SpaceMember,
            AuthObject::Space(space_id),
        );

        let (user, _, _) = FgaAuthorizationStore::wire(&tuple);
        assert_eq!(user, format!("team:{team_id}#member"));
    }

    #[test]
    fn consistency_values_match_the_api() {
        assert_eq!(proto::ConsistencyPreference::MinimizeLatency as i32, 100);
        assert_eq!(proto::ConsistencyPreference::HigherConsistency as i32, 200);
    }

    #[test]
    fn idempotent_write_semantics_values() {
        assert_eq!(proto::OnDuplicateWriteSemantics::Ignore as i32, 2);
        assert_eq!(proto::OnMissingDeleteSemantics::Ignore as i32, 2);
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn default_config_targets_local_grpc_port() {
        let config = FgaConfig::default();
        assert_eq!(config.endpoint, "http://localhost:8081");
        assert!(!config.use_tls);
        assert!(config.store_id.is_none());
    }

    #[test]
    fn default_config_has_no_token() {
        let config = FgaConfig::default();
        assert!(config.token.is_empty());
    }
}

// =============================================================================
// Integration Tests (Require OpenFGA)
// =============================================================================

#[cfg(test)]
mod integration_tests {
    use super::*;
    use weld_core::{
        AuthObject, AuthRelation, AuthSubject, AuthorizationStore, OrganizationId,
        RelationshipTuple, SpaceId, TeamId, UserId, SPACE_PERMISSIONS,
    };

    /// Helper to check if OpenFGA is available
    fn openfga_available() -> bool {
        std::env::var("OPENFGA_ENDPOINT").is_ok()
    }

    async fn live_store() -> FgaAuthorizationStore {
        let endpoint = std::env::var("OPENFGA_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:8081".to_string());

        let config = FgaConfig {
            endpoint,
            store_name: format!("weld-test-{}", uuid::Uuid::now_v7()),
            ..Default::default()
        };

        let store = FgaAuthorizationStore::connect(&config)
            .await
            .expect("Should connect to OpenFGA");
        store.bootstrap().await.expect("Should bootstrap the store");
        store
    }

    #[tokio::test]
    #[ignore = "Requires running OpenFGA instance"]
    async fn test_openfga_connection() {
        if !openfga_available() {
            eprintln!("Skipping: OpenFGA not available");
            return;
        }

        let store = live_store().await;
        assert!(store.ping().await, "Bootstrapped store should be healthy");
    }

    #[tokio::test]
    #[ignore = "Requires running OpenFGA instance"]
    async fn test_moderator_implied_permissions() {
        if !openfga_available() {
            return;
        }

        let store = live_store().await;
        let org = OrganizationId::new();
        let space = SpaceId::new();
        let moderator = UserId::new();
        let object = AuthObject::Space(space);

        store
            .create_relationships(&[
                RelationshipTuple::new(
                    AuthSubject::Organization(org),
                    AuthRelation::SpaceOrganization,
                    object,
                ),
                RelationshipTuple::user(moderator, AuthRelation::SpaceModerator, object),
            ])
            .await
            .unwrap();

        let subject = AuthSubject::User(moderator);
        for relation in [
            AuthRelation::SpaceRename,
            AuthRelation::ResourceEdit,
            AuthRelation::AppRun,
            AuthRelation::FolderCreate,
        ] {
            assert!(
                store.check_permission(&subject, relation, &object).await.unwrap(),
                "moderator should hold {:?}",
                relation.wire_name()
            );
        }
        for relation in [AuthRelation::SpaceDelete, AuthRelation::SpaceCreate] {
            assert!(
                !store.check_permission(&subject, relation, &object).await.unwrap(),
                "moderator must not hold {:?}",
                relation.wire_name()
            );
        }
    }

    #[tokio::test]
    #[ignore = "Requires running OpenFGA instance"]
    async fn test_org_admin_inherits_through_structural_tuple() {
        if !openfga_available() {
            return;
        }

        let store = live_store().await;
        let org = OrganizationId::new();
        let space = SpaceId::new();
        let admin = UserId::new();
        let object = AuthObject::Space(space);

        store
            .create_relationships(&[
                RelationshipTuple::new(
                    AuthSubject::Organization(org),
                    AuthRelation::SpaceOrganization,
                    object,
                ),
                RelationshipTuple::user(
                    admin,
                    AuthRelation::OrganizationAdmin,
                    AuthObject::Organization(org),
                ),
            ])
            .await
            .unwrap();

        let subject = AuthSubject::User(admin);
        for relation in [
            AuthRelation::SpaceDelete,
            AuthRelation::SpaceRename,
            AuthRelation::ResourceDelete,
        ] {
            assert!(
                store.check_permission(&subject, relation, &object).await.unwrap(),
                "org admin should hold {:?}",
                relation.wire_name()
            );
        }
    }

    #[tokio::test]
    #[ignore = "Requires running OpenFGA instance"]
    async fn test_plain_member_holds_no_command_relations() {
        if !openfga_available() {
            return;
        }

        let store = live_store().await;
        let space = SpaceId::new();
        let member = UserId::new();
        let object = AuthObject::Space(space);

        store
            .create_relationships(&[RelationshipTuple::user(
                member,
                AuthRelation::SpaceMember,
                object,
            )])
            .await
            .unwrap();

        let results = store
            .batch_check_permission(&AuthSubject::User(member), SPACE_PERMISSIONS, &object)
            .await
            .unwrap();

        assert_eq!(results.len(), SPACE_PERMISSIONS.len());
        for (relation, allowed) in results {
            if relation == AuthRelation::SpaceMember {
                assert!(allowed, "membership itself should check true");
            } else {
                assert!(!allowed, "member must not hold {:?}", relation.wire_name());
            }
        }
    }

    #[tokio::test]
    #[ignore = "Requires running OpenFGA instance"]
    async fn test_team_members_flow_into_space_membership() {
        if !openfga_available() {
            return;
        }

        let store = live_store().await;
        let team = TeamId::new();
        let space = SpaceId::new();
        let user = UserId::new();
        let object = AuthObject::Space(space);

        store
            .create_relationships(&[
                RelationshipTuple::user(user, AuthRelation::TeamMember, AuthObject::Team(team)),
                RelationshipTuple::new(
                    AuthSubject::team_members(team),
                    AuthRelation::SpaceMember,
                    object,
                ),
            ])
            .await
            .unwrap();

        assert!(store
            .check_permission(&AuthSubject::User(user), AuthRelation::SpaceMember, &object)
            .await
            .unwrap());
    }

    #[tokio::test]
    #[ignore = "Requires running OpenFGA instance"]
    async fn test_duplicate_writes_and_missing_deletes_are_no_ops() {
        if !openfga_available() {
            return;
        }

        let store = live_store().await;
        let space = SpaceId::new();
        let user = UserId::new();
        let tuple = RelationshipTuple::user(user, AuthRelation::SpaceMember, AuthObject::Space(space));

        store.create_relationships(&[tuple.clone()]).await.unwrap();
        store
            .create_relationships(&[tuple.clone()])
            .await
            .expect("Re-adding a present tuple should be a no-op");

        store.delete_relationships(&[tuple.clone()]).await.unwrap();
        store
            .delete_relationships(&[tuple])
            .await
            .expect("Deleting an absent tuple should be a no-op");
    }

    #[tokio::test]
    #[ignore = "Requires running OpenFGA instance"]
    async fn test_moderator_handover_is_atomic() {
        if !openfga_available() {
            return;
        }

        let store = live_store().await;
        let space = SpaceId::new();
        let old_moderator = UserId::new();
        let new_moderator = UserId::new();
        let object = AuthObject::Space(space);

        store
            .create_relationships(&[
                RelationshipTuple::user(old_moderator, AuthRelation::SpaceModerator, object),
                RelationshipTuple::user(new_moderator, AuthRelation::SpaceMember, object),
            ])
            .await
            .unwrap();

        store
            .update_relationships(
                &[
                    RelationshipTuple::user(new_moderator, AuthRelation::SpaceModerator, object),
                    RelationshipTuple::user(old_moderator, AuthRelation::SpaceMember, object),
                ],
                &[
                    RelationshipTuple::user(old_moderator, AuthRelation::SpaceModerator, object),
                    RelationshipTuple::user(new_moderator, AuthRelation::SpaceMember, object),
                ],
            )
            .await
            .unwrap();

        let old = AuthSubject::User(old_moderator);
        let new = AuthSubject::User(new_moderator);
        assert!(store
            .check_permission(&new, AuthRelation::SpaceModerator, &object)
            .await
            .unwrap());
        assert!(!store
            .check_permission(&old, AuthRelation::SpaceModerator, &object)
            .await
            .unwrap());
        assert!(store
            .check_permission(&old, AuthRelation::SpaceMember, &object)
            .await
            .unwrap());
    }
}
