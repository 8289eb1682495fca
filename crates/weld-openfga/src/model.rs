//! Authorization model definition for Weld
//!
//! Builds the OpenFGA model document from the relation tables in
//! `weld_core::authz`, so the published model cannot drift from the
//! relations the services check. In OpenFGA's DSL the result reads:
//!
//! ```text
//! model
//!   schema 1.1
//! type user
//! type team
//!   relations
//!     define member: [user]
//! type organization
//!   relations
//!     define admin: [user]
//!     define member: [user, team#member]
//! type space
//!   relations
//!     define organization: [organization]
//!     define moderator: [user]
//!     define member: [user, team#member]
//!     define rename_space: [user] or moderator or admin from organization
//!     ... (one line per command relation; create_space and delete_space
//!          omit the moderator branch)
//! ```

use std::collections::HashMap;

use weld_core::ORG_ADMIN_IMPLIED;

use crate::proto::{
    relation_reference, userset, DirectUserset, Metadata, ObjectRelation, RelationMetadata,
    RelationReference, TupleToUserset, TypeDefinition, Userset, Usersets,
};

/// Model schema version understood by OpenFGA 1.x
pub const SCHEMA_VERSION: &str = "1.1";

/// The complete Weld authorization model
pub fn authorization_model() -> Vec<TypeDefinition> {
    vec![user_type(), team_type(), organization_type(), space_type()]
}

fn user_type() -> TypeDefinition {
    TypeDefinition {
        r#type: "user".to_string(),
        relations: HashMap::new(),
        metadata: None,
    }
}

fn team_type() -> TypeDefinition {
    let mut relations = HashMap::new();
    let mut metadata = HashMap::new();

    relations.insert("member".to_string(), this());
    metadata.insert("member".to_string(), related(vec![reference("user")]));

    TypeDefinition {
        r#type: "team".to_string(),
        relations,
        metadata: Some(Metadata {
            relations: metadata,
        }),
    }
}

fn organization_type() -> TypeDefinition {
    let mut relations = HashMap::new();
    let mut metadata = HashMap::new();

    relations.insert("admin".to_string(), this());
    metadata.insert("admin".to_string(), related(vec![reference("user")]));

    relations.insert("member".to_string(), this());
    metadata.insert(
        "member".to_string(),
        related(vec![reference("user"), userset_reference("team", "member")]),
    );

    TypeDefinition {
        r#type: "organization".to_string(),
        relations,
        metadata: Some(Metadata {
            relations: metadata,
        }),
    }
}

fn space_type() -> TypeDefinition {
    let mut relations = HashMap::new();
    let mut metadata = HashMap::new();

    relations.insert("organization".to_string(), this());
    metadata.insert(
        "organization".to_string(),
        related(vec![reference("organization")]),
    );

    relations.insert("moderator".to_string(), this());
    metadata.insert("moderator".to_string(), related(vec![reference("user")]));

    relations.insert("member".to_string(), this());
    metadata.insert(
        "member".to_string(),
        related(vec![reference("user"), userset_reference("team", "member")]),
    );

    // Every command relation can be granted directly and is held by the
    // organization admin; most are also held by the space moderator.
    for relation in ORG_ADMIN_IMPLIED {
        let mut children = vec![this()];
        if relation.implied_by_moderator() {
            children.push(computed("moderator"));
        }
        children.push(via_organization("admin"));

        relations.insert(relation.wire_name().to_string(), union(children));
        metadata.insert(
            relation.wire_name().to_string(),
            related(vec![reference("user")]),
        );
    }

    TypeDefinition {
        r#type: "space".to_string(),
        relations,
        metadata: Some(Metadata {
            relations: metadata,
        }),
    }
}

fn this() -> Userset {
    Userset {
        userset: Some(userset::Userset::This(DirectUserset {})),
    }
}

fn computed(relation: &str) -> Userset {
    Userset {
        userset: Some(userset::Userset::ComputedUserset(ObjectRelation {
            object: String::new(),
            relation: relation.to_string(),
        })),
    }
}

/// Follow the `organization` tupleset and evaluate `relation` there.
fn via_organization(relation: &str) -> Userset {
    Userset {
        userset: Some(userset::Userset::TupleToUserset(TupleToUserset {
            tupleset: Some(ObjectRelation {
                object: String::new(),
                relation: "organization".to_string(),
            }),
            computed_userset: Some(ObjectRelation {
                object: String::new(),
                relation: relation.to_string(),
            }),
        })),
    }
}

fn union(children: Vec<Userset>) -> Userset {
    Userset {
        userset: Some(userset::Userset::Union(Usersets { child: children })),
    }
}

fn reference(r#type: &str) -> RelationReference {
    RelationReference {
        r#type: r#type.to_string(),
        relation_or_wildcard: None,
    }
}

fn userset_reference(r#type: &str, relation: &str) -> RelationReference {
    RelationReference {
        r#type: r#type.to_string(),
        relation_or_wildcard: Some(relation_reference::RelationOrWildcard::Relation(
            relation.to_string(),
        )),
    }
}

fn related(types: Vec<RelationReference>) -> RelationMetadata {
    RelationMetadata {
        directly_related_user_types: types,
    }
}
