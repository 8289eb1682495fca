//! Identity reconciliation engine
//!
//! Runs once per login event and brings the relational membership
//! record, the OU-mapping table, and the authorization store's tuples
//! into agreement for one user, creating spaces on the fly when a group
//! key has no mapping yet. All relational writes land before any tuple
//! write, so a crash in between leaves the database as the canonical
//! truth and the next login repairs the rest. Every step is idempotent;
//! callers may simply retry the whole request.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use weld_core::{
    AuthObject, AuthRelation, AuthSubject, AuthorizationStore, GroupMappingRepository,
    OrganizationId, ProvisioningRequest, RelationshipTuple, Result, Space, SpaceRepository, User,
    UserId, UserRepository, UserStatus, WeldError,
};

/// One resolved target space plus how the current user attaches to it.
struct ResolvedTarget {
    space: Space,
    /// Created during this run: the user becomes moderator, not member.
    created_here: bool,
}

pub struct Provisioner<U, S, G, A>
where
    U: UserRepository,
    S: SpaceRepository,
    G: GroupMappingRepository,
    A: AuthorizationStore,
{
    users: Arc<U>,
    spaces: Arc<S>,
    mappings: Arc<G>,
    authz: Arc<A>,
    organization_id: OrganizationId,
}

impl<U, S, G, A> Provisioner<U, S, G, A>
where
    U: UserRepository + 'static,
    S: SpaceRepository + 'static,
    G: GroupMappingRepository + 'static,
    A: AuthorizationStore + 'static,
{
    pub fn new(
        users: Arc<U>,
        spaces: Arc<S>,
        mappings: Arc<G>,
        authz: Arc<A>,
        organization_id: OrganizationId,
    ) -> Self {
        Self {
            users,
            spaces,
            mappings,
            authz,
            organization_id,
        }
    }

    /// Reconcile one login event. Aborts on the first failure; nothing
    /// already written is rolled back, the next attempt re-applies it.
    #[instrument(skip(self, request), fields(email = %request.email, source = %request.source))]
    pub async fn ensure_user(&self, request: &ProvisioningRequest) -> Result<UserId> {
        let email = request.email.trim();
        if !valid_email(email) {
            return Err(WeldError::invalid_email(email));
        }

        let user = self.resolve_user(email, request).await?;
        let targets = self.resolve_target_spaces(&user, &request.group_keys).await?;
        self.apply_membership(&user, &targets).await?;
        self.project_tuples(&user, &targets).await?;

        info!(user_id = %user.id, targets = targets.len(), "Provisioning complete");
        Ok(user.id)
    }

    /// Find or create the user row. An `Invited` placeholder becomes a
    /// real account on its first login, adopting the incoming profile.
    async fn resolve_user(&self, email: &str, request: &ProvisioningRequest) -> Result<User> {
        match self.users.get_by_email(email).await? {
            Some(mut user) if user.is_invited() => {
                user.status = UserStatus::Active;
                user.display_name = request.display_name.clone();
                user.picture_url = request.picture_url.clone();
                user.updated_at = Utc::now();
                let user = self.users.update(&user).await?;
                info!(user_id = %user.id, "Activated invited user");
                Ok(user)
            }
            Some(user) => Ok(user),
            None => {
                let user = self
                    .users
                    .add(&User::new(
                        email,
                        request.display_name.clone(),
                        request.picture_url.clone(),
                    ))
                    .await?;
                info!(user_id = %user.id, "Created user on first login");
                Ok(user)
            }
        }
    }

    /// Resolve each group key to a target space. Mapped keys take the
    /// fast path; unmapped keys derive a space name and walk the bounded
    /// two-attempt collision chain (last segment, then full path, then
    /// member-only attachment to whatever already holds the name).
    async fn resolve_target_spaces(
        &self,
        user: &User,
        group_keys: &[String],
    ) -> Result<Vec<ResolvedTarget>> {
        let mut targets: Vec<ResolvedTarget> = Vec::new();
        let mut seen = HashSet::new();

        for raw_key in group_keys {
            let key = raw_key.trim();
            if key.is_empty() || !seen.insert(key.to_string()) {
                continue;
            }

            if let Some(mapping) = self.mappings.get_active_by_group_key(key).await? {
                match self.spaces.get_by_id(mapping.space_id).await? {
                    Some(space) => push_target(
                        &mut targets,
                        ResolvedTarget {
                            space,
                            created_here: false,
                        },
                    ),
                    None => {
                        warn!(group_key = %key, space_id = %mapping.space_id,
                            "Active mapping targets a deleted space; skipping key");
                    }
                }
                continue;
            }

            let candidate = candidate_name(key);
            if candidate.is_empty() {
                warn!(group_key = %key, "Group key yields no space name; skipping key");
                continue;
            }

            match self.spaces.get_by_name(&candidate).await? {
                None => {
                    let target = self.create_space_for_key(user, key, &candidate).await?;
                    push_target(&mut targets, target);
                }
                Some(_taken) => {
                    let fallback = fallback_name(key);
                    match self.spaces.get_by_name(&fallback).await? {
                        None => {
                            let target = self.create_space_for_key(user, key, &fallback).await?;
                            push_target(&mut targets, target);
                        }
                        // Second collision: attach as a plain member of the
                        // unrelated space rather than seizing its ownership.
                        Some(existing) => push_target(
                            &mut targets,
                            ResolvedTarget {
                                space: existing,
                                created_here: false,
                            },
                        ),
                    }
                }
            }
        }

        Ok(targets)
    }

    /// Create a space for an unmapped key and record the mapping. Losing
    /// the creation race to a concurrent login demotes this key to a
    /// member-only attachment on the winner's space.
    async fn create_space_for_key(
        &self,
        user: &User,
        group_key: &str,
        name: &str,
    ) -> Result<ResolvedTarget> {
        match self.spaces.add(&Space::new(name, user.id)).await {
            Ok(space) => {
                self.mappings.add(user.id, group_key, space.id).await?;
                info!(space_id = %space.id, name = %space.name, group_key = %group_key,
                    "Space auto-created from group key");
                Ok(ResolvedTarget {
                    space,
                    created_here: true,
                })
            }
            Err(error) if error.is_conflict() => match self.spaces.get_by_name(name).await? {
                Some(existing) => {
                    warn!(name = %name, group_key = %group_key,
                        "Lost space-creation race; attaching as member");
                    Ok(ResolvedTarget {
                        space: existing,
                        created_here: false,
                    })
                }
                None => Err(error),
            },
            Err(error) => Err(error),
        }
    }

    /// Ensure the user appears in each target's member set. Moderators
    /// are never also written as members.
    async fn apply_membership(&self, user: &User, targets: &[ResolvedTarget]) -> Result<()> {
        for target in targets {
            if target.space.moderator_user_id == user.id
                || target.space.member_ids.contains(&user.id)
            {
                continue;
            }
            let mut space = target.space.clone();
            space.member_ids.insert(user.id);
            space.updated_at = Utc::now();
            self.spaces.update(&space).await?;
        }
        Ok(())
    }

    /// Project the resolved attachments into the authorization store in
    /// one additive write. Reconciliation never removes roles; demotion
    /// is an explicit admin action.
    async fn project_tuples(&self, user: &User, targets: &[ResolvedTarget]) -> Result<()> {
        let mut tuples = Vec::new();
        for target in targets {
            let object = AuthObject::Space(target.space.id);
            if target.created_here {
                tuples.push(RelationshipTuple::new(
                    AuthSubject::Organization(self.organization_id),
                    AuthRelation::SpaceOrganization,
                    object,
                ));
                tuples.push(RelationshipTuple::user(
                    user.id,
                    AuthRelation::SpaceModerator,
                    object,
                ));
            } else if target.space.moderator_user_id != user.id {
                // Moderator already implies membership; skip the tuple.
                tuples.push(RelationshipTuple::user(
                    user.id,
                    AuthRelation::SpaceMember,
                    object,
                ));
            }
        }

        if tuples.is_empty() {
            return Ok(());
        }
        self.authz.create_relationships(&tuples).await
    }
}

/// Two group keys can resolve to the same space; process it once.
fn push_target(targets: &mut Vec<ResolvedTarget>, target: ResolvedTarget) {
    if !targets.iter().any(|t| t.space.id == target.space.id) {
        targets.push(target);
    }
}

/// Structural check only. Real deliverability is the directory's
/// problem; this guards against garbage reaching the stores.
fn valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Last segment of the OU path: `"ou:/Support/Support Managers"` ->
/// `"Support Managers"`.
fn candidate_name(group_key: &str) -> String {
    let path = strip_scheme(group_key);
    path.rsplit('/')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
        .to_string()
}

/// Full OU path with the scheme stripped and inner slashes kept:
/// `"ou:/Support/Support Managers"` -> `"Support/Support Managers"`.
fn fallback_name(group_key: &str) -> String {
    strip_scheme(group_key).to_string()
}

fn strip_scheme(group_key: &str) -> &str {
    let key = group_key.trim();
    let key = key.strip_prefix("ou:").unwrap_or(key);
    key.trim_matches('/').trim()
}
