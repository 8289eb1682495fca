//! In-memory trait implementations for test suites
//!
//! Behavioral stand-ins for the relational stores and the authorization
//! store. The store fake records every write and answers checks from an
//! explicit grant table; it does not evaluate inheritance, which belongs
//! to the external store.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::authz::{AuthObject, AuthRelation, AuthSubject, RelationshipTuple};
use crate::error::{Result, WeldError};
use crate::ids::{GroupMappingId, SpaceId, UserId};
use crate::models::{GroupSpaceMapping, Space, User};
use crate::traits::{AuthorizationStore, GroupMappingRepository, SpaceRepository, UserRepository};

// =============================================================================
// Users
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
    failing: AtomicBool,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn all(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    /// Make every subsequent call fail with a persistence error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn guard(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WeldError::persistence("injected user store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.guard()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.guard()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn add(&self, user: &User) -> Result<User> {
        self.guard()?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(WeldError::conflict(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User> {
        self.guard()?;
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user.clone())
            }
            None => Err(WeldError::not_found("user", user.id.to_string())),
        }
    }
}

// =============================================================================
// Spaces
// =============================================================================

#[derive(Default)]
pub struct InMemorySpaceRepository {
    spaces: Mutex<HashMap<SpaceId, Space>>,
    // name -> rival row that wins the creation race on the next add
    races: Mutex<HashMap<String, Space>>,
    failing: AtomicBool,
}

impl InMemorySpaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, space: Space) {
        self.spaces.lock().unwrap().insert(space.id, space);
    }

    pub fn get(&self, id: SpaceId) -> Option<Space> {
        self.spaces.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<Space> {
        self.spaces.lock().unwrap().values().cloned().collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Simulate a concurrent creator winning the race for `rival.name`:
    /// the next `add` under that name inserts the rival row and returns
    /// the unique-violation conflict the real store would raise.
    pub fn inject_create_race(&self, rival: Space) {
        self.races.lock().unwrap().insert(rival.name.clone(), rival);
    }

    fn guard(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WeldError::persistence("injected space store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl SpaceRepository for InMemorySpaceRepository {
    async fn add(&self, space: &Space) -> Result<Space> {
        self.guard()?;
        let mut spaces = self.spaces.lock().unwrap();
        if let Some(rival) = self.races.lock().unwrap().remove(&space.name) {
            spaces.insert(rival.id, rival);
            return Err(WeldError::conflict(format!(
                "space name {:?} already exists",
                space.name
            )));
        }
        if spaces
            .values()
            .any(|s| !s.is_deleted && s.name == space.name)
        {
            return Err(WeldError::conflict(format!(
                "space name {:?} already exists",
                space.name
            )));
        }
        spaces.insert(space.id, space.clone());
        Ok(space.clone())
    }

    async fn update(&self, space: &Space) -> Result<Space> {
        self.guard()?;
        let mut spaces = self.spaces.lock().unwrap();
        if !spaces.contains_key(&space.id) {
            return Err(WeldError::not_found("space", space.id.to_string()));
        }
        spaces.insert(space.id, space.clone());
        Ok(space.clone())
    }

    async fn get_by_id(&self, id: SpaceId) -> Result<Option<Space>> {
        self.guard()?;
        Ok(self
            .spaces
            .lock()
            .unwrap()
            .get(&id)
            .filter(|s| !s.is_deleted)
            .cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Space>> {
        self.guard()?;
        Ok(self
            .spaces
            .lock()
            .unwrap()
            .values()
            .find(|s| !s.is_deleted && s.name == name)
            .cloned())
    }

    async fn soft_delete(&self, id: SpaceId) -> Result<()> {
        self.guard()?;
        let mut spaces = self.spaces.lock().unwrap();
        match spaces.get_mut(&id) {
            Some(space) => {
                space.is_deleted = true;
                space.updated_at = Utc::now();
                Ok(())
            }
            None => Err(WeldError::not_found("space", id.to_string())),
        }
    }
}

// =============================================================================
// Group mappings
// =============================================================================

#[derive(Default)]
pub struct InMemoryGroupMappingRepository {
    rows: Mutex<Vec<GroupSpaceMapping>>,
    failing: AtomicBool,
}

impl InMemoryGroupMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, mapping: GroupSpaceMapping) {
        self.rows.lock().unwrap().push(mapping);
    }

    pub fn all(&self) -> Vec<GroupSpaceMapping> {
        self.rows.lock().unwrap().clone()
    }

    pub fn active(&self) -> Vec<GroupSpaceMapping> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.is_active)
            .cloned()
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn guard(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WeldError::persistence("injected mapping store failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl GroupMappingRepository for InMemoryGroupMappingRepository {
    async fn get_all(&self) -> Result<Vec<GroupSpaceMapping>> {
        self.guard()?;
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn get_active_by_group_key(&self, group_key: &str) -> Result<Option<GroupSpaceMapping>> {
        self.guard()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.is_active && m.group_key == group_key)
            .cloned())
    }

    async fn get_space_ids_by_group_keys(&self, group_keys: &[String]) -> Result<Vec<SpaceId>> {
        self.guard()?;
        let rows = self.rows.lock().unwrap();
        let mut out = Vec::new();
        for key in group_keys {
            let key = key.trim();
            for row in rows.iter().filter(|m| m.is_active && m.group_key == key) {
                if !out.contains(&row.space_id) {
                    out.push(row.space_id);
                }
            }
        }
        Ok(out)
    }

    async fn add(
        &self,
        actor_user_id: UserId,
        group_key: &str,
        space_id: SpaceId,
    ) -> Result<GroupSpaceMapping> {
        self.guard()?;
        let mapping = GroupSpaceMapping::new(actor_user_id, group_key, space_id);
        self.rows.lock().unwrap().push(mapping.clone());
        Ok(mapping)
    }

    async fn deactivate(&self, actor_user_id: UserId, id: GroupMappingId) -> Result<()> {
        self.guard()?;
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|m| m.id == id) {
            Some(row) => {
                row.is_active = false;
                row.updated_by = Some(actor_user_id);
                row.updated_at = Utc::now();
                Ok(())
            }
            None => Err(WeldError::not_found("group mapping", id.to_string())),
        }
    }
}

// =============================================================================
// Authorization store
// =============================================================================

#[derive(Default)]
pub struct RecordingAuthorizationStore {
    created: Mutex<Vec<RelationshipTuple>>,
    deleted: Mutex<Vec<RelationshipTuple>>,
    updates: Mutex<Vec<(Vec<RelationshipTuple>, Vec<RelationshipTuple>)>>,
    grants: Mutex<BTreeSet<String>>,
    allow_all: AtomicBool,
    failing_writes: AtomicBool,
    failing_checks: AtomicBool,
}

impl RecordingAuthorizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(subject: &AuthSubject, relation: AuthRelation, object: &AuthObject) -> String {
        format!("{subject}|{}|{object}", relation.wire_name())
    }

    /// Make `check_permission` answer true for this triple.
    pub fn grant(&self, subject: &AuthSubject, relation: AuthRelation, object: &AuthObject) {
        self.grants
            .lock()
            .unwrap()
            .insert(Self::key(subject, relation, object));
    }

    pub fn set_allow_all(&self, allow: bool) {
        self.allow_all.store(allow, Ordering::SeqCst);
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_checks(&self, failing: bool) {
        self.failing_checks.store(failing, Ordering::SeqCst);
    }

    pub fn created_tuples(&self) -> Vec<RelationshipTuple> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted_tuples(&self) -> Vec<RelationshipTuple> {
        self.deleted.lock().unwrap().clone()
    }

    /// Atomic update calls, in order, as (to_add, to_remove) pairs.
    pub fn update_calls(&self) -> Vec<(Vec<RelationshipTuple>, Vec<RelationshipTuple>)> {
        self.updates.lock().unwrap().clone()
    }

    /// Net tuple state: everything created (by either write path) minus
    /// everything deleted, as rendered tuples.
    pub fn tuple_set(&self) -> BTreeSet<String> {
        let mut set: BTreeSet<String> = self
            .created
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.to_string())
            .collect();
        for tuple in self.deleted.lock().unwrap().iter() {
            set.remove(&tuple.to_string());
        }
        set
    }
}

#[async_trait]
impl AuthorizationStore for RecordingAuthorizationStore {
    async fn create_store(&self, name: &str) -> Result<String> {
        Ok(format!("store-{name}"))
    }

    async fn write_authorization_model(&self) -> Result<String> {
        Ok("model-1".to_string())
    }

    async fn create_relationships(&self, tuples: &[RelationshipTuple]) -> Result<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(WeldError::authorization_store("injected write failure"));
        }
        self.created.lock().unwrap().extend_from_slice(tuples);
        Ok(())
    }

    async fn delete_relationships(&self, tuples: &[RelationshipTuple]) -> Result<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(WeldError::authorization_store("injected delete failure"));
        }
        self.deleted.lock().unwrap().extend_from_slice(tuples);
        Ok(())
    }

    async fn update_relationships(
        &self,
        to_add: &[RelationshipTuple],
        to_remove: &[RelationshipTuple],
    ) -> Result<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(WeldError::authorization_store("injected update failure"));
        }
        self.created.lock().unwrap().extend_from_slice(to_add);
        self.deleted.lock().unwrap().extend_from_slice(to_remove);
        self.updates
            .lock()
            .unwrap()
            .push((to_add.to_vec(), to_remove.to_vec()));
        Ok(())
    }

    async fn check_permission(
        &self,
        subject: &AuthSubject,
        relation: AuthRelation,
        object: &AuthObject,
    ) -> Result<bool> {
        if self.failing_checks.load(Ordering::SeqCst) {
            return Err(WeldError::authorization_store("injected check failure"));
        }
        if self.allow_all.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(self
            .grants
            .lock()
            .unwrap()
            .contains(&Self::key(subject, relation, object)))
    }

    async fn batch_check_permission(
        &self,
        subject: &AuthSubject,
        relations: &[AuthRelation],
        object: &AuthObject,
    ) -> Result<HashMap<AuthRelation, bool>> {
        let mut results = HashMap::with_capacity(relations.len());
        for relation in relations {
            let allowed = self.check_permission(subject, *relation, object).await?;
            results.insert(*relation, allowed);
        }
        Ok(results)
    }
}

