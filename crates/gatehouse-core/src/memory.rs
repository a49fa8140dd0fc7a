//! In-memory implementation of the repository traits.
//!
//! Every table lives behind one [`RwLock`], so each mutation (including
//! cascades and blocked-delete checks) is applied atomically. Used as the
//! test double for the service layer and for embedding without a database.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{RbacError, RbacResult};
use crate::models::{
    action::Action,
    edge::{Edge, EdgeInsert, Relation},
    group::{CreateGroup, Group, UpdateGroup},
    module::{CreateModule, Module, UpdateModule},
    permission::{CreatePermission, Permission, UpdatePermission},
    role::{CreateRole, Role, UpdateRole},
    user::{CreateUser, UpdateUser, User},
};
use crate::repository::{
    EdgeRepository, GroupRepository, ModuleRepository, PaginatedResult, Pagination,
    PermissionRepository, RbacStore, RoleRepository, UserRepository,
};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, Group>,
    roles: HashMap<Uuid, Role>,
    modules: HashMap<Uuid, Module>,
    permissions: HashMap<Uuid, Permission>,
    edges: Vec<Edge>,
}

type SharedState = Arc<RwLock<MemoryState>>;

impl MemoryState {
    fn contains(&self, entity: &str, id: Uuid) -> bool {
        match entity {
            "user" => self.users.contains_key(&id),
            "group" => self.groups.contains_key(&id),
            "role" => self.roles.contains_key(&id),
            "permission" => self.permissions.contains_key(&id),
            "module" => self.modules.contains_key(&id),
            _ => false,
        }
    }

    /// Write the edge unless the pair is already related. Endpoints are the
    /// caller's to check.
    fn relate(&mut self, relation: Relation, parent_id: Uuid, child_id: Uuid) -> EdgeInsert {
        if let Some(existing) = self
            .edges
            .iter()
            .find(|e| e.relation == relation && e.parent_id == parent_id && e.child_id == child_id)
        {
            return EdgeInsert::Existing(existing.clone());
        }
        let edge = Edge {
            id: Uuid::new_v4(),
            relation,
            parent_id,
            child_id,
            created_at: Utc::now(),
        };
        self.edges.push(edge.clone());
        EdgeInsert::Created(edge)
    }

    /// Drop every edge of `relations` touching `id` on either side.
    fn cascade(&mut self, id: Uuid, relations: &[Relation]) {
        self.edges.retain(|edge| {
            !(relations.contains(&edge.relation) && (edge.parent_id == id || edge.child_id == id))
        });
    }
}

fn ordered<T: Clone>(
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> (DateTime<Utc>, Uuid),
) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

fn paginate<T>(items: Vec<T>, pagination: Pagination) -> PaginatedResult<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(pagination.offset as usize)
        .take(pagination.limit as usize)
        .collect();
    PaginatedResult {
        items,
        total,
        offset: pagination.offset,
        limit: pagination.limit,
    }
}

// ---------------------------------------------------------------------------
// Named entities (group, role, module share one shape)
// ---------------------------------------------------------------------------

trait NamedRecord: Clone {
    const ENTITY: &'static str;

    fn build(id: Uuid, name: String, description: String, now: DateTime<Utc>) -> Self;
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn apply(&mut self, name: Option<String>, description: Option<String>, now: DateTime<Utc>);
}

macro_rules! named_record {
    ($ty:ty, $entity:literal) => {
        impl NamedRecord for $ty {
            const ENTITY: &'static str = $entity;

            fn build(id: Uuid, name: String, description: String, now: DateTime<Utc>) -> Self {
                Self {
                    id,
                    name,
                    description,
                    created_at: now,
                    updated_at: now,
                }
            }

            fn id(&self) -> Uuid {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn apply(
                &mut self,
                name: Option<String>,
                description: Option<String>,
                now: DateTime<Utc>,
            ) {
                if let Some(name) = name {
                    self.name = name;
                }
                if let Some(description) = description {
                    self.description = description;
                }
                self.updated_at = now;
            }
        }
    };
}

named_record!(Group, "group");
named_record!(Role, "role");
named_record!(Module, "module");

fn name_taken<T: NamedRecord>(table: &HashMap<Uuid, T>, name: &str, except: Option<Uuid>) -> bool {
    table
        .values()
        .any(|record| record.name() == name && Some(record.id()) != except)
}

fn create_named<T: NamedRecord>(
    table: &mut HashMap<Uuid, T>,
    name: String,
    description: String,
) -> RbacResult<T> {
    if name_taken(table, &name, None) {
        return Err(RbacError::conflict(
            T::ENTITY,
            format!("{} name '{name}' already exists", T::ENTITY),
        ));
    }
    let record = T::build(Uuid::new_v4(), name, description, Utc::now());
    table.insert(record.id(), record.clone());
    Ok(record)
}

fn update_named<T: NamedRecord>(
    table: &mut HashMap<Uuid, T>,
    id: Uuid,
    name: Option<String>,
    description: Option<String>,
) -> RbacResult<T> {
    if let Some(name) = name.as_deref() {
        if name_taken(table, name, Some(id)) {
            return Err(RbacError::conflict(
                T::ENTITY,
                format!("{} name '{name}' already exists", T::ENTITY),
            ));
        }
    }
    let record = table
        .get_mut(&id)
        .ok_or_else(|| RbacError::not_found(T::ENTITY, id))?;
    record.apply(name, description, Utc::now());
    Ok(record.clone())
}

fn get_named<T: NamedRecord>(table: &HashMap<Uuid, T>, id: Uuid) -> RbacResult<T> {
    table
        .get(&id)
        .cloned()
        .ok_or_else(|| RbacError::not_found(T::ENTITY, id))
}

fn get_named_by_name<T: NamedRecord>(table: &HashMap<Uuid, T>, name: &str) -> RbacResult<T> {
    table
        .values()
        .find(|record| record.name() == name)
        .cloned()
        .ok_or_else(|| RbacError::not_found(T::ENTITY, name))
}

fn all_named<T: NamedRecord>(table: &HashMap<Uuid, T>) -> Vec<T> {
    ordered(table.values().cloned(), |r| (r.created_at(), r.id()))
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory store; clones share the same tables.
#[derive(Clone)]
pub struct MemoryStore {
    users: MemoryUserRepository,
    groups: MemoryGroupRepository,
    roles: MemoryRoleRepository,
    modules: MemoryModuleRepository,
    permissions: MemoryPermissionRepository,
    edges: MemoryEdgeRepository,
}

impl MemoryStore {
    pub fn new() -> Self {
        let state: SharedState = Arc::default();
        Self {
            users: MemoryUserRepository {
                state: state.clone(),
            },
            groups: MemoryGroupRepository {
                state: state.clone(),
            },
            roles: MemoryRoleRepository {
                state: state.clone(),
            },
            modules: MemoryModuleRepository {
                state: state.clone(),
            },
            permissions: MemoryPermissionRepository {
                state: state.clone(),
            },
            edges: MemoryEdgeRepository { state },
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RbacStore for MemoryStore {
    type Users = MemoryUserRepository;
    type Groups = MemoryGroupRepository;
    type Roles = MemoryRoleRepository;
    type Modules = MemoryModuleRepository;
    type Permissions = MemoryPermissionRepository;
    type Edges = MemoryEdgeRepository;

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn groups(&self) -> &Self::Groups {
        &self.groups
    }

    fn roles(&self) -> &Self::Roles {
        &self.roles
    }

    fn modules(&self) -> &Self::Modules {
        &self.modules
    }

    fn permissions(&self) -> &Self::Permissions {
        &self.permissions
    }

    fn edges(&self) -> &Self::Edges {
        &self.edges
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MemoryUserRepository {
    state: SharedState,
}

fn user_conflict(
    users: &HashMap<Uuid, User>,
    username: &str,
    email: &str,
    except: Option<Uuid>,
) -> bool {
    users
        .values()
        .any(|u| Some(u.id) != except && (u.username == username || u.email == email))
}

impl UserRepository for MemoryUserRepository {
    async fn create(&self, input: CreateUser) -> RbacResult<User> {
        let mut state = self.state.write().await;
        if user_conflict(&state.users, &input.username, &input.email, None) {
            return Err(RbacError::conflict("user", "username or email already exists"));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            password_hash: input.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<User> {
        let state = self.state.read().await;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RbacError::not_found("user", id))
    }

    async fn get_by_username(&self, username: &str) -> RbacResult<User> {
        let state = self.state.read().await;
        state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| RbacError::not_found("user", username))
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> RbacResult<User> {
        let mut state = self.state.write().await;
        let current = state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| RbacError::not_found("user", id))?;
        let username = input.username.unwrap_or(current.username);
        let email = input.email.unwrap_or(current.email);
        if user_conflict(&state.users, &username, &email, Some(id)) {
            return Err(RbacError::conflict("user", "username or email already exists"));
        }
        let user = User {
            username,
            email,
            password_hash: input.password_hash.unwrap_or(current.password_hash),
            updated_at: Utc::now(),
            ..current
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(RbacError::not_found("user", id));
        }
        state.cascade(id, &[Relation::UserGroup]);
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<User>> {
        Ok(paginate(self.all().await?, pagination))
    }

    async fn all(&self) -> RbacResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(ordered(state.users.values().cloned(), |u| (u.created_at, u.id)))
    }

    async fn count(&self) -> RbacResult<u64> {
        Ok(self.state.read().await.users.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MemoryGroupRepository {
    state: SharedState,
}

impl GroupRepository for MemoryGroupRepository {
    async fn create(&self, input: CreateGroup) -> RbacResult<Group> {
        let mut state = self.state.write().await;
        create_named(&mut state.groups, input.name, input.description)
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Group> {
        get_named(&self.state.read().await.groups, id)
    }

    async fn get_by_name(&self, name: &str) -> RbacResult<Group> {
        get_named_by_name(&self.state.read().await.groups, name)
    }

    async fn update(&self, id: Uuid, input: UpdateGroup) -> RbacResult<Group> {
        let mut state = self.state.write().await;
        update_named(&mut state.groups, id, input.name, input.description)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let mut state = self.state.write().await;
        if state.groups.remove(&id).is_none() {
            return Err(RbacError::not_found("group", id));
        }
        state.cascade(id, &[Relation::UserGroup, Relation::GroupRole]);
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Group>> {
        Ok(paginate(self.all().await?, pagination))
    }

    async fn all(&self) -> RbacResult<Vec<Group>> {
        Ok(all_named(&self.state.read().await.groups))
    }

    async fn count(&self) -> RbacResult<u64> {
        Ok(self.state.read().await.groups.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MemoryRoleRepository {
    state: SharedState,
}

impl RoleRepository for MemoryRoleRepository {
    async fn create(&self, input: CreateRole) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        create_named(&mut state.roles, input.name, input.description)
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Role> {
        get_named(&self.state.read().await.roles, id)
    }

    async fn get_by_name(&self, name: &str) -> RbacResult<Role> {
        get_named_by_name(&self.state.read().await.roles, name)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> RbacResult<Role> {
        let mut state = self.state.write().await;
        update_named(&mut state.roles, id, input.name, input.description)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let mut state = self.state.write().await;
        if state.roles.remove(&id).is_none() {
            return Err(RbacError::not_found("role", id));
        }
        state.cascade(id, &[Relation::GroupRole, Relation::RolePermission]);
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Role>> {
        Ok(paginate(self.all().await?, pagination))
    }

    async fn all(&self) -> RbacResult<Vec<Role>> {
        Ok(all_named(&self.state.read().await.roles))
    }

    async fn count(&self) -> RbacResult<u64> {
        Ok(self.state.read().await.roles.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MemoryModuleRepository {
    state: SharedState,
}

impl ModuleRepository for MemoryModuleRepository {
    async fn create(&self, input: CreateModule) -> RbacResult<Module> {
        let mut state = self.state.write().await;
        create_named(&mut state.modules, input.name, input.description)
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Module> {
        get_named(&self.state.read().await.modules, id)
    }

    async fn get_by_name(&self, name: &str) -> RbacResult<Module> {
        get_named_by_name(&self.state.read().await.modules, name)
    }

    async fn update(&self, id: Uuid, input: UpdateModule) -> RbacResult<Module> {
        let mut state = self.state.write().await;
        update_named(&mut state.modules, id, input.name, input.description)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let mut state = self.state.write().await;
        if !state.modules.contains_key(&id) {
            return Err(RbacError::not_found("module", id));
        }
        let references = state
            .permissions
            .values()
            .filter(|p| p.module_id == id)
            .count();
        if references > 0 {
            return Err(RbacError::Integrity {
                entity: "module".into(),
                id: id.to_string(),
                reason: format!("referenced by {references} permission(s)"),
            });
        }
        state.modules.remove(&id);
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Module>> {
        Ok(paginate(self.all().await?, pagination))
    }

    async fn all(&self) -> RbacResult<Vec<Module>> {
        Ok(all_named(&self.state.read().await.modules))
    }

    async fn count(&self) -> RbacResult<u64> {
        Ok(self.state.read().await.modules.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MemoryPermissionRepository {
    state: SharedState,
}

fn permission_taken(
    permissions: &HashMap<Uuid, Permission>,
    action: Action,
    module_id: Uuid,
    except: Option<Uuid>,
) -> bool {
    permissions
        .values()
        .any(|p| p.action == action && p.module_id == module_id && Some(p.id) != except)
}

fn pair_conflict() -> RbacError {
    RbacError::conflict(
        "permission",
        "permission with this action already exists for this module",
    )
}

impl PermissionRepository for MemoryPermissionRepository {
    async fn create(&self, input: CreatePermission) -> RbacResult<Permission> {
        let action: Action = input.action.parse()?;
        let mut state = self.state.write().await;
        if !state.modules.contains_key(&input.module_id) {
            return Err(RbacError::not_found("module", input.module_id));
        }
        if permission_taken(&state.permissions, action, input.module_id, None) {
            return Err(pair_conflict());
        }
        let now = Utc::now();
        let permission = Permission {
            id: Uuid::new_v4(),
            name: input.name,
            action,
            module_id: input.module_id,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Permission> {
        let state = self.state.read().await;
        state
            .permissions
            .get(&id)
            .cloned()
            .ok_or_else(|| RbacError::not_found("permission", id))
    }

    async fn find(&self, module_id: Uuid, action: Action) -> RbacResult<Option<Permission>> {
        let state = self.state.read().await;
        Ok(state
            .permissions
            .values()
            .find(|p| p.module_id == module_id && p.action == action)
            .cloned())
    }

    async fn update(&self, id: Uuid, input: UpdatePermission) -> RbacResult<Permission> {
        let action = input.action.as_deref().map(str::parse::<Action>).transpose()?;
        let mut state = self.state.write().await;
        let current = state
            .permissions
            .get(&id)
            .cloned()
            .ok_or_else(|| RbacError::not_found("permission", id))?;
        let module_id = input.module_id.unwrap_or(current.module_id);
        if !state.modules.contains_key(&module_id) {
            return Err(RbacError::not_found("module", module_id));
        }
        let action = action.unwrap_or(current.action);
        if permission_taken(&state.permissions, action, module_id, Some(id)) {
            return Err(pair_conflict());
        }
        let permission = Permission {
            name: input.name.unwrap_or(current.name),
            action,
            module_id,
            description: input.description.unwrap_or(current.description),
            updated_at: Utc::now(),
            ..current
        };
        state.permissions.insert(id, permission.clone());
        Ok(permission)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let mut state = self.state.write().await;
        if !state.permissions.contains_key(&id) {
            return Err(RbacError::not_found("permission", id));
        }
        let grants = state
            .edges
            .iter()
            .filter(|e| e.relation == Relation::RolePermission && e.child_id == id)
            .count();
        if grants > 0 {
            return Err(RbacError::Integrity {
                entity: "permission".into(),
                id: id.to_string(),
                reason: format!("assigned to {grants} role(s)"),
            });
        }
        state.permissions.remove(&id);
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Permission>> {
        Ok(paginate(self.all().await?, pagination))
    }

    async fn all(&self) -> RbacResult<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(ordered(state.permissions.values().cloned(), |p| {
            (p.created_at, p.id)
        }))
    }

    async fn list_by_module(&self, module_id: Uuid) -> RbacResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|p| p.module_id == module_id)
            .cloned()
            .collect();
        permissions.sort_by_key(|p| p.action);
        Ok(permissions)
    }

    async fn count(&self) -> RbacResult<u64> {
        Ok(self.state.read().await.permissions.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MemoryEdgeRepository {
    state: SharedState,
}

impl EdgeRepository for MemoryEdgeRepository {
    async fn insert(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> RbacResult<EdgeInsert> {
        let mut state = self.state.write().await;
        if !state.contains(relation.parent_entity(), parent_id) {
            return Err(RbacError::not_found(relation.parent_entity(), parent_id));
        }
        if !state.contains(relation.child_entity(), child_id) {
            return Err(RbacError::not_found(relation.child_entity(), child_id));
        }
        Ok(state.relate(relation, parent_id, child_id))
    }

    async fn insert_many(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_ids: &[Uuid],
    ) -> RbacResult<Vec<EdgeInsert>> {
        let mut state = self.state.write().await;
        if !state.contains(relation.parent_entity(), parent_id) {
            return Err(RbacError::not_found(relation.parent_entity(), parent_id));
        }
        if let Some(missing) = child_ids
            .iter()
            .find(|id| !state.contains(relation.child_entity(), **id))
        {
            return Err(RbacError::not_found(relation.child_entity(), missing));
        }
        Ok(child_ids
            .iter()
            .map(|child_id| state.relate(relation, parent_id, *child_id))
            .collect())
    }

    async fn remove(&self, relation: Relation, parent_id: Uuid, child_id: Uuid) -> RbacResult<()> {
        let mut state = self.state.write().await;
        let before = state.edges.len();
        state.edges.retain(|e| {
            !(e.relation == relation && e.parent_id == parent_id && e.child_id == child_id)
        });
        if state.edges.len() == before {
            return Err(RbacError::not_found(
                relation.as_str(),
                format!("{parent_id}->{child_id}"),
            ));
        }
        Ok(())
    }

    async fn find(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> RbacResult<Option<Edge>> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .iter()
            .find(|e| e.relation == relation && e.parent_id == parent_id && e.child_id == child_id)
            .cloned())
    }

    async fn list_by_parent(&self, relation: Relation, parent_id: Uuid) -> RbacResult<Vec<Edge>> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .iter()
            .filter(|e| e.relation == relation && e.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn list_by_child(&self, relation: Relation, child_id: Uuid) -> RbacResult<Vec<Edge>> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .iter()
            .filter(|e| e.relation == relation && e.child_id == child_id)
            .cloned()
            .collect())
    }

    async fn list(&self, relation: Relation) -> RbacResult<Vec<Edge>> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .iter()
            .filter(|e| e.relation == relation)
            .cloned()
            .collect())
    }

    async fn count(&self, relation: Relation) -> RbacResult<u64> {
        let state = self.state.read().await;
        Ok(state.edges.iter().filter(|e| e.relation == relation).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, User, Group, Role, Permission) {
        let store = MemoryStore::new();
        let user = store
            .users()
            .create(CreateUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let group = store
            .groups()
            .create(CreateGroup {
                name: "Developers".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        let role = store
            .roles()
            .create(CreateRole {
                name: "Editor".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        let module = store
            .modules()
            .create(CreateModule {
                name: "Users".into(),
                description: String::new(),
            })
            .await
            .unwrap();
        let permission = store
            .permissions()
            .create(CreatePermission {
                name: "read_users".into(),
                action: "read".into(),
                module_id: module.id,
                description: String::new(),
            })
            .await
            .unwrap();
        (store, user, group, role, permission)
    }

    #[tokio::test]
    async fn duplicate_group_name_is_a_conflict() {
        let (store, _, _, _, _) = seeded().await;
        let err = store
            .groups()
            .create(CreateGroup {
                name: "Developers".into(),
                description: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::Conflict { .. }));
    }

    #[tokio::test]
    async fn reinserting_an_edge_reports_existing() {
        let (store, user, group, _, _) = seeded().await;
        let first = store
            .edges()
            .insert(Relation::UserGroup, user.id, group.id)
            .await
            .unwrap();
        let second = store
            .edges()
            .insert(Relation::UserGroup, user.id, group.id)
            .await
            .unwrap();
        assert!(first.is_created());
        assert!(!second.is_created());
        assert_eq!(first.edge().id, second.edge().id);
        assert_eq!(store.edges().count(Relation::UserGroup).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn bulk_insert_writes_nothing_when_a_child_is_missing() {
        let (store, _, group, role, _) = seeded().await;
        let err = store
            .edges()
            .insert_many(Relation::GroupRole, group.id, &[role.id, Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { ref entity, .. } if entity == "role"));
        assert_eq!(store.edges().count(Relation::GroupRole).await.unwrap(), 0);

        let outcomes = store
            .edges()
            .insert_many(Relation::GroupRole, group.id, &[role.id])
            .await
            .unwrap();
        assert!(outcomes[0].is_created());
        let again = store
            .edges()
            .insert_many(Relation::GroupRole, group.id, &[role.id])
            .await
            .unwrap();
        assert!(!again[0].is_created());
    }

    #[tokio::test]
    async fn edge_to_missing_endpoint_is_rejected() {
        let (store, user, _, _, _) = seeded().await;
        let err = store
            .edges()
            .insert(Relation::UserGroup, user.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { ref entity, .. } if entity == "group"));
    }

    #[tokio::test]
    async fn role_delete_cascades_both_relations() {
        let (store, _, group, role, permission) = seeded().await;
        store
            .edges()
            .insert(Relation::GroupRole, group.id, role.id)
            .await
            .unwrap();
        store
            .edges()
            .insert(Relation::RolePermission, role.id, permission.id)
            .await
            .unwrap();

        store.roles().delete(role.id).await.unwrap();

        assert_eq!(store.edges().count(Relation::GroupRole).await.unwrap(), 0);
        assert_eq!(store.edges().count(Relation::RolePermission).await.unwrap(), 0);
        // The permission itself is untouched.
        assert!(store.permissions().get_by_id(permission.id).await.is_ok());
    }

    #[tokio::test]
    async fn granted_permission_cannot_be_deleted() {
        let (store, _, _, role, permission) = seeded().await;
        store
            .edges()
            .insert(Relation::RolePermission, role.id, permission.id)
            .await
            .unwrap();

        let err = store.permissions().delete(permission.id).await.unwrap_err();
        assert!(matches!(err, RbacError::Integrity { .. }));
        assert!(store.permissions().get_by_id(permission.id).await.is_ok());
    }

    #[tokio::test]
    async fn list_paginates_in_creation_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .roles()
                .create(CreateRole {
                    name: format!("role-{i}"),
                    description: String::new(),
                })
                .await
                .unwrap();
        }
        let page = store
            .roles()
            .list(Pagination {
                offset: 3,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
    }
}
