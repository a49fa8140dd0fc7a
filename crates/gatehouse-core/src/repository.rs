//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations must execute each
//! mutation as a single atomic unit and enforce the uniqueness constraints
//! documented on each method, reporting violations as
//! [`RbacError::Conflict`](crate::error::RbacError::Conflict).

use uuid::Uuid;

use crate::error::RbacResult;
use crate::models::{
    action::Action,
    edge::{Edge, EdgeInsert, Relation},
    group::{CreateGroup, Group, UpdateGroup},
    module::{CreateModule, Module, UpdateModule},
    permission::{CreatePermission, Permission, UpdatePermission},
    role::{CreateRole, Role, UpdateRole},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Users. `username` and `email` are each unique.
pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = RbacResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RbacResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = RbacResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = RbacResult<User>> + Send;
    /// Delete the user together with its `UserGroup` edges.
    fn delete(&self, id: Uuid) -> impl Future<Output = RbacResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = RbacResult<PaginatedResult<User>>> + Send;
    /// All users ordered by creation time.
    fn all(&self) -> impl Future<Output = RbacResult<Vec<User>>> + Send;
    fn count(&self) -> impl Future<Output = RbacResult<u64>> + Send;
}

/// Groups. `name` is unique.
pub trait GroupRepository: Send + Sync {
    fn create(&self, input: CreateGroup) -> impl Future<Output = RbacResult<Group>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RbacResult<Group>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = RbacResult<Group>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = RbacResult<Group>> + Send;
    /// Delete the group together with its `UserGroup` and `GroupRole` edges.
    fn delete(&self, id: Uuid) -> impl Future<Output = RbacResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = RbacResult<PaginatedResult<Group>>> + Send;
    fn all(&self) -> impl Future<Output = RbacResult<Vec<Group>>> + Send;
    fn count(&self) -> impl Future<Output = RbacResult<u64>> + Send;
}

/// Roles. `name` is unique.
pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = RbacResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RbacResult<Role>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = RbacResult<Role>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = RbacResult<Role>> + Send;
    /// Delete the role together with its `GroupRole` and `RolePermission`
    /// edges.
    fn delete(&self, id: Uuid) -> impl Future<Output = RbacResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = RbacResult<PaginatedResult<Role>>> + Send;
    fn all(&self) -> impl Future<Output = RbacResult<Vec<Role>>> + Send;
    fn count(&self) -> impl Future<Output = RbacResult<u64>> + Send;
}

/// Modules. `name` is unique.
pub trait ModuleRepository: Send + Sync {
    fn create(&self, input: CreateModule) -> impl Future<Output = RbacResult<Module>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RbacResult<Module>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = RbacResult<Module>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateModule,
    ) -> impl Future<Output = RbacResult<Module>> + Send;
    /// Delete the module. Fails with `Integrity` and leaves the module in
    /// place if any permission still references it.
    fn delete(&self, id: Uuid) -> impl Future<Output = RbacResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = RbacResult<PaginatedResult<Module>>> + Send;
    fn all(&self) -> impl Future<Output = RbacResult<Vec<Module>>> + Send;
    fn count(&self) -> impl Future<Output = RbacResult<u64>> + Send;
}

/// Permissions. `(action, module_id)` is unique.
pub trait PermissionRepository: Send + Sync {
    /// `input.action` must already be a canonical [`Action`] name.
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = RbacResult<Permission>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RbacResult<Permission>> + Send;
    /// The permission for `(action, module_id)`, if one exists.
    fn find(
        &self,
        module_id: Uuid,
        action: Action,
    ) -> impl Future<Output = RbacResult<Option<Permission>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = RbacResult<Permission>> + Send;
    /// Delete the permission. Fails with `Integrity` and leaves the
    /// permission in place if any role still grants it.
    fn delete(&self, id: Uuid) -> impl Future<Output = RbacResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = RbacResult<PaginatedResult<Permission>>> + Send;
    fn all(&self) -> impl Future<Output = RbacResult<Vec<Permission>>> + Send;
    /// Permissions scoped to a module, ordered by action.
    fn list_by_module(
        &self,
        module_id: Uuid,
    ) -> impl Future<Output = RbacResult<Vec<Permission>>> + Send;
    fn count(&self) -> impl Future<Output = RbacResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// Edge rows of the three join relations. `(relation, parent_id,
/// child_id)` is unique.
pub trait EdgeRepository: Send + Sync {
    /// Insert an edge unless the pair is already related.
    ///
    /// Returns `NotFound` if either endpoint does not exist.
    fn insert(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> impl Future<Output = RbacResult<EdgeInsert>> + Send;
    /// Relate `parent_id` to every id in `child_ids` as one unit: either
    /// every endpoint exists and each missing edge is written, or nothing
    /// is. Outcomes follow the order of `child_ids`.
    fn insert_many(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_ids: &[Uuid],
    ) -> impl Future<Output = RbacResult<Vec<EdgeInsert>>> + Send;
    /// Remove the exact-match edge; `NotFound` if absent.
    fn remove(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> impl Future<Output = RbacResult<()>> + Send;
    fn find(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> impl Future<Output = RbacResult<Option<Edge>>> + Send;
    fn list_by_parent(
        &self,
        relation: Relation,
        parent_id: Uuid,
    ) -> impl Future<Output = RbacResult<Vec<Edge>>> + Send;
    fn list_by_child(
        &self,
        relation: Relation,
        child_id: Uuid,
    ) -> impl Future<Output = RbacResult<Vec<Edge>>> + Send;
    fn list(&self, relation: Relation) -> impl Future<Output = RbacResult<Vec<Edge>>> + Send;
    fn count(&self, relation: Relation) -> impl Future<Output = RbacResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Store bundle
// ---------------------------------------------------------------------------

/// An injected storage capability: one repository per entity type plus
/// the edge relations, all backed by the same store.
pub trait RbacStore: Send + Sync {
    type Users: UserRepository;
    type Groups: GroupRepository;
    type Roles: RoleRepository;
    type Modules: ModuleRepository;
    type Permissions: PermissionRepository;
    type Edges: EdgeRepository;

    fn users(&self) -> &Self::Users;
    fn groups(&self) -> &Self::Groups;
    fn roles(&self) -> &Self::Roles;
    fn modules(&self) -> &Self::Modules;
    fn permissions(&self) -> &Self::Permissions;
    fn edges(&self) -> &Self::Edges;
}
