//! [`RbacStore`] bundle over a single SurrealDB client.

use gatehouse_core::repository::RbacStore;
use surrealdb::{Connection, Surreal};

use crate::repository::{
    SurrealEdgeRepository, SurrealGroupRepository, SurrealModuleRepository,
    SurrealPermissionRepository, SurrealRoleRepository, SurrealUserRepository,
};

/// All repositories sharing one connection.
#[derive(Clone)]
pub struct SurrealStore<C: Connection> {
    users: SurrealUserRepository<C>,
    groups: SurrealGroupRepository<C>,
    roles: SurrealRoleRepository<C>,
    modules: SurrealModuleRepository<C>,
    permissions: SurrealPermissionRepository<C>,
    edges: SurrealEdgeRepository<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            users: SurrealUserRepository::new(db.clone()),
            groups: SurrealGroupRepository::new(db.clone()),
            roles: SurrealRoleRepository::new(db.clone()),
            modules: SurrealModuleRepository::new(db.clone()),
            permissions: SurrealPermissionRepository::new(db.clone()),
            edges: SurrealEdgeRepository::new(db),
        }
    }
}

impl<C: Connection> RbacStore for SurrealStore<C> {
    type Users = SurrealUserRepository<C>;
    type Groups = SurrealGroupRepository<C>;
    type Roles = SurrealRoleRepository<C>;
    type Modules = SurrealModuleRepository<C>;
    type Permissions = SurrealPermissionRepository<C>;
    type Edges = SurrealEdgeRepository<C>;

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
