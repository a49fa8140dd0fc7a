//! Deletion policy for the RBAC graph.
//!
//! | Deleting   | Blocked by                      | Cascades                      |
//! |------------|---------------------------------|-------------------------------|
//! | Module     | any permission in the module    |                               |
//! | Permission | any role granting it            |                               |
//! | Role       |                                 | group assignments and grants  |
//! | Group      |                                 | memberships and assignments   |
//! | User       |                                 | memberships                   |
//!
//! Block checks run here before any mutation so the caller gets a precise
//! error. The store repeats the check inside its atomic delete, and it owns
//! the cascade.

use gatehouse_core::error::{RbacError, RbacResult};
use gatehouse_core::models::edge::Relation;
use gatehouse_core::repository::{
    EdgeRepository, GroupRepository, ModuleRepository, PermissionRepository, RbacStore,
    RoleRepository, UserRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Enforces the deletion policy in front of the store.
#[derive(Clone)]
pub struct IntegrityGuard<S: RbacStore> {
    store: S,
}

impl<S: RbacStore> IntegrityGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn blocked(entity: &str, id: Uuid, reason: String) -> RbacError {
        warn!(entity, %id, %reason, "Delete blocked");
        RbacError::Integrity {
            entity: entity.into(),
            id: id.to_string(),
            reason,
        }
    }

    /// Number of edges of `relations` touching `id`, for the cascade log.
    async fn edge_count(&self, id: Uuid, relations: &[(Relation, bool)]) -> RbacResult<usize> {
        let mut total = 0;
        for &(relation, as_parent) in relations {
            let edges = if as_parent {
                self.store.edges().list_by_parent(relation, id).await?
            } else {
                self.store.edges().list_by_child(relation, id).await?
            };
            total += edges.len();
        }
        Ok(total)
    }

    pub async fn delete_module(&self, id: Uuid) -> RbacResult<()> {
        let module = self.store.modules().get_by_id(id).await?;
        let references = self.store.permissions().list_by_module(id).await?.len();
        if references > 0 {
            return Err(Self::blocked(
                "module",
                id,
                format!("referenced by {references} permission(s)"),
            ));
        }
        self.store.modules().delete(id).await?;
        info!(module = %module.name, %id, "Module deleted");
        Ok(())
    }

    pub async fn delete_permission(&self, id: Uuid) -> RbacResult<()> {
        let permission = self.store.permissions().get_by_id(id).await?;
        let grants = self
            .store
            .edges()
            .list_by_child(Relation::RolePermission, id)
            .await?
            .len();
        if grants > 0 {
            return Err(Self::blocked(
                "permission",
                id,
                format!("assigned to {grants} role(s)"),
            ));
        }
        self.store.permissions().delete(id).await?;
        info!(permission = %permission.name, %id, "Permission deleted");
        Ok(())
    }

    pub async fn delete_role(&self, id: Uuid) -> RbacResult<()> {
        let role = self.store.roles().get_by_id(id).await?;
        let cascaded = self
            .edge_count(
                id,
                &[(Relation::GroupRole, false), (Relation::RolePermission, true)],
            )
            .await?;
        self.store.roles().delete(id).await?;
        info!(role = %role.name, %id, cascaded, "Role deleted");
        Ok(())
    }

    pub async fn delete_group(&self, id: Uuid) -> RbacResult<()> {
        let group = self.store.groups().get_by_id(id).await?;
        let cascaded = self
            .edge_count(id, &[(Relation::UserGroup, false), (Relation::GroupRole, true)])
            .await?;
        self.store.groups().delete(id).await?;
        info!(group = %group.name, %id, cascaded, "Group deleted");
        Ok(())
    }

    pub async fn delete_user(&self, id: Uuid) -> RbacResult<()> {
        let user = self.store.users().get_by_id(id).await?;
        let cascaded = self.edge_count(id, &[(Relation::UserGroup, true)]).await?;
        self.store.users().delete(id).await?;
        info!(username = %user.username, %id, cascaded, "User deleted");
        Ok(())
    }
}
