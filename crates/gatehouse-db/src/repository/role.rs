//! SurrealDB implementation of [`RoleRepository`].

use gatehouse_core::error::RbacResult;
use gatehouse_core::models::role::{CreateRole, Role, UpdateRole};
use gatehouse_core::repository::{PaginatedResult, Pagination, RoleRepository};
use surrealdb::{Connection, Surreal};
use tracing::debug;
use uuid::Uuid;

use super::{delete_cascading, named};

#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> RbacResult<Role> {
        Ok(named::create(&self.db, input.name, input.description).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Role> {
        Ok(named::get_by_id(&self.db, id).await?)
    }

    async fn get_by_name(&self, name: &str) -> RbacResult<Role> {
        Ok(named::get_by_name(&self.db, name).await?)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> RbacResult<Role> {
        Ok(named::update(&self.db, id, input.name, input.description).await?)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        delete_cascading(
            &self.db,
            "role",
            id,
            &[
                "DELETE has_role WHERE child_id = $id;",
                "DELETE grants WHERE parent_id = $id;",
            ],
        )
        .await?;

        debug!(role_id = %id, "Deleted role with its edges");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Role>> {
        Ok(named::list(&self.db, pagination).await?)
    }

    async fn all(&self) -> RbacResult<Vec<Role>> {
        Ok(named::all(&self.db).await?)
    }

    async fn count(&self) -> RbacResult<u64> {
        Ok(named::count::<C, Role>(&self.db).await?)
    }
}
