//! SurrealDB implementation of [`GroupRepository`].

use gatehouse_core::error::RbacResult;
use gatehouse_core::models::group::{CreateGroup, Group, UpdateGroup};
use gatehouse_core::repository::{GroupRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use tracing::debug;
use uuid::Uuid;

use super::{delete_cascading, named};

/// Groups. Deleting one drops its memberships and role assignments.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, input: CreateGroup) -> RbacResult<Group> {
        Ok(named::create(&self.db, input.name, input.description).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Group> {
        Ok(named::get_by_id(&self.db, id).await?)
    }

    async fn get_by_name(&self, name: &str) -> RbacResult<Group> {
        Ok(named::get_by_name(&self.db, name).await?)
    }

    async fn update(&self, id: Uuid, input: UpdateGroup) -> RbacResult<Group> {
        Ok(named::update(&self.db, id, input.name, input.description).await?)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        // Memberships and role assignments go with the group.
        delete_cascading(
            &self.db,
            "group",
            id,
            &[
                "DELETE member_of WHERE child_id = $id;",
                "DELETE has_role WHERE parent_id = $id;",
            ],
        )
        .await?;

        debug!(group_id = %id, "Deleted group with its edges");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Group>> {
        Ok(named::list(&self.db, pagination).await?)
    }

    async fn all(&self) -> RbacResult<Vec<Group>> {
        Ok(named::all(&self.db).await?)
    }

    async fn count(&self) -> RbacResult<u64> {
        Ok(named::count::<C, Group>(&self.db).await?)
    }
}
