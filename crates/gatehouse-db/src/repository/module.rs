//! SurrealDB implementation of [`ModuleRepository`].

use gatehouse_core::error::{RbacError, RbacResult};
use gatehouse_core::models::module::{CreateModule, Module, UpdateModule};
use gatehouse_core::repository::{ModuleRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, delete_unreferenced, first_total, named};
use crate::error::DbError;

/// Modules. A delete is refused while any permission points here.
#[derive(Clone)]
pub struct SurrealModuleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealModuleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn reference_count(&self, id: &str) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM permission WHERE module_id = $id GROUP ALL")
            .bind(("id", id.to_owned()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(first_total(rows))
    }
}

impl<C: Connection> ModuleRepository for SurrealModuleRepository<C> {
    async fn create(&self, input: CreateModule) -> RbacResult<Module> {
        Ok(named::create(&self.db, input.name, input.description).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Module> {
        Ok(named::get_by_id(&self.db, id).await?)
    }

    async fn get_by_name(&self, name: &str) -> RbacResult<Module> {
        Ok(named::get_by_name(&self.db, name).await?)
    }

    async fn update(&self, id: Uuid, input: UpdateModule) -> RbacResult<Module> {
        Ok(named::update(&self.db, id, input.name, input.description).await?)
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let deleted = delete_unreferenced(
            &self.db,
            "module",
            id,
            "(SELECT VALUE id FROM permission WHERE module_id = $id)",
        )
        .await?;

        if !deleted {
            let id_str = id.to_string();
            let references = self.reference_count(&id_str).await?;
            return Err(RbacError::Integrity {
                entity: "module".into(),
                id: id_str,
                reason: format!("referenced by {references} permission(s)"),
            });
        }

        debug!(module_id = %id, "Deleted module");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Module>> {
        Ok(named::list(&self.db, pagination).await?)
    }

    async fn all(&self) -> RbacResult<Vec<Module>> {
        Ok(named::all(&self.db).await?)
    }

    async fn count(&self) -> RbacResult<u64> {
        Ok(named::count::<C, Module>(&self.db).await?)
    }
}
