//! SurrealDB implementation of [`PermissionRepository`].

use chrono::{DateTime, Utc};
use gatehouse_core::error::{RbacError, RbacResult};
use gatehouse_core::models::action::Action;
use gatehouse_core::models::permission::{CreatePermission, Permission, UpdatePermission};
use gatehouse_core::repository::{PaginatedResult, Pagination, PermissionRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{
    CountRow, MISSING, bind, delete_unreferenced, first_total, parse_uuid, require, run_guarded,
    touch, transaction,
};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    name: String,
    action: String,
    module_id: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    name: String,
    action: String,
    module_id: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_action(value: &str) -> Result<Action, DbError> {
    Action::parse(value).ok_or_else(|| DbError::Decode(format!("unknown action: {value}")))
}

impl PermissionRow {
    fn try_into_permission(self, id: Uuid) -> Result<Permission, DbError> {
        Ok(Permission {
            id,
            name: self.name,
            action: parse_action(&self.action)?,
            module_id: parse_uuid("module", &self.module_id)?,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        let id = parse_uuid("permission", &self.record_id)?;
        PermissionRow {
            name: self.name,
            action: self.action,
            module_id: self.module_id,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_permission(id)
    }
}

fn pair_conflict(err: DbError) -> RbacError {
    match err {
        DbError::Conflict { entity, .. } => RbacError::Conflict {
            entity,
            message: "permission with this action already exists for this module".into(),
        },
        other => other.into(),
    }
}

fn rows_into_permissions(rows: Vec<PermissionRowWithId>) -> Result<Vec<Permission>, DbError> {
    rows.into_iter()
        .map(|row| row.try_into_permission())
        .collect()
}

const MISSING_MODULE: &str = "missing module";

/// Permissions, unique per `(action, module_id)`.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn grant_count(&self, id: &str) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM grants WHERE child_id = $id GROUP ALL")
            .bind(("id", id.to_owned()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(first_total(rows))
    }

    /// Run a guarded write on permission `id` that may point at `module_id`.
    async fn write(
        &self,
        id: Uuid,
        module_id: Option<Uuid>,
        body: &str,
        bindings: &[(String, String)],
    ) -> RbacResult<()> {
        match run_guarded(&self.db, "permission", &transaction(body), bindings).await {
            Ok(()) => Ok(()),
            Err(e) if e.raised(MISSING_MODULE) => match module_id {
                Some(module_id) => Err(RbacError::not_found("module", module_id)),
                None => Err(e.into()),
            },
            Err(e) if e.raised(MISSING) => Err(RbacError::not_found("permission", id)),
            Err(e) => Err(pair_conflict(e)),
        }
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> RbacResult<Permission> {
        let action: Action = input.action.parse()?;
        let id = Uuid::new_v4();

        // The module latch orders this write against a module delete.
        let mut body = touch("module_id");
        body.push_str(&require("'module'", "module_id", MISSING_MODULE));
        body.push_str(
            "CREATE type::record('permission', $id) SET \
             name = $name, action = $action, \
             module_id = $module_id, description = $description RETURN NONE;\n",
        );
        let bindings = [
            bind("id", id),
            bind("name", input.name),
            bind("action", action.as_str()),
            bind("module_id", input.module_id),
            bind("description", input.description),
        ];
        self.write(id, Some(input.module_id), &body, &bindings).await?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> RbacResult<Permission> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('permission', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| RbacError::not_found("permission", id))?;

        Ok(row.try_into_permission(id)?)
    }

    async fn find(&self, module_id: Uuid, action: Action) -> RbacResult<Option<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE module_id = $module_id AND action = $action LIMIT 1",
            )
            .bind(("module_id", module_id.to_string()))
            .bind(("action", action.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_permission())
            .transpose()?)
    }

    async fn update(&self, id: Uuid, input: UpdatePermission) -> RbacResult<Permission> {
        let action = input
            .action
            .as_deref()
            .map(str::parse::<Action>)
            .transpose()?;

        let mut body = touch("id");
        body.push_str(&require("'permission'", "id", MISSING));
        let mut bindings = vec![bind("id", id)];
        let mut sets = Vec::new();
        if let Some(name) = input.name {
            sets.push("name = $name");
            bindings.push(bind("name", name));
        }
        if let Some(action) = action {
            sets.push("action = $action");
            bindings.push(bind("action", action.as_str()));
        }
        if let Some(module_id) = input.module_id {
            body.push_str(&touch("module_id"));
            body.push_str(&require("'module'", "module_id", MISSING_MODULE));
            sets.push("module_id = $module_id");
            bindings.push(bind("module_id", module_id));
        }
        if let Some(description) = input.description {
            sets.push("description = $description");
            bindings.push(bind("description", description));
        }
        sets.push("updated_at = time::now()");
        body.push_str(&format!(
            "UPDATE type::record('permission', $id) SET {} RETURN NONE;\n",
            sets.join(", ")
        ));

        self.write(id, input.module_id, &body, &bindings).await?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> RbacResult<()> {
        let deleted = delete_unreferenced(
            &self.db,
            "permission",
            id,
            "(SELECT VALUE id FROM grants WHERE child_id = $id)",
        )
        .await?;

        if !deleted {
            let id_str = id.to_string();
            let grants = self.grant_count(&id_str).await?;
            return Err(RbacError::Integrity {
                entity: "permission".into(),
                id: id_str,
                reason: format!("assigned to {grants} role(s)"),
            });
        }

        debug!(permission_id = %id, "Deleted permission");
        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Permission>> {
        let total = self.count().await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows_into_permissions(rows)?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn all(&self) -> RbacResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows_into_permissions(rows)?)
    }

    async fn list_by_module(&self, module_id: Uuid) -> RbacResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE module_id = $module_id",
            )
            .bind(("module_id", module_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let mut permissions = rows_into_permissions(rows)?;
        // Canonical action order, not lexical.
        permissions.sort_by_key(|p| p.action);
        Ok(permissions)
    }

    async fn count(&self) -> RbacResult<u64> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM permission GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_total(rows))
    }
}
