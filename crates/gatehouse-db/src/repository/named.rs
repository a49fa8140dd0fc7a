//! Queries shared by the name-keyed tables (`group`, `role`, `module`).
//!
//! The three tables have identical columns, so the row structs and CRUD
//! queries live here and each repository only adds its own delete policy.

use chrono::{DateTime, Utc};
use gatehouse_core::models::{group::Group, module::Module, role::Role};
use gatehouse_core::repository::{PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, first_total, parse_uuid};
use crate::error::DbError;

/// Columns shared by every named table.
#[derive(Debug, SurrealValue)]
pub(crate) struct NamedRow {
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// [`NamedRow`] plus `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct NamedRowWithId {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub(crate) trait NamedEntity: Sized {
    const TABLE: &'static str;

    fn from_row(id: Uuid, row: NamedRow) -> Self;
}

macro_rules! named_entity {
    ($ty:ty, $table:literal) => {
        impl NamedEntity for $ty {
            const TABLE: &'static str = $table;

            fn from_row(id: Uuid, row: NamedRow) -> Self {
                Self {
                    id,
                    name: row.name,
                    description: row.description,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                }
            }
        }
    };
}

named_entity!(Group, "group");
named_entity!(Role, "role");
named_entity!(Module, "module");

impl NamedRowWithId {
    fn try_into_entity<T: NamedEntity>(self) -> Result<T, DbError> {
        let id = parse_uuid(T::TABLE, &self.record_id)?;
        Ok(T::from_row(
            id,
            NamedRow {
                name: self.name,
                description: self.description,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        ))
    }
}

fn single<T: NamedEntity>(id: Uuid, rows: Vec<NamedRow>) -> Result<T, DbError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(T::TABLE, id))?;
    Ok(T::from_row(id, row))
}

pub(crate) async fn create<C: Connection, T: NamedEntity>(
    db: &Surreal<C>,
    name: String,
    description: String,
) -> Result<T, DbError> {
    let id = Uuid::new_v4();

    let result = db
        .query(
            "CREATE type::record($table, $id) SET \
             name = $name, description = $description",
        )
        .bind(("table", T::TABLE))
        .bind(("id", id.to_string()))
        .bind(("name", name))
        .bind(("description", description))
        .await?;

    let mut result = result.check().map_err(|e| DbError::checked(T::TABLE, e))?;
    let rows: Vec<NamedRow> = result.take(0)?;
    single(id, rows)
}

pub(crate) async fn get_by_id<C: Connection, T: NamedEntity>(
    db: &Surreal<C>,
    id: Uuid,
) -> Result<T, DbError> {
    let mut result = db
        .query("SELECT * FROM type::record($table, $id)")
        .bind(("table", T::TABLE))
        .bind(("id", id.to_string()))
        .await?;

    let rows: Vec<NamedRow> = result.take(0)?;
    single(id, rows)
}

pub(crate) async fn get_by_name<C: Connection, T: NamedEntity>(
    db: &Surreal<C>,
    name: &str,
) -> Result<T, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM type::table($table) \
             WHERE name = $name LIMIT 1",
        )
        .bind(("table", T::TABLE))
        .bind(("name", name.to_owned()))
        .await?;

    let rows: Vec<NamedRowWithId> = result.take(0)?;
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(T::TABLE, name))?
        .try_into_entity()
}

pub(crate) async fn update<C: Connection, T: NamedEntity>(
    db: &Surreal<C>,
    id: Uuid,
    name: Option<String>,
    description: Option<String>,
) -> Result<T, DbError> {
    let mut sets = Vec::new();
    if name.is_some() {
        sets.push("name = $name");
    }
    if description.is_some() {
        sets.push("description = $description");
    }
    sets.push("updated_at = time::now()");

    let query = format!(
        "UPDATE type::record($table, $id) SET {}",
        sets.join(", ")
    );

    let mut builder = db
        .query(&query)
        .bind(("table", T::TABLE))
        .bind(("id", id.to_string()));
    if let Some(name) = name {
        builder = builder.bind(("name", name));
    }
    if let Some(description) = description {
        builder = builder.bind(("description", description));
    }

    let result = builder.await?;
    let mut result = result.check().map_err(|e| DbError::checked(T::TABLE, e))?;
    let rows: Vec<NamedRow> = result.take(0)?;
    single(id, rows)
}

pub(crate) async fn all<C: Connection, T: NamedEntity>(db: &Surreal<C>) -> Result<Vec<T>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM type::table($table) \
             ORDER BY created_at ASC",
        )
        .bind(("table", T::TABLE))
        .await?;

    let rows: Vec<NamedRowWithId> = result.take(0)?;
    rows.into_iter().map(|row| row.try_into_entity()).collect()
}

pub(crate) async fn list<C: Connection, T: NamedEntity>(
    db: &Surreal<C>,
    pagination: Pagination,
) -> Result<PaginatedResult<T>, DbError> {
    let total = count::<C, T>(db).await?;

    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM type::table($table) \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset",
        )
        .bind(("table", T::TABLE))
        .bind(("limit", pagination.limit))
        .bind(("offset", pagination.offset))
        .await?;

    let rows: Vec<NamedRowWithId> = result.take(0)?;
    let items = rows
        .into_iter()
        .map(|row| row.try_into_entity())
        .collect::<Result<Vec<_>, DbError>>()?;

    Ok(PaginatedResult {
        items,
        total,
        offset: pagination.offset,
        limit: pagination.limit,
    })
}

pub(crate) async fn count<C: Connection, T: NamedEntity>(db: &Surreal<C>) -> Result<u64, DbError> {
    let mut result = db
        .query("SELECT count() AS total FROM type::table($table) GROUP ALL")
        .bind(("table", T::TABLE))
        .await?;
    let rows: Vec<CountRow> = result.take(0)?;
    Ok(first_total(rows))
}
