//! SurrealDB repository implementations.

mod edge;
mod group;
mod module;
mod named;
mod permission;
mod role;
mod user;

pub use edge::SurrealEdgeRepository;
pub use group::SurrealGroupRepository;
pub use module::SurrealModuleRepository;
pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use user::SurrealUserRepository;

use gatehouse_core::error::{RbacError, RbacResult};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn first_total(rows: Vec<CountRow>) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

// ---------------------------------------------------------------------------
// Guarded scripts
// ---------------------------------------------------------------------------

const MAX_ATTEMPTS: u32 = 8;

/// `THROW` reason for a guarded record that does not exist.
pub(crate) const MISSING: &str = "missing record";

/// Statement writing the latch of the id bound to `$<param>`.
pub(crate) fn touch(param: &str) -> String {
    format!("UPSERT type::record('latch', ${param}) SET touched_at = time::now() RETURN NONE;\n")
}

/// Statement aborting the transaction with `reason` unless the record
/// `table`:`$<param>` exists. `table` is a SurrealQL expression.
pub(crate) fn require(table: &str, param: &str, reason: &str) -> String {
    format!(
        "IF array::len((SELECT VALUE id FROM type::record({table}, ${param}))) = 0 \
         {{ THROW \"{reason}\" }};\n"
    )
}

/// Wrap statements in one transaction.
pub(crate) fn transaction(body: &str) -> String {
    format!("BEGIN TRANSACTION;\n{body}COMMIT TRANSACTION;")
}

/// Run a transactional script, retrying while it loses commit conflicts.
///
/// Every statement error is gathered, since a failed transaction reports
/// the `THROW` reason alongside the statements it cancelled.
pub(crate) async fn run_guarded<C: Connection>(
    db: &Surreal<C>,
    entity: &str,
    script: &str,
    bindings: &[(String, String)],
) -> Result<(), DbError> {
    let mut attempt = 1;
    loop {
        let mut query = db.query(script);
        for (key, value) in bindings {
            query = query.bind((key.clone(), value.clone()));
        }
        let outcome = match query.await {
            Ok(mut response) => {
                let mut errors: Vec<(usize, surrealdb::Error)> =
                    response.take_errors().into_iter().collect();
                if errors.is_empty() {
                    return Ok(());
                }
                errors.sort_by_key(|(index, _)| *index);
                let message = errors
                    .iter()
                    .map(|(_, e)| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                DbError::classify(entity, message)
            }
            Err(e) => DbError::checked(entity, e),
        };
        match outcome {
            DbError::Contended { .. } if attempt < MAX_ATTEMPTS => {
                debug!(entity, attempt, "Retrying contended transaction");
                attempt += 1;
            }
            other => return Err(other),
        }
    }
}

/// `(key, value)` binding for [`run_guarded`].
pub(crate) fn bind(key: impl Into<String>, value: impl ToString) -> (String, String) {
    (key.into(), value.to_string())
}

/// Delete `table`:`id` and the edge rows removed by `cascades` (statements
/// reading `$id`) in one latched transaction.
pub(crate) async fn delete_cascading<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    id: Uuid,
    cascades: &[&str],
) -> RbacResult<()> {
    let mut body = touch("id");
    body.push_str(&require("$table", "id", MISSING));
    for statement in cascades {
        body.push_str(statement);
        body.push('\n');
    }
    body.push_str("DELETE type::record($table, $id);\n");

    let bindings = [bind("table", table), bind("id", id)];
    match run_guarded(db, table, &transaction(&body), &bindings).await {
        Err(e) if e.raised(MISSING) => Err(RbacError::not_found(table, id)),
        other => Ok(other?),
    }
}

const REFERENCED: &str = "still referenced";

/// Delete `table`:`id` unless `references`, a SurrealQL array of the rows
/// pointing at `$id`, is non-empty. Returns `false` when blocked.
pub(crate) async fn delete_unreferenced<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    id: Uuid,
    references: &str,
) -> RbacResult<bool> {
    let mut body = touch("id");
    body.push_str(&require("$table", "id", MISSING));
    body.push_str(&format!(
        "IF array::len({references}) > 0 {{ THROW \"{REFERENCED}\" }};\n\
         DELETE type::record($table, $id);\n"
    ));

    let bindings = [bind("table", table), bind("id", id)];
    match run_guarded(db, table, &transaction(&body), &bindings).await {
        Ok(()) => Ok(true),
        Err(e) if e.raised(MISSING) => Err(RbacError::not_found(table, id)),
        Err(e) if e.raised(REFERENCED) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
