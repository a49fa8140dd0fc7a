//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings and the action
//! enum as a string with an ASSERT constraint. Uniqueness rules live in
//! UNIQUE indexes so concurrent writers cannot race past them.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Applied versions
// -----------------------------------------------------------------------

const VERSION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS schema_version SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE schema_version TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE schema_version TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE schema_version TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_schema_version ON TABLE schema_version \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedRow {
    version: i64,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "rbac_graph",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Groups, roles and modules share one shape
-- =======================================================================
DEFINE TABLE group SCHEMAFULL;
DEFINE FIELD name ON TABLE group TYPE string;
DEFINE FIELD description ON TABLE group TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE group TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE group TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_group_name ON TABLE group COLUMNS name UNIQUE;

DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE role TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

DEFINE TABLE module SCHEMAFULL;
DEFINE FIELD name ON TABLE module TYPE string;
DEFINE FIELD description ON TABLE module TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE module TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE module TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_module_name ON TABLE module COLUMNS name UNIQUE;

-- =======================================================================
-- Permissions: one per (action, module)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD action ON TABLE permission TYPE string \
    ASSERT $value IN ['create', 'read', 'update', 'delete'];
DEFINE FIELD module_id ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_action_module ON TABLE permission \
    COLUMNS action, module_id UNIQUE;
DEFINE INDEX idx_permission_module ON TABLE permission COLUMNS module_id;

-- =======================================================================
-- Write latches. Edge writes and entity deletes both touch the latch of
-- every entity they depend on, so the two conflict at commit instead of
-- leaving an edge to a deleted record.
-- =======================================================================
DEFINE TABLE latch SCHEMAFULL;
DEFINE FIELD touched_at ON TABLE latch TYPE datetime DEFAULT time::now();

-- =======================================================================
-- Relations. parent_id/child_id mirror in/out as plain UUID strings.
-- ENFORCED rejects a RELATE whose endpoints do not exist.
-- =======================================================================

-- User -> Group membership
DEFINE TABLE member_of TYPE RELATION IN user OUT group ENFORCED SCHEMAFULL;
DEFINE FIELD edge_id ON TABLE member_of TYPE string;
DEFINE FIELD parent_id ON TABLE member_of TYPE string;
DEFINE FIELD child_id ON TABLE member_of TYPE string;
DEFINE FIELD created_at ON TABLE member_of TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_member_of_pair ON TABLE member_of \
    COLUMNS parent_id, child_id UNIQUE;
DEFINE INDEX idx_member_of_child ON TABLE member_of COLUMNS child_id;

-- Group -> Role assignment
DEFINE TABLE has_role TYPE RELATION IN group OUT role ENFORCED SCHEMAFULL;
DEFINE FIELD edge_id ON TABLE has_role TYPE string;
DEFINE FIELD parent_id ON TABLE has_role TYPE string;
DEFINE FIELD child_id ON TABLE has_role TYPE string;
DEFINE FIELD created_at ON TABLE has_role TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_has_role_pair ON TABLE has_role \
    COLUMNS parent_id, child_id UNIQUE;
DEFINE INDEX idx_has_role_child ON TABLE has_role COLUMNS child_id;

-- Role -> Permission grants
DEFINE TABLE grants TYPE RELATION IN role OUT permission ENFORCED SCHEMAFULL;
DEFINE FIELD edge_id ON TABLE grants TYPE string;
DEFINE FIELD parent_id ON TABLE grants TYPE string;
DEFINE FIELD child_id ON TABLE grants TYPE string;
DEFINE FIELD created_at ON TABLE grants TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_grants_pair ON TABLE grants \
    COLUMNS parent_id, child_id UNIQUE;
DEFINE INDEX idx_grants_child ON TABLE grants COLUMNS child_id;
";

/// Bring the database up to the latest schema.
///
/// Each pending migration runs in one transaction together with its
/// `schema_version` row, so a failed step leaves no trace.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(VERSION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db.query("SELECT version FROM schema_version").await?;
    let applied: Vec<AppliedRow> = result.take(0)?;
    let latest = applied.iter().map(|row| row.version).max().unwrap_or(0);

    let pending = MIGRATIONS
        .iter()
        .filter(|m| i64::from(m.version) > latest);
    for migration in pending {
        info!(version = migration.version, name = migration.name, "Migrating");
        let script = format!(
            "BEGIN TRANSACTION;\n{}\n\
             CREATE schema_version SET version = $version, name = $name;\n\
             COMMIT TRANSACTION;",
            migration.sql
        );
        db.query(script)
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!("v{} {}: {e}", migration.version, migration.name))
            })?;
    }

    info!(version = MIGRATIONS.len(), "Schema up to date");
    Ok(())
}

/// Schema DDL without version tracking.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
