//! Join rows of the three many-to-many relations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The many-to-many relations of the RBAC graph, oriented parent → child
/// along the resolution path User → Group → Role → Permission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// User (parent) is a member of Group (child).
    UserGroup,
    /// Group (parent) holds Role (child).
    GroupRole,
    /// Role (parent) grants Permission (child).
    RolePermission,
}

impl Relation {
    pub const ALL: [Relation; 3] = [
        Relation::UserGroup,
        Relation::GroupRole,
        Relation::RolePermission,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::UserGroup => "user_group",
            Relation::GroupRole => "group_role",
            Relation::RolePermission => "role_permission",
        }
    }

    /// Entity name of the parent side.
    pub fn parent_entity(&self) -> &'static str {
        match self {
            Relation::UserGroup => "user",
            Relation::GroupRole => "group",
            Relation::RolePermission => "role",
        }
    }

    /// Entity name of the child side.
    pub fn child_entity(&self) -> &'static str {
        match self {
            Relation::UserGroup => "group",
            Relation::GroupRole => "role",
            Relation::RolePermission => "permission",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single edge row. `(relation, parent_id, child_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub id: Uuid,
    pub relation: Relation,
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Outcome of inserting an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeInsert {
    /// A new row was written.
    Created(Edge),
    /// The pair was already related; nothing was written.
    Existing(Edge),
}

impl EdgeInsert {
    pub fn is_created(&self) -> bool {
        matches!(self, EdgeInsert::Created(_))
    }

    pub fn edge(&self) -> &Edge {
        match self {
            EdgeInsert::Created(edge) | EdgeInsert::Existing(edge) => edge,
        }
    }
}
