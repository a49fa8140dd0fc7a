//! SurrealDB implementation of [`EdgeRepository`].
//!
//! Each [`Relation`] maps onto its own RELATION table. Besides the
//! native `in`/`out` links, every row carries `parent_id`/`child_id` as
//! plain UUID strings so the pair index can enforce uniqueness.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gatehouse_core::error::{RbacError, RbacResult};
use gatehouse_core::models::edge::{Edge, EdgeInsert, Relation};
use gatehouse_core::repository::EdgeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{
    CountRow, bind, first_total, parse_uuid, require, run_guarded, touch, transaction,
};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct EdgeRow {
    edge_id: String,
    parent_id: String,
    child_id: String,
    created_at: DateTime<Utc>,
}

impl EdgeRow {
    fn try_into_edge(self, relation: Relation) -> Result<Edge, DbError> {
        Ok(Edge {
            id: parse_uuid("edge", &self.edge_id)?,
            relation,
            parent_id: parse_uuid(relation.parent_entity(), &self.parent_id)?,
            child_id: parse_uuid(relation.child_entity(), &self.child_id)?,
            created_at: self.created_at,
        })
    }
}

const MISSING_PARENT: &str = "missing parent";
const PAIR_RETRIES: u32 = 3;

/// `THROW` reason for the `i`-th child; delimited so `1` never matches `12`.
fn missing_child(i: usize) -> String {
    format!("missing child #{i}#")
}

/// Table backing a relation.
pub(crate) fn edge_table(relation: Relation) -> &'static str {
    match relation {
        Relation::UserGroup => "member_of",
        Relation::GroupRole => "has_role",
        Relation::RolePermission => "grants",
    }
}

fn rows_into_edges(relation: Relation, rows: Vec<EdgeRow>) -> Result<Vec<Edge>, DbError> {
    rows.into_iter()
        .map(|row| row.try_into_edge(relation))
        .collect()
}

/// The `member_of`, `has_role` and `grants` relation tables.
#[derive(Clone)]
pub struct SurrealEdgeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealEdgeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Relate `parent_id` to each child in one transaction.
    ///
    /// Both endpoints are latched and checked inside the transaction, so a
    /// concurrent delete either sees the new edge and cascades it or makes
    /// this insert fail with `NotFound`. Pairs already related are skipped.
    async fn relate(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_ids: &[Uuid],
    ) -> RbacResult<Vec<EdgeInsert>> {
        let table = edge_table(relation);
        let parent_table = relation.parent_entity();
        let child_table = relation.child_entity();

        let mut body = touch("parent_id");
        body.push_str(&require("$parent_table", "parent_id", MISSING_PARENT));
        let mut bindings = vec![
            bind("parent_table", parent_table),
            bind("child_table", child_table),
            bind("parent_id", parent_id),
        ];
        let mut edge_ids = Vec::with_capacity(child_ids.len());
        for (i, child_id) in child_ids.iter().enumerate() {
            let edge_id = Uuid::new_v4();
            body.push_str(&touch(&format!("child_{i}")));
            body.push_str(&require("$child_table", &format!("child_{i}"), &missing_child(i)));
            body.push_str(&format!(
                "IF array::len((SELECT VALUE id FROM {table} \
                 WHERE parent_id = $parent_id AND child_id = $child_{i})) = 0 {{ \
                 RELATE {parent_table}:`{parent_id}` -> {table} -> {child_table}:`{child_id}` \
                 SET edge_id = $edge_{i}, parent_id = $parent_id, child_id = $child_{i} \
                 }};\n"
            ));
            bindings.push(bind(format!("child_{i}"), child_id));
            bindings.push(bind(format!("edge_{i}"), edge_id));
            edge_ids.push(edge_id);
        }

        let script = transaction(&body);
        let mut retries = 0;
        loop {
            let Err(e) = run_guarded(&self.db, relation.as_str(), &script, &bindings).await else {
                break;
            };
            if e.raised(MISSING_PARENT) {
                return Err(RbacError::not_found(parent_table, parent_id));
            }
            if let Some(i) = (0..child_ids.len()).find(|i| e.raised(&missing_child(*i))) {
                return Err(RbacError::not_found(child_table, child_ids[i]));
            }
            // A concurrent insert of the same pair won the unique index.
            // Nothing of ours committed; the rerun skips that pair.
            if matches!(e, DbError::Conflict { .. }) && retries < PAIR_RETRIES {
                retries += 1;
                continue;
            }
            return Err(e.into());
        }

        let current: HashMap<Uuid, Edge> = self
            .select(relation, "WHERE parent_id = $parent_id", Some(parent_id), None)
            .await?
            .into_iter()
            .map(|edge| (edge.child_id, edge))
            .collect();
        child_ids
            .iter()
            .zip(edge_ids)
            .map(|(child_id, edge_id)| {
                let edge = current.get(child_id).cloned().ok_or_else(|| {
                    RbacError::not_found(relation.as_str(), format!("{parent_id}->{child_id}"))
                })?;
                Ok(if edge.id == edge_id {
                    EdgeInsert::Created(edge)
                } else {
                    EdgeInsert::Existing(edge)
                })
            })
            .collect()
    }

    async fn select(
        &self,
        relation: Relation,
        filter: &str,
        parent_id: Option<Uuid>,
        child_id: Option<Uuid>,
    ) -> Result<Vec<Edge>, DbError> {
        let query = format!(
            "SELECT edge_id, parent_id, child_id, created_at FROM {} {filter} \
             ORDER BY created_at ASC",
            edge_table(relation)
        );
        let mut builder = self.db.query(&query);
        if let Some(parent_id) = parent_id {
            builder = builder.bind(("parent_id", parent_id.to_string()));
        }
        if let Some(child_id) = child_id {
            builder = builder.bind(("child_id", child_id.to_string()));
        }
        let mut result = builder.await?;
        let rows: Vec<EdgeRow> = result.take(0)?;
        rows_into_edges(relation, rows)
    }
}

impl<C: Connection> EdgeRepository for SurrealEdgeRepository<C> {
    async fn insert(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> RbacResult<EdgeInsert> {
        let mut outcomes = self.relate(relation, parent_id, &[child_id]).await?;
        let outcome = outcomes
            .pop()
            .ok_or_else(|| RbacError::Internal(format!("{relation} insert returned nothing")))?;
        if outcome.is_created() {
            debug!(%relation, %parent_id, %child_id, "Created edge");
        }
        Ok(outcome)
    }

    async fn insert_many(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_ids: &[Uuid],
    ) -> RbacResult<Vec<EdgeInsert>> {
        let outcomes = self.relate(relation, parent_id, child_ids).await?;
        debug!(
            %relation,
            %parent_id,
            created = outcomes.iter().filter(|o| o.is_created()).count(),
            "Bulk edge insert"
        );
        Ok(outcomes)
    }

    async fn remove(&self, relation: Relation, parent_id: Uuid, child_id: Uuid) -> RbacResult<()> {
        let query = format!(
            "DELETE {} WHERE parent_id = $parent_id AND child_id = $child_id RETURN BEFORE",
            edge_table(relation)
        );

        let mut result = self
            .db
            .query(query)
            .bind(("parent_id", parent_id.to_string()))
            .bind(("child_id", child_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::checked(relation.as_str(), e))?;

        let removed: Vec<EdgeRow> = result.take(0).map_err(DbError::from)?;
        if removed.is_empty() {
            return Err(RbacError::not_found(
                relation.as_str(),
                format!("{parent_id}->{child_id}"),
            ));
        }
        debug!(%relation, %parent_id, %child_id, "Removed edge");
        Ok(())
    }

    async fn find(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> RbacResult<Option<Edge>> {
        let edges = self
            .select(
                relation,
                "WHERE parent_id = $parent_id AND child_id = $child_id",
                Some(parent_id),
                Some(child_id),
            )
            .await?;
        Ok(edges.into_iter().next())
    }

    async fn list_by_parent(&self, relation: Relation, parent_id: Uuid) -> RbacResult<Vec<Edge>> {
        Ok(self
            .select(relation, "WHERE parent_id = $parent_id", Some(parent_id), None)
            .await?)
    }

    async fn list_by_child(&self, relation: Relation, child_id: Uuid) -> RbacResult<Vec<Edge>> {
        Ok(self
            .select(relation, "WHERE child_id = $child_id", None, Some(child_id))
            .await?)
    }

    async fn list(&self, relation: Relation) -> RbacResult<Vec<Edge>> {
        Ok(self.select(relation, "", None, None).await?)
    }

    async fn count(&self, relation: Relation) -> RbacResult<u64> {
        let query = format!(
            "SELECT count() AS total FROM {} GROUP ALL",
            edge_table(relation)
        );
        let mut result = self.db.query(query).await.map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_total(rows))
    }
}
