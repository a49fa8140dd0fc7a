//! Assignment and listing of the three edge relations.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use gatehouse_core::error::{RbacError, RbacResult};
use gatehouse_core::models::edge::{Edge, EdgeInsert, Relation};
use gatehouse_core::repository::{EdgeRepository, RbacStore};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::lookup::{display_names, exists};

const INVALID_IDS: &str = "one or more invalid ids";

/// Outcome of [`RelationshipService::assign_many`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssignSummary {
    /// Edges newly created by this call.
    pub assigned: usize,
    /// Ids in the request.
    pub total: usize,
}

/// An edge with both endpoints' display names.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeView {
    pub id: Uuid,
    pub relation: Relation,
    pub parent_id: Uuid,
    pub parent_name: String,
    pub child_id: Uuid,
    pub child_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RelationshipService<S: RbacStore> {
    store: S,
}

impl<S: RbacStore> RelationshipService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Relate `parent_id` to `child_id`. Re-asserting an existing edge is a
    /// successful no-op reported as [`EdgeInsert::Existing`].
    pub async fn assign(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> RbacResult<EdgeInsert> {
        let outcome = self.store.edges().insert(relation, parent_id, child_id).await?;
        if outcome.is_created() {
            info!(%relation, %parent_id, %child_id, "Assigned");
        }
        Ok(outcome)
    }

    pub async fn unassign(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> RbacResult<()> {
        self.store.edges().remove(relation, parent_id, child_id).await?;
        info!(%relation, %parent_id, %child_id, "Unassigned");
        Ok(())
    }

    /// Relate one parent to many children.
    ///
    /// The children are written as one unit, so an unknown or repeated id
    /// leaves the graph untouched.
    pub async fn assign_many(
        &self,
        relation: Relation,
        parent_id: Uuid,
        child_ids: &[Uuid],
    ) -> RbacResult<AssignSummary> {
        let child = relation.child_entity();
        if child_ids.is_empty() {
            return Err(RbacError::validation(format!("at least one {child} id is required")));
        }
        if !exists(&self.store, relation.parent_entity(), parent_id).await? {
            return Err(RbacError::not_found(relation.parent_entity(), parent_id));
        }

        let mut seen = HashSet::new();
        if !child_ids.iter().all(|id| seen.insert(*id)) {
            return Err(RbacError::validation(INVALID_IDS));
        }

        let outcomes = match self
            .store
            .edges()
            .insert_many(relation, parent_id, child_ids)
            .await
        {
            Err(RbacError::NotFound { entity, .. }) if entity == child => {
                return Err(RbacError::validation(INVALID_IDS));
            }
            other => other?,
        };

        let summary = AssignSummary {
            assigned: outcomes.iter().filter(|o| o.is_created()).count(),
            total: child_ids.len(),
        };
        info!(
            %relation,
            %parent_id,
            assigned = summary.assigned,
            total = summary.total,
            "Bulk assignment"
        );
        Ok(summary)
    }

    /// Child ids related to `parent_id`.
    pub async fn children_of(&self, relation: Relation, parent_id: Uuid) -> RbacResult<Vec<Uuid>> {
        let edges = self.store.edges().list_by_parent(relation, parent_id).await?;
        Ok(edges.into_iter().map(|e| e.child_id).collect())
    }

    /// Parent ids related to `child_id`.
    pub async fn parents_of(&self, relation: Relation, child_id: Uuid) -> RbacResult<Vec<Uuid>> {
        let edges = self.store.edges().list_by_child(relation, child_id).await?;
        Ok(edges.into_iter().map(|e| e.parent_id).collect())
    }

    pub async fn list_all(&self, relation: Relation) -> RbacResult<Vec<Edge>> {
        self.store.edges().list(relation).await
    }

    /// Every edge of `relation` with display names, sorted by parent name
    /// then child name.
    pub async fn list_edge_views(&self, relation: Relation) -> RbacResult<Vec<EdgeView>> {
        let parents = display_names(&self.store, relation.parent_entity()).await?;
        let children = display_names(&self.store, relation.child_entity()).await?;

        let mut views: Vec<EdgeView> = self
            .store
            .edges()
            .list(relation)
            .await?
            .into_iter()
            .filter_map(|edge| {
                Some(EdgeView {
                    parent_name: parents.get(&edge.parent_id)?.clone(),
                    child_name: children.get(&edge.child_id)?.clone(),
                    id: edge.id,
                    relation,
                    parent_id: edge.parent_id,
                    child_id: edge.child_id,
                    created_at: edge.created_at,
                })
            })
            .collect();

        views.sort_by(|a, b| {
            a.parent_name
                .cmp(&b.parent_name)
                .then_with(|| a.child_name.cmp(&b.child_name))
        });
        Ok(views)
    }
}
