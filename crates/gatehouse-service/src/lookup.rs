//! Store lookups shared by the services.

use std::collections::HashMap;

use gatehouse_core::error::{RbacError, RbacResult};
use gatehouse_core::repository::{
    GroupRepository, ModuleRepository, PermissionRepository, RbacStore, RoleRepository,
    UserRepository,
};
use uuid::Uuid;

/// Map `NotFound` to `None`, keep every other error.
pub(crate) fn found<T>(result: RbacResult<T>) -> RbacResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RbacError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whether the entity named by a relation endpoint exists.
pub(crate) async fn exists<S: RbacStore>(store: &S, entity: &str, id: Uuid) -> RbacResult<bool> {
    let present = match entity {
        "user" => found(store.users().get_by_id(id).await)?.is_some(),
        "group" => found(store.groups().get_by_id(id).await)?.is_some(),
        "role" => found(store.roles().get_by_id(id).await)?.is_some(),
        "module" => found(store.modules().get_by_id(id).await)?.is_some(),
        "permission" => found(store.permissions().get_by_id(id).await)?.is_some(),
        other => return Err(RbacError::Internal(format!("unknown entity type: {other}"))),
    };
    Ok(present)
}

/// Display name of every record of an entity type (username for users).
pub(crate) async fn display_names<S: RbacStore>(
    store: &S,
    entity: &str,
) -> RbacResult<HashMap<Uuid, String>> {
    let names = match entity {
        "user" => store
            .users()
            .all()
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect(),
        "group" => store
            .groups()
            .all()
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect(),
        "role" => store
            .roles()
            .all()
            .await?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect(),
        "module" => store
            .modules()
            .all()
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect(),
        "permission" => store
            .permissions()
            .all()
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect(),
        other => return Err(RbacError::Internal(format!("unknown entity type: {other}"))),
    };
    Ok(names)
}
