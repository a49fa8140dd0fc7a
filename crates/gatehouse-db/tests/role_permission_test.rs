//! Integration tests for permissions and the three edge relations using
//! in-memory SurrealDB.

use gatehouse_core::error::RbacError;
use gatehouse_core::models::action::Action;
use gatehouse_core::models::edge::Relation;
use gatehouse_core::models::module::CreateModule;
use gatehouse_core::models::permission::{CreatePermission, UpdatePermission};
use gatehouse_core::models::role::CreateRole;
use gatehouse_core::repository::{
    EdgeRepository, ModuleRepository, PermissionRepository, RbacStore, RoleRepository,
};
use gatehouse_db::SurrealStore;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: in-memory DB with one module and one role.
async fn setup() -> (SurrealStore<Db>, Uuid, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    gatehouse_db::run_migrations(&db).await.unwrap();
    let store = SurrealStore::new(db);

    let module = store
        .modules()
        .create(CreateModule {
            name: "Reports".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    let role = store
        .roles()
        .create(CreateRole {
            name: "Analyst".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    (store, module.id, role.id)
}

fn permission(action: &str, module_id: Uuid) -> CreatePermission {
    CreatePermission {
        name: format!("{action}_reports"),
        action: action.into(),
        module_id,
        description: String::new(),
    }
}

#[tokio::test]
async fn one_permission_per_action_and_module() {
    let (store, module_id, _) = setup().await;
    store
        .permissions()
        .create(permission("read", module_id))
        .await
        .unwrap();

    let err = store
        .permissions()
        .create(permission("READ", module_id))
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::Conflict { .. }), "got {err:?}");
}

#[tokio::test]
async fn unknown_action_or_module_is_rejected() {
    let (store, module_id, _) = setup().await;

    let err = store
        .permissions()
        .create(permission("execute", module_id))
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::Validation { .. }));

    let err = store
        .permissions()
        .create(permission("read", Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::NotFound { ref entity, .. } if entity == "module"));
}

#[tokio::test]
async fn find_and_list_by_module_use_canonical_order() {
    let (store, module_id, _) = setup().await;
    for action in ["delete", "create", "update", "read"] {
        store
            .permissions()
            .create(permission(action, module_id))
            .await
            .unwrap();
    }

    let actions: Vec<Action> = store
        .permissions()
        .list_by_module(module_id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.action)
        .collect();
    assert_eq!(actions, Action::ALL);

    let found = store
        .permissions()
        .find(module_id, Action::Update)
        .await
        .unwrap()
        .expect("update permission exists");
    assert_eq!(found.name, "update_reports");
}

#[tokio::test]
async fn update_permission_action() {
    let (store, module_id, _) = setup().await;
    let created = store
        .permissions()
        .create(permission("read", module_id))
        .await
        .unwrap();

    let updated = store
        .permissions()
        .update(
            created.id,
            UpdatePermission {
                action: Some("Update".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.action, Action::Update);
    assert_eq!(updated.module_id, module_id);
}

#[tokio::test]
async fn grant_is_idempotent_and_removable() {
    let (store, module_id, role_id) = setup().await;
    let read = store
        .permissions()
        .create(permission("read", module_id))
        .await
        .unwrap();

    let first = store
        .edges()
        .insert(Relation::RolePermission, role_id, read.id)
        .await
        .unwrap();
    let again = store
        .edges()
        .insert(Relation::RolePermission, role_id, read.id)
        .await
        .unwrap();
    assert!(first.is_created());
    assert!(!again.is_created());
    assert_eq!(first.edge().id, again.edge().id);

    let by_parent = store
        .edges()
        .list_by_parent(Relation::RolePermission, role_id)
        .await
        .unwrap();
    assert_eq!(by_parent.len(), 1);
    assert_eq!(by_parent[0].child_id, read.id);

    store
        .edges()
        .remove(Relation::RolePermission, role_id, read.id)
        .await
        .unwrap();
    let err = store
        .edges()
        .remove(Relation::RolePermission, role_id, read.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::NotFound { .. }));
}

#[tokio::test]
async fn granted_permission_is_protected_until_role_is_deleted() {
    let (store, module_id, role_id) = setup().await;
    let read = store
        .permissions()
        .create(permission("read", module_id))
        .await
        .unwrap();
    store
        .edges()
        .insert(Relation::RolePermission, role_id, read.id)
        .await
        .unwrap();

    let err = store.permissions().delete(read.id).await.unwrap_err();
    assert!(matches!(err, RbacError::Integrity { .. }), "got {err:?}");

    // Deleting the role cascades the grant and unblocks the permission.
    store.roles().delete(role_id).await.unwrap();
    assert_eq!(
        store.edges().count(Relation::RolePermission).await.unwrap(),
        0
    );
    store.permissions().delete(read.id).await.unwrap();
}

#[tokio::test]
async fn edge_requires_both_endpoints() {
    let (store, _, role_id) = setup().await;
    let err = store
        .edges()
        .insert(Relation::RolePermission, role_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::NotFound { ref entity, .. } if entity == "permission"));
}

#[tokio::test]
async fn bulk_grant_reports_created_and_existing() {
    let (store, module_id, role_id) = setup().await;
    let read = store
        .permissions()
        .create(permission("read", module_id))
        .await
        .unwrap();
    let update = store
        .permissions()
        .create(permission("update", module_id))
        .await
        .unwrap();
    store
        .edges()
        .insert(Relation::RolePermission, role_id, read.id)
        .await
        .unwrap();

    let outcomes = store
        .edges()
        .insert_many(Relation::RolePermission, role_id, &[read.id, update.id])
        .await
        .unwrap();
    assert!(!outcomes[0].is_created());
    assert!(outcomes[1].is_created());
    assert_eq!(outcomes[1].edge().child_id, update.id);
    assert_eq!(
        store.edges().count(Relation::RolePermission).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn bulk_grant_with_unknown_permission_writes_nothing() {
    let (store, module_id, role_id) = setup().await;
    let read = store
        .permissions()
        .create(permission("read", module_id))
        .await
        .unwrap();
    let missing = Uuid::new_v4();

    let err = store
        .edges()
        .insert_many(Relation::RolePermission, role_id, &[read.id, missing])
        .await
        .unwrap_err();
    match err {
        RbacError::NotFound { entity, id } => {
            assert_eq!(entity, "permission");
            assert_eq!(id, missing.to_string());
        }
        other => panic!("expected not found, got {other:?}"),
    }
    assert_eq!(
        store.edges().count(Relation::RolePermission).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn permission_create_and_move_require_the_module() {
    let (store, module_id, _) = setup().await;
    let read = store
        .permissions()
        .create(permission("read", module_id))
        .await
        .unwrap();

    let err = store
        .permissions()
        .update(
            read.id,
            UpdatePermission {
                module_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::NotFound { ref entity, .. } if entity == "module"));

    let err = store
        .permissions()
        .update(Uuid::new_v4(), UpdatePermission::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::NotFound { ref entity, .. } if entity == "permission"));

    // The failed move left the permission where it was.
    let unchanged = store.permissions().get_by_id(read.id).await.unwrap();
    assert_eq!(unchanged.module_id, module_id);
}
