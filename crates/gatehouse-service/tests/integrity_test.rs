//! Integration tests for the deletion policy over the in-memory store.

use gatehouse_core::error::RbacError;
use gatehouse_core::memory::MemoryStore;
use gatehouse_core::models::edge::Relation;
use gatehouse_core::models::group::CreateGroup;
use gatehouse_core::models::module::CreateModule;
use gatehouse_core::models::permission::CreatePermission;
use gatehouse_core::models::role::CreateRole;
use gatehouse_core::models::user::RegisterUser;
use gatehouse_core::repository::{EdgeRepository, RbacStore};
use gatehouse_service::{EntityService, RelationshipService, ServiceConfig};
use uuid::Uuid;

struct Graph {
    store: MemoryStore,
    entities: EntityService<MemoryStore>,
    user: Uuid,
    group: Uuid,
    role: Uuid,
    module: Uuid,
    permission: Uuid,
}

/// Helper: one fully linked user → group → role → permission → module.
async fn setup() -> Graph {
    let store = MemoryStore::new();
    let entities = EntityService::new(store.clone(), ServiceConfig::default());
    let relationships = RelationshipService::new(store.clone());

    let user = entities
        .register_user(RegisterUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "secret123".into(),
        })
        .await
        .unwrap()
        .id;
    let group = entities
        .create_group(CreateGroup {
            name: "Ops".into(),
            description: String::new(),
        })
        .await
        .unwrap()
        .id;
    let role = entities
        .create_role(CreateRole {
            name: "Operator".into(),
            description: String::new(),
        })
        .await
        .unwrap()
        .id;
    let module = entities
        .create_module(CreateModule {
            name: "Servers".into(),
            description: String::new(),
        })
        .await
        .unwrap()
        .id;
    let permission = entities
        .create_permission(CreatePermission {
            name: "update_servers".into(),
            action: "update".into(),
            module_id: module,
            description: String::new(),
        })
        .await
        .unwrap()
        .id;

    relationships
        .assign(Relation::UserGroup, user, group)
        .await
        .unwrap();
    relationships
        .assign(Relation::GroupRole, group, role)
        .await
        .unwrap();
    relationships
        .assign(Relation::RolePermission, role, permission)
        .await
        .unwrap();

    Graph {
        store,
        entities,
        user,
        group,
        role,
        module,
        permission,
    }
}

async fn edge_counts(store: &MemoryStore) -> [u64; 3] {
    [
        store.edges().count(Relation::UserGroup).await.unwrap(),
        store.edges().count(Relation::GroupRole).await.unwrap(),
        store.edges().count(Relation::RolePermission).await.unwrap(),
    ]
}

#[tokio::test]
async fn module_delete_is_blocked_until_its_permissions_are_gone() {
    let g = setup().await;

    let err = g.entities.delete_module(g.module).await.unwrap_err();
    match err {
        RbacError::Integrity { entity, reason, .. } => {
            assert_eq!(entity, "module");
            assert_eq!(reason, "referenced by 1 permission(s)");
        }
        other => panic!("expected integrity error, got {other:?}"),
    }
    assert!(g.entities.get_module(g.module).await.is_ok());

    // The permission is itself blocked by its grant.
    let err = g.entities.delete_permission(g.permission).await.unwrap_err();
    assert!(matches!(err, RbacError::Integrity { .. }));
    assert_eq!(edge_counts(&g.store).await, [1, 1, 1]);

    g.entities.delete_role(g.role).await.unwrap();
    g.entities.delete_permission(g.permission).await.unwrap();
    g.entities.delete_module(g.module).await.unwrap();
}

#[tokio::test]
async fn group_delete_cascades_memberships_and_assignments() {
    let g = setup().await;
    g.entities.delete_group(g.group).await.unwrap();

    assert_eq!(edge_counts(&g.store).await, [0, 0, 1]);
    assert!(g.entities.get_user(g.user).await.is_ok());
    assert!(g.entities.get_role(g.role).await.is_ok());
}

#[tokio::test]
async fn role_delete_cascades_assignments_and_grants() {
    let g = setup().await;
    g.entities.delete_role(g.role).await.unwrap();

    assert_eq!(edge_counts(&g.store).await, [1, 0, 0]);
    assert!(g.entities.get_permission(g.permission).await.is_ok());
}

#[tokio::test]
async fn user_delete_cascades_memberships() {
    let g = setup().await;
    g.entities.delete_user(g.user).await.unwrap();

    assert_eq!(edge_counts(&g.store).await, [0, 1, 1]);
    assert!(g.entities.get_group(g.group).await.is_ok());
}

#[tokio::test]
async fn deleting_a_missing_entity_is_not_found() {
    let g = setup().await;
    for result in [
        g.entities.delete_user(Uuid::new_v4()).await,
        g.entities.delete_group(Uuid::new_v4()).await,
        g.entities.delete_role(Uuid::new_v4()).await,
        g.entities.delete_module(Uuid::new_v4()).await,
        g.entities.delete_permission(Uuid::new_v4()).await,
    ] {
        assert!(matches!(result, Err(RbacError::NotFound { .. })));
    }
}
