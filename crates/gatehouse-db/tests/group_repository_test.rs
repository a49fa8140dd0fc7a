//! Integration tests for the Group, Role and Module repositories using
//! in-memory SurrealDB.

use gatehouse_core::error::RbacError;
use gatehouse_core::models::edge::Relation;
use gatehouse_core::models::group::{CreateGroup, UpdateGroup};
use gatehouse_core::models::module::CreateModule;
use gatehouse_core::models::permission::CreatePermission;
use gatehouse_core::models::role::CreateRole;
use gatehouse_core::models::user::CreateUser;
use gatehouse_core::repository::{
    EdgeRepository, GroupRepository, ModuleRepository, PermissionRepository, RbacStore,
    RoleRepository, UserRepository,
};
use gatehouse_db::SurrealStore;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> SurrealStore<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    gatehouse_db::run_migrations(&db).await.unwrap();
    SurrealStore::new(db)
}

fn group(name: &str) -> CreateGroup {
    CreateGroup {
        name: name.into(),
        description: format!("{name} team"),
    }
}

#[tokio::test]
async fn create_get_and_rename_group() {
    let store = setup().await;
    let created = store.groups().create(group("Developers")).await.unwrap();

    let fetched = store.groups().get_by_name("Developers").await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.description, "Developers team");

    let renamed = store
        .groups()
        .update(
            created.id,
            UpdateGroup {
                name: Some("Engineers".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Engineers");
    assert_eq!(renamed.description, "Developers team");
}

#[tokio::test]
async fn rename_onto_existing_name_is_a_conflict() {
    let store = setup().await;
    store.groups().create(group("Developers")).await.unwrap();
    let other = store.groups().create(group("Support")).await.unwrap();

    let err = store
        .groups()
        .update(
            other.id,
            UpdateGroup {
                name: Some("Developers".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RbacError::Conflict { .. }), "got {err:?}");
}

#[tokio::test]
async fn delete_group_cascades_memberships_and_roles() {
    let store = setup().await;
    let user = store
        .users()
        .create(CreateUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
        })
        .await
        .unwrap();
    let devs = store.groups().create(group("Developers")).await.unwrap();
    let editor = store
        .roles()
        .create(CreateRole {
            name: "Editor".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    store
        .edges()
        .insert(Relation::UserGroup, user.id, devs.id)
        .await
        .unwrap();
    store
        .edges()
        .insert(Relation::GroupRole, devs.id, editor.id)
        .await
        .unwrap();

    store.groups().delete(devs.id).await.unwrap();

    assert!(store.groups().get_by_id(devs.id).await.is_err());
    assert_eq!(store.edges().count(Relation::UserGroup).await.unwrap(), 0);
    assert_eq!(store.edges().count(Relation::GroupRole).await.unwrap(), 0);
    assert!(store.users().get_by_id(user.id).await.is_ok());
    assert!(store.roles().get_by_id(editor.id).await.is_ok());
}

#[tokio::test]
async fn module_with_permissions_cannot_be_deleted() {
    let store = setup().await;
    let module = store
        .modules()
        .create(CreateModule {
            name: "Reports".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    let permission = store
        .permissions()
        .create(CreatePermission {
            name: "read_reports".into(),
            action: "read".into(),
            module_id: module.id,
            description: String::new(),
        })
        .await
        .unwrap();

    let err = store.modules().delete(module.id).await.unwrap_err();
    match err {
        RbacError::Integrity { reason, .. } => assert!(reason.contains('1'), "{reason}"),
        other => panic!("expected integrity error, got {other:?}"),
    }
    assert!(store.modules().get_by_id(module.id).await.is_ok());

    store.permissions().delete(permission.id).await.unwrap();
    store.modules().delete(module.id).await.unwrap();
    assert_eq!(store.modules().count().await.unwrap(), 0);
}

#[tokio::test]
async fn roles_list_in_creation_order() {
    let store = setup().await;
    for name in ["Viewer", "Editor", "Admin"] {
        store
            .roles()
            .create(CreateRole {
                name: name.into(),
                description: String::new(),
            })
            .await
            .unwrap();
    }

    let names: Vec<String> = store
        .roles()
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["Viewer", "Editor", "Admin"]);
}
