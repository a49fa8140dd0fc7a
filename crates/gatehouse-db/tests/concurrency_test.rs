//! Concurrent writes against in-memory SurrealDB. Edge inserts and
//! permission creates racing a delete of the record they point at must
//! never leave a row behind that references the deleted record.

use gatehouse_core::error::RbacError;
use gatehouse_core::models::edge::Relation;
use gatehouse_core::models::group::CreateGroup;
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
use uuid::Uuid;

const ROUNDS: usize = 40;

async fn setup() -> (Surreal<Db>, SurrealStore<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    gatehouse_db::run_migrations(&db).await.unwrap();
    let store = SurrealStore::new(db.clone());
    (db, store)
}

async fn create_group(store: &SurrealStore<Db>, name: &str) -> Uuid {
    store
        .groups()
        .create(CreateGroup {
            name: name.into(),
            description: String::new(),
        })
        .await
        .unwrap()
        .id
}

async fn create_role(store: &SurrealStore<Db>, name: &str) -> Uuid {
    store
        .roles()
        .create(CreateRole {
            name: name.into(),
            description: String::new(),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn membership_insert_racing_group_delete_leaves_no_dangling_edge() {
    let (_db, store) = setup().await;
    let user = store
        .users()
        .create(CreateUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$stub".into(),
        })
        .await
        .unwrap()
        .id;

    for round in 0..ROUNDS {
        let group = create_group(&store, &format!("Group {round}")).await;

        let inserter = {
            let store = store.clone();
            tokio::spawn(async move {
                store.edges().insert(Relation::UserGroup, user, group).await
            })
        };
        let deleter = {
            let store = store.clone();
            tokio::spawn(async move { store.groups().delete(group).await })
        };
        let inserted = inserter.await.unwrap();
        deleter.await.unwrap().unwrap();

        match inserted {
            Ok(_) => {}
            Err(RbacError::NotFound { entity, .. }) => assert_eq!(entity, "group"),
            Err(other) => panic!("round {round}: unexpected insert error {other:?}"),
        }
        let dangling = store
            .edges()
            .list_by_child(Relation::UserGroup, group)
            .await
            .unwrap();
        assert!(dangling.is_empty(), "round {round}: edge to deleted group");
    }

    assert_eq!(store.edges().count(Relation::UserGroup).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bulk_insert_racing_role_delete_is_all_or_nothing() {
    let (_db, store) = setup().await;
    let group = create_group(&store, "Staff").await;

    for round in 0..ROUNDS {
        let kept = create_role(&store, &format!("Kept {round}")).await;
        let doomed = create_role(&store, &format!("Doomed {round}")).await;

        let inserter = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .edges()
                    .insert_many(Relation::GroupRole, group, &[kept, doomed])
                    .await
            })
        };
        let deleter = {
            let store = store.clone();
            tokio::spawn(async move { store.roles().delete(doomed).await })
        };
        let inserted = inserter.await.unwrap();
        deleter.await.unwrap().unwrap();

        let kept_edges = store
            .edges()
            .list_by_child(Relation::GroupRole, kept)
            .await
            .unwrap();
        match inserted {
            Ok(outcomes) => {
                assert_eq!(outcomes.len(), 2);
                assert_eq!(kept_edges.len(), 1, "round {round}");
            }
            Err(RbacError::NotFound { entity, .. }) => {
                assert_eq!(entity, "role");
                assert!(kept_edges.is_empty(), "round {round}: partial bulk insert");
            }
            Err(other) => panic!("round {round}: unexpected insert error {other:?}"),
        }
        let dangling = store
            .edges()
            .list_by_child(Relation::GroupRole, doomed)
            .await
            .unwrap();
        assert!(dangling.is_empty(), "round {round}: edge to deleted role");

        store.roles().delete(kept).await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn permission_create_racing_module_delete_leaves_no_orphan() {
    let (_db, store) = setup().await;

    for round in 0..ROUNDS {
        let module = store
            .modules()
            .create(CreateModule {
                name: format!("Module {round}"),
                description: String::new(),
            })
            .await
            .unwrap()
            .id;

        let creator = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .permissions()
                    .create(CreatePermission {
                        name: "read_module".into(),
                        action: "read".into(),
                        module_id: module,
                        description: String::new(),
                    })
                    .await
            })
        };
        let deleter = {
            let store = store.clone();
            tokio::spawn(async move { store.modules().delete(module).await })
        };
        let created = creator.await.unwrap();
        let deleted = deleter.await.unwrap();

        // Exactly one side wins: either the permission exists and blocked
        // the delete, or the module is gone and the create failed.
        match (created, deleted) {
            (Ok(permission), Err(RbacError::Integrity { .. })) => {
                assert_eq!(permission.module_id, module);
                store.permissions().delete(permission.id).await.unwrap();
                store.modules().delete(module).await.unwrap();
            }
            (Err(RbacError::NotFound { entity, .. }), Ok(())) => assert_eq!(entity, "module"),
            other => panic!("round {round}: inconsistent outcome {other:?}"),
        }
        assert_eq!(store.permissions().count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn raw_relate_to_missing_record_is_rejected() {
    let (db, store) = setup().await;
    let role = create_role(&store, "Orphan maker").await;
    let missing = Uuid::new_v4();

    let result = db
        .query(format!(
            "RELATE role:`{role}` -> grants -> permission:`{missing}` \
             SET edge_id = $edge_id, parent_id = $parent_id, child_id = $child_id"
        ))
        .bind(("edge_id", Uuid::new_v4().to_string()))
        .bind(("parent_id", role.to_string()))
        .bind(("child_id", missing.to_string()))
        .await
        .unwrap()
        .check();

    assert!(result.is_err());
    assert_eq!(
        store.edges().count(Relation::RolePermission).await.unwrap(),
        0
    );
}
