//! Integration tests for seeding and reporting over the in-memory store.

use gatehouse_core::error::RbacError;
use gatehouse_core::memory::MemoryStore;
use gatehouse_core::models::action::Action;
use gatehouse_core::models::edge::Relation;
use gatehouse_core::models::group::CreateGroup;
use gatehouse_core::models::module::CreateModule;
use gatehouse_core::models::role::CreateRole;
use gatehouse_core::models::user::RegisterUser;
use gatehouse_core::repository::{
    GroupRepository, ModuleRepository, PermissionRepository, RbacStore, RoleRepository,
    UserRepository,
};
use gatehouse_service::{
    AccessReporter, EntityService, ModuleStats, OrphanReporter, PermissionResolver,
    RelationshipService, SeedOutcome, Seeder, ServiceConfig,
};
use uuid::Uuid;

async fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    let outcome = Seeder::new(store.clone(), ServiceConfig::default())
        .seed_defaults()
        .await
        .unwrap();
    assert!(matches!(outcome, SeedOutcome::Seeded(_)));
    store
}

#[tokio::test]
async fn seed_creates_a_fully_linked_admin() {
    let store = seeded().await;
    let admin = store.users().get_by_username("admin").await.unwrap();

    let effective = PermissionResolver::new(store.clone())
        .effective_permissions(admin.id)
        .await
        .unwrap();
    assert_eq!(effective.modules.len(), 5);
    assert_eq!(effective.permission_count(), 20);

    let users_module = effective
        .modules
        .iter()
        .find(|m| m.module.name == "Users")
        .unwrap();
    let create = &users_module.permissions[0];
    assert_eq!(create.permission.action, Action::Create);
    assert_eq!(create.permission.name, "create_users");
    assert_eq!(create.permission.description, "Create users");
    assert_eq!(create.roles.iter().collect::<Vec<_>>(), ["Admin"]);
    assert_eq!(create.groups.iter().collect::<Vec<_>>(), ["Administrators"]);
}

#[tokio::test]
async fn seed_is_skipped_when_users_exist() {
    let store = seeded().await;
    let outcome = Seeder::new(store.clone(), ServiceConfig::default())
        .seed_defaults()
        .await
        .unwrap();
    assert_eq!(outcome, SeedOutcome::Skipped);
    assert_eq!(store.users().count().await.unwrap(), 1);
}

#[tokio::test]
async fn seeded_graph_has_no_orphans() {
    let store = seeded().await;
    let report = OrphanReporter::new(store).orphan_report().await.unwrap();
    assert!(report.is_clean(), "{:?}", report.summary);
}

#[tokio::test]
async fn removing_the_only_assignment_orphans_the_role() {
    let store = seeded().await;
    let group = store.groups().get_by_name("Administrators").await.unwrap();
    let role = store.roles().get_by_name("Admin").await.unwrap();

    RelationshipService::new(store.clone())
        .unassign(Relation::GroupRole, group.id, role.id)
        .await
        .unwrap();

    let report = OrphanReporter::new(store).orphan_report().await.unwrap();
    assert_eq!(report.summary.roles_without_groups, 1);
    assert_eq!(report.roles_without_groups[0].name, "Admin");
    assert_eq!(report.summary.groups_without_roles, 1);
    // The role keeps its grants.
    assert_eq!(report.summary.roles_without_permissions, 0);
    assert_eq!(report.summary.permissions_without_roles, 0);
    assert_eq!(report.summary.total(), 2);
}

#[tokio::test]
async fn new_entities_show_up_as_orphans() {
    let store = seeded().await;
    let entities = EntityService::new(store.clone(), ServiceConfig::default());
    entities
        .register_user(RegisterUser {
            username: "loner".into(),
            email: "loner@example.com".into(),
            password: "secret123".into(),
        })
        .await
        .unwrap();
    entities
        .create_module(CreateModule {
            name: "Empty".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let report = OrphanReporter::new(store).orphan_report().await.unwrap();
    assert_eq!(report.users_without_groups.len(), 1);
    assert_eq!(report.users_without_groups[0].username, "loner");
    assert_eq!(report.modules_without_permissions.len(), 1);
    assert_eq!(report.modules_without_permissions[0].name, "Empty");
}

#[tokio::test]
async fn access_report_lists_only_users_with_access() {
    let store = seeded().await;
    EntityService::new(store.clone(), ServiceConfig::default())
        .register_user(RegisterUser {
            username: "nobody".into(),
            email: "nobody@example.com".into(),
            password: "secret123".into(),
        })
        .await
        .unwrap();

    let report = AccessReporter::new(store).user_access_report().await.unwrap();
    assert_eq!(report.len(), 1);

    let admin = &report[0];
    assert_eq!(admin.user.username, "admin");
    assert_eq!(admin.total_permissions, 20);
    assert_eq!(admin.groups.len(), 1);
    assert_eq!(admin.groups[0].name, "Administrators");
    assert_eq!(admin.groups[0].roles[0].name, "Admin");
    assert_eq!(admin.groups[0].roles[0].permissions.len(), 20);
    assert_eq!(admin.unique_permissions[0], "create_Groups");
}

#[tokio::test]
async fn overview_counts_everything() {
    let store = seeded().await;
    let reporter = AccessReporter::new(store);
    let overview = reporter.system_overview().await.unwrap();

    assert_eq!(overview.counts.users, 1);
    assert_eq!(overview.counts.modules, 5);
    assert_eq!(overview.counts.permissions, 20);
    assert_eq!(overview.counts.user_groups, 1);
    assert_eq!(overview.counts.group_roles, 1);
    assert_eq!(overview.counts.role_permissions, 20);
    assert!(overview
        .permissions_by_module
        .iter()
        .all(|m| m.permission_count == 4));
    assert_eq!(overview.active_users[0].username, "admin");
    assert_eq!(overview.active_users[0].group_count, 1);
    assert_eq!(overview.recent_activity.len(), 3);

    let catalogue = reporter.permissions_by_module().await.unwrap();
    let names: Vec<&str> = catalogue.iter().map(|c| c.module.name.as_str()).collect();
    assert_eq!(names, ["Groups", "Modules", "Permissions", "Roles", "Users"]);

    let read_users = &catalogue[4].permissions[1];
    assert_eq!(read_users.name, "read_users");
    let roles = reporter.permission_roles(read_users.id).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].name, "Admin");
}

#[tokio::test]
async fn module_stats_count_each_role_and_user_once() {
    let store = seeded().await;
    let entities = EntityService::new(store.clone(), ServiceConfig::default());
    let relationships = RelationshipService::new(store.clone());

    let users_module = store.modules().get_by_name("Users").await.unwrap();
    let read_users = store
        .permissions()
        .find(users_module.id, Action::Read)
        .await
        .unwrap()
        .unwrap();
    let admin_role = store.roles().get_by_name("Admin").await.unwrap();
    let administrators = store.groups().get_by_name("Administrators").await.unwrap();

    let viewer = entities
        .create_role(CreateRole {
            name: "Viewer".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    relationships
        .assign(Relation::RolePermission, viewer.id, read_users.id)
        .await
        .unwrap();
    let staff = entities
        .create_group(CreateGroup {
            name: "Staff".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    relationships
        .assign_many(Relation::GroupRole, staff.id, &[admin_role.id, viewer.id])
        .await
        .unwrap();

    for name in ["alice", "bob"] {
        let user = entities
            .register_user(RegisterUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password: "secret123".into(),
            })
            .await
            .unwrap();
        relationships
            .assign(Relation::UserGroup, user.id, staff.id)
            .await
            .unwrap();
        if name == "alice" {
            relationships
                .assign(Relation::UserGroup, user.id, administrators.id)
                .await
                .unwrap();
        }
    }

    let reporter = AccessReporter::new(store.clone());
    let stats = reporter.module_stats(users_module.id).await.unwrap();
    assert_eq!(
        stats,
        ModuleStats {
            permissions: 4,
            roles: 2,
            users: 3
        }
    );

    let empty = entities
        .create_module(CreateModule {
            name: "Empty".into(),
            description: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(
        reporter.module_stats(empty.id).await.unwrap(),
        ModuleStats::default()
    );

    let err = reporter.module_stats(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, RbacError::NotFound { ref entity, .. } if entity == "module"));
}
