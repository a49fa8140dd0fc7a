//! Entities missing the edges they are expected to have.

use std::collections::{HashMap, HashSet};

use gatehouse_core::error::RbacResult;
use gatehouse_core::models::{
    edge::Relation, group::Group, module::Module, permission::Permission, role::Role,
    user::User,
};
use gatehouse_core::repository::{
    EdgeRepository, GroupRepository, ModuleRepository, PermissionRepository, RbacStore,
    RoleRepository, UserRepository,
};
use serde::Serialize;
use uuid::Uuid;

/// A permission no role grants, with its module's name.
#[derive(Debug, Clone, Serialize)]
pub struct OrphanPermission {
    pub permission: Permission,
    pub module_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrphanSummary {
    pub users_without_groups: usize,
    pub groups_without_users: usize,
    pub groups_without_roles: usize,
    pub roles_without_groups: usize,
    pub roles_without_permissions: usize,
    pub permissions_without_roles: usize,
    pub modules_without_permissions: usize,
}

impl OrphanSummary {
    pub fn total(&self) -> usize {
        self.users_without_groups
            + self.groups_without_users
            + self.groups_without_roles
            + self.roles_without_groups
            + self.roles_without_permissions
            + self.permissions_without_roles
            + self.modules_without_permissions
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrphanReport {
    pub users_without_groups: Vec<User>,
    pub groups_without_users: Vec<Group>,
    pub groups_without_roles: Vec<Group>,
    pub roles_without_groups: Vec<Role>,
    pub roles_without_permissions: Vec<Role>,
    pub permissions_without_roles: Vec<OrphanPermission>,
    pub modules_without_permissions: Vec<Module>,
    pub summary: OrphanSummary,
}

impl OrphanReport {
    pub fn is_clean(&self) -> bool {
        self.summary.total() == 0
    }
}

#[derive(Clone)]
pub struct OrphanReporter<S: RbacStore> {
    store: S,
}

impl<S: RbacStore> OrphanReporter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn endpoints(&self, relation: Relation) -> RbacResult<(HashSet<Uuid>, HashSet<Uuid>)> {
        let edges = self.store.edges().list(relation).await?;
        Ok((
            edges.iter().map(|e| e.parent_id).collect(),
            edges.iter().map(|e| e.child_id).collect(),
        ))
    }

    pub async fn orphan_report(&self) -> RbacResult<OrphanReport> {
        let users = self.store.users().all().await?;
        let groups = self.store.groups().all().await?;
        let roles = self.store.roles().all().await?;
        let modules = self.store.modules().all().await?;
        let permissions = self.store.permissions().all().await?;

        let (members, populated_groups) = self.endpoints(Relation::UserGroup).await?;
        let (groups_with_roles, assigned_roles) = self.endpoints(Relation::GroupRole).await?;
        let (granting_roles, granted) = self.endpoints(Relation::RolePermission).await?;

        let module_names: HashMap<Uuid, &str> =
            modules.iter().map(|m| (m.id, m.name.as_str())).collect();
        let used_modules: HashSet<Uuid> = permissions.iter().map(|p| p.module_id).collect();

        let permissions_without_roles: Vec<OrphanPermission> = permissions
            .iter()
            .filter(|p| !granted.contains(&p.id))
            .map(|p| OrphanPermission {
                permission: p.clone(),
                module_name: module_names
                    .get(&p.module_id)
                    .copied()
                    .unwrap_or_default()
                    .to_owned(),
            })
            .collect();

        let mut report = OrphanReport {
            users_without_groups: users
                .into_iter()
                .filter(|u| !members.contains(&u.id))
                .collect(),
            groups_without_users: groups
                .iter()
                .filter(|g| !populated_groups.contains(&g.id))
                .cloned()
                .collect(),
            groups_without_roles: groups
                .into_iter()
                .filter(|g| !groups_with_roles.contains(&g.id))
                .collect(),
            roles_without_groups: roles
                .iter()
                .filter(|r| !assigned_roles.contains(&r.id))
                .cloned()
                .collect(),
            roles_without_permissions: roles
                .into_iter()
                .filter(|r| !granting_roles.contains(&r.id))
                .collect(),
            permissions_without_roles,
            modules_without_permissions: modules
                .iter()
                .filter(|m| !used_modules.contains(&m.id))
                .cloned()
                .collect(),
            summary: OrphanSummary::default(),
        };

        report.summary = OrphanSummary {
            users_without_groups: report.users_without_groups.len(),
            groups_without_users: report.groups_without_users.len(),
            groups_without_roles: report.groups_without_roles.len(),
            roles_without_groups: report.roles_without_groups.len(),
            roles_without_permissions: report.roles_without_permissions.len(),
            permissions_without_roles: report.permissions_without_roles.len(),
            modules_without_permissions: report.modules_without_permissions.len(),
        };
        Ok(report)
    }
}
