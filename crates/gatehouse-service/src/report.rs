//! Operational reports over the whole graph.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use gatehouse_core::error::RbacResult;
use gatehouse_core::models::{
    action::Action, edge::Relation, module::Module, permission::Permission, principal::Principal,
    role::Role,
};
use gatehouse_core::repository::{
    EdgeRepository, GroupRepository, ModuleRepository, PermissionRepository, RbacStore,
    RoleRepository, UserRepository,
};
use serde::Serialize;
use uuid::Uuid;

use crate::lookup::found;
use crate::resolver::PermissionResolver;

// ---------------------------------------------------------------------------
// User access report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionRef {
    pub id: Uuid,
    pub name: String,
    pub action: Action,
    pub module: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleAccess {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<PermissionRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupAccess {
    pub id: Uuid,
    pub name: String,
    pub roles: Vec<RoleAccess>,
}

/// Everything one user can reach, as a group → role → permission tree.
#[derive(Debug, Clone, Serialize)]
pub struct UserAccess {
    pub user: Principal,
    pub groups: Vec<GroupAccess>,
    pub total_permissions: usize,
    /// Sorted `<action>_<module>` keys.
    pub unique_permissions: Vec<String>,
}

// ---------------------------------------------------------------------------
// System overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemCounts {
    pub users: u64,
    pub groups: u64,
    pub roles: u64,
    pub modules: u64,
    pub permissions: u64,
    pub user_groups: u64,
    pub group_roles: u64,
    pub role_permissions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleLoad {
    pub module_name: String,
    pub permission_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveUser {
    pub username: String,
    pub group_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    User,
    Group,
    Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentActivity {
    pub kind: ActivityKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemOverview {
    pub counts: SystemCounts,
    /// Newest first.
    pub recent_activity: Vec<RecentActivity>,
    /// Most permissions first.
    pub permissions_by_module: Vec<ModuleLoad>,
    /// The users in the most groups.
    pub active_users: Vec<ActiveUser>,
}

/// A module with its permissions ordered by action.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleCatalogue {
    pub module: Module,
    pub permissions: Vec<Permission>,
}

/// How far one module's permissions reach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModuleStats {
    pub permissions: usize,
    /// Distinct roles granting at least one of the permissions.
    pub roles: usize,
    /// Distinct users reaching the module through group, role and grant.
    pub users: usize,
}

const ACTIVE_USERS: usize = 5;
const RECENT_USERS: usize = 5;
const RECENT_GROUPS: usize = 3;
const RECENT_ROLES: usize = 2;
const RECENT_ACTIVITY: usize = 10;

fn newest<T>(
    items: &[T],
    limit: usize,
    kind: ActivityKind,
    project: impl Fn(&T) -> (String, DateTime<Utc>),
) -> Vec<RecentActivity> {
    let mut entries: Vec<(String, DateTime<Utc>)> = items.iter().map(project).collect();
    entries.sort_by_key(|(_, created_at)| Reverse(*created_at));
    entries
        .into_iter()
        .take(limit)
        .map(|(name, created_at)| RecentActivity {
            kind: kind.clone(),
            name,
            created_at,
        })
        .collect()
}

#[derive(Clone)]
pub struct AccessReporter<S: RbacStore + Clone> {
    store: S,
    resolver: PermissionResolver<S>,
}

impl<S: RbacStore + Clone> AccessReporter<S> {
    pub fn new(store: S) -> Self {
        Self {
            resolver: PermissionResolver::new(store.clone()),
            store,
        }
    }

    /// Access trees for every user holding at least one permission,
    /// ordered by username.
    pub async fn user_access_report(&self) -> RbacResult<Vec<UserAccess>> {
        let modules: HashMap<Uuid, String> = self
            .store
            .modules()
            .all()
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();
        let permissions: HashMap<Uuid, Permission> = self
            .store
            .permissions()
            .all()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut users = self.store.users().all().await?;
        users.sort_by(|a, b| a.username.cmp(&b.username));

        let mut report = Vec::new();
        for user in users {
            // group name/id → role name/id → permissions
            let mut tree: BTreeMap<(String, Uuid), BTreeMap<(String, Uuid), Vec<PermissionRef>>> =
                BTreeMap::new();
            let mut keys = BTreeSet::new();

            for path in self.resolver.paths(user.id).await? {
                let Some(permission) = permissions.get(&path.permission_id) else {
                    continue;
                };
                let Some(module) = modules.get(&permission.module_id) else {
                    continue;
                };
                keys.insert(permission.key(module));
                tree.entry((path.group.name, path.group.id))
                    .or_default()
                    .entry((path.role.name, path.role.id))
                    .or_default()
                    .push(PermissionRef {
                        id: permission.id,
                        name: permission.name.clone(),
                        action: permission.action,
                        module: module.clone(),
                    });
            }

            if keys.is_empty() {
                continue;
            }

            let groups = tree
                .into_iter()
                .map(|((name, id), roles)| GroupAccess {
                    id,
                    name,
                    roles: roles
                        .into_iter()
                        .map(|((name, id), mut permissions)| {
                            permissions.sort_by(|a, b| {
                                a.module.cmp(&b.module).then(a.action.cmp(&b.action))
                            });
                            RoleAccess {
                                id,
                                name,
                                permissions,
                            }
                        })
                        .collect(),
                })
                .collect();

            report.push(UserAccess {
                user: user.principal(),
                groups,
                total_permissions: keys.len(),
                unique_permissions: keys.into_iter().collect(),
            });
        }

        Ok(report)
    }

    pub async fn system_overview(&self) -> RbacResult<SystemOverview> {
        let edges = self.store.edges();
        let counts = SystemCounts {
            users: self.store.users().count().await?,
            groups: self.store.groups().count().await?,
            roles: self.store.roles().count().await?,
            modules: self.store.modules().count().await?,
            permissions: self.store.permissions().count().await?,
            user_groups: edges.count(Relation::UserGroup).await?,
            group_roles: edges.count(Relation::GroupRole).await?,
            role_permissions: edges.count(Relation::RolePermission).await?,
        };

        let users = self.store.users().all().await?;
        let groups = self.store.groups().all().await?;
        let roles = self.store.roles().all().await?;

        let mut recent_activity = newest(&users, RECENT_USERS, ActivityKind::User, |u| {
            (u.username.clone(), u.created_at)
        });
        recent_activity.extend(newest(&groups, RECENT_GROUPS, ActivityKind::Group, |g| {
            (g.name.clone(), g.created_at)
        }));
        recent_activity.extend(newest(&roles, RECENT_ROLES, ActivityKind::Role, |r| {
            (r.name.clone(), r.created_at)
        }));
        recent_activity.sort_by_key(|a| Reverse(a.created_at));
        recent_activity.truncate(RECENT_ACTIVITY);

        let mut permissions_by_module = Vec::new();
        for module in self.store.modules().all().await? {
            let permission_count = self.store.permissions().list_by_module(module.id).await?.len();
            permissions_by_module.push(ModuleLoad {
                module_name: module.name,
                permission_count,
            });
        }
        permissions_by_module.sort_by_key(|m| Reverse(m.permission_count));

        let mut memberships: HashMap<Uuid, usize> = HashMap::new();
        for edge in edges.list(Relation::UserGroup).await? {
            *memberships.entry(edge.parent_id).or_default() += 1;
        }
        let mut active_users: Vec<ActiveUser> = users
            .iter()
            .map(|u| ActiveUser {
                username: u.username.clone(),
                group_count: memberships.get(&u.id).copied().unwrap_or(0),
            })
            .collect();
        active_users.sort_by_key(|u| Reverse(u.group_count));
        active_users.truncate(ACTIVE_USERS);

        Ok(SystemOverview {
            counts,
            recent_activity,
            permissions_by_module,
            active_users,
        })
    }

    /// Every module ordered by name with its permissions ordered by action.
    pub async fn permissions_by_module(&self) -> RbacResult<Vec<ModuleCatalogue>> {
        let mut modules = self.store.modules().all().await?;
        modules.sort_by(|a, b| a.name.cmp(&b.name));

        let mut catalogue = Vec::with_capacity(modules.len());
        for module in modules {
            let permissions = self.store.permissions().list_by_module(module.id).await?;
            catalogue.push(ModuleCatalogue {
                module,
                permissions,
            });
        }
        Ok(catalogue)
    }

    pub async fn module_stats(&self, module_id: Uuid) -> RbacResult<ModuleStats> {
        self.store.modules().get_by_id(module_id).await?;
        let edges = self.store.edges();

        let permissions = self.store.permissions().list_by_module(module_id).await?;
        let mut roles = HashSet::new();
        for permission in &permissions {
            for grant in edges
                .list_by_child(Relation::RolePermission, permission.id)
                .await?
            {
                roles.insert(grant.parent_id);
            }
        }

        // Walk back from the granting roles to their members.
        let mut groups = HashSet::new();
        for &role_id in &roles {
            for assignment in edges.list_by_child(Relation::GroupRole, role_id).await? {
                groups.insert(assignment.parent_id);
            }
        }
        let mut users = HashSet::new();
        for &group_id in &groups {
            for membership in edges.list_by_child(Relation::UserGroup, group_id).await? {
                users.insert(membership.parent_id);
            }
        }

        Ok(ModuleStats {
            permissions: permissions.len(),
            roles: roles.len(),
            users: users.len(),
        })
    }

    /// Roles granting a permission, ordered by name.
    pub async fn permission_roles(&self, permission_id: Uuid) -> RbacResult<Vec<Role>> {
        self.store.permissions().get_by_id(permission_id).await?;

        let mut roles = Vec::new();
        for edge in self
            .store
            .edges()
            .list_by_child(Relation::RolePermission, permission_id)
            .await?
        {
            if let Some(role) = found(self.store.roles().get_by_id(edge.parent_id).await)? {
                roles.push(role);
            }
        }
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }
}
