//! Permission resolution over User → Group → Role → Permission → Module.
//!
//! Every query walks the same edge set. A record missing mid-walk (for
//! example deleted by a concurrent writer) drops the path rather than
//! granting anything. "No permission" is a result, never an error.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use gatehouse_core::error::RbacResult;
use gatehouse_core::models::{
    action::Action,
    edge::Relation,
    group::Group,
    module::Module,
    permission::Permission,
    principal::Principal,
    role::Role,
};
use gatehouse_core::repository::{
    EdgeRepository, GroupRepository, ModuleRepository, PermissionRepository, RbacStore,
    RoleRepository,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::lookup::found;

/// One (group, role) path through which a permission reaches a user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GrantPath {
    pub group: String,
    pub role: String,
    pub group_id: Uuid,
    pub role_id: Uuid,
}

/// Result of a point query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionCheck {
    pub granted: bool,
    /// Every granting path, sorted by group then role.
    pub evidence: Vec<GrantPath>,
}

impl PermissionCheck {
    fn denied() -> Self {
        Self {
            granted: false,
            evidence: Vec::new(),
        }
    }

    fn from_evidence(mut evidence: Vec<GrantPath>) -> Self {
        evidence.sort();
        evidence.dedup();
        Self {
            granted: !evidence.is_empty(),
            evidence,
        }
    }
}

/// A permission reachable by a user, with everything that contributes it.
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePermission {
    pub permission: Permission,
    pub roles: BTreeSet<String>,
    pub groups: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModulePermissions {
    pub module: Module,
    /// Ordered by action.
    pub permissions: Vec<EffectivePermission>,
}

/// All permissions of a user grouped by module, modules ordered by name.
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePermissions {
    pub user_id: Uuid,
    pub modules: Vec<ModulePermissions>,
}

impl EffectivePermissions {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn permission_count(&self) -> usize {
        self.modules.iter().map(|m| m.permissions.len()).sum()
    }

    /// `<action>_<module>` keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .modules
            .iter()
            .flat_map(|m| {
                m.permissions
                    .iter()
                    .map(|p| p.permission.key(&m.module.name))
            })
            .collect();
        keys.sort();
        keys
    }

    /// Whether `action` on the module named `module` is granted.
    pub fn allows(&self, module: &str, action: Action) -> bool {
        self.modules
            .iter()
            .filter(|m| m.module.name == module)
            .flat_map(|m| &m.permissions)
            .any(|p| p.permission.action == action)
    }
}

/// A fully hydrated user → group → role → permission path.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedPath {
    pub group: Group,
    pub role: Role,
    pub permission_id: Uuid,
}

#[derive(Clone)]
pub struct PermissionResolver<S: RbacStore> {
    store: S,
}

impl<S: RbacStore> PermissionResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every path from the user to a permission id.
    pub(crate) async fn paths(&self, user_id: Uuid) -> RbacResult<Vec<ResolvedPath>> {
        let edges = self.store.edges();
        let mut roles: HashMap<Uuid, Option<Role>> = HashMap::new();
        let mut grants: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let mut paths = Vec::new();

        for membership in edges.list_by_parent(Relation::UserGroup, user_id).await? {
            let Some(group) = found(self.store.groups().get_by_id(membership.child_id).await)?
            else {
                continue;
            };

            for assignment in edges.list_by_parent(Relation::GroupRole, group.id).await? {
                let role_id = assignment.child_id;
                if !roles.contains_key(&role_id) {
                    let role = found(self.store.roles().get_by_id(role_id).await)?;
                    roles.insert(role_id, role);
                }
                let Some(Some(role)) = roles.get(&role_id) else {
                    continue;
                };

                if !grants.contains_key(&role_id) {
                    let permission_ids = edges
                        .list_by_parent(Relation::RolePermission, role_id)
                        .await?
                        .into_iter()
                        .map(|e| e.child_id)
                        .collect();
                    grants.insert(role_id, permission_ids);
                }
                for &permission_id in grants.get(&role_id).into_iter().flatten() {
                    paths.push(ResolvedPath {
                        group: group.clone(),
                        role: role.clone(),
                        permission_id,
                    });
                }
            }
        }

        Ok(paths)
    }

    /// Can the user perform `action` on the module named `module_name`?
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        module_name: &str,
        action: Action,
    ) -> RbacResult<PermissionCheck> {
        let Some(module) = found(self.store.modules().get_by_name(module_name).await)? else {
            debug!(%user_id, module = module_name, %action, "Unknown module; denied");
            return Ok(PermissionCheck::denied());
        };
        let Some(permission) = self.store.permissions().find(module.id, action).await? else {
            debug!(%user_id, module = module_name, %action, "No such permission; denied");
            return Ok(PermissionCheck::denied());
        };

        let evidence = self
            .paths(user_id)
            .await?
            .into_iter()
            .filter(|path| path.permission_id == permission.id)
            .map(|path| GrantPath {
                group: path.group.name,
                role: path.role.name,
                group_id: path.group.id,
                role_id: path.role.id,
            })
            .collect();

        let check = PermissionCheck::from_evidence(evidence);
        debug!(
            %user_id,
            module = module_name,
            %action,
            granted = check.granted,
            paths = check.evidence.len(),
            "Permission check"
        );
        Ok(check)
    }

    /// Every permission the user holds, deduplicated by permission id.
    pub async fn effective_permissions(&self, user_id: Uuid) -> RbacResult<EffectivePermissions> {
        let mut contributors: BTreeMap<Uuid, (BTreeSet<String>, BTreeSet<String>)> =
            BTreeMap::new();
        for path in self.paths(user_id).await? {
            let (roles, groups) = contributors.entry(path.permission_id).or_default();
            roles.insert(path.role.name);
            groups.insert(path.group.name);
        }

        let mut modules: HashMap<Uuid, Option<Module>> = HashMap::new();
        let mut by_module: BTreeMap<(String, Uuid), Vec<EffectivePermission>> = BTreeMap::new();

        for (permission_id, (roles, groups)) in contributors {
            let Some(permission) =
                found(self.store.permissions().get_by_id(permission_id).await)?
            else {
                continue;
            };
            let module_id = permission.module_id;
            if !modules.contains_key(&module_id) {
                let module = found(self.store.modules().get_by_id(module_id).await)?;
                modules.insert(module_id, module);
            }
            let Some(Some(module)) = modules.get(&module_id) else {
                continue;
            };
            by_module
                .entry((module.name.clone(), module_id))
                .or_default()
                .push(EffectivePermission {
                    permission,
                    roles,
                    groups,
                });
        }

        let modules = by_module
            .into_iter()
            .filter_map(|((_, module_id), mut permissions)| {
                let module = modules.get(&module_id).cloned().flatten()?;
                permissions.sort_by_key(|p| p.permission.action);
                Some(ModulePermissions {
                    module,
                    permissions,
                })
            })
            .collect();

        let effective = EffectivePermissions { user_id, modules };
        debug!(
            %user_id,
            permissions = effective.permission_count(),
            "Resolved effective permissions"
        );
        Ok(effective)
    }

    /// [`has_permission`](Self::has_permission) for an authenticated
    /// principal.
    pub async fn check(
        &self,
        principal: &Principal,
        module_name: &str,
        action: Action,
    ) -> RbacResult<PermissionCheck> {
        self.has_permission(principal.id, module_name, action).await
    }

    /// [`effective_permissions`](Self::effective_permissions) for an
    /// authenticated principal.
    pub async fn principal_permissions(
        &self,
        principal: &Principal,
    ) -> RbacResult<EffectivePermissions> {
        self.effective_permissions(principal.id).await
    }
}
