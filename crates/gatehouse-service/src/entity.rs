//! CRUD over the five entity types.
//!
//! Inputs are validated and normalised here; uniqueness is left to the
//! store, which reports violations as `Conflict`. Deletes are routed
//! through the [`IntegrityGuard`].

use gatehouse_core::error::{RbacError, RbacResult};
use gatehouse_core::models::{
    action::Action,
    group::{CreateGroup, Group, UpdateGroup},
    module::{CreateModule, Module, UpdateModule},
    permission::{CreatePermission, Permission, UpdatePermission},
    principal::Principal,
    role::{CreateRole, Role, UpdateRole},
    user::{ChangeUser, CreateUser, RegisterUser, UpdateUser, User},
};
use gatehouse_core::repository::{
    GroupRepository, ModuleRepository, PaginatedResult, Pagination, PermissionRepository,
    RbacStore, RoleRepository, UserRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::integrity::IntegrityGuard;
use crate::lookup::found;
use crate::password;
use crate::validation::{self, optional, required};

/// Entity service.
///
/// Generic over the store so that it has no dependency on the database
/// crate.
#[derive(Clone)]
pub struct EntityService<S: RbacStore + Clone> {
    store: S,
    guard: IntegrityGuard<S>,
    config: ServiceConfig,
}

impl<S: RbacStore + Clone> EntityService<S> {
    pub fn new(store: S, config: ServiceConfig) -> Self {
        Self {
            guard: IntegrityGuard::new(store.clone()),
            store,
            config,
        }
    }

    fn pepper(&self) -> Option<&str> {
        self.config.pepper.as_deref()
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub async fn register_user(&self, input: RegisterUser) -> RbacResult<User> {
        let username = input.username.trim().to_owned();
        let email = input.email.trim().to_owned();

        let mut errors = Vec::new();
        validation::username_errors(&username, &mut errors);
        validation::email_errors(&email, &mut errors);
        validation::password_errors(
            &input.password,
            self.config.min_password_length,
            &mut errors,
        );
        validation::finish(errors)?;

        let password_hash = password::hash_password(&input.password, self.pepper())?;
        let user = self
            .store
            .users()
            .create(CreateUser {
                username,
                email,
                password_hash,
            })
            .await?;

        info!(username = %user.username, id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> RbacResult<User> {
        self.store.users().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> RbacResult<User> {
        self.store.users().get_by_username(username.trim()).await
    }

    pub async fn list_users(&self, pagination: Pagination) -> RbacResult<PaginatedResult<User>> {
        self.store.users().list(pagination).await
    }

    pub async fn update_user(&self, id: Uuid, input: ChangeUser) -> RbacResult<User> {
        let username = input.username.map(|u| u.trim().to_owned());
        let email = input.email.map(|e| e.trim().to_owned());

        let mut errors = Vec::new();
        if let Some(username) = &username {
            validation::username_errors(username, &mut errors);
        }
        if let Some(email) = &email {
            validation::email_errors(email, &mut errors);
        }
        if let Some(password) = &input.password {
            validation::password_errors(password, self.config.min_password_length, &mut errors);
        }
        validation::finish(errors)?;

        let password_hash = input
            .password
            .as_deref()
            .map(|p| password::hash_password(p, self.pepper()))
            .transpose()?;

        let user = self
            .store
            .users()
            .update(
                id,
                UpdateUser {
                    username,
                    email,
                    password_hash,
                },
            )
            .await?;

        info!(username = %user.username, %id, "User updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: Uuid) -> RbacResult<()> {
        self.guard.delete_user(id).await
    }

    /// Check a username/password pair for the externally owned login flow.
    ///
    /// Unknown users and wrong passwords both yield `None`.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> RbacResult<Option<Principal>> {
        let Some(user) = found(self.store.users().get_by_username(username.trim()).await)? else {
            return Ok(None);
        };
        let valid = password::verify_password(password, &user.password_hash, self.pepper())?;
        Ok(valid.then(|| user.principal()))
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    pub async fn create_group(&self, input: CreateGroup) -> RbacResult<Group> {
        let group = self
            .store
            .groups()
            .create(CreateGroup {
                name: required("name", &input.name)?,
                description: input.description.trim().to_owned(),
            })
            .await?;
        info!(group = %group.name, id = %group.id, "Group created");
        Ok(group)
    }

    pub async fn get_group(&self, id: Uuid) -> RbacResult<Group> {
        self.store.groups().get_by_id(id).await
    }

    pub async fn list_groups(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Group>> {
        self.store.groups().list(pagination).await
    }

    pub async fn update_group(&self, id: Uuid, input: UpdateGroup) -> RbacResult<Group> {
        let group = self
            .store
            .groups()
            .update(
                id,
                UpdateGroup {
                    name: optional("name", input.name)?,
                    description: input.description.map(|d| d.trim().to_owned()),
                },
            )
            .await?;
        info!(group = %group.name, %id, "Group updated");
        Ok(group)
    }

    pub async fn delete_group(&self, id: Uuid) -> RbacResult<()> {
        self.guard.delete_group(id).await
    }

    // -----------------------------------------------------------------------
    // Roles
    // -----------------------------------------------------------------------

    pub async fn create_role(&self, input: CreateRole) -> RbacResult<Role> {
        let role = self
            .store
            .roles()
            .create(CreateRole {
                name: required("name", &input.name)?,
                description: input.description.trim().to_owned(),
            })
            .await?;
        info!(role = %role.name, id = %role.id, "Role created");
        Ok(role)
    }

    pub async fn get_role(&self, id: Uuid) -> RbacResult<Role> {
        self.store.roles().get_by_id(id).await
    }

    pub async fn list_roles(&self, pagination: Pagination) -> RbacResult<PaginatedResult<Role>> {
        self.store.roles().list(pagination).await
    }

    pub async fn update_role(&self, id: Uuid, input: UpdateRole) -> RbacResult<Role> {
        let role = self
            .store
            .roles()
            .update(
                id,
                UpdateRole {
                    name: optional("name", input.name)?,
                    description: input.description.map(|d| d.trim().to_owned()),
                },
            )
            .await?;
        info!(role = %role.name, %id, "Role updated");
        Ok(role)
    }

    pub async fn delete_role(&self, id: Uuid) -> RbacResult<()> {
        self.guard.delete_role(id).await
    }

    // -----------------------------------------------------------------------
    // Modules
    // -----------------------------------------------------------------------

    pub async fn create_module(&self, input: CreateModule) -> RbacResult<Module> {
        let module = self
            .store
            .modules()
            .create(CreateModule {
                name: required("name", &input.name)?,
                description: input.description.trim().to_owned(),
            })
            .await?;
        info!(module = %module.name, id = %module.id, "Module created");
        Ok(module)
    }

    pub async fn get_module(&self, id: Uuid) -> RbacResult<Module> {
        self.store.modules().get_by_id(id).await
    }

    pub async fn get_module_by_name(&self, name: &str) -> RbacResult<Module> {
        self.store.modules().get_by_name(name.trim()).await
    }

    pub async fn list_modules(
        &self,
        pagination: Pagination,
    ) -> RbacResult<PaginatedResult<Module>> {
        self.store.modules().list(pagination).await
    }

    pub async fn update_module(&self, id: Uuid, input: UpdateModule) -> RbacResult<Module> {
        let module = self
            .store
            .modules()
            .update(
                id,
                UpdateModule {
                    name: optional("name", input.name)?,
                    description: input.description.map(|d| d.trim().to_owned()),
                },
            )
            .await?;
        info!(module = %module.name, %id, "Module updated");
        Ok(module)
    }

    pub async fn delete_module(&self, id: Uuid) -> RbacResult<()> {
        self.guard.delete_module(id).await
    }

    // -----------------------------------------------------------------------
    // Permissions
    // -----------------------------------------------------------------------

    async fn require_module(&self, module_id: Uuid) -> RbacResult<()> {
        match found(self.store.modules().get_by_id(module_id).await)? {
            Some(_) => Ok(()),
            None => Err(RbacError::validation("invalid module id")),
        }
    }

    fn parse_action(value: &str) -> RbacResult<Action> {
        if value.trim().is_empty() {
            return Err(RbacError::validation("action is required"));
        }
        value.parse()
    }

    pub async fn create_permission(&self, input: CreatePermission) -> RbacResult<Permission> {
        let name = required("name", &input.name)?;
        let action = Self::parse_action(&input.action)?;
        self.require_module(input.module_id).await?;

        let permission = self
            .store
            .permissions()
            .create(CreatePermission {
                name,
                action: action.as_str().to_owned(),
                module_id: input.module_id,
                description: input.description.trim().to_owned(),
            })
            .await?;
        info!(
            permission = %permission.name,
            action = %permission.action,
            module_id = %permission.module_id,
            "Permission created"
        );
        Ok(permission)
    }

    pub async fn get_permission(&self, id: Uuid) -> RbacResult<Permission> {
        self.store.permissions().get_by_id(id).await
    }

    pub async fn list_permissions(
        &self,
        pagination: Pagination,
    ) -> RbacResult<PaginatedResult<Permission>> {
        self.store.permissions().list(pagination).await
    }

    pub async fn update_permission(
        &self,
        id: Uuid,
        input: UpdatePermission,
    ) -> RbacResult<Permission> {
        let name = optional("name", input.name)?;
        let action = input
            .action
            .as_deref()
            .map(Self::parse_action)
            .transpose()?;
        if let Some(module_id) = input.module_id {
            self.require_module(module_id).await?;
        }

        let permission = self
            .store
            .permissions()
            .update(
                id,
                UpdatePermission {
                    name,
                    action: action.map(|a| a.as_str().to_owned()),
                    module_id: input.module_id,
                    description: input.description.map(|d| d.trim().to_owned()),
                },
            )
            .await?;
        info!(permission = %permission.name, %id, "Permission updated");
        Ok(permission)
    }

    pub async fn delete_permission(&self, id: Uuid) -> RbacResult<()> {
        self.guard.delete_permission(id).await
    }
}
