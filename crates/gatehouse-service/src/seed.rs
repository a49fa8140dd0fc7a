//! Default data for an empty store.

use gatehouse_core::error::RbacResult;
use gatehouse_core::models::{
    action::Action,
    edge::Relation,
    group::CreateGroup,
    module::CreateModule,
    permission::CreatePermission,
    role::CreateRole,
    user::RegisterUser,
};
use gatehouse_core::repository::{RbacStore, UserRepository};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::entity::EntityService;
use crate::relationship::RelationshipService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub admin_id: Uuid,
    pub modules: usize,
    pub permissions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SeedOutcome {
    /// The store already had users; nothing was written.
    Skipped,
    Seeded(SeedSummary),
}

#[derive(Clone)]
pub struct Seeder<S: RbacStore + Clone> {
    store: S,
    entities: EntityService<S>,
    relationships: RelationshipService<S>,
    config: ServiceConfig,
}

impl<S: RbacStore + Clone> Seeder<S> {
    pub fn new(store: S, config: ServiceConfig) -> Self {
        Self {
            entities: EntityService::new(store.clone(), config.clone()),
            relationships: RelationshipService::new(store.clone()),
            store,
            config,
        }
    }

    /// Create the default modules, their CRUD permissions and a fully
    /// linked administrator unless any user already exists.
    pub async fn seed_defaults(&self) -> RbacResult<SeedOutcome> {
        if self.store.users().count().await? > 0 {
            info!("Store already populated; skipping default seed");
            return Ok(SeedOutcome::Skipped);
        }
        let seed = &self.config.seed;

        let mut permission_ids = Vec::new();
        for (name, description) in &seed.modules {
            let module = self
                .entities
                .create_module(CreateModule {
                    name: name.clone(),
                    description: description.clone(),
                })
                .await?;
            let lowered = module.name.to_lowercase();
            for action in Action::ALL {
                let permission = self
                    .entities
                    .create_permission(CreatePermission {
                        name: format!("{action}_{lowered}"),
                        action: action.as_str().into(),
                        module_id: module.id,
                        description: format!("{} {lowered}", action.label()),
                    })
                    .await?;
                permission_ids.push(permission.id);
            }
        }

        let admin = self
            .entities
            .register_user(RegisterUser {
                username: seed.admin_username.clone(),
                email: seed.admin_email.clone(),
                password: seed.admin_password.clone(),
            })
            .await?;
        let group = self
            .entities
            .create_group(CreateGroup {
                name: seed.admin_group.clone(),
                description: "Full system access".into(),
            })
            .await?;
        let role = self
            .entities
            .create_role(CreateRole {
                name: seed.admin_role.clone(),
                description: "Administrator role with all permissions".into(),
            })
            .await?;

        self.relationships
            .assign(Relation::UserGroup, admin.id, group.id)
            .await?;
        self.relationships
            .assign(Relation::GroupRole, group.id, role.id)
            .await?;
        if !permission_ids.is_empty() {
            self.relationships
                .assign_many(Relation::RolePermission, role.id, &permission_ids)
                .await?;
        }

        let summary = SeedSummary {
            admin_id: admin.id,
            modules: seed.modules.len(),
            permissions: permission_ids.len(),
        };
        info!(
            admin = %admin.username,
            modules = summary.modules,
            permissions = summary.permissions,
            "Default data seeded"
        );
        Ok(SeedOutcome::Seeded(summary))
    }
}
