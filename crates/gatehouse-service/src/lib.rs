//! Gatehouse services: entity and relationship management, the deletion
//! policy, permission resolution and reporting over an injected
//! [`RbacStore`](gatehouse_core::repository::RbacStore).

pub mod config;
pub mod entity;
pub mod integrity;
mod lookup;
pub mod orphan;
pub mod password;
pub mod relationship;
pub mod report;
pub mod resolver;
pub mod seed;
mod validation;

pub use config::{SeedConfig, ServiceConfig};
pub use entity::EntityService;
pub use integrity::IntegrityGuard;
pub use orphan::{OrphanReport, OrphanReporter, OrphanSummary};
pub use relationship::{AssignSummary, EdgeView, RelationshipService};
pub use report::{AccessReporter, ModuleStats, SystemOverview, UserAccess};
pub use resolver::{EffectivePermissions, GrantPath, PermissionCheck, PermissionResolver};
pub use seed::{SeedOutcome, Seeder};
