//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::Action;

/// An (action, module) pair. At most one permission exists per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub action: Action,
    pub module_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// `<action>_<module>` key used in access reports.
    pub fn key(&self, module_name: &str) -> String {
        format!("{}_{}", self.action, module_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    /// Action name; validated against [`Action`] case-insensitively.
    pub action: String,
    pub module_id: Uuid,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePermission {
    pub name: Option<String>,
    pub action: Option<String>,
    pub module_id: Option<Uuid>,
    pub description: Option<String>,
}
